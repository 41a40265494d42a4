//! Account service routes

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    AppState,
    error::AccountResult,
    middleware::{Authenticated, auth_middleware},
    models::{AccountSummary, ActivityEntry, PaymentSummary, Registration},
    session::IssuedSession,
};

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for user login
pub type LoginResponse = IssuedSession;

/// Request for a password change
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Request for a password reset token
#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Request redeeming a password reset token
#[derive(Deserialize)]
pub struct ResetConfirmation {
    pub token: String,
    pub new_password: String,
}

/// Request for a charge
#[derive(Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
    pub source: String,
}

/// Plain acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Create the router for the account service
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let protected = Router::new()
        .route("/change-password", post(change_password))
        .route("/me", get(me).delete(deactivate))
        .route("/me/activity", get(activity))
        .route("/payments", post(create_payment).get(list_payments))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/password-reset-request", post(request_reset))
        .route("/password-reset", post(confirm_reset))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "accounts"
    }))
}

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> AccountResult<impl IntoResponse> {
    let Json(registration) = payload?;
    info!("Registration attempt for user: {}", registration.username);

    let account = state.accounts.register(registration).await?;

    Ok((StatusCode::CREATED, Json(AccountSummary::from(&account))))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AccountResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    info!("Login attempt for user: {}", payload.username);

    let session = state
        .accounts
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(session))
}

/// Revoke the presented token, if any
pub async fn logout(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> AccountResult<StatusCode> {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        state.accounts.logout(bearer.token()).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Change the caller's password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AccountResult<Json<MessageResponse>> {
    let Json(payload) = payload?;

    state
        .accounts
        .change_password(&caller.account, &payload.old_password, &payload.new_password)
        .await?;

    Ok(MessageResponse::new("Password changed"))
}

/// Ask for a reset token. The answer is the same for unknown emails.
pub async fn request_reset(
    State(state): State<AppState>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> AccountResult<Json<MessageResponse>> {
    let Json(payload) = payload?;

    state.accounts.request_reset(&payload.email).await?;

    Ok(MessageResponse::new(
        "If the email is registered, a reset code has been sent",
    ))
}

/// Redeem a reset token
pub async fn confirm_reset(
    State(state): State<AppState>,
    payload: Result<Json<ResetConfirmation>, JsonRejection>,
) -> AccountResult<Json<MessageResponse>> {
    let Json(payload) = payload?;

    state
        .accounts
        .confirm_reset(&payload.token, &payload.new_password)
        .await?;

    Ok(MessageResponse::new("Password has been reset"))
}

/// The caller's account
pub async fn me(Extension(caller): Extension<Authenticated>) -> Json<AccountSummary> {
    Json(AccountSummary::from(&caller.account))
}

/// Deactivate the caller's account
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
) -> AccountResult<StatusCode> {
    state.accounts.deactivate(&caller.account).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's latest activity
pub async fn activity(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
) -> AccountResult<Json<Vec<ActivityEntry>>> {
    Ok(Json(state.accounts.activity(&caller.account).await?))
}

/// Charge the caller
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> AccountResult<impl IntoResponse> {
    let Json(payload) = payload?;

    let payment = state
        .payments
        .charge(&caller.account, payload.amount_cents, &payload.source)
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

/// The caller's payment ledger
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(caller): Extension<Authenticated>,
) -> AccountResult<Json<Vec<PaymentSummary>>> {
    Ok(Json(state.payments.history(&caller.account).await?))
}

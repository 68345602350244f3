//! Account routes: signup with email codes, login, logout, password reset.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::db::{UserRepository, VerificationTokenRepository};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, RESET_TOKEN_TTL_MINUTES};
use crate::services::email::{self, Notification};
use crate::services::signup::{IssuedCode, OTP_TTL_MINUTES, SignupService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

/// Returned after a code is (re)issued. The code itself only goes out by email.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSentResponse {
    pub email: String,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: Option<CurrentUser>,
}

fn signup_service(
    state: &AppState,
) -> SignupService<VerificationTokenRepository<'_>, UserRepository<'_>> {
    SignupService::new(
        VerificationTokenRepository::new(state.pool()),
        UserRepository::new(state.pool()),
    )
}

async fn send_code(state: &AppState, issued: &IssuedCode) -> Result<Json<CodeSentResponse>> {
    email::deliver(
        state.email(),
        state.config().environment,
        &issued.email,
        Notification::VerificationCode {
            name: &issued.name,
            code: &issued.code,
            minutes: OTP_TTL_MINUTES,
        },
    )
    .await?;

    Ok(Json(CodeSentResponse {
        email: issued.email.to_string(),
        expires_in_minutes: OTP_TTL_MINUTES,
    }))
}

async fn sign_in(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(current)
}

/// `POST /api/auth/signup` - store the pending account and email a code.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<CodeSentResponse>)> {
    let issued = signup_service(&state)
        .start(&body.name, &body.email, &body.password)
        .await?;

    let response = send_code(&state, &issued).await?;
    Ok((StatusCode::ACCEPTED, response))
}

/// `POST /api/auth/resend-otp` - replace the code for a pending signup.
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<CodeSentResponse>> {
    let issued = signup_service(&state).resend(&body.email).await?;
    send_code(&state, &issued).await
}

/// `POST /api/auth/verify-otp` - create the account and sign it in.
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = signup_service(&state)
        .verify(&body.email, &body.code)
        .await?;

    let current = sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user: Some(current) })))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    let current = sign_in(&session, &user).await?;
    Ok(Json(UserResponse { user: Some(current) }))
}

/// `POST /api/auth/logout`
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me` - the signed-in user, or `null`.
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<UserResponse> {
    Json(UserResponse { user })
}

/// `POST /api/auth/forgot-password`
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    if let Some(reset) = AuthService::new(state.pool())
        .request_password_reset(&body.email)
        .await?
    {
        let reset_url = state.config().url_for(&format!(
            "reset-password?email={}&token={}",
            url::form_urlencoded::byte_serialize(reset.email.as_str().as_bytes())
                .collect::<String>(),
            reset.token
        ));

        email::deliver(
            state.email(),
            state.config().environment,
            &reset.email,
            Notification::PasswordReset {
                reset_url: &reset_url,
                minutes: RESET_TOKEN_TTL_MINUTES,
            },
        )
        .await?;
    }

    Ok(Json(MessageResponse {
        message: "If an account exists for that email, a reset link is on its way",
    }))
}

/// `POST /api/auth/reset-password` - consume the token and set a new password.
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool())
        .reset_password(&body.email, &body.token, &body.new_password)
        .await?;

    let current = sign_in(&session, &user).await?;
    Ok(Json(UserResponse { user: Some(current) }))
}

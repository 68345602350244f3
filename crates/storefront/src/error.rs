//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response is JSON: `{"error": "<message>"}`, plus a `fields`
//! map for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::email::EmailError;
use crate::services::payment::PaymentError;
use crate::services::product_form::FieldErrors;
use crate::services::signup::SignupError;
use crate::services::uploads::UploadError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Signup flow failed.
    #[error("Signup error: {0}")]
    Signup(#[from] SignupError),

    /// Payment provider call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Email could not be sent.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Uploaded file rejected or not stored.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Request body failed field validation.
    #[error("Validation failed: {message}")]
    Validation { message: String, fields: FieldErrors },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A dependency this request needs is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A validation failure with per-field messages.
    #[must_use]
    pub fn validation(fields: FieldErrors) -> Self {
        Self::Validation {
            message: "Please correct the highlighted fields".to_owned(),
            fields,
        }
    }

    /// Whether this error is the server's fault and should reach Sentry.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ),
            Self::Auth(e) => matches!(e, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Signup(e) => matches!(
                e,
                SignupError::Repository(_)
                    | SignupError::CorruptPending(_)
                    | SignupError::Auth(AuthError::PasswordHash)
            ),
            Self::Payment(e) => !matches!(e, PaymentError::NotPayable(_)),
            Self::Upload(e) => matches!(e, UploadError::Io(_)),
            Self::Email(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => match e {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => auth_status(err),
            Self::Signup(err) => match err {
                SignupError::InvalidEmail(_) | SignupError::MissingName => StatusCode::BAD_REQUEST,
                SignupError::Auth(e) => auth_status(e),
                SignupError::AlreadyRegistered => StatusCode::CONFLICT,
                SignupError::NoPendingSignup => StatusCode::NOT_FOUND,
                SignupError::InvalidCode => StatusCode::BAD_REQUEST,
                SignupError::Expired => StatusCode::GONE,
                SignupError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                SignupError::CorruptPending(_) | SignupError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Payment(PaymentError::NotPayable(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Email(EmailError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Payment(_) | Self::Email(_) => StatusCode::BAD_GATEWAY,
            Self::Upload(UploadError::Io(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upload(_) | Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Client-facing message. Internal details never leave the server.
    fn public_message(&self) -> String {
        match self {
            Self::Database(e) => match e {
                RepositoryError::NotFound => "Not found".to_string(),
                RepositoryError::Conflict(msg) => msg.clone(),
                _ => "Internal server error".to_string(),
            },
            Self::Auth(err) => auth_message(err),
            Self::Signup(err) => match err {
                SignupError::Auth(e) => auth_message(e),
                SignupError::InvalidEmail(_) => "Invalid email address".to_string(),
                SignupError::CorruptPending(_) | SignupError::Repository(_) => {
                    "Internal server error".to_string()
                }
                other => other.to_string(),
            },
            Self::Payment(PaymentError::NotPayable(_)) => {
                "This order can no longer be paid".to_string()
            }
            Self::Payment(_) => "Payment provider error, please try again".to_string(),
            Self::Email(_) => "Email could not be sent, please try again".to_string(),
            Self::Upload(UploadError::Io(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Upload(e) => e.to_string(),
            Self::Validation { message, .. }
            | Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::BadRequest(message)
            | Self::Conflict(message)
            | Self::ServiceUnavailable(message) => message.clone(),
            Self::RateLimited => "Too many requests, please slow down".to_string(),
        }
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) | AuthError::InvalidResetToken => {
            StatusCode::BAD_REQUEST
        }
        AuthError::ResetTokenExpired => StatusCode::GONE,
        AuthError::Repository(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "Invalid credentials".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
        AuthError::InvalidResetToken | AuthError::ResetTokenExpired => err.to_string(),
        AuthError::Repository(_) | AuthError::PasswordHash => "Authentication error".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let message = self.public_message();

        let body = match self {
            Self::Validation { fields, .. } => json!({ "error": message, "fields": fields }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::validation(FieldErrors::new())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_repository_errors_map_by_kind() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("taken".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_signup_errors_map_by_kind() {
        assert_eq!(
            get_status(SignupError::NoPendingSignup.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(SignupError::InvalidCode.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(SignupError::Expired.into()), StatusCode::GONE);
        assert_eq!(
            get_status(SignupError::TooManyAttempts.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(SignupError::AlreadyRegistered.into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_upstream_failures_are_bad_gateway() {
        let err = PaymentError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(get_status(err.into()), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let body = get_body(RepositoryError::DataCorruption("secret detail".into()).into()).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("price".into(), "must be a number".into());

        let body = get_body(AppError::validation(fields)).await;

        assert_eq!(body["fields"]["price"], "must be a number");
        assert!(body["error"].is_string());
    }
}

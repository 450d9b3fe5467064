use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::auth::dto::ApiResponse;
use crate::auth::services::SignupError;
use crate::auth::validation::ValidationIssues;
use crate::mail::MailNotConfigured;
use crate::verification::{ResendError, VerifyError};

const VALIDATION_FAILED: &str = "Validatiefout";
const UPDATE_FAILED: &str = "Fout bij het bijwerken van de gebruiker";
const MAIL_NOT_CONFIGURED: &str = "Email service not configured";
const MAIL_NOT_SENT: &str = "De verificatie-e-mail kon niet worden verzonden";

/// Error returned by the auth handlers. Every variant renders as an
/// `ApiResponse` with `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {}", .0.joined())]
    Validation(ValidationIssues),
    #[error(transparent)]
    Signup(#[from] SignupError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Resend(#[from] ResendError),
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl From<ValidationIssues> for ApiError {
    fn from(issues: ValidationIssues) -> Self {
        ApiError::Validation(issues)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationIssues(vec![rejection.body_text()]))
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            ApiError::Validation(issues) => (
                StatusCode::BAD_REQUEST,
                VALIDATION_FAILED,
                Some(issues.joined()),
            ),
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
            }
            ApiError::Signup(e) => match e {
                SignupError::EmailTaken => {
                    (StatusCode::CONFLICT, "E-mailadres is al in gebruik", None)
                }
                SignupError::TokenAttachFailed | SignupError::Hash(_) | SignupError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Er is een fout opgetreden bij het aanmaken van je account",
                    None,
                ),
            },
            ApiError::Verify(e) => match e {
                VerifyError::InvalidToken => (
                    StatusCode::BAD_REQUEST,
                    "Ongeldige of verlopen verificatietoken",
                    None,
                ),
                VerifyError::AlreadyVerified => {
                    (StatusCode::BAD_REQUEST, "E-mailadres is al geverifieerd", None)
                }
                VerifyError::TokenExpired => (
                    StatusCode::BAD_REQUEST,
                    "Verificatietoken is verlopen. Vraag een nieuwe verificatie aan.",
                    None,
                ),
                VerifyError::UpdateFailed => (StatusCode::BAD_REQUEST, UPDATE_FAILED, None),
                VerifyError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Er is een fout opgetreden bij het verifiëren van je e-mailadres",
                    None,
                ),
            },
            ApiError::Resend(e) => match e {
                ResendError::UserNotFound => {
                    (StatusCode::BAD_REQUEST, "Gebruiker niet gevonden", None)
                }
                ResendError::AlreadyVerified => {
                    (StatusCode::BAD_REQUEST, "E-mailadres is al geverifieerd", None)
                }
                ResendError::UpdateFailed => (StatusCode::BAD_REQUEST, UPDATE_FAILED, None),
                // Transport detail stays in the log.
                ResendError::Delivery(e) if e.is::<MailNotConfigured>() => {
                    (StatusCode::BAD_REQUEST, MAIL_NOT_CONFIGURED, None)
                }
                ResendError::Delivery(_) => (StatusCode::BAD_REQUEST, MAIL_NOT_SENT, None),
                ResendError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Er is een fout opgetreden bij het verzenden van de verificatie-e-mail",
                    None,
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        if status.is_server_error() {
            error!(error = ?self, %status, "request failed");
        } else {
            warn!(reason = %self, %status, "request rejected");
        }
        (status, Json(ApiResponse::failure(error, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;

    fn status_and_error(e: ApiError) -> (StatusCode, &'static str) {
        let (status, error, _) = e.parts();
        (status, error)
    }

    #[test]
    fn client_errors_are_400_with_dutch_messages() {
        assert_eq!(
            status_and_error(VerifyError::InvalidToken.into()),
            (StatusCode::BAD_REQUEST, "Ongeldige of verlopen verificatietoken")
        );
        assert_eq!(
            status_and_error(ResendError::UserNotFound.into()),
            (StatusCode::BAD_REQUEST, "Gebruiker niet gevonden")
        );
        assert_eq!(
            status_and_error(SignupError::EmailTaken.into()),
            (StatusCode::CONFLICT, "E-mailadres is al in gebruik")
        );
    }

    #[test]
    fn update_failures_are_client_errors() {
        assert_eq!(
            status_and_error(VerifyError::UpdateFailed.into()),
            (StatusCode::BAD_REQUEST, "Fout bij het bijwerken van de gebruiker")
        );
        assert_eq!(
            status_and_error(ResendError::UpdateFailed.into()),
            (StatusCode::BAD_REQUEST, "Fout bij het bijwerken van de gebruiker")
        );
    }

    #[test]
    fn delivery_failure_uses_fixed_message() {
        let err: ApiError = ResendError::Delivery(MailNotConfigured.into()).into();
        assert_eq!(
            status_and_error(err),
            (StatusCode::BAD_REQUEST, "Email service not configured")
        );

        let err: ApiError = ResendError::Delivery(anyhow::anyhow!("relay 10.0.0.3 refused")).into();
        let (status, error, message) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "De verificatie-e-mail kon niet worden verzonden");
        assert!(message.is_none());
    }

    #[test]
    fn store_outages_are_generic_500s() {
        let err: ApiError = VerifyError::Store(StoreError::Unavailable(anyhow::anyhow!("pool"))).into();
        let (status, error, _) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.contains("pool"));

        let err: ApiError = ResendError::Store(StoreError::Unavailable(anyhow::anyhow!("pool"))).into();
        assert_eq!(err.parts().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_joins_issues_into_message() {
        let err: ApiError = ValidationIssues(vec!["a".into(), "b".into()]).into();
        let (status, error, message) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "Validatiefout");
        assert_eq!(message.as_deref(), Some("a, b"));
    }
}

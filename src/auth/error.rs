// Authentication and authorization error types

use tracing::{error, warn};

use crate::auth::models::{Role, RoleSet};
use crate::auth::token::TokenError;
use crate::error::ApiError;

/// Uniform message for every token failure; the precise reason is logged only
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing authentication token";

/// Authentication and authorization errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authentication token")]
    MissingToken,

    #[error("malformed Authorization header")]
    MalformedHeader,

    #[error("token rejected: {0}")]
    Token(#[from] TokenError),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("insufficient permissions: required role '{required}', actual role '{actual}'")]
    InsufficientRole { required: RoleSet, actual: Role },

    #[error("username already exists")]
    UsernameTaken,

    #[error("email already exists")]
    EmailTaken,

    #[error("principal {0} not found")]
    PrincipalNotFound(i32),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("password hashing error: {0}")]
    PasswordHash(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::MalformedHeader | AuthError::Token(_) => {
                warn!("Unauthorized request: {}", err);
                ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
            }
            AuthError::InvalidCredentials => {
                warn!("Failed login attempt");
                ApiError::Unauthorized("Invalid username or password".to_string())
            }
            AuthError::InsufficientRole { required, actual } => {
                warn!(
                    "Authorization failed: required role '{}', actual role '{}'",
                    required, actual
                );
                ApiError::Forbidden(format!(
                    "Insufficient permissions: required role '{}'",
                    required
                ))
            }
            AuthError::UsernameTaken => ApiError::Conflict {
                message: "Username already exists".to_string(),
            },
            AuthError::EmailTaken => ApiError::Conflict {
                message: "Email already exists".to_string(),
            },
            AuthError::PrincipalNotFound(id) => ApiError::NotFound {
                resource: "Principal".to_string(),
                id: id.to_string(),
            },
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::PasswordHash(msg) => {
                error!("Password hashing error: {}", msg);
                ApiError::InternalError(msg)
            }
            AuthError::Store(msg) => ApiError::InternalError(msg),
        }
    }
}

impl axum::response::IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_token_failures_share_one_external_message() {
        let reasons = [
            AuthError::MissingToken,
            AuthError::MalformedHeader,
            AuthError::Token(TokenError::Expired),
            AuthError::Token(TokenError::InvalidSignature),
            AuthError::Token(TokenError::Malformed),
        ];
        for reason in reasons {
            match ApiError::from(reason) {
                ApiError::Unauthorized(msg) => assert_eq!(msg, UNAUTHORIZED_MESSAGE),
                other => panic!("Expected Unauthorized, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_insufficient_role_is_forbidden_not_unauthorized() {
        let err = AuthError::InsufficientRole {
            required: RoleSet::new(&[Role::Staff]),
            actual: Role::Customer,
        };
        assert_eq!(ApiError::from(err).status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_duplicates_are_conflicts() {
        assert_eq!(
            ApiError::from(AuthError::UsernameTaken).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::EmailTaken).status_code(),
            StatusCode::CONFLICT
        );
    }
}

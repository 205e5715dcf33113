//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur during authentication operations.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] farmgate_core::EmailError),

    /// Password missing.
    #[error("password cannot be empty")]
    EmptyPassword,

    /// One-time password missing.
    #[error("verification code cannot be empty")]
    EmptyOtp,

    /// The backend refused the request (bad credentials, duplicate account, bad OTP).
    #[error("{0}")]
    Rejected(String),

    /// No authenticated session.
    #[error("not logged in")]
    NotAuthenticated,

    /// The backend could not be reached or failed.
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl AuthError {
    /// Map a backend failure, using `fallback` when the backend sent no message.
    #[must_use]
    pub fn from_api(source: ApiError, fallback: &str) -> Self {
        match source.status() {
            Some(401) if source.backend_message().is_none() => Self::NotAuthenticated,
            Some(status) if (400..500).contains(&status) => Self::Rejected(
                source
                    .backend_message()
                    .unwrap_or(fallback)
                    .to_string(),
            ),
            _ => Self::Api {
                message: source.backend_message().unwrap_or(fallback).to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api() {
        let err = AuthError::from_api(
            ApiError::Api {
                status: 400,
                message: Some("Invalid email or password".to_string()),
            },
            "Login failed",
        );
        assert_eq!(err.to_string(), "Invalid email or password");

        let err = AuthError::from_api(
            ApiError::Api {
                status: 401,
                message: None,
            },
            "Login failed",
        );
        assert!(matches!(err, AuthError::NotAuthenticated));

        let err = AuthError::from_api(
            ApiError::Api {
                status: 503,
                message: None,
            },
            "Login failed",
        );
        assert_eq!(err.to_string(), "Login failed");
    }
}

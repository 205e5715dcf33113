//! Authentication service.
//!
//! Login (with the backend's optional OTP step), registration, session
//! resume, logout, and profile updates. Credential checks and OTP issuance
//! live in the backend; this only validates input that could never succeed
//! and turns backend answers into typed results and notices.

mod error;

pub use error::AuthError;

use farmgate_core::Email;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::api::{Backend, Credentials, ProfileUpdate, Registration, User};
use crate::notify::Notifier;

/// Outcome of a password login.
#[derive(Debug, Clone)]
pub enum LoginResult {
    /// The session is authenticated.
    Authenticated(User),
    /// The backend sent a one-time password; call [`AuthService::verify_otp`].
    OtpRequired { email: Email },
}

/// Authentication service.
///
/// Borrows the backend and notifier of the owning storefront.
pub struct AuthService<'a> {
    backend: &'a dyn Backend,
    notifier: &'a Notifier,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(backend: &'a dyn Backend, notifier: &'a Notifier) -> Self {
        Self { backend, notifier }
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::EmptyPassword` without
    /// calling the backend, `AuthError::Rejected` with the backend's message
    /// for bad credentials, or `AuthError::Api` if the backend failed.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginResult, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let credentials = Credentials {
            email: email.to_string(),
            password: password.clone(),
        };

        let response = self
            .backend
            .login(&credentials)
            .await
            .map_err(|e| self.fail(AuthError::from_api(e, "Login failed")))?;

        if response.requires_otp {
            info!(email = %email, "Backend requires OTP verification");
            return Ok(LoginResult::OtpRequired { email });
        }

        let user = match response.user {
            Some(user) => user,
            // Older backends answer a successful login with an empty body.
            None => self
                .backend
                .fetch_profile()
                .await
                .map_err(|e| self.fail(AuthError::from_api(e, "Login failed")))?,
        };

        self.notifier.success("Logged in successfully!");
        Ok(LoginResult::Authenticated(user))
    }

    /// Submit the one-time password and load the now-authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyOtp` without calling the backend,
    /// `AuthError::Rejected` for a wrong code, or `AuthError::Api`.
    #[instrument(skip(self, otp))]
    pub async fn verify_otp(&self, email: &Email, otp: &str) -> Result<User, AuthError> {
        let otp = otp.trim();
        if otp.is_empty() {
            return Err(self.fail(AuthError::EmptyOtp));
        }

        self.backend
            .verify_otp(email.as_str(), otp)
            .await
            .map_err(|e| self.fail(AuthError::from_api(e, "OTP verification failed")))?;

        let user = self
            .backend
            .fetch_profile()
            .await
            .map_err(|e| self.fail(AuthError::from_api(e, "OTP verification failed")))?;

        self.notifier.success("OTP verified successfully!");
        Ok(user)
    }

    /// Create an account. The backend logs the new user in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::EmptyPassword` without
    /// calling the backend, `AuthError::Rejected` (e.g., duplicate email), or
    /// `AuthError::Api`.
    #[instrument(skip(self, password, address))]
    pub async fn register(
        &self,
        user_name: &str,
        email: &str,
        password: &SecretString,
        address: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let registration = Registration {
            user_name: user_name.trim().to_string(),
            email: email.to_string(),
            password: password.clone(),
            address: address.trim().to_string(),
        };

        let user = self
            .backend
            .register(&registration)
            .await
            .map_err(|e| self.fail(AuthError::from_api(e, "Registration failed")))?;

        self.notifier.success("Account created successfully!");
        Ok(user)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Load the user behind the transport's session credential, if any.
    ///
    /// Any failure means "not logged in"; it is logged, not surfaced.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Option<User> {
        match self.backend.fetch_profile().await {
            Ok(user) => Some(user),
            Err(e) if e.is_unauthorized() => None,
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                None
            }
        }
    }

    /// End the session on the backend.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the backend call failed; the error notice reads
    /// "Logout failed".
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        match self.backend.logout().await {
            Ok(()) => {
                self.notifier.success("Logged out successfully!");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout failed");
                self.notifier.error("Logout failed");
                Err(AuthError::from_api(e, "Logout failed"))
            }
        }
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed new email, or the
    /// backend failure.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, AuthError> {
        let mut update = update.clone();
        if let Some(email) = update.email.as_deref() {
            update.email = Some(Email::parse(email)?.to_string());
        }

        let user = self
            .backend
            .update_profile(&update)
            .await
            .map_err(|e| self.fail(AuthError::from_api(e, "Profile update failed")))?;

        self.notifier.success("Profile updated successfully!");
        Ok(user)
    }

    fn fail(&self, err: AuthError) -> AuthError {
        self.notifier.error(err.to_string());
        err
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Reject passwords that could never succeed.
fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::{ApiError, LoginResponse, MockBackend};

    fn user() -> User {
        serde_json::from_value(json!({"_id": "u1", "userName": "Aline", "email": "aline@farm.rw"}))
            .unwrap()
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value)
    }

    #[tokio::test]
    async fn test_login_authenticated() {
        let mut mock = MockBackend::new();
        mock.expect_login()
            .withf(|c| c.email == "aline@farm.rw" && c.password.expose_secret() == "pw123456")
            .returning(|_| {
                Ok(LoginResponse {
                    requires_otp: false,
                    user: Some(user()),
                })
            });

        let notifier = Notifier::new();
        let mut notices = notifier.subscribe();
        let auth = AuthService::new(&mock, &notifier);

        let result = auth.login(" aline@farm.rw ", &secret("pw123456")).await.unwrap();
        assert!(matches!(result, LoginResult::Authenticated(u) if u.id.as_str() == "u1"));
        assert_eq!(notices.recv().await.unwrap().message, "Logged in successfully!");
    }

    #[tokio::test]
    async fn test_login_requires_otp() {
        let mut mock = MockBackend::new();
        mock.expect_login().returning(|_| {
            Ok(LoginResponse {
                requires_otp: true,
                user: None,
            })
        });
        mock.expect_fetch_profile().never();

        let notifier = Notifier::new();
        let auth = AuthService::new(&mock, &notifier);

        let result = auth.login("aline@farm.rw", &secret("pw")).await.unwrap();
        assert!(matches!(result, LoginResult::OtpRequired { email } if email.as_str() == "aline@farm.rw"));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_input_locally() {
        let mut mock = MockBackend::new();
        mock.expect_login().never();

        let notifier = Notifier::new();
        let auth = AuthService::new(&mock, &notifier);

        assert!(matches!(
            auth.login("not-an-email", &secret("pw")).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.login("a@b.rw", &secret("")).await,
            Err(AuthError::EmptyPassword)
        ));
    }

    #[tokio::test]
    async fn test_login_failure_uses_backend_message() {
        let mut mock = MockBackend::new();
        mock.expect_login().returning(|_| {
            Err(ApiError::Api {
                status: 400,
                message: Some("Invalid credentials".to_string()),
            })
        });

        let notifier = Notifier::new();
        let mut notices = notifier.subscribe();
        let auth = AuthService::new(&mock, &notifier);

        let err = auth.login("a@b.rw", &secret("pw")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(notices.recv().await.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_verify_otp_loads_profile() {
        let mut mock = MockBackend::new();
        mock.expect_verify_otp()
            .withf(|email, otp| email == "a@b.rw" && otp == "123456")
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_fetch_profile().times(1).returning(|| Ok(user()));

        let notifier = Notifier::new();
        let auth = AuthService::new(&mock, &notifier);
        let email = Email::parse("a@b.rw").unwrap();

        let user = auth.verify_otp(&email, " 123456 ").await.unwrap();
        assert_eq!(user.user_name, "Aline");
    }

    #[tokio::test]
    async fn test_resume_unauthorized_is_none() {
        let mut mock = MockBackend::new();
        mock.expect_fetch_profile().returning(|| {
            Err(ApiError::Api {
                status: 401,
                message: None,
            })
        });

        let notifier = Notifier::new();
        assert!(AuthService::new(&mock, &notifier).resume().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_failure_notice() {
        let mut mock = MockBackend::new();
        mock.expect_logout().returning(|| {
            Err(ApiError::Api {
                status: 500,
                message: None,
            })
        });

        let notifier = Notifier::new();
        let mut notices = notifier.subscribe();
        let auth = AuthService::new(&mock, &notifier);

        assert!(auth.logout().await.is_err());
        assert_eq!(notices.recv().await.unwrap().message, "Logout failed");
    }
}

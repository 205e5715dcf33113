//! Storefront state shared by every front end.

use std::sync::Arc;

use farmgate_core::Email;
use secrecy::SecretString;

use crate::api::{ApiClient, ApiError, Backend};
use crate::config::StorefrontConfig;
use crate::error::Error;
use crate::notify::Notifier;
use crate::services::auth::{AuthError, AuthService, LoginResult};
use crate::services::catalog::Catalog;
use crate::session::SessionContext;

/// Outcome of [`Storefront::login`].
#[derive(Debug)]
pub enum LoginOutcome {
    /// The user is logged in.
    Authenticated(SessionContext),
    /// The backend sent a one-time password; finish with [`Storefront::verify_otp`].
    OtpRequired { email: Email },
}

/// Storefront state: configuration, backend, notices, and the catalog.
///
/// This struct is cheaply cloneable via `Arc`. Session-scoped state lives
/// in [`SessionContext`], created by the login entry points.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    catalog: Catalog,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Create a storefront talking to the configured backend over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let client = ApiClient::new(&config.api)?;
        Ok(Self::with_backend(config, Arc::new(client)))
    }

    /// Create a storefront over an arbitrary backend implementation.
    #[must_use]
    pub fn with_backend(config: StorefrontConfig, backend: Arc<dyn Backend>) -> Self {
        let catalog = Catalog::new(Arc::clone(&backend));
        Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                notifier: Notifier::new(),
                catalog,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    /// Notices published by every service of this storefront.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.backend.as_ref(), &self.inner.notifier)
    }

    // =========================================================================
    // Session Entry Points
    // =========================================================================

    /// Resume the session held by the transport credential, if it is still valid.
    pub async fn resume(&self) -> Option<SessionContext> {
        let user = self.auth().resume().await?;
        Some(self.start_session(user).await)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// See [`AuthService::login`].
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginOutcome, AuthError> {
        match self.auth().login(email, password).await? {
            LoginResult::Authenticated(user) => {
                Ok(LoginOutcome::Authenticated(self.start_session(user).await))
            }
            LoginResult::OtpRequired { email } => Ok(LoginOutcome::OtpRequired { email }),
        }
    }

    /// Finish a login that required a one-time password.
    ///
    /// # Errors
    ///
    /// See [`AuthService::verify_otp`].
    pub async fn verify_otp(&self, email: &Email, otp: &str) -> Result<SessionContext, AuthError> {
        let user = self.auth().verify_otp(email, otp).await?;
        Ok(self.start_session(user).await)
    }

    /// Create an account and start its session.
    ///
    /// # Errors
    ///
    /// See [`AuthService::register`].
    pub async fn register(
        &self,
        user_name: &str,
        email: &str,
        password: &SecretString,
        address: &str,
    ) -> Result<SessionContext, AuthError> {
        let user = self
            .auth()
            .register(user_name, email, password, address)
            .await?;
        Ok(self.start_session(user).await)
    }

    /// Reject an action that needs a session, e.g., `login_required("cart")`
    /// publishes "Please login to add items to cart".
    #[must_use]
    pub fn login_required(&self, target: &str) -> Error {
        self.inner
            .notifier
            .error(format!("Please login to add items to {target}"));
        Error::NotAuthenticated
    }

    async fn start_session(&self, user: crate::api::User) -> SessionContext {
        SessionContext::start(
            Arc::clone(&self.inner.backend),
            self.inner.notifier.clone(),
            user,
            self.inner.config.same_key_policy,
        )
        .await
    }
}

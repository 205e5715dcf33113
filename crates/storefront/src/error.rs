//! Unified error handling with Sentry integration.
//!
//! Provides a top-level `Error` type aggregating every layer's errors for
//! front ends, plus helpers that attach user context and breadcrumbs to
//! Sentry events.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::config::ConfigError;
use crate::services::auth::AuthError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed outside of cart handling.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart mutation or order placement failed.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// The operation needs a logged-in session.
    #[error("Please login to continue")]
    NotAuthenticated,
}

impl Error {
    /// Capture the error to Sentry when it points at a backend or transport
    /// problem rather than a user mistake.
    pub fn report(&self) {
        let remote = match self {
            Self::Api(err) => !matches!(err, ApiError::Api { status, .. } if *status < 500),
            Self::Cart(CartError::Backend { source, .. }) => source.status().is_none_or(|s| s >= 500),
            _ => false,
        };

        if remote {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.filter(|e| !e.is_empty()).map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for debugging context in Sentry.
///
/// Breadcrumbs are attached to any error events captured later in the session.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

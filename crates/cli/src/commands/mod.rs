//! CLI command implementations.

use clap::Args;
use farmgate_core::Email;
use farmgate_storefront::api::{ApiError, UserAddress};
use farmgate_storefront::cart::CartError;
use farmgate_storefront::config::ConfigError;
use farmgate_storefront::notify::Notice;
use farmgate_storefront::services::auth::AuthError;
use farmgate_storefront::session::SessionContext;
use farmgate_storefront::{Error as StorefrontError, LoginOutcome, Storefront};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod account;
pub mod cart;
pub mod catalog;
pub mod wishlist;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("A one-time password was sent to {0}; rerun with --otp")]
    OtpRequired(Email),

    #[error("Missing --email or --password")]
    MissingCredentials,
}

impl CommandError {
    /// Send backend and transport failures to Sentry.
    pub fn report(&self) {
        if let Self::Storefront(err) = self {
            err.report();
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(err: ApiError) -> Self {
        Self::Storefront(err.into())
    }
}

impl From<AuthError> for CommandError {
    fn from(err: AuthError) -> Self {
        Self::Storefront(err.into())
    }
}

impl From<CartError> for CommandError {
    fn from(err: CartError) -> Self {
        Self::Storefront(err.into())
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        Self::Storefront(err.into())
    }
}

/// Credentials shared by every command that needs a session.
#[derive(Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(long, env = "FARMGATE_EMAIL", global = true)]
    pub email: Option<String>,

    /// Account password
    #[arg(long, env = "FARMGATE_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// One-time password, when the backend asks for one
    #[arg(long, global = true)]
    pub otp: Option<String>,
}

impl LoginArgs {
    fn credentials(&self) -> Option<(&str, SecretString)> {
        let email = self.email.as_deref()?;
        let password = self.password.clone()?;
        Some((email, SecretString::from(password)))
    }
}

/// Rwandan administrative address parts.
#[derive(Args, Default)]
pub struct AddressArgs {
    #[arg(long)]
    pub district: Option<String>,

    #[arg(long)]
    pub sector: Option<String>,

    #[arg(long)]
    pub cell: Option<String>,

    #[arg(long)]
    pub village: Option<String>,
}

impl AddressArgs {
    /// The address, or `None` when no part was given.
    pub fn into_address(self) -> Option<UserAddress> {
        let address = UserAddress {
            district: self.district,
            sector: self.sector,
            cell: self.cell,
            village: self.village,
        };
        (!address.is_empty()).then_some(address)
    }
}

/// Start a session: resume the configured bearer session, else log in.
///
/// `target` names what the session is for in the "Please login" notice.
pub async fn session(
    storefront: &Storefront,
    login: &LoginArgs,
    target: &str,
) -> Result<SessionContext, CommandError> {
    if storefront.config().api.token.is_some()
        && let Some(session) = storefront.resume().await
    {
        return Ok(session);
    }

    let Some((email, password)) = login.credentials() else {
        return Err(storefront.login_required(target).into());
    };

    match storefront.login(email, &password).await? {
        LoginOutcome::Authenticated(session) => Ok(session),
        LoginOutcome::OtpRequired { email } => {
            let Some(otp) = login.otp.as_deref() else {
                return Err(CommandError::OtpRequired(email));
            };
            Ok(storefront.verify_otp(&email, otp).await?)
        }
    }
}

/// Print every notice published so far.
#[allow(clippy::print_stdout)]
pub fn print_notices(notices: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        println!("{notice}");
    }
}

//! Account commands.
//!
//! # Usage
//!
//! ```bash
//! farmgate --email aline@farm.rw --password secret register -n "Aline" -a "Kigali"
//! farmgate profile update --phone 0788123456 --district Gasabo
//! ```

use farmgate_storefront::Storefront;
use farmgate_storefront::api::{ProfileUpdate, User, format_phone};
use farmgate_storefront::session::SessionContext;

use super::{AddressArgs, CommandError, LoginArgs};

pub async fn show(session: &SessionContext) -> Result<(), CommandError> {
    let user = session.refresh_profile().await?;
    print_user(&user);
    Ok(())
}

pub async fn update(
    session: &SessionContext,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: AddressArgs,
) -> Result<(), CommandError> {
    let update = ProfileUpdate {
        user_name: name,
        email,
        phone,
        address: address.into_address(),
    };

    if update.is_empty() {
        print_user(&session.user());
        return Ok(());
    }

    let user = session.update_profile(&update).await?;
    print_user(&user);
    Ok(())
}

/// Create an account from `--email`/`--password` and the given name.
pub async fn register(
    storefront: &Storefront,
    login: &LoginArgs,
    name: &str,
    address: &str,
) -> Result<(), CommandError> {
    let (email, password) = login
        .credentials()
        .ok_or(CommandError::MissingCredentials)?;

    let session = storefront
        .register(name, email, &password, address)
        .await?;
    print_user(&session.user());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_user(user: &User) {
    println!("{} <{}>", user.user_name, user.email);
    if let Some(phone) = user.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        println!("Phone:   {}", format_phone(phone));
    }
    if let Some(address) = user.address.as_ref().and_then(|a| a.formatted()) {
        println!("Address: {address}");
    }
}

//! Farmgate CLI - command-line storefront for the Farmgate marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! farmgate products --search maize --sort price-low
//! farmgate categories
//!
//! # Cart (credentials from flags or FARMGATE_EMAIL / FARMGATE_PASSWORD)
//! farmgate --email aline@farm.rw --password secret cart add 65f0c3 --quantity 2
//! farmgate cart set 65f0c3 5
//! farmgate cart show
//!
//! # Checkout
//! farmgate order place --district Gasabo --sector Kimironko
//! farmgate orders
//!
//! # Accounts needing a one-time password
//! farmgate --otp 482913 profile show
//! ```
//!
//! # Commands
//!
//! - `products`, `categories`, `stats` - Catalog reads (no login needed)
//! - `cart`, `wishlist` - Session collections
//! - `order place`, `orders` - Checkout and order history
//! - `profile`, `register`, `logout` - Account management

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use farmgate_storefront::Storefront;
use farmgate_storefront::config::StorefrontConfig;
use farmgate_storefront::services::catalog::SortKey;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{AddressArgs, CommandError, LoginArgs};

mod commands;

#[derive(Parser)]
#[command(name = "farmgate")]
#[command(author, version, about = "Farmgate marketplace storefront")]
struct Cli {
    #[command(flatten)]
    login: LoginArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Match against product name and description
        #[arg(short, long)]
        search: Option<String>,

        /// Only show this category (`all` for every category)
        #[arg(short, long)]
        category: Option<String>,

        /// Sort order (`name`, `price-low`, `price-high`, `rating`, `newest`)
        #[arg(long, default_value_t = SortKey::Name)]
        sort: SortKey,

        /// Only show featured products
        #[arg(long)]
        featured: bool,
    },
    /// List product categories
    Categories,
    /// Show catalog statistics
    Stats,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Check out
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Show order history, newest first
    Orders,
    /// Manage the account profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Create an account with --email and --password
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Free-form address
        #[arg(short, long, default_value = "")]
        address: String,
    },
    /// End the backend session
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and subtotal
    Show,
    /// Add units of a product
    Add {
        product: String,

        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        quantity: i64,
    },
    /// Set a product's quantity (0 removes the line)
    Set {
        product: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product's line
    Remove { product: String },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show saved products
    Show,
    /// Save a product
    Add { product: String },
    /// Remove a saved product
    Remove { product: String },
    /// Save a product, or remove it if already saved
    Toggle { product: String },
    /// Remove every saved product
    Clear,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place a cash-on-delivery order for the cart
    Place {
        #[command(flatten)]
        address: AddressArgs,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Update profile fields (only those given are sent)
    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long = "new-email")]
        new_email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[command(flatten)]
        address: AddressArgs,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry: errors and warnings become events, the rest breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = StorefrontConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Logs go to stderr; stdout carries command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "farmgate_storefront=info,farmgate=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CommandError::from(e)),
    };

    if let Err(e) = result {
        e.report();
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CommandError> {
    let storefront = Storefront::new(config)?;
    let mut notices = storefront.notifier().subscribe();

    let result = dispatch(&storefront, &cli.login, cli.command).await;

    commands::print_notices(&mut notices);
    result
}

async fn dispatch(
    storefront: &Storefront,
    login: &LoginArgs,
    command: Commands,
) -> Result<(), CommandError> {
    match command {
        Commands::Products {
            search,
            category,
            sort,
            featured,
        } => commands::catalog::products(storefront, search, category, sort, featured).await,
        Commands::Categories => commands::catalog::categories(storefront).await,
        Commands::Stats => commands::catalog::stats(storefront).await,
        Commands::Cart { action } => {
            let session = commands::session(storefront, login, "cart").await?;
            match action {
                CartAction::Show => commands::cart::show(storefront, &session),
                CartAction::Add { product, quantity } => {
                    commands::cart::add(storefront, &session, &product, quantity).await
                }
                CartAction::Set { product, quantity } => {
                    commands::cart::set(storefront, &session, &product, quantity).await
                }
                CartAction::Remove { product } => {
                    commands::cart::remove(storefront, &session, &product).await
                }
                CartAction::Clear => commands::cart::clear(&session).await,
            }
        }
        Commands::Wishlist { action } => {
            let session = commands::session(storefront, login, "wishlist").await?;
            match action {
                WishlistAction::Show => commands::wishlist::show(storefront, &session),
                WishlistAction::Add { product } => {
                    commands::wishlist::add(&session, &product).await
                }
                WishlistAction::Remove { product } => {
                    commands::wishlist::remove(&session, &product).await
                }
                WishlistAction::Toggle { product } => {
                    commands::wishlist::toggle(&session, &product).await
                }
                WishlistAction::Clear => commands::wishlist::clear(&session).await,
            }
        }
        Commands::Order { action } => {
            let session = commands::session(storefront, login, "cart").await?;
            match action {
                OrderAction::Place { address } => {
                    commands::cart::place_order(storefront, &session, address).await
                }
            }
        }
        Commands::Orders => {
            let session = commands::session(storefront, login, "orders").await?;
            commands::cart::orders(storefront, &session).await
        }
        Commands::Profile { action } => {
            let session = commands::session(storefront, login, "profile").await?;
            match action {
                ProfileAction::Show => commands::account::show(&session).await,
                ProfileAction::Update {
                    name,
                    new_email,
                    phone,
                    address,
                } => commands::account::update(&session, name, new_email, phone, address).await,
            }
        }
        Commands::Register { name, address } => {
            commands::account::register(storefront, login, &name, &address).await
        }
        Commands::Logout => {
            let session = commands::session(storefront, login, "account").await?;
            Ok(session.logout().await?)
        }
    }
}

//! HTTP client against a running marketplace backend.
//!
//! Set `FARMGATE_API_URL` (a `.env` file works) and run with `--ignored`.

use farmgate_storefront::api::{ApiClient, Backend, Credentials};
use farmgate_storefront::config::StorefrontConfig;
use farmgate_storefront::services::catalog::{ProductQuery, SortKey, filter_and_sort};
use secrecy::SecretString;
use testresult::TestResult;

fn client() -> Result<ApiClient, Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    Ok(ApiClient::new(&config.api)?)
}

#[tokio::test]
#[ignore = "Requires running marketplace backend"]
async fn test_catalog_reads() -> TestResult {
    let client = client()?;

    let products = client.list_products().await?;
    let categories = client.list_categories().await?;
    let stats = client.product_stats().await?;

    assert!(stats.out_of_stock <= stats.total);
    for category in &categories {
        assert!(!category.name.is_empty());
    }

    let query = ProductQuery {
        sort: SortKey::PriceLow,
        ..ProductQuery::default()
    };
    let sorted = filter_and_sort(&products, &query);
    assert!(
        sorted
            .windows(2)
            .all(|pair| matches!(pair, [a, b] if a.effective_price() <= b.effective_price()))
    );
    Ok(())
}

#[tokio::test]
#[ignore = "Requires running marketplace backend"]
async fn test_cached_catalog_survives_invalidation() -> TestResult {
    let client = client()?;

    let first = client.list_products().await?;
    let cached = client.list_products().await?;
    assert_eq!(first, cached);

    client.invalidate_catalog();
    let reloaded = client.list_products().await?;
    assert_eq!(first.len(), reloaded.len());
    Ok(())
}

#[tokio::test]
#[ignore = "Requires running marketplace backend"]
async fn test_bad_login_is_rejected() -> TestResult {
    let client = client()?;

    let err = client
        .login(&Credentials {
            email: "nobody@farmgate.invalid".to_string(),
            password: SecretString::from("definitely-wrong"),
        })
        .await
        .err()
        .ok_or("login should fail")?;

    let status = err.status().ok_or("expected an HTTP status")?;
    assert!((400..500).contains(&status), "unexpected status {status}");
    Ok(())
}

#[tokio::test]
#[ignore = "Requires running marketplace backend"]
async fn test_profile_requires_session() -> TestResult {
    let client = client()?;

    let err = client
        .fetch_profile()
        .await
        .err()
        .ok_or("profile should need a session")?;
    assert!(err.is_unauthorized());
    Ok(())
}

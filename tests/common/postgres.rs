use std::path::Path;

use storefront_orders::{
    config::AppConfig,
    db::{DbPool, create_orm_conn, create_pool, run_migrations},
    state::AppState,
    store::OrderStore,
};
use uuid::Uuid;

/// Connection string for the integration database, if one is configured.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

pub async fn setup_state(
    database_url: &str,
    evidence_dir: &Path,
) -> anyhow::Result<(AppState, DbPool)> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE payments, order_items, orders, cart_items, products RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        metro_cities: vec!["Kathmandu".into(), "Lalitpur".into(), "Bhaktapur".into()],
        metro_shipping_fee: 10_000,
        standard_shipping_fee: 15_000,
        evidence_dir: evidence_dir.to_path_buf(),
        max_evidence_bytes: 1024 * 1024,
    };
    let state = AppState::postgres(create_orm_conn(pool.clone()), &config);
    Ok((state, pool))
}

pub async fn create_product(
    pool: &DbPool,
    seller_id: Uuid,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, seller_id, name, price, stock, is_active) VALUES ($1, $2, $3, $4, $5, TRUE)",
    )
    .bind(id)
    .bind(seller_id)
    .bind(name)
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = state
        .store
        .find_product(product_id)
        .await?
        .expect("product exists");
    Ok(product.stock)
}

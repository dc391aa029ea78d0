use storefront_orders::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let handicraft_seller = Uuid::new_v4();
    let tea_seller = Uuid::new_v4();
    seed_products(&pool, handicraft_seller, &[
        ("Singing Bowl", 350_000, 12),
        ("Lokta Paper Journal", 45_000, 80),
        ("Dhaka Topi", 60_000, 40),
    ])
    .await?;
    seed_products(&pool, tea_seller, &[
        ("Ilam Green Tea 250g", 90_000, 150),
        ("Himalayan Orthodox Black Tea", 120_000, 60),
    ])
    .await?;

    println!("Seed completed. Sellers: {handicraft_seller}, {tea_seller}");
    Ok(())
}

async fn seed_products(
    pool: &sqlx::PgPool,
    seller_id: Uuid,
    products: &[(&str, i64, i32)],
) -> anyhow::Result<()> {
    for &(name, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, name, price, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(name)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products for seller {seller_id}", products.len());
    Ok(())
}

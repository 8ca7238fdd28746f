use rental_manager::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    models::ProductCategory,
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rental_manager=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&config.database_url).await?;

    let email = std::env::var("SEED_STAFF_EMAIL").unwrap_or_else(|_| "staff@example.com".into());
    let password = std::env::var("SEED_STAFF_PASSWORD").unwrap_or_else(|_| "staff123".into());
    let staff_id = ensure_staff(&pool, &email, &password).await?;
    seed_products(&pool).await?;

    tracing::info!(%staff_id, %email, "seed completed");
    Ok(())
}

/// Creates the account or resets its password and role.
async fn ensure_staff(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, 'staff')
        ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash, role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.trim().to_lowercase())
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    tracing::info!(%email, "ensured staff account");
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = [
        ("Dinner plate", ProductCategory::Tableware, Decimal::new(150, 2), 400, "White porcelain, 27 cm"),
        ("Soup bowl", ProductCategory::Tableware, Decimal::new(120, 2), 300, "White porcelain"),
        ("Folding chair", ProductCategory::Chairs, Decimal::new(900, 2), 200, "Padded, white"),
        ("Tiffany chair", ProductCategory::Chairs, Decimal::new(1800, 2), 120, "Gold finish"),
        ("Round table 10 seats", ProductCategory::Tables, Decimal::new(4500, 2), 30, "1.5 m diameter"),
        ("Rectangular table", ProductCategory::Tables, Decimal::new(3500, 2), 40, "2.4 x 0.8 m"),
        ("Round tablecloth", ProductCategory::Tablecloths, Decimal::new(2000, 2), 60, "Ivory, 3 m"),
        ("Cutlery set", ProductCategory::Cutlery, Decimal::new(250, 2), 500, "Knife, fork and spoon"),
        ("Wine glass", ProductCategory::Glassware, Decimal::new(130, 2), 600, "Crystal, 350 ml"),
        ("Centerpiece", ProductCategory::Decoration, Decimal::new(3000, 2), 25, "Candelabra with flowers"),
    ];

    for (name, category, price, stock, description) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, price_per_unit, stock, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(category.as_str())
        .bind(price)
        .bind(stock)
        .bind(description)
        .execute(pool)
        .await?;
    }

    tracing::info!(count = products.len(), "seeded rental catalog");
    Ok(())
}

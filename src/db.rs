use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Builds the shared connection pool and applies pending migrations.
#[tracing::instrument(name = "init_db")]
pub async fn init_db() -> Result<PgPool, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.");

    tracing::info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await?;

    tracing::debug!("Running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database ready");
    Ok(pool)
}

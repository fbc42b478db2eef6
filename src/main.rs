use artmart::{
    config::{self, database},
    core::pricing::format_amount,
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal: env vars can be set externally
    dotenv().ok();

    // 3. Load application settings
    let app_config = config::settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    info!(
        "Free shipping above {}, otherwise {} (strict transitions: {})",
        format_amount(&app_config.currency.0, app_config.shipping.free_shipping_threshold_cents),
        format_amount(&app_config.currency.0, app_config.shipping.flat_fee_cents),
        app_config.orders.strict_transitions,
    );

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed configured categories
    database::seed_categories(&db, &app_config.categories)
        .await
        .inspect_err(|e| error!("Failed to seed categories: {e}"))?;

    info!("ArtMart core ready at {}", database::get_database_url());
    Ok(())
}

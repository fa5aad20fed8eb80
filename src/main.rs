use dotenvy::dotenv;
use foodgram::{
    api::{self, AppState},
    config::{database, seed, settings::Settings},
    errors::Result,
    media::LocalMediaStore,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    let settings = Settings::from_env();
    info!("Loaded settings: {:?}", settings);

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 4. Seed tags and ingredients
    let report = seed::seed_from_file(&db, &settings.seed_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalogue: {}", e))?;
    info!(
        "Seeding done: {} tags, {} ingredients created",
        report.tags_created, report.ingredients_created
    );

    // 5. Serve
    tokio::fs::create_dir_all(&settings.media_root).await?;
    let media = LocalMediaStore::new(
        settings.media_root.clone(),
        settings.absolute_url("/media"),
    );
    let state = AppState {
        db: Arc::new(db),
        settings: Arc::new(settings),
        media: Arc::new(media),
    };
    api::serve(state).await
}

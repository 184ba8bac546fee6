use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, init_pool};
use moderation::{
    analyzer::{Analyzer, SubprocessAnalyzer},
    config::ModerationConfig,
    orchestrator::ModerationOrchestrator,
    routes,
    sampler::FrameSampler,
    state::AppState,
    storage::HttpFrameStorage,
    store::PgAssetStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting moderation service");

    let config = ModerationConfig::from_env();

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Wire the pipeline: store, frame storage, sampler, analyzer
    let store = Arc::new(PgAssetStore::new(pool));
    let frame_storage = Arc::new(HttpFrameStorage::new());
    let sampler = Arc::new(FrameSampler::new(
        frame_storage,
        config.sampling.clone(),
        config.frames_dir.clone(),
    ));
    let analyzer = Arc::new(SubprocessAnalyzer::new(config.analyzer.clone()));

    if !analyzer.is_available() {
        info!(
            "Analyzer script not found at {}; uploads will complete without content analysis",
            config.analyzer.script_path.display()
        );
    }

    let orchestrator =
        ModerationOrchestrator::new(store.clone(), sampler, analyzer, config.aggregation.clone());

    let app_state = AppState {
        orchestrator,
        store,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Moderation service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

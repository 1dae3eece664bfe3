use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medley_monitor::clients::DiscordClient;
use medley_monitor::config::Config;
use medley_monitor::directory::{PgServiceDirectory, ServiceConfig, ServiceDirectory, ServiceName};
use medley_monitor::engine::PipelineEngine;
use medley_monitor::steps::media_request;
use medley_monitor::store::PgPipelineStore;
use medley_monitor::{api, db};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medley_monitor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Medley Monitor...");

    let config = Config::from_env();

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Seed the service directory from the environment
    let directory: Arc<dyn ServiceDirectory> = Arc::new(PgServiceDirectory::new(pool.clone()));
    seed_directory(directory.as_ref(), &config).await;

    // Wire up the pipeline engine: store + media-request step registry
    let notifier = match &config.discord_bot_token {
        Some(token) => DiscordClient::new(token.clone()),
        None => {
            tracing::warn!(
                "DISCORD_BOT_TOKEN is not set; import notifications will fail until it is"
            );
            DiscordClient::new(String::new())
        }
    };
    let registry = media_request::registry(Arc::clone(&directory), Arc::new(notifier));
    let store = Arc::new(PgPipelineStore::new(pool.clone()));
    let engine = Arc::new(PipelineEngine::new(store, Arc::new(registry)));

    // Build router with all endpoints
    let app = api::create_router(pool, engine);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn seed_directory(directory: &dyn ServiceDirectory, config: &Config) {
    let seeds = [
        (ServiceName::Ombi, config.ombi.clone()),
        (ServiceName::Sonarr, config.sonarr.clone()),
        (ServiceName::Radarr, config.radarr.clone()),
        (
            ServiceName::Discord,
            config.discord_bot_token.clone().map(|token| ServiceConfig {
                host: "https://discord.com/api/v10".to_string(),
                api_key: token,
            }),
        ),
    ];

    for (name, seed) in seeds {
        if let Some(service) = seed {
            if let Err(err) = directory.upsert(name, &service).await {
                tracing::error!(service = %name, %err, "failed to seed service directory");
            } else {
                tracing::info!(service = %name, "seeded service directory entry");
            }
        }
    }
}

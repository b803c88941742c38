use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assessment_backend::{
    build_router,
    config::{Config, StoreBackend},
    database::{pool::create_pool, AssessmentStore, MemoryStore, PgStore},
    services::ai_service::{OpenAiQuestionGenerator, QuestionGenerator},
    AppState,
};
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn AssessmentStore> = match (config.store_backend, config.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(url)) => {
            let pool = create_pool(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using Postgres store");
            Arc::new(PgStore::new(pool))
        }
        (StoreBackend::Postgres, None) => {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres")
        }
        (StoreBackend::Memory, _) => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let generator: Option<Arc<dyn QuestionGenerator>> = match config.openai_api_key.clone() {
        Some(key) => {
            let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
            Some(Arc::new(OpenAiQuestionGenerator::new(key, client)))
        }
        None => {
            info!("OPENAI_API_KEY not set, question generation disabled");
            None
        }
    };

    let addr: SocketAddr = config.server_address.parse()?;
    let app = build_router(AppState::new(config, store, generator));

    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchlist_api::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, MovieStore, PgMovieStore},
    routes::{create_router, AppState},
    services::{similarity::ModelHandle, RecommendationService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    run_migrations(&pool).await.context("running migrations")?;
    let movies: Arc<dyn MovieStore> = Arc::new(PgMovieStore::new(pool));

    let redis_client = create_redis_client(&config.redis_url).context("opening Redis client")?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    let model = Arc::new(ModelHandle::new(config.artifact_paths()));
    if config.preload_artifacts {
        model
            .get()
            .await
            .context("loading similarity artifacts at startup")?;
    }

    let recommendations = RecommendationService::new(movies.clone(), model)
        .with_cache(cache, config.ranking_cache_ttl_secs)
        .with_ranking_timeout(config.ranking_timeout());

    let state = Arc::new(AppState {
        movies,
        recommendations: Arc::new(recommendations),
        default_recommendation_count: config.recommendation_count,
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

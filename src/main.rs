//! News feed aggregator: binary entrypoint.
//! Loads configuration, wires the cache, upstream adapters and the
//! aggregation service, then serves the HTTP API.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_feed_aggregator::{
    api::{self, AppState},
    cache::TtlCache,
    clock::TokioClock,
    config::AppConfig,
    metrics::Metrics,
    news::{PROVIDER_BBC, PROVIDER_SKY},
    provider::{bbc::BbcProvider, sky::SkyProvider},
    service::NewsService,
};

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_feed_aggregator=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // The hosting runtime may already have installed a global subscriber.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

async fn build_router() -> anyhow::Result<axum::Router> {
    let cfg = AppConfig::load().context("loading configuration")?;

    let cache = TtlCache::builder()
        .clock(Arc::new(TokioClock))
        .build()
        .context("building feed cache")?;

    let client = reqwest::Client::builder()
        .timeout(cfg.http_timeout())
        .build()
        .context("building http client")?;

    let sky = SkyProvider::new(&cfg.sky_url, client.clone()).context("sky provider")?;
    let bbc = BbcProvider::new(&cfg.bbc_url, client).context("bbc provider")?;

    let mut builder = NewsService::builder()
        .cache(Arc::new(cache))
        .provider(PROVIDER_SKY, Arc::new(sky))
        .provider(PROVIDER_BBC, Arc::new(bbc));
    for category in cfg.categories() {
        builder = builder.category(category);
    }
    if let Some(timeout) = cfg.fetch_timeout() {
        builder = builder.fetch_timeout(timeout);
    }
    let news = Arc::new(builder.build().context("building news service")?);

    let metrics = Metrics::init(news.categories().len())?;

    info!(
        categories = ?cfg.categories,
        http_timeout_ms = cfg.http_timeout_ms,
        version = %cfg.version,
        "news service ready"
    );

    let state = AppState::new(news, cfg.version.clone());
    Ok(api::router(state).merge(metrics.router()))
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = build_router().await?;
    Ok(router.into())
}

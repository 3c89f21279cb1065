use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::news::{Category, FeedResponse, NewsError, ProviderId};
use crate::service::NewsService;

#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsService>,
    pub version: String,
}

impl AppState {
    pub fn new(news: Arc<NewsService>, version: impl Into<String>) -> Self {
        Self {
            news,
            version: version.into(),
        }
    }
}

/// Feed routes plus the liveness/health/version probes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_feed))
        .route("/{category}", get(get_feed_by_category))
        .route("/_live", get(|| async { StatusCode::OK }))
        .route("/_health", get(|| async { StatusCode::OK }))
        .route("/_version", get(version))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<&NewsError> for ApiError {
    fn from(err: &NewsError) -> Self {
        if err.is_not_found() {
            Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            }
        } else {
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "could not get news feed".to_string(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// Missing or empty `provider` means every provider.
fn provider_param(q: &HashMap<String, String>) -> ProviderId {
    match q.get("provider").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(p) => ProviderId::new(p),
        None => ProviderId::all(),
    }
}

/// Missing or empty means 0; negative or non-numeric is rejected here so
/// the service only ever sees valid offsets and limits.
fn int_param(q: &HashMap<String, String>, key: &str) -> Result<usize, ApiError> {
    match q.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(0),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::bad_request(format!("{key} is invalid"))),
    }
}

async fn get_feed(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<FeedResponse>, ApiError> {
    let provider = provider_param(&q);
    let limit = int_param(&q, "limit")?;
    let offset = int_param(&q, "offset")?;

    match state.news.feed(&provider, offset, limit).await {
        Ok(res) => Ok(Json(res)),
        Err(err) => {
            error!(
                target: "api",
                %provider, limit, offset, error = %err,
                "error_getting_feed"
            );
            Err(ApiError::from(&err))
        }
    }
}

async fn get_feed_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<FeedResponse>, ApiError> {
    let limit = int_param(&q, "limit")?;
    let offset = int_param(&q, "offset")?;
    let provider = provider_param(&q);
    let category = Category::new(category);

    match state
        .news
        .feed_by_category(&provider, &category, offset, limit)
        .await
    {
        Ok(res) => Ok(Json(res)),
        Err(err) => {
            error!(
                target: "api",
                %category, %provider, limit, offset, error = %err,
                "error_getting_feed_category"
            );
            Err(ApiError::from(&err))
        }
    }
}

#[derive(serde::Serialize)]
struct VersionOut {
    version: String,
}

async fn version(State(state): State<AppState>) -> Json<VersionOut> {
    Json(VersionOut {
        version: state.version.clone(),
    })
}

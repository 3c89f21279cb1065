// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /            (merged feed, provider filter, pagination)
// - GET /{category}  (category feed, unknown category/provider)
// - 400 on invalid limit/offset, 500 on upstream failure
// - GET /_live, /_health, /_version

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use news_feed_aggregator::api::{self, AppState};
use news_feed_aggregator::cache::TtlCache;
use news_feed_aggregator::clock::TokioClock;
use news_feed_aggregator::news::{Category, Feed, Item, ProviderId};
use news_feed_aggregator::service::{NewsProvider, NewsService};

const BODY_LIMIT: usize = 1024 * 1024;

struct Canned {
    id: &'static str,
    offset_secs: i64,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl NewsProvider for Canned {
    async fn fetch(&self, category: &Category) -> anyhow::Result<Feed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("failed to do request");
        }
        let base = Utc.with_ymd_and_hms(2020, 11, 10, 12, 0, 0).unwrap();
        let items = (0..2)
            .map(|n| Item {
                category: category.clone(),
                provider: ProviderId::from(self.id),
                title: format!("{}-{category}-{n}", self.id),
                link: format!("https://{}.example/{category}/{n}", self.id),
                description: "body".to_string(),
                thumbnail: String::new(),
                published_at: base + ChronoDuration::seconds(self.offset_secs - n * 60),
            })
            .collect();
        let mut feed = Feed::with_items(items);
        feed.ttl = 5;
        Ok(feed)
    }
}

fn canned(id: &'static str, offset_secs: i64, fail: bool) -> Arc<Canned> {
    Arc::new(Canned {
        id,
        offset_secs,
        fail,
        calls: AtomicUsize::new(0),
    })
}

/// Build the same Router the binary uses, with canned upstreams.
fn test_router(bbc_fails: bool) -> (Router, Arc<Canned>) {
    let cache = TtlCache::builder()
        .clock(Arc::new(TokioClock))
        .build()
        .expect("cache");
    let sky = canned("sky", 30, false);
    let bbc = canned("bbc", 0, bbc_fails);

    let news = NewsService::builder()
        .cache(Arc::new(cache))
        .provider("sky", sky.clone() as Arc<dyn NewsProvider>)
        .provider("bbc", bbc as Arc<dyn NewsProvider>)
        .category("uk")
        .category("technology")
        .build()
        .expect("service");

    let state = AppState::new(Arc::new(news), "v1.2.3");
    (api::router(state), sky)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

#[tokio::test]
async fn root_returns_every_provider_and_category_newest_first() {
    let (app, _) = test_router(false);
    let (status, v) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(v.get("provider").is_none(), "wildcard provider is omitted");
    assert!(v.get("category").is_none(), "no category on the merged feed");
    assert!(v.get("limit").is_none() && v.get("offset").is_none());

    let items = v["items"].as_array().expect("items array");
    assert_eq!(items.len(), 8);
    assert_eq!(items[0]["provider"], "sky");
    assert!(items[0]["dateTime"].is_string());
    for key in ["category", "provider", "title", "link", "description", "thumbnail"] {
        assert!(items[0].get(key).is_some(), "item carries `{key}`");
    }
}

#[tokio::test]
async fn category_route_filters_provider_and_paginates() {
    let (app, _) = test_router(false);
    let (status, v) = get(app, "/technology?provider=bbc&limit=1&offset=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["category"], "technology");
    assert_eq!(v["provider"], "bbc");
    assert_eq!(v["limit"], 1);
    assert_eq!(v["offset"], 1);
    let items = v["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "bbc-technology-1");
}

#[tokio::test]
async fn empty_query_values_mean_defaults() {
    let (app, _) = test_router(false);
    let (status, v) = get(app, "/uk?provider=&limit=&offset=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(v.get("provider").is_none());
    assert_eq!(v["items"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unknown_category_and_provider_are_404() {
    let (app, _) = test_router(false);
    let (status, v) = get(app.clone(), "/weather").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["message"], "category not found");

    let (status, v) = get(app, "/?provider=cnn").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["message"], "provider not found");
}

#[tokio::test]
async fn invalid_limit_or_offset_is_400() {
    let (app, sky) = test_router(false);

    let (status, v) = get(app.clone(), "/?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "limit is invalid");

    let (status, v) = get(app.clone(), "/uk?offset=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["message"], "offset is invalid");

    let (status, _) = get(app, "/uk?limit=-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(sky.calls.load(Ordering::SeqCst), 0, "rejected before fetching");
}

#[tokio::test]
async fn upstream_failure_is_500_with_generic_message() {
    let (app, _) = test_router(true);
    let (status, v) = get(app, "/uk").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["message"], "could not get news feed");
}

#[tokio::test]
async fn repeated_requests_hit_the_cache() {
    let (app, sky) = test_router(false);
    for _ in 0..3 {
        let (status, _) = get(app.clone(), "/uk?provider=sky").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(sky.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn probes_and_version() {
    let (app, _) = test_router(false);

    let (status, _) = get(app.clone(), "/_live").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(app.clone(), "/_health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, v) = get(app, "/_version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["version"], "v1.2.3");
}

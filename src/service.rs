//! # Aggregation service
//! Resolves a feed request into provider fetches (cache first), merges the
//! items, orders them most-recent-first and paginates.
//!
//! Fan-out across providers and categories is sequential in registration
//! order. The first upstream failure aborts the whole request; no partial
//! response is ever returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::cache::FeedCache;
use crate::news::{Category, Feed, FeedResponse, Item, NewsError, NewsResult, ProviderId};

/// Upstream source capability. Implementations must stamp every item with
/// the requested category and their own provider id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch(&self, category: &Category) -> anyhow::Result<Feed>;
}

/// A provider registered under an identifier.
#[derive(Clone)]
pub struct ProviderBinding {
    pub id: ProviderId,
    pub provider: Arc<dyn NewsProvider>,
}

impl ProviderBinding {
    pub fn new(id: impl Into<ProviderId>, provider: Arc<dyn NewsProvider>) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }
}

/// Registry and limits, validated once when the service is built.
#[derive(Clone, Default)]
pub struct ServiceConfig {
    pub providers: Vec<ProviderBinding>,
    pub categories: Vec<Category>,
    /// Upper bound on a single provider fetch. `None` leaves it to the
    /// provider's own transport timeout.
    pub fetch_timeout: Option<Duration>,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_cache_hits_total", "Feeds served from the cache.");
        describe_counter!(
            "news_cache_misses_total",
            "Feed lookups that required a provider fetch."
        );
        describe_counter!(
            "news_upstream_errors_total",
            "Provider fetches that failed or timed out."
        );
    });
}

#[derive(Default)]
pub struct NewsServiceBuilder {
    cache: Option<Arc<dyn FeedCache>>,
    config: ServiceConfig,
}

impl NewsServiceBuilder {
    pub fn cache(mut self, cache: Arc<dyn FeedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the whole registry.
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(mut self, id: impl Into<ProviderId>, provider: Arc<dyn NewsProvider>) -> Self {
        self.config.providers.push(ProviderBinding::new(id, provider));
        self
    }

    pub fn category(mut self, category: impl Into<Category>) -> Self {
        self.config.categories.push(category.into());
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = Some(timeout);
        self
    }

    /// An empty registry is legal. Rejects a missing cache, duplicate
    /// provider ids, and providers registered under the wildcard id.
    pub fn build(self) -> NewsResult<NewsService> {
        let cache = self.cache.ok_or_else(|| NewsError::invalid("cache"))?;
        let ServiceConfig {
            providers,
            categories: raw_categories,
            fetch_timeout,
        } = self.config;

        for (i, binding) in providers.iter().enumerate() {
            let duplicate = providers[..i].iter().any(|b| b.id == binding.id);
            if binding.id.is_all() || duplicate {
                return Err(NewsError::invalid("providers"));
            }
        }

        let mut categories: Vec<Category> = Vec::with_capacity(raw_categories.len());
        for category in raw_categories {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }

        ensure_metrics_described();

        Ok(NewsService {
            cache,
            providers,
            categories,
            fetch_timeout,
        })
    }
}

pub struct NewsService {
    cache: Arc<dyn FeedCache>,
    providers: Vec<ProviderBinding>,
    categories: Vec<Category>,
    fetch_timeout: Option<Duration>,
}

impl NewsService {
    pub fn builder() -> NewsServiceBuilder {
        NewsServiceBuilder::default()
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.iter().map(|b| &b.id)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Items of one registered category, newest first, paginated.
    pub async fn feed_by_category(
        &self,
        provider: &ProviderId,
        category: &Category,
        offset: usize,
        limit: usize,
    ) -> NewsResult<FeedResponse> {
        if !self.categories.contains(category) {
            return Err(NewsError::CategoryNotFound);
        }

        let mut items = self.resolve_items(provider, category).await?;
        sort_most_recent_first(&mut items);

        Ok(FeedResponse {
            category: Some(category.clone()),
            provider: provider.clone(),
            items: paginate(items, offset, limit),
            limit,
            offset,
        })
    }

    /// Items across every registered category, newest first, paginated.
    pub async fn feed(
        &self,
        provider: &ProviderId,
        offset: usize,
        limit: usize,
    ) -> NewsResult<FeedResponse> {
        if !provider.is_all() && self.binding(provider).is_none() {
            return Err(NewsError::ProviderNotFound);
        }

        let mut items = Vec::new();
        for category in &self.categories {
            items.extend(self.resolve_items(provider, category).await?);
        }
        sort_most_recent_first(&mut items);

        Ok(FeedResponse {
            category: None,
            provider: provider.clone(),
            items: paginate(items, offset, limit),
            limit,
            offset,
        })
    }

    fn binding(&self, provider: &ProviderId) -> Option<&ProviderBinding> {
        self.providers.iter().find(|b| &b.id == provider)
    }

    async fn resolve_items(&self, provider: &ProviderId, category: &Category) -> NewsResult<Vec<Item>> {
        if provider.is_all() {
            let mut items = Vec::new();
            for binding in &self.providers {
                let feed = self.fetch_feed(binding, category).await?;
                items.extend(feed.items);
            }
            return Ok(items);
        }

        let binding = self.binding(provider).ok_or(NewsError::ProviderNotFound)?;
        Ok(self.fetch_feed(binding, category).await?.items)
    }

    async fn fetch_feed(&self, binding: &ProviderBinding, category: &Category) -> NewsResult<Feed> {
        let provider = binding.id.as_str().to_owned();

        if let Some(feed) = self.cache.get(&binding.id, category) {
            counter!("news_cache_hits_total", "provider" => provider).increment(1);
            debug!(target: "service", provider = %binding.id, %category, "cache hit");
            return Ok(feed);
        }
        counter!("news_cache_misses_total", "provider" => provider.clone()).increment(1);
        debug!(target: "service", provider = %binding.id, %category, "cache miss");

        let fetched = match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, binding.provider.fetch(category))
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("timed out after {limit:?}"))),
            None => binding.provider.fetch(category).await,
        };

        let feed = fetched.map_err(|source| {
            counter!("news_upstream_errors_total", "provider" => provider).increment(1);
            warn!(target: "service", provider = %binding.id, %category, error = %source, "provider fetch failed");
            NewsError::Upstream {
                provider: binding.id.clone(),
                category: category.clone(),
                source,
            }
        })?;

        self.cache.store(&binding.id, category, feed.clone());
        Ok(feed)
    }
}

/// Stable sort on publish time, newest first.
fn sort_most_recent_first(items: &mut [Item]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Slice `[offset, offset + limit)` clamped to the sequence; `limit == 0`
/// means "to the end", an offset past the end yields nothing.
pub fn paginate<T>(mut items: Vec<T>, offset: usize, limit: usize) -> Vec<T> {
    let len = items.len();
    let start = offset.min(len);
    let end = if limit == 0 {
        len
    } else {
        start.saturating_add(limit).min(len)
    };
    items.truncate(end);
    items.drain(..start);
    items
}

//! # News model
//! Identifiers and the feed/item/response shapes shared by the cache,
//! the aggregation service, the provider adapters, and the HTTP layer.

pub mod error;

pub use error::{NewsError, NewsResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved provider identifier meaning "every registered provider".
pub const WILDCARD_PROVIDER: &str = "all";

pub const PROVIDER_BBC: &str = "bbc";
pub const PROVIDER_SKY: &str = "sky";

pub const CATEGORY_UK: &str = "uk";
pub const CATEGORY_TECHNOLOGY: &str = "technology";

/// Opaque token identifying an upstream source (e.g. "bbc", "sky").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The wildcard id used for fan-out across all providers.
    pub fn all() -> Self {
        Self(WILDCARD_PROVIDER.to_string())
    }

    pub fn is_all(&self) -> bool {
        self.0 == WILDCARD_PROVIDER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque token identifying a feed topic (e.g. "uk", "technology").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One provider's fetch result for a category. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub copyright: String,
    /// Retrieval (last build) timestamp reported by the upstream.
    #[serde(rename = "dateTime")]
    pub retrieved_at: DateTime<Utc>,
    /// Freshness window in minutes; 0 means "expire immediately".
    pub ttl: u32,
    pub items: Vec<Item>,
}

impl Feed {
    /// Empty feed carrying only items, handy for fixtures and tests.
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            link: String::new(),
            language: String::new(),
            copyright: String::new(),
            retrieved_at: DateTime::<Utc>::UNIX_EPOCH,
            ttl: 0,
            items,
        }
    }
}

/// A single article. Ordered for presentation by `published_at` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub category: Category,
    pub provider: ProviderId,
    pub title: String,
    pub link: String,
    pub description: String,
    pub thumbnail: String,
    #[serde(rename = "dateTime")]
    pub published_at: DateTime<Utc>,
}

/// Query result: paginated, most-recent-first items. Built per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Omitted from JSON for the wildcard.
    #[serde(default = "ProviderId::all", skip_serializing_if = "ProviderId::is_all")]
    pub provider: ProviderId,
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

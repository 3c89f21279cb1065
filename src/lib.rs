// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod news;
pub mod provider;
pub mod service;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::cache::{FeedCache, TtlCache};
pub use crate::news::{NewsError, NewsResult};
pub use crate::service::{NewsProvider, NewsService};

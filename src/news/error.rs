use thiserror::Error;

use super::{Category, ProviderId};

#[derive(Error, Debug)]
pub enum NewsError {
    // Wiring errors
    #[error("invalid parameter: {parameter}")]
    InvalidParameter { parameter: &'static str },

    // Lookup errors
    #[error("provider not found")]
    ProviderNotFound,

    #[error("category not found")]
    CategoryNotFound,

    // Upstream errors
    #[error("failed to get {category} feed from {provider}: {source:#}")]
    Upstream {
        provider: ProviderId,
        category: Category,
        #[source]
        source: anyhow::Error,
    },
}

impl NewsError {
    pub fn invalid(parameter: &'static str) -> Self {
        NewsError::InvalidParameter { parameter }
    }

    /// True for the lookup failures the transport maps to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NewsError::ProviderNotFound | NewsError::CategoryNotFound
        )
    }
}

pub type NewsResult<T> = Result<T, NewsError>;

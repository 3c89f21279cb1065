//! # Clock
//! Time source consumed by the TTL cache. Injected so expiry timing can be
//! driven by a paused Tokio runtime in tests.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Resolves once `delay` has elapsed.
    async fn after(&self, delay: Duration);
}

/// Clock backed by `tokio::time`; honours `tokio::time::pause`/`advance`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn after(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn after_follows_paused_time() {
        let clock = TokioClock;
        let t0 = clock.now();
        clock.after(Duration::from_secs(90)).await;
        assert_eq!(clock.now() - t0, Duration::from_secs(90));
    }
}

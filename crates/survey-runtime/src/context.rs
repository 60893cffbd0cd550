//! Environmental context captured while the respondent answers.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use survey_spec::GeoFix;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("position is unavailable")]
    Unavailable,
    #[error("position request denied: {0}")]
    Denied(String),
}

#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoFix, ContextError>;
}

/// Resolves to a configured fix.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedContext {
    fix: GeoFix,
}

impl FixedContext {
    pub fn new(fix: GeoFix) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl ContextProvider for FixedContext {
    async fn current_position(&self) -> Result<GeoFix, ContextError> {
        Ok(self.fix)
    }
}

/// Never yields a position.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableContext;

#[async_trait]
impl ContextProvider for UnavailableContext {
    async fn current_position(&self) -> Result<GeoFix, ContextError> {
        Err(ContextError::Unavailable)
    }
}

/// Asks `provider` for a fix, giving up after `timeout`. Any failure yields an
/// empty fix.
pub async fn capture_context(provider: &dyn ContextProvider, timeout: Duration) -> GeoFix {
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(fix)) => fix,
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "context unavailable");
            GeoFix::default()
        }
        Err(_) => {
            tracing::debug!(timeout_ms = timeout.as_millis() as u64, "context capture timed out");
            GeoFix::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl ContextProvider for Stalled {
        async fn current_position(&self) -> Result<GeoFix, ContextError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ContextError::Unavailable)
        }
    }

    fn fix() -> GeoFix {
        GeoFix {
            latitude: Some(12.97),
            longitude: Some(77.59),
            altitude: Some(920.0),
            accuracy: Some(15.0),
        }
    }

    #[tokio::test]
    async fn fixed_context_passes_through() {
        let provider = FixedContext::new(fix());
        assert_eq!(capture_context(&provider, Duration::from_secs(1)).await, fix());
    }

    #[tokio::test]
    async fn failure_maps_to_empty_fix() {
        let captured = capture_context(&UnavailableContext, Duration::from_secs(1)).await;
        assert_eq!(captured, GeoFix::default());
    }

    #[tokio::test]
    async fn timeout_maps_to_empty_fix() {
        let captured = capture_context(&Stalled, Duration::from_millis(50)).await;
        assert_eq!(captured, GeoFix::default());
    }
}

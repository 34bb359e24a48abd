//! Locator resolution
//!
//! Maps a media identifier to its content locator with one ledger round
//! trip. The resolver memoizes nothing; an unknown id, a ledger failure and
//! an unparsable answer all come back as [`MediaError::NotFound`] so the
//! caller can simply retry on a later pass.

use std::sync::Arc;

use swarmview_core::{ContentLocator, LedgerClient, MediaError, MediaId};
use tracing::{debug, instrument, warn};

/// Resolves media identifiers through the ledger
#[derive(Clone)]
pub struct LocatorResolver {
    ledger: Arc<dyn LedgerClient>,
}

impl LocatorResolver {
    /// Create a resolver over a ledger client
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Resolve `id` to a content locator
    #[instrument(skip(self), fields(id = %id))]
    pub async fn resolve(&self, id: &MediaId) -> Result<ContentLocator, MediaError> {
        let raw = match self.ledger.locator_for(id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Ledger lookup failed");
                return Err(MediaError::not_found(id.to_string(), e.to_string()));
            }
        };

        if raw.trim().is_empty() {
            debug!("No locator recorded");
            return Err(MediaError::not_found(id.to_string(), "no locator recorded"));
        }

        let locator = ContentLocator::parse(&raw).map_err(|e| {
            warn!(error = %e, "Ledger returned an unusable locator");
            MediaError::not_found(id.to_string(), e.to_string())
        })?;

        debug!(
            hash = %locator.short_hash(),
            trackers = locator.trackers().len(),
            "Resolved locator"
        );
        Ok(locator)
    }
}

impl std::fmt::Debug for LocatorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocatorResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmview_core::{LedgerError, MockLedger};

    #[tokio::test]
    async fn test_resolve_media_and_video() {
        let ledger = Arc::new(
            MockLedger::new()
                .with_media("7.png", "magnet:?xt=urn:btih:AAA")
                .with_video("7", "magnet:?xt=urn:btih:VVV"),
        );
        let resolver = LocatorResolver::new(ledger.clone());

        let image = resolver.resolve(&MediaId::image("7.png")).await.unwrap();
        assert_eq!(image.as_str(), "magnet:?xt=urn:btih:AAA");

        let video = resolver.resolve(&MediaId::video("7")).await.unwrap();
        assert_eq!(video.info_hash(), "VVV");

        assert_eq!(ledger.media_calls(), 1);
        assert_eq!(ledger.video_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_locator_is_not_found() {
        let resolver = LocatorResolver::new(Arc::new(MockLedger::new()));
        let err = resolver.resolve(&MediaId::image("9.png")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_ledger_error_is_not_found() {
        let ledger = MockLedger::new();
        ledger.fail_with("7.png", LedgerError::transport("connection refused"));
        let resolver = LocatorResolver::new(Arc::new(ledger));

        let err = resolver.resolve(&MediaId::image("7.png")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_malformed_locator_is_not_found() {
        let ledger = MockLedger::new().with_media("7.png", "ipfs://bafy");
        let resolver = LocatorResolver::new(Arc::new(ledger));
        assert!(
            resolver
                .resolve(&MediaId::image("7.png"))
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}

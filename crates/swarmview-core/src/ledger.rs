//! Ledger collaborator
//!
//! The ledger maps media identifiers to content locators. It is an external,
//! read-only collaborator: one asynchronous round trip per lookup, with an
//! empty answer meaning "not found".

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::media::{MediaId, MediaNamespace};

/// Read-only media id to content locator lookup
///
/// # Example
///
/// ```rust,ignore
/// use swarmview_core::{LedgerClient, MediaId};
///
/// async fn lookup<L: LedgerClient>(ledger: &L) -> Result<String, LedgerError> {
///     ledger.locator_for(&MediaId::image("42.png")).await
/// }
/// ```
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Locator for a still-media identifier (empty string when unknown)
    async fn locator_for_media(&self, id: &str) -> Result<String, LedgerError>;

    /// Locator for a video identifier (empty string when unknown)
    async fn locator_for_video(&self, id: &str) -> Result<String, LedgerError>;

    /// Dispatch to the lookup matching the identifier's namespace
    async fn locator_for(&self, id: &MediaId) -> Result<String, LedgerError> {
        match id.namespace() {
            MediaNamespace::Image => self.locator_for_media(id.key()).await,
            MediaNamespace::Video => self.locator_for_video(id.key()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;
    use tokio_test::{assert_err, assert_ok, block_on};

    #[test]
    fn test_locator_for_dispatches_by_namespace() {
        let ledger = MockLedger::new()
            .with_media("7", "magnet:?xt=urn:btih:IMG")
            .with_video("7", "magnet:?xt=urn:btih:VID");

        let image = assert_ok!(block_on(ledger.locator_for(&MediaId::image("7"))));
        let video = assert_ok!(block_on(ledger.locator_for(&MediaId::video("7"))));
        assert_eq!(image, "magnet:?xt=urn:btih:IMG");
        assert_eq!(video, "magnet:?xt=urn:btih:VID");
        assert_eq!(ledger.media_calls(), 1);
        assert_eq!(ledger.video_calls(), 1);
    }

    #[test]
    fn test_locator_for_propagates_errors() {
        let ledger = MockLedger::new();
        ledger.fail_with("7", LedgerError::malformed("bad abi"));
        assert_err!(block_on(ledger.locator_for(&MediaId::video("7"))));
    }
}

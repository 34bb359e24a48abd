//! Error types for swarmview

use thiserror::Error;

/// Errors produced while parsing a content locator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("Empty content locator")]
    Empty,

    #[error("Unsupported locator scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Locator has no content hash topic: {0}")]
    MissingInfoHash(String),
}

/// Errors reported by the ledger collaborator
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger transport error: {0}")]
    Transport(String),

    #[error("Malformed ledger response: {0}")]
    MalformedResponse(String),
}

impl LedgerError {
    /// Create a new Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new MalformedResponse error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

/// Errors reported by the swarm transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwarmError {
    #[error("No peers available for {0}")]
    NoPeers(String),

    #[error("Swarm timed out: {0}")]
    Timeout(String),

    #[error("Corrupt content: {0}")]
    CorruptContent(String),

    #[error("Byte extraction failed: {0}")]
    Extraction(String),

    #[error("Download was removed")]
    Removed,
}

impl SwarmError {
    /// Create a new NoPeers error
    pub fn no_peers(locator: impl Into<String>) -> Self {
        Self::NoPeers(locator.into())
    }

    /// Create a new Extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a new CorruptContent error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptContent(message.into())
    }
}

/// Errors surfaced while resolving one media element
///
/// Every variant is retryable: nothing here is cached, and the display layer
/// leaves the element unresolved so a later scan can try again. The type is
/// `Clone` because one outcome is handed to every waiter of a shared fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The identifier has no content locator (or the lookup failed)
    #[error("No content locator for {id}: {reason}")]
    NotFound { id: String, reason: String },

    /// The swarm could not deliver the content
    #[error("Fetch failed for {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    /// The swarm did not deliver the content in time
    #[error("Fetch for {locator} timed out after {elapsed_ms}ms")]
    Timeout { locator: String, elapsed_ms: u64 },

    /// The payload could not be turned into a usable resource
    #[error("Materialization failed for {locator}: {reason}")]
    Materialization { locator: String, reason: String },
}

impl MediaError {
    /// Create a new NotFound error
    pub fn not_found(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Fetch error
    pub fn fetch(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Materialization error
    pub fn materialization(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Materialization {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure came from the locator lookup rather than the swarm
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure happened after a locator was known
    ///
    /// Materialization failures are treated the same as fetch failures.
    pub fn is_fetch_failure(&self) -> bool {
        !self.is_not_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = MediaError::not_found("9.png", "empty locator");
        assert!(err.is_not_found());
        assert!(!err.is_fetch_failure());
        assert!(err.to_string().contains("9.png"));
    }

    #[test]
    fn test_materialization_counts_as_fetch_failure() {
        let err = MediaError::materialization("magnet:?xt=urn:btih:AAA", "empty payload");
        assert!(err.is_fetch_failure());

        let err = MediaError::Timeout {
            locator: "magnet:?xt=urn:btih:AAA".into(),
            elapsed_ms: 10,
        };
        assert!(err.is_fetch_failure());
        assert!(err.to_string().contains("10ms"));
    }

    #[test]
    fn test_swarm_error_constructors() {
        assert!(matches!(SwarmError::no_peers("x"), SwarmError::NoPeers(_)));
        assert!(matches!(
            SwarmError::extraction("boom"),
            SwarmError::Extraction(_)
        ));
    }
}

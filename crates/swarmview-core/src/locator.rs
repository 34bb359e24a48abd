//! Content locators
//!
//! A [`ContentLocator`] is a magnet-style URI: a content hash topic plus
//! optional display name, tracker and peer hints. Locators are content
//! addressed, so the same locator always names the same bytes and can be
//! used directly as a cache key.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LocatorError;

const MAGNET_PREFIX: &str = "magnet:?";
const TOPIC_PREFIXES: [&str; 2] = ["urn:btih:", "urn:btmh:"];

/// Swarm-routable content location with integrity info
///
/// Equality and hashing use the raw locator string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentLocator {
    raw: String,
    info_hash: String,
    display_name: Option<String>,
    trackers: Vec<String>,
    peers: Vec<String>,
}

impl ContentLocator {
    /// Parse a magnet URI
    ///
    /// The URI must carry an `xt=urn:btih:` (or `urn:btmh:`) topic with a
    /// non-empty hash. `dn`, `tr` and `x.pe` parameters are kept as hints.
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(LocatorError::Empty);
        }

        let query = raw
            .strip_prefix(MAGNET_PREFIX)
            .ok_or_else(|| LocatorError::UnsupportedScheme(scheme_of(raw)))?;

        let mut info_hash = None;
        let mut display_name = None;
        let mut trackers = Vec::new();
        let mut peers = Vec::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "xt" => {
                    if info_hash.is_none() {
                        info_hash = TOPIC_PREFIXES
                            .iter()
                            .find_map(|prefix| value.strip_prefix(prefix))
                            .filter(|hash| !hash.is_empty())
                            .map(str::to_string);
                    }
                }
                "dn" => display_name = Some(decode(value)),
                "tr" => trackers.push(decode(value)),
                "x.pe" => peers.push(decode(value)),
                _ => {}
            }
        }

        let info_hash = info_hash.ok_or_else(|| LocatorError::MissingInfoHash(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            info_hash,
            display_name,
            trackers,
            peers,
        })
    }

    /// The locator exactly as resolved
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Content hash from the exact-topic parameter
    pub fn info_hash(&self) -> &str {
        &self.info_hash
    }

    /// Get a short hash for display (first 8 chars)
    pub fn short_hash(&self) -> &str {
        let end = self
            .info_hash
            .char_indices()
            .nth(8)
            .map_or(self.info_hash.len(), |(i, _)| i);
        &self.info_hash[..end]
    }

    /// Suggested file name, if the locator carries one
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Tracker hints
    pub fn trackers(&self) -> &[String] {
        &self.trackers
    }

    /// Direct peer hints
    pub fn peers(&self) -> &[String] {
        &self.peers
    }
}

fn scheme_of(raw: &str) -> String {
    raw.split_once(':')
        .map_or_else(|| raw.to_string(), |(scheme, _)| scheme.to_string())
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl PartialEq for ContentLocator {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ContentLocator {}

impl Hash for ContentLocator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ContentLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentLocator {
    type Error = LocatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentLocator> for String {
    fn from(locator: ContentLocator) -> Self {
        locator.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let locator = ContentLocator::parse("magnet:?xt=urn:btih:AAA").unwrap();
        assert_eq!(locator.info_hash(), "AAA");
        assert_eq!(locator.short_hash(), "AAA");
        assert!(locator.display_name().is_none());
        assert!(locator.trackers().is_empty());
    }

    #[test]
    fn test_parse_hints() {
        let locator = ContentLocator::parse(
            "magnet:?xt=urn:btih:c9e15763f722f23e98a29decdfae341b98d53056\
             &dn=banner%2042.png\
             &tr=udp%3A%2F%2Ftracker.openbittorrent.com%3A80\
             &tr=wss%3A%2F%2Ftracker.webtorrent.dev\
             &x.pe=10.0.0.2%3A6881",
        )
        .unwrap();

        assert_eq!(locator.short_hash(), "c9e15763");
        assert_eq!(locator.display_name(), Some("banner 42.png"));
        assert_eq!(
            locator.trackers(),
            &[
                "udp://tracker.openbittorrent.com:80".to_string(),
                "wss://tracker.webtorrent.dev".to_string()
            ]
        );
        assert_eq!(locator.peers(), &["10.0.0.2:6881".to_string()]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(ContentLocator::parse("   "), Err(LocatorError::Empty));
        assert!(matches!(
            ContentLocator::parse("https://example.com/a.png"),
            Err(LocatorError::UnsupportedScheme(s)) if s == "https"
        ));
        assert!(matches!(
            ContentLocator::parse("magnet:?dn=x"),
            Err(LocatorError::MissingInfoHash(_))
        ));
        assert!(matches!(
            ContentLocator::parse("magnet:?xt=urn:btih:"),
            Err(LocatorError::MissingInfoHash(_))
        ));
    }

    #[test]
    fn test_equality_uses_raw_string() {
        let a = ContentLocator::parse("magnet:?xt=urn:btih:AAA").unwrap();
        let b: ContentLocator = " magnet:?xt=urn:btih:AAA ".parse().unwrap();
        let c = ContentLocator::parse("magnet:?xt=urn:btih:AAA&dn=x").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

//! Error types for page resolution.
//!
//! Every step of the handshake reports one of these; any of them aborts the
//! current attempt, and the caller decides whether to start a new one.

use thiserror::Error;

/// Errors that can occur while resolving a gallery item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// HTTP 404 at any step, or the host's "File Not Found" page.
    #[error("not found: {url}")]
    NotFound {
        /// URL that reported the miss.
        url: String,
    },

    /// The redirect payload could not be reconstructed.
    #[error("redirect not found in {url}: {reason}")]
    DecodeFailure {
        /// Page whose tokens were decoded.
        url: String,
        /// Why decoding failed.
        reason: String,
    },

    /// An expected markup fragment is absent.
    #[error("missing {field} in {url}")]
    MissingField {
        /// Name of the absent fragment.
        field: &'static str,
        /// Page that lacked it.
        url: String,
    },

    /// The URL matches no supported host.
    #[error("no provider for '{url}'\n  Suggestion: use a link from one of the supported image hosts")]
    NoProvider {
        /// Rejected input.
        url: String,
    },

    /// The URL does not carry an item identifier for its provider.
    #[error("no identifier in '{url}' for {provider}")]
    NoIdentifier {
        /// Rejected input.
        url: String,
        /// Provider cache key.
        provider: &'static str,
    },

    /// A network call exceeded its connect or read deadline.
    #[error("timeout requesting {url}")]
    Timeout {
        /// URL that timed out.
        url: String,
    },

    /// Any other network or parse failure.
    #[error("request to {url} failed: {reason}")]
    Transient {
        /// URL involved.
        url: String,
        /// Failure description.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a `NotFound` error.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Creates a `DecodeFailure` error.
    pub fn decode_failure(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `MissingField` error.
    pub fn missing_field(field: &'static str, url: impl Into<String>) -> Self {
        Self::MissingField {
            field,
            url: url.into(),
        }
    }

    /// Creates a `NoProvider` error.
    pub fn no_provider(url: impl Into<String>) -> Self {
        Self::NoProvider { url: url.into() }
    }

    /// Creates a `NoIdentifier` error.
    pub fn no_identifier(url: impl Into<String>, provider: &'static str) -> Self {
        Self::NoIdentifier {
            url: url.into(),
            provider,
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a `Transient` error.
    pub fn transient(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transient {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest failure, distinguishing timeouts.
    pub fn from_request(url: impl Into<String>, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(url)
        } else {
            Self::transient(url, error.to_string())
        }
    }

    /// Returns true for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let msg = ResolveError::not_found("https://imgrock.pw/abc").to_string();
        assert!(msg.contains("not found"), "{msg}");
        assert!(msg.contains("https://imgrock.pw/abc"), "{msg}");
    }

    #[test]
    fn test_decode_failure_display() {
        let msg = ResolveError::decode_failure("https://imgrock.pw/abc", "redirect payload is empty")
            .to_string();
        assert!(msg.contains("redirect not found"), "{msg}");
        assert!(msg.contains("payload is empty"), "{msg}");
    }

    #[test]
    fn test_missing_field_display() {
        let msg = ResolveError::missing_field("form field name", "https://x.test/r").to_string();
        assert_eq!(msg, "missing form field name in https://x.test/r");
    }

    #[test]
    fn test_no_provider_has_suggestion() {
        let msg = ResolveError::no_provider("https://example.com/x").to_string();
        assert!(msg.contains("Suggestion"), "{msg}");
    }

    #[test]
    fn test_is_not_found() {
        assert!(ResolveError::not_found("u").is_not_found());
        assert!(!ResolveError::timeout("u").is_not_found());
    }
}

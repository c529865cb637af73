//! Shared User-Agent string for every outbound request.
//!
//! The supported hosts serve the obfuscated viewer flow only to browser-like
//! clients, so all requests (pages, form posts, images, thumbnails, gallery
//! listings) carry the same desktop Firefox identity.

/// Fixed browser User-Agent sent with every request.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64; rv:68.0) Gecko/20100101 Firefox/68.0";

/// Returns the User-Agent used by [`crate::resolver::PageClient`].
#[must_use]
pub(crate) fn default_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}

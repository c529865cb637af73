//! Redirect token extraction and reassembly.
//!
//! The initial item page hides the viewer URL as ten JavaScript string
//! assignments (`_0x92afb7="..."`). Nine of them, taken in a fixed order,
//! concatenate to a base64 payload that decodes to the redirect target. The
//! second slot is a decoy and never contributes. Only the variable names vary
//! between providers; slot order and reassembly are shared.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Number of tokens every redirect plan extracts.
pub const REDIRECT_TOKEN_COUNT: usize = 10;

/// Zero-based extraction slots concatenated to form the payload.
///
/// Slot `t2` (index 1) is skipped.
pub const REASSEMBLY_ORDER: [usize; 9] = [6, 8, 3, 5, 7, 0, 2, 9, 4];

/// Standard alphabet, tolerant of missing or extra padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced while turning extracted tokens into a redirect URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The plan did not yield the expected number of slots.
    #[error("expected {expected} redirect tokens, got {actual}")]
    TokenCount {
        /// Required slot count.
        expected: usize,
        /// Slots supplied.
        actual: usize,
    },

    /// All contributing tokens were absent or empty.
    #[error("redirect payload is empty")]
    EmptyPayload,

    /// The reassembled payload is not valid base64.
    #[error("redirect payload is not valid base64: {reason}")]
    Base64 {
        /// Decoder message.
        reason: String,
    },

    /// The decoded payload is not UTF-8 text.
    #[error("redirect payload is not UTF-8")]
    NotUtf8,
}

/// Ordered token names one provider uses for its redirect payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPlan {
    names: [&'static str; REDIRECT_TOKEN_COUNT],
}

impl TokenPlan {
    /// Creates a plan from names in extraction order (`t1..t10`).
    #[must_use]
    pub const fn new(names: [&'static str; REDIRECT_TOKEN_COUNT]) -> Self {
        Self { names }
    }

    /// Token names in extraction order.
    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Extracts every token of the plan, then reassembles and decodes them.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the payload is empty, not base64, or not UTF-8.
    pub fn decode_redirect(&self, markup: &str) -> Result<String, DecodeError> {
        let tokens = extract_tokens(markup, &self.names);
        reassemble(&tokens)
    }
}

/// Extracts the value assigned to `name` in the markup.
///
/// Accepts both `name="value"` and `name='value'`. A missing token yields an
/// empty string.
#[must_use]
pub fn extract_token(markup: &str, name: &str) -> String {
    let pattern = format!(r#"{}=(?:"([^"]*)"|'([^']*)')"#, regex::escape(name));
    let Ok(regex) = Regex::new(&pattern) else {
        debug!(name, "token pattern failed to compile");
        return String::new();
    };

    regex
        .captures(markup)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Extracts each named token in order.
#[must_use]
pub fn extract_tokens(markup: &str, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| extract_token(markup, name))
        .collect()
}

/// Concatenates the extracted values of `names` in the given order.
///
/// Used for the form-field name, which is a plain join with no decoding.
#[must_use]
pub fn concat_tokens(markup: &str, names: &[&str]) -> String {
    extract_tokens(markup, names).concat()
}

/// Builds the base64 payload from ten slots using [`REASSEMBLY_ORDER`].
///
/// # Errors
///
/// Returns [`DecodeError::TokenCount`] unless exactly ten slots are supplied.
pub fn reassemble_payload(tokens: &[String]) -> Result<String, DecodeError> {
    if tokens.len() != REDIRECT_TOKEN_COUNT {
        return Err(DecodeError::TokenCount {
            expected: REDIRECT_TOKEN_COUNT,
            actual: tokens.len(),
        });
    }

    Ok(REASSEMBLY_ORDER
        .iter()
        .map(|&slot| tokens[slot].as_str())
        .collect())
}

/// Reassembles ten slots and base64-decodes the result into a URL string.
///
/// Characters outside the base64 alphabet are discarded before decoding.
///
/// # Errors
///
/// Returns [`DecodeError`] if the slot count is wrong, the payload is empty,
/// the payload is not base64, or the decoded bytes are not UTF-8.
pub fn reassemble(tokens: &[String]) -> Result<String, DecodeError> {
    let payload = reassemble_payload(tokens)?;
    let cleaned: String = payload
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();
    if cleaned.trim_end_matches('=').is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = PAYLOAD_ENGINE
        .decode(cleaned.as_bytes())
        .map_err(|e| DecodeError::Base64 {
            reason: e.to_string(),
        })?;
    let decoded = String::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8)?;
    if decoded.trim().is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    Ok(decoded.trim().to_string())
}

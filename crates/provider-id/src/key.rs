//! Composite keys and their opaque encoded form

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Separator joining key parts before the base64 transform.
pub const SEPARATOR: char = '.';

/// The opaque identifier persisted by the orchestration framework.
///
/// Treated as an uninterpreted string everywhere except
/// [`CompositeKey::decode`]. Imports construct one directly from the
/// literal supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(String);

impl ExternalId {
    /// Wrap a raw identifier string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExternalId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ExternalId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Ordered tuple of identifying fields for a database object.
///
/// A valid key has at least two parts, no empty parts, and no separator
/// inside any part except the last. The final part may contain separators
/// because [`decode`](Self::decode) splits at most `expected_parts - 1`
/// times.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(Vec<String>);

impl CompositeKey {
    /// Build a validated key from its parts.
    ///
    /// # Errors
    ///
    /// Fails if fewer than two parts are given, any part is empty, or a
    /// non-final part contains the separator.
    pub fn new<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if parts.len() < 2 {
            return Err(Error::TooFewParts { found: parts.len() });
        }
        let last = parts.len() - 1;
        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(Error::EmptyPart { index });
            }
            if index != last && part.contains(SEPARATOR) {
                return Err(Error::SeparatorInPart { index });
            }
        }
        Ok(Self(parts))
    }

    /// Encode the key into its persisted opaque form.
    ///
    /// The output is `base64(part1 "." part2 [...])`; this format is
    /// stable and must not change between versions.
    pub fn encode(&self) -> ExternalId {
        let joined = self.0.join(&SEPARATOR.to_string());
        ExternalId(STANDARD.encode(joined.as_bytes()))
    }

    /// Decode an external id back into its parts.
    ///
    /// Splits at most `expected_parts` times so that separators inside
    /// the final part survive the round trip. Both the legacy two-part
    /// scheme and newer wider keys decode through the same path.
    ///
    /// # Errors
    ///
    /// Fails if the id is not base64, not UTF-8, yields a different
    /// number of parts than expected, or contains an empty part.
    pub fn decode(id: &ExternalId, expected_parts: usize) -> Result<Self> {
        if expected_parts < 2 {
            return Err(Error::TooFewParts {
                found: expected_parts,
            });
        }

        let bytes = STANDARD.decode(id.as_str())?;
        let decoded = String::from_utf8(bytes)?;

        let parts: Vec<String> = decoded
            .splitn(expected_parts, SEPARATOR)
            .map(str::to_string)
            .collect();
        if parts.len() != expected_parts {
            return Err(Error::PartCount {
                expected: expected_parts,
                found: parts.len(),
            });
        }
        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(Error::EmptyPart { index });
            }
        }

        Ok(Self(parts))
    }

    /// The key parts, in order
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// A single part by position
    pub fn part(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Consume the key, returning its parts
    pub fn into_parts(self) -> Vec<String> {
        self.0
    }
}

//! Case-tolerant partner identifier.
//!
//! Historical writers were inconsistent about the casing and whitespace
//! of partner identifiers. [`PartnerId`] keeps the trimmed, as-supplied
//! form for display alongside the case-folded form used for lookups and
//! comparisons.

use std::fmt;

use serde::{Serialize, Serializer};

/// Identifier of a venue partner.
///
/// Equality and hashing use the case-folded form, so `"P1"`, `" p1 "` and
/// `"p1"` are the same partner.
#[derive(Debug, Clone)]
pub struct PartnerId {
    display: String,
    normalized: String,
}

impl PartnerId {
    /// Parses a raw identifier, trimming surrounding whitespace.
    ///
    /// Returns `None` when nothing is left after trimming.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let display = raw.trim();
        if display.is_empty() {
            return None;
        }
        Some(Self {
            display: display.to_string(),
            normalized: display.to_lowercase(),
        })
    }

    /// Trimmed identifier with its original casing.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Trimmed, lower-cased identifier used for lookups.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Returns `true` if `other` names the same partner, ignoring case
    /// and surrounding whitespace.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        other.trim().to_lowercase() == self.normalized
    }
}

impl PartialEq for PartnerId {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for PartnerId {}

impl std::hash::Hash for PartnerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Serialize for PartnerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

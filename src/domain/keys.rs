//! Storage key naming and candidate-key resolution.
//!
//! Key layout (shared with the write side):
//!
//! | Key                                | Type | Holds                              |
//! |------------------------------------|------|------------------------------------|
//! | `partner:visits:<partnerId>`       | set  | member keys `qr:<email>:<pid>:<vid>` |
//! | `qr:<email>:<partnerId>:<visitId>` | hash | one visit                          |
//! | `qr:email:<email>`                 | hash | legacy single record per customer  |
//! | `partner:<partnerId>`              | set  | legacy member emails               |
//! | `partners`                         | set  | partner directory                  |
//!
//! Writers were inconsistent about identifier casing, so a partner is
//! read under several case variants. Resolution never fails: a blank
//! identifier resolves to no keys at all.

use super::partner_id::PartnerId;

/// Prefix of the current per-partner visit sets.
pub const VISIT_SET_PREFIX: &str = "partner:visits:";

/// Prefix of the legacy per-partner email sets.
pub const LEGACY_EMAIL_SET_PREFIX: &str = "partner:";

/// Prefix shared by every visit record key.
pub const RECORD_PREFIX: &str = "qr:";

/// Prefix of legacy single-record keys.
pub const LEGACY_RECORD_PREFIX: &str = "qr:email:";

/// Default key of the partner directory set.
pub const DEFAULT_PARTNER_DIRECTORY_KEY: &str = "partners";

/// Candidate keys for one partner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerKeys {
    /// Resolved partner, `None` for a blank identifier.
    pub partner: Option<PartnerId>,
    /// `partner:visits:*` variants, deduplicated, in read order.
    pub visit_sets: Vec<String>,
    /// `partner:*` legacy email-set variants.
    pub legacy_email_sets: Vec<String>,
}

impl PartnerKeys {
    /// Returns `true` if there is nothing to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visit_sets.is_empty() && self.legacy_email_sets.is_empty()
    }
}

/// Candidate keys for one customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserKeys {
    /// Trimmed, lower-cased email. Empty for a blank input.
    pub email: String,
    /// Legacy single-record keys to read.
    pub legacy_records: Vec<String>,
}

impl UserKeys {
    /// Returns `true` if there is nothing to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_empty()
    }

    /// Returns `true` if `email` is this customer's, ignoring case.
    #[must_use]
    pub fn owns(&self, email: &str) -> bool {
        !self.email.is_empty() && email.trim().to_lowercase() == self.email
    }
}

/// Resolves every key that may hold visits for a partner.
#[must_use]
pub fn resolve_partner_keys(raw_id: &str) -> PartnerKeys {
    let Some(partner) = PartnerId::parse(raw_id) else {
        return PartnerKeys::default();
    };

    let original = partner.as_str();
    let normalized = partner.normalized();
    // Case-independent forms first: load order must not follow the
    // caller's casing.
    let variants = [
        normalized.to_string(),
        normalized.to_uppercase(),
        original.to_string(),
        original.to_lowercase(),
        original.to_uppercase(),
    ];
    let visit_sets = dedup(variants.iter().map(|v| visit_set_key(v)));

    let legacy_email_sets = dedup(
        [normalized, original]
            .into_iter()
            .map(|v| format!("{LEGACY_EMAIL_SET_PREFIX}{v}")),
    );

    PartnerKeys {
        partner: Some(partner),
        visit_sets,
        legacy_email_sets,
    }
}

/// Resolves the legacy record keys of a customer.
#[must_use]
pub fn resolve_user_keys(raw_email: &str) -> UserKeys {
    let trimmed = raw_email.trim();
    if trimmed.is_empty() {
        return UserKeys::default();
    }
    let email = trimmed.to_lowercase();
    let legacy_records = dedup(
        [email.as_str(), trimmed]
            .into_iter()
            .map(legacy_record_key),
    );
    UserKeys {
        email,
        legacy_records,
    }
}

/// Visit-set keys of every partner in a directory, deduplicated.
#[must_use]
pub fn resolve_directory_visit_sets<'a, I>(partners: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    dedup(
        partners
            .into_iter()
            .flat_map(|p| resolve_partner_keys(p).visit_sets),
    )
}

/// `partner:visits:<partnerId>`.
#[must_use]
pub fn visit_set_key(partner_id: &str) -> String {
    format!("{VISIT_SET_PREFIX}{partner_id}")
}

/// `qr:email:<email>`.
#[must_use]
pub fn legacy_record_key(email: &str) -> String {
    format!("{LEGACY_RECORD_PREFIX}{email}")
}

/// Removes duplicates, keeping the first occurrence.
fn dedup<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    keys.into_iter()
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

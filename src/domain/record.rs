//! Raw stored records and the storage-key shapes they live under.
//!
//! Two schemes coexist in the store: the current visit-set scheme, one
//! hash per visit under `qr:<email>:<partnerId>:<visitId>`, and the
//! legacy scheme, one hash per customer under `qr:email:<email>`.
//! [`SourceKey`] tells them apart; [`merge_records`] layers a legacy
//! record underneath a current one.

use std::collections::BTreeMap;

use super::keys::{LEGACY_RECORD_PREFIX, RECORD_PREFIX, legacy_record_key};
use super::payload::{Payload, decode_record_payload, merge_payloads};

/// Flat string map stored under one hash key.
pub type RawRecord = BTreeMap<String, String>;

/// Storage-key shape of a record, with the context embedded in the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKey {
    /// Current scheme: `qr:<email>:<partnerId>:<visitId>`.
    VisitSetRecord {
        /// Customer email embedded in the key.
        email: String,
        /// Partner identifier embedded in the key.
        partner_id: String,
        /// Visit identifier embedded in the key, if present.
        visit_id: Option<String>,
    },
    /// Legacy scheme: `qr:email:<email>`.
    LegacyEmailRecord {
        /// Customer email embedded in the key.
        email: String,
    },
}

impl SourceKey {
    /// Parses a record key. Keys outside the `qr:` namespace, or without
    /// an email segment, yield `None`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if let Some(email) = key.strip_prefix(LEGACY_RECORD_PREFIX) {
            let email = email.trim();
            return (!email.is_empty()).then(|| Self::LegacyEmailRecord {
                email: email.to_string(),
            });
        }

        let rest = key.strip_prefix(RECORD_PREFIX)?;
        let mut parts = rest.splitn(3, ':');
        let email = non_empty(parts.next())?;
        let partner_id = non_empty(parts.next())?;
        let visit_id = non_empty(parts.next());
        Some(Self::VisitSetRecord {
            email,
            partner_id,
            visit_id,
        })
    }

    /// Customer email embedded in the key.
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::VisitSetRecord { email, .. } | Self::LegacyEmailRecord { email } => email,
        }
    }

    /// Partner identifier embedded in the key, if any.
    #[must_use]
    pub fn partner_id(&self) -> Option<&str> {
        match self {
            Self::VisitSetRecord { partner_id, .. } => Some(partner_id),
            Self::LegacyEmailRecord { .. } => None,
        }
    }

    /// Visit identifier embedded in the key, if any.
    #[must_use]
    pub fn visit_id(&self) -> Option<&str> {
        match self {
            Self::VisitSetRecord { visit_id, .. } => visit_id.as_deref(),
            Self::LegacyEmailRecord { .. } => None,
        }
    }

    /// Legacy single-record key for the embedded email.
    #[must_use]
    pub fn legacy_key(&self) -> String {
        legacy_record_key(self.email())
    }
}

fn non_empty(part: Option<&str>) -> Option<String> {
    part.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A fetched record with its decoded payload and key context.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecord {
    /// Key the record was read from.
    pub key: String,
    /// Context parsed from the key that named this record.
    pub source: Option<SourceKey>,
    /// Raw hash fields.
    pub record: RawRecord,
    /// Decoded payload.
    pub payload: Payload,
}

impl LoadedRecord {
    /// Wraps a fetched hash, decoding its payload.
    #[must_use]
    pub fn new(key: impl Into<String>, source: Option<SourceKey>, record: RawRecord) -> Self {
        let payload = decode_record_payload(&record);
        Self {
            key: key.into(),
            source,
            record,
            payload,
        }
    }

    /// Partner named by the record itself (hash field, then payload).
    #[must_use]
    pub fn declared_partner(&self) -> Option<String> {
        self.record
            .get("partnerId")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.payload
                    .get("partnerId")
                    .and_then(super::payload::value_as_text)
            })
    }
}

/// Layers `legacy` underneath `current`.
///
/// Hash fields and decoded payload keys of `current` win; fields only
/// present in `legacy` are added. Key and key context stay those of
/// `current`.
#[must_use]
pub fn merge_records(current: &LoadedRecord, legacy: &LoadedRecord) -> LoadedRecord {
    let mut record = current.record.clone();
    for (field, value) in &legacy.record {
        record.entry(field.clone()).or_insert_with(|| value.clone());
    }
    LoadedRecord {
        key: current.key.clone(),
        source: current.source.clone(),
        record,
        payload: merge_payloads(&current.payload, &legacy.payload),
    }
}

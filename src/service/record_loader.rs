//! Record loader: turns candidate keys into fetched, layered records.
//!
//! Every store read goes through here. Reads fan out with a bounded,
//! order-preserving stream so the ledger keeps set-member order, and a
//! failed read never aborts the load: it is recorded as a
//! [`FetchWarning`] and the key is treated as empty.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;

use crate::domain::keys::{PartnerKeys, RECORD_PREFIX, UserKeys, legacy_record_key};
use crate::domain::warning::FetchOperation;
use crate::domain::{FetchWarning, LoadedRecord, PartnerId, RawRecord, SourceKey};
use crate::store::{KeyValueStore, StoreError};

/// Default number of store reads in flight per request.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

/// A record ready for normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
    /// Record the visit is built from.
    pub primary: LoadedRecord,
    /// Legacy record to layer underneath `primary`, if one applies.
    pub legacy: Option<LoadedRecord>,
}

/// Records found for one request plus every read that failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutcome {
    /// Records in load order.
    pub records: Vec<SourcedRecord>,
    /// Failed reads.
    pub warnings: Vec<FetchWarning>,
}

/// Fetches visit records for partners and customers.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    store: Arc<dyn KeyValueStore>,
    concurrency: usize,
}

impl RecordLoader {
    /// Creates a loader keeping at most `concurrency` reads in flight.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Loads every record of one partner.
    ///
    /// Falls back to the legacy per-partner email sets when none of the
    /// visit sets has a member.
    pub async fn load_partner(&self, keys: &PartnerKeys) -> LoadOutcome {
        let mut warnings = Vec::new();
        let members = self.collect_members(&keys.visit_sets, &mut warnings).await;

        let records = if members.is_empty() {
            tracing::debug!(
                partner = ?keys.partner,
                "no visit-set members, reading legacy email sets"
            );
            self.load_legacy_email_sets(&keys.legacy_email_sets, &mut warnings)
                .await
        } else {
            self.load_members(members, &mut warnings).await
        };

        LoadOutcome { records, warnings }
    }

    /// Loads every record of one customer across `visit_sets`.
    ///
    /// Only members whose key embeds the customer's email are read. A
    /// customer with no such member falls back to the legacy records.
    pub async fn load_user(&self, keys: &UserKeys, visit_sets: &[String]) -> LoadOutcome {
        let mut warnings = Vec::new();
        let members: Vec<String> = self
            .collect_members(visit_sets, &mut warnings)
            .await
            .into_iter()
            .filter(|member| {
                SourceKey::parse(member).is_some_and(|source| keys.owns(source.email()))
            })
            .collect();

        let records = if members.is_empty() {
            tracing::debug!(email = %keys.email, "no visit-set members, reading legacy records");
            self.load_legacy_records(&keys.legacy_records, &mut warnings)
                .await
        } else {
            self.load_members(members, &mut warnings).await
        };

        LoadOutcome { records, warnings }
    }

    /// Partner ids listed in the directory set at `key`.
    pub async fn partner_directory(&self, key: &str) -> (Vec<String>, Vec<FetchWarning>) {
        match self.store.smembers(key).await {
            Ok(partners) => (partners, Vec::new()),
            Err(e) => (
                Vec::new(),
                vec![FetchWarning::new(key, FetchOperation::Smembers, e)],
            ),
        }
    }

    /// Pools the `qr:` members of every set, first occurrence wins.
    async fn collect_members(
        &self,
        sets: &[String],
        warnings: &mut Vec<FetchWarning>,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for (key, result) in self.fetch_sets(sets).await {
            match result {
                Ok(set) => members.extend(
                    set.into_iter()
                        .filter(|m| m.starts_with(RECORD_PREFIX) && seen.insert(m.clone())),
                ),
                Err(e) => warnings.push(FetchWarning::new(key, FetchOperation::Smembers, e)),
            }
        }
        members
    }

    /// Reads member records together with the legacy records they may
    /// layer over, then pairs them up.
    async fn load_members(
        &self,
        members: Vec<String>,
        warnings: &mut Vec<FetchWarning>,
    ) -> Vec<SourcedRecord> {
        let sources: Vec<Option<SourceKey>> = members
            .iter()
            .map(String::as_str)
            .map(SourceKey::parse)
            .collect();

        let mut seen = HashSet::new();
        let legacy_keys: Vec<String> = sources
            .iter()
            .filter_map(|s| s.as_ref().and_then(derived_legacy_key))
            .filter(|k| seen.insert(k.clone()))
            .collect();

        let (primaries, legacies) = futures_util::future::join(
            self.fetch_hashes(&members),
            self.fetch_hashes(&legacy_keys),
        )
        .await;

        let mut legacy_cache: HashMap<String, LoadedRecord> = HashMap::new();
        for (key, result) in legacies {
            match result {
                Ok(record) if !record.is_empty() => {
                    let source = SourceKey::parse(&key);
                    legacy_cache.insert(key.clone(), LoadedRecord::new(key, source, record));
                }
                Ok(_) => {}
                Err(e) => warnings.push(FetchWarning::new(key, FetchOperation::Hgetall, e)),
            }
        }

        let mut records = Vec::with_capacity(primaries.len());
        for ((key, result), source) in primaries.into_iter().zip(sources) {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warnings.push(FetchWarning::new(key.as_str(), FetchOperation::Hgetall, e));
                    RawRecord::new()
                }
            };

            let legacy = source
                .as_ref()
                .and_then(derived_legacy_key)
                .and_then(|k| legacy_cache.get(&k))
                .filter(|legacy| legacy_fits(legacy, source.as_ref()))
                .cloned();

            if record.is_empty() {
                match legacy {
                    Some(legacy) => records.push(SourcedRecord {
                        primary: in_place_of(legacy, source),
                        legacy: None,
                    }),
                    None => tracing::debug!(key = %key, "member record missing, skipped"),
                }
            } else {
                records.push(SourcedRecord {
                    primary: LoadedRecord::new(key, source, record),
                    legacy,
                });
            }
        }
        records
    }

    /// Legacy layout: email sets per partner, one record per email.
    async fn load_legacy_email_sets(
        &self,
        sets: &[String],
        warnings: &mut Vec<FetchWarning>,
    ) -> Vec<SourcedRecord> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for (key, result) in self.fetch_sets(sets).await {
            match result {
                Ok(emails) => keys.extend(
                    emails
                        .iter()
                        .map(|email| email.trim())
                        .filter(|email| !email.is_empty())
                        .map(legacy_record_key)
                        .filter(|k| seen.insert(k.clone())),
                ),
                Err(e) => warnings.push(FetchWarning::new(key, FetchOperation::Smembers, e)),
            }
        }
        self.load_legacy_records(&keys, warnings).await
    }

    /// Reads `qr:email:*` records, keeping the non-empty ones.
    async fn load_legacy_records(
        &self,
        keys: &[String],
        warnings: &mut Vec<FetchWarning>,
    ) -> Vec<SourcedRecord> {
        let mut records = Vec::new();
        for (key, result) in self.fetch_hashes(keys).await {
            match result {
                Ok(record) if !record.is_empty() => {
                    let source = SourceKey::parse(&key);
                    records.push(SourcedRecord {
                        primary: LoadedRecord::new(key, source, record),
                        legacy: None,
                    });
                }
                Ok(_) => {}
                Err(e) => warnings.push(FetchWarning::new(key, FetchOperation::Hgetall, e)),
            }
        }
        records
    }

    async fn fetch_sets(&self, keys: &[String]) -> Vec<(String, Result<Vec<String>, StoreError>)> {
        let store = self.store.as_ref();
        stream::iter(keys.iter().cloned())
            .map(move |key| async move {
                let result = store.smembers(&key).await;
                (key, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn fetch_hashes(&self, keys: &[String]) -> Vec<(String, Result<RawRecord, StoreError>)> {
        let store = self.store.as_ref();
        stream::iter(keys.iter().cloned())
            .map(move |key| async move {
                let result = store.hgetall(&key).await;
                (key, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Legacy key a visit-set member may layer over.
fn derived_legacy_key(source: &SourceKey) -> Option<String> {
    match source {
        SourceKey::VisitSetRecord { .. } => Some(source.legacy_key()),
        SourceKey::LegacyEmailRecord { .. } => None,
    }
}

/// A legacy record standing in for a missing member keeps the member's
/// email and partner context. The visit id is dropped so that several
/// missing members of one customer collapse onto the single legacy visit.
fn in_place_of(legacy: LoadedRecord, member: Option<SourceKey>) -> LoadedRecord {
    let source = match member {
        Some(SourceKey::VisitSetRecord {
            email, partner_id, ..
        }) => Some(SourceKey::VisitSetRecord {
            email,
            partner_id,
            visit_id: None,
        }),
        _ => legacy.source,
    };
    LoadedRecord { source, ..legacy }
}

/// A legacy record applies unless it names another partner.
fn legacy_fits(legacy: &LoadedRecord, source: Option<&SourceKey>) -> bool {
    let Some(member_partner) = source
        .and_then(SourceKey::partner_id)
        .and_then(PartnerId::parse)
    else {
        return true;
    };
    legacy
        .declared_partner()
        .is_none_or(|declared| member_partner.matches(&declared))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::keys::{resolve_partner_keys, resolve_user_keys};
    use crate::store::MemoryStore;

    fn loader(store: &Arc<MemoryStore>) -> RecordLoader {
        let store: Arc<dyn KeyValueStore> = Arc::clone(store) as Arc<dyn KeyValueStore>;
        RecordLoader::new(store, 4)
    }

    fn keys_of(outcome: &LoadOutcome) -> Vec<&str> {
        outcome
            .records
            .iter()
            .map(|r| r.primary.key.as_str())
            .collect()
    }

    #[tokio::test]
    async fn reads_members_across_case_variants_once() {
        let store = Arc::new(MemoryStore::new());
        store
            .sadd("partner:visits:P1", ["qr:a@x.com:P1:v1", "qr:b@x.com:P1:v2"])
            .await;
        store
            .sadd("partner:visits:p1", ["qr:a@x.com:P1:v1", "not-a-record"])
            .await;
        store.hset("qr:a@x.com:P1:v1", [("totalPrice", "10")]).await;
        store.hset("qr:b@x.com:P1:v2", [("totalPrice", "20")]).await;

        let outcome = loader(&store).load_partner(&resolve_partner_keys("P1")).await;

        assert_eq!(keys_of(&outcome), vec!["qr:a@x.com:P1:v1", "qr:b@x.com:P1:v2"]);
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn attaches_matching_legacy_record() {
        let store = Arc::new(MemoryStore::new());
        store.sadd("partner:visits:P1", ["qr:a@x.com:P1:v1"]).await;
        store.hset("qr:a@x.com:P1:v1", [("totalPrice", "100")]).await;
        store
            .hset("qr:email:a@x.com", [("visitedAt", "2024-01-01"), ("partnerId", "p1")])
            .await;

        let outcome = loader(&store).load_partner(&resolve_partner_keys("P1")).await;

        let [record] = outcome.records.as_slice() else {
            panic!("expected one record");
        };
        let Some(legacy) = &record.legacy else {
            panic!("expected legacy layer");
        };
        assert_eq!(legacy.key, "qr:email:a@x.com");
    }

    #[tokio::test]
    async fn ignores_legacy_record_of_another_partner() {
        let store = Arc::new(MemoryStore::new());
        store.sadd("partner:visits:P1", ["qr:a@x.com:P1:v1"]).await;
        store.hset("qr:a@x.com:P1:v1", [("totalPrice", "100")]).await;
        store
            .hset("qr:email:a@x.com", [("partnerId", "P2"), ("visitedAt", "2024-01-01")])
            .await;

        let outcome = loader(&store).load_partner(&resolve_partner_keys("P1")).await;

        let [record] = outcome.records.as_slice() else {
            panic!("expected one record");
        };
        assert!(record.legacy.is_none());
    }

    #[tokio::test]
    async fn missing_member_falls_back_to_legacy_record() {
        let store = Arc::new(MemoryStore::new());
        store
            .sadd("partner:visits:P1", ["qr:a@x.com:P1:v1", "qr:b@x.com:P1:v2"])
            .await;
        store.hset("qr:email:a@x.com", [("totalPrice", "7")]).await;

        let outcome = loader(&store).load_partner(&resolve_partner_keys("P1")).await;

        assert_eq!(keys_of(&outcome), vec!["qr:email:a@x.com"]);
    }

    #[tokio::test]
    async fn empty_visit_sets_use_legacy_email_sets() {
        let store = Arc::new(MemoryStore::new());
        store.sadd("partner:P1", ["a@x.com", "b@x.com"]).await;
        store.hset("qr:email:a@x.com", [("totalPrice", "5")]).await;

        let outcome = loader(&store).load_partner(&resolve_partner_keys(" P1 ")).await;

        assert_eq!(keys_of(&outcome), vec!["qr:email:a@x.com"]);
    }

    #[tokio::test]
    async fn failed_reads_become_warnings() {
        let store = Arc::new(MemoryStore::new());
        store
            .sadd("partner:visits:P1", ["qr:a@x.com:P1:v1", "qr:b@x.com:P1:v2"])
            .await;
        store.hset("qr:a@x.com:P1:v1", [("totalPrice", "10")]).await;
        store.hset("qr:b@x.com:P1:v2", [("totalPrice", "20")]).await;
        store.fail_key("qr:b@x.com:P1:v2").await;
        store.fail_key("partner:visits:p1").await;

        let outcome = loader(&store).load_partner(&resolve_partner_keys("P1")).await;

        assert_eq!(keys_of(&outcome), vec!["qr:a@x.com:P1:v1"]);
        let failed: Vec<(&str, FetchOperation)> = outcome
            .warnings
            .iter()
            .map(|w| (w.key.as_str(), w.operation))
            .collect();
        assert!(failed.contains(&("partner:visits:p1", FetchOperation::Smembers)));
        assert!(failed.contains(&("qr:b@x.com:P1:v2", FetchOperation::Hgetall)));
    }

    #[tokio::test]
    async fn user_load_keeps_only_own_members() {
        let store = Arc::new(MemoryStore::new());
        store
            .sadd("partner:visits:P1", ["qr:A@x.com:P1:v1", "qr:b@x.com:P1:v2"])
            .await;
        store.hset("qr:A@x.com:P1:v1", [("totalPrice", "10")]).await;
        store.hset("qr:b@x.com:P1:v2", [("totalPrice", "20")]).await;

        let outcome = loader(&store)
            .load_user(
                &resolve_user_keys("a@X.com"),
                &["partner:visits:P1".to_string()],
            )
            .await;

        assert_eq!(keys_of(&outcome), vec!["qr:A@x.com:P1:v1"]);
    }

    #[tokio::test]
    async fn user_without_members_reads_legacy_record() {
        let store = Arc::new(MemoryStore::new());
        store.hset("qr:email:a@x.com", [("totalPrice", "10")]).await;

        let outcome = loader(&store)
            .load_user(&resolve_user_keys("a@x.com"), &[])
            .await;

        assert_eq!(keys_of(&outcome), vec!["qr:email:a@x.com"]);
    }

    #[tokio::test]
    async fn directory_read_failure_is_a_warning() {
        let store = Arc::new(MemoryStore::new());
        store.sadd("partners", ["P1", "P2"]).await;

        let (partners, warnings) = loader(&store).partner_directory("partners").await;
        assert_eq!(partners, vec!["P1".to_string(), "P2".to_string()]);
        assert!(warnings.is_empty());

        store.fail_key("partners").await;
        let (partners, warnings) = loader(&store).partner_directory("partners").await;
        assert!(partners.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}

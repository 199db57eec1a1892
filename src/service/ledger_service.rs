//! Ledger service: orchestrates one ledger read end to end.
//!
//! Every read follows the same pipeline: ping the store → resolve keys →
//! load records → normalize → collapse duplicates → sort → project.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::keys::{
    DEFAULT_PARTNER_DIRECTORY_KEY, resolve_directory_visit_sets, resolve_partner_keys,
    resolve_user_keys,
};
use crate::domain::metrics::sort_ledger;
use crate::domain::visit::{
    NormalizeContext, VisitIdentity, merge_legacy_into_current, normalize,
};
use crate::domain::{PartnerLedger, RewardCatalog, UserBonus, Visit};
use crate::error::LedgerError;
use crate::store::KeyValueStore;

use super::record_loader::{RecordLoader, SourcedRecord};

/// Read-side orchestration over a [`KeyValueStore`].
///
/// Stateless between requests: the only shared pieces are the store
/// handle and read-only settings.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<dyn KeyValueStore>,
    loader: RecordLoader,
    catalog: RewardCatalog,
    directory_key: String,
}

impl LedgerService {
    /// Creates a service with the default reward catalog and directory key.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, fetch_concurrency: usize) -> Self {
        Self {
            loader: RecordLoader::new(Arc::clone(&store), fetch_concurrency),
            store,
            catalog: RewardCatalog::default(),
            directory_key: DEFAULT_PARTNER_DIRECTORY_KEY.to_string(),
        }
    }

    /// Replaces the reward catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: RewardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Reads the partner directory from `key` instead of `partners`.
    #[must_use]
    pub fn with_directory_key(mut self, key: impl Into<String>) -> Self {
        self.directory_key = key.into();
        self
    }

    /// Returns the reward catalog.
    #[must_use]
    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Returns `true` if the store answers a ping.
    pub async fn store_reachable(&self) -> bool {
        self.store.ping().await.is_ok()
    }

    /// Builds the ledger of one partner.
    ///
    /// The identifier is matched case- and whitespace-insensitively. An
    /// identifier that resolves to nothing yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StoreUnavailable`] if the store does not
    /// answer a ping. Individual failed reads only add warnings.
    pub async fn partner_ledger(&self, raw_id: &str) -> Result<PartnerLedger, LedgerError> {
        let keys = resolve_partner_keys(raw_id);
        let Some(partner) = keys.partner.as_ref() else {
            return Ok(PartnerLedger::empty(raw_id.trim().to_string()));
        };
        self.ensure_store().await?;

        let outcome = self.loader.load_partner(&keys).await;
        let ctx = NormalizeContext {
            normalized_id: Some(partner.normalized()),
            raw_id: Some(raw_id),
        };
        let submissions = reconcile(outcome.records, ctx);

        tracing::info!(
            partner = %partner,
            visits = submissions.len(),
            warnings = outcome.warnings.len(),
            "partner ledger built"
        );
        Ok(PartnerLedger::new(
            partner.as_str().to_string(),
            submissions,
            outcome.warnings,
        ))
    }

    /// Builds the bonus view of one customer across every partner in
    /// the directory.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::StoreUnavailable`] if the store does not
    /// answer a ping. Individual failed reads only add warnings.
    pub async fn user_bonus(&self, raw_email: &str) -> Result<UserBonus, LedgerError> {
        let keys = resolve_user_keys(raw_email);
        if keys.is_empty() {
            return Ok(UserBonus::empty(String::new(), &self.catalog));
        }
        self.ensure_store().await?;

        let (partners, mut warnings) = self.loader.partner_directory(&self.directory_key).await;
        let visit_sets = resolve_directory_visit_sets(partners.iter().map(String::as_str));
        let mut outcome = self.loader.load_user(&keys, &visit_sets).await;
        warnings.append(&mut outcome.warnings);

        let visits = reconcile(outcome.records, NormalizeContext::default());

        tracing::info!(
            partners = partners.len(),
            visits = visits.len(),
            warnings = warnings.len(),
            "user bonus built"
        );
        Ok(UserBonus::new(keys.email, visits, &self.catalog, warnings))
    }

    async fn ensure_store(&self) -> Result<(), LedgerError> {
        self.store.ping().await.map_err(|e| {
            tracing::error!(error = %e, "store ping failed");
            LedgerError::StoreUnavailable(e.to_string())
        })
    }
}

/// Normalizes loaded records, collapses visits sharing an identity and
/// sorts newest first. The first visit of an identity wins; later ones
/// only fill its missing fields.
fn reconcile(records: Vec<SourcedRecord>, ctx: NormalizeContext<'_>) -> Vec<Visit> {
    let mut visits: Vec<Visit> = Vec::with_capacity(records.len());
    let mut positions: HashMap<VisitIdentity, usize> = HashMap::new();

    for sourced in records {
        let visit = match &sourced.legacy {
            Some(legacy) => merge_legacy_into_current(&sourced.primary, legacy, ctx),
            None => normalize(&sourced.primary, ctx),
        };
        let identity = visit.identity();
        match positions.get(&identity).and_then(|&i| visits.get_mut(i)) {
            Some(first) => first.absorb(&visit),
            None => {
                positions.insert(identity, visits.len());
                visits.push(visit);
            }
        }
    }

    sort_ledger(&mut visits);
    visits
}

//! Partner ledger response body.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{FetchWarning, Metrics, PartnerLedger, Visit};

/// `GET /api/v1/partners/{partner_id}/visits` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerVisitsResponse {
    /// Partner identifier as requested, trimmed.
    pub partner_id: String,
    /// Visits, newest first. Each visit carries its canonical fields plus
    /// every other stored field passed through.
    #[schema(value_type = Vec<Object>)]
    pub submissions: Vec<Visit>,
    /// Aggregate over `submissions`.
    pub metrics: Metrics,
    /// Partner display name, `null` when no visit carries one.
    pub partner_label: Option<String>,
    /// Failed store reads, only present with `?diagnostics=true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<FetchWarning>>,
}

impl PartnerVisitsResponse {
    /// Builds the body, keeping warnings only when `diagnostics` is set.
    #[must_use]
    pub fn from_ledger(ledger: PartnerLedger, diagnostics: bool) -> Self {
        Self {
            partner_id: ledger.partner_id,
            submissions: ledger.submissions,
            metrics: ledger.metrics,
            partner_label: ledger.partner_label,
            warnings: diagnostics.then_some(ledger.warnings),
        }
    }
}

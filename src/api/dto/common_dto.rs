//! Shared DTO types used across multiple endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters accepted by every ledger endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DiagnosticsParams {
    /// Include per-key fetch warnings in the response. Defaults to `false`.
    #[serde(default)]
    pub diagnostics: bool,
}

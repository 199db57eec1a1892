//! Partner ledger handler.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::check_length;
use crate::api::dto::{DiagnosticsParams, PartnerVisitsResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LedgerError};

/// Longest partner identifier accepted in a path.
pub const MAX_PARTNER_ID_LEN: usize = 256;

/// `GET /partners/{partner_id}/visits`: Visit ledger of one partner.
///
/// # Errors
///
/// Returns [`LedgerError`] for an oversized identifier or an
/// unreachable store.
#[utoipa::path(
    get,
    path = "/api/v1/partners/{partner_id}/visits",
    tag = "Partners",
    summary = "Partner visit ledger",
    description = "Returns every visit recorded for the partner, newest first, with aggregate metrics. The identifier is matched case- and whitespace-insensitively; an unknown partner yields an empty ledger.",
    params(
        ("partner_id" = String, Path, description = "Partner identifier"),
        DiagnosticsParams,
    ),
    responses(
        (status = 200, description = "Partner ledger", body = PartnerVisitsResponse),
        (status = 400, description = "Identifier too long", body = ErrorResponse),
        (status = 503, description = "Store unreachable", body = ErrorResponse),
    )
)]
pub async fn partner_visits(
    State(state): State<AppState>,
    Path(partner_id): Path<String>,
    Query(params): Query<DiagnosticsParams>,
) -> Result<impl IntoResponse, LedgerError> {
    check_length("partner id", &partner_id, MAX_PARTNER_ID_LEN)?;
    let ledger = state.ledger_service.partner_ledger(&partner_id).await?;
    Ok(Json(PartnerVisitsResponse::from_ledger(
        ledger,
        params.diagnostics,
    )))
}

/// Partner routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/partners/{partner_id}/visits", get(partner_visits))
}

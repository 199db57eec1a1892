//! Customer bonus handler.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::check_length;
use crate::api::dto::{DiagnosticsParams, UserBonusResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, LedgerError};

/// Longest email accepted in a path.
pub const MAX_EMAIL_LEN: usize = 320;

/// `GET /users/{email}/bonus`: Points and rewards of one customer.
///
/// # Errors
///
/// Returns [`LedgerError`] for an oversized email or an unreachable
/// store.
#[utoipa::path(
    get,
    path = "/api/v1/users/{email}/bonus",
    tag = "Users",
    summary = "Customer bonus view",
    description = "Collects the customer's visits across every partner in the directory and derives earned, redeemed and available points together with the rewards the balance can pay for.",
    params(
        ("email" = String, Path, description = "Customer email, matched case-insensitively"),
        DiagnosticsParams,
    ),
    responses(
        (status = 200, description = "Customer bonus view", body = UserBonusResponse),
        (status = 400, description = "Email too long", body = ErrorResponse),
        (status = 503, description = "Store unreachable", body = ErrorResponse),
    )
)]
pub async fn user_bonus(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<DiagnosticsParams>,
) -> Result<impl IntoResponse, LedgerError> {
    check_length("email", &email, MAX_EMAIL_LEN)?;
    let bonus = state.ledger_service.user_bonus(&email).await?;
    Ok(Json(UserBonusResponse::from_bonus(bonus, params.diagnostics)))
}

/// Customer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{email}/bonus", get(user_bonus))
}

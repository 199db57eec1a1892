//! Customer bonus response body.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ledger::{PointsHistoryEntry, UserRef, UserStatistics};
use crate::domain::{FetchWarning, Reward, UserBonus, Visit};

/// `GET /api/v1/users/{email}/bonus` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBonusResponse {
    /// Customer the view belongs to.
    pub user: UserRef,
    /// Points summary.
    pub statistics: UserStatistics,
    /// Visits across all partners, newest first.
    #[schema(value_type = Vec<Object>)]
    pub visits: Vec<Visit>,
    /// Earned and redeemed points, newest first.
    pub points_history: Vec<PointsHistoryEntry>,
    /// Reward-redemption visits.
    #[schema(value_type = Vec<Object>)]
    pub redemptions: Vec<Visit>,
    /// Rewards the current balance can pay for.
    pub available_rewards: Vec<Reward>,
    /// Failed store reads, only present with `?diagnostics=true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<FetchWarning>>,
}

impl UserBonusResponse {
    /// Builds the body, keeping warnings only when `diagnostics` is set.
    #[must_use]
    pub fn from_bonus(bonus: UserBonus, diagnostics: bool) -> Self {
        Self {
            user: bonus.user,
            statistics: bonus.statistics,
            visits: bonus.visits,
            points_history: bonus.points_history,
            redemptions: bonus.redemptions,
            available_rewards: bonus.available_rewards,
            warnings: diagnostics.then_some(bonus.warnings),
        }
    }
}

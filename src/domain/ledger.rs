//! Read-side projections handed to callers: the partner ledger and the
//! customer bonus view.

use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use super::metrics::{Metrics, ledger_partner_label, timestamp_millis};
use super::reward::{Reward, RewardCatalog};
use super::visit::Visit;
use super::warning::FetchWarning;

/// Payload fields naming what a redemption cost, in lookup order.
const REDEMPTION_COST_FIELDS: &[&str] = &["pointsCost", "pointsSpent", "rewardCost"];

/// Deduplicated, sorted visits of one partner with their summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerLedger {
    /// Partner identifier as requested (trimmed).
    pub partner_id: String,
    /// Visits, newest first.
    pub submissions: Vec<Visit>,
    /// Summary of `submissions`.
    pub metrics: Metrics,
    /// Partner display name, if any visit carries one.
    pub partner_label: Option<String>,
    /// Fetches that failed while loading.
    pub warnings: Vec<FetchWarning>,
}

impl PartnerLedger {
    /// Builds the projection from an already sorted ledger.
    #[must_use]
    pub fn new(partner_id: String, submissions: Vec<Visit>, warnings: Vec<FetchWarning>) -> Self {
        let metrics = Metrics::from_ledger(&submissions);
        let partner_label = ledger_partner_label(&submissions);
        Self {
            partner_id,
            submissions,
            metrics,
            partner_label,
            warnings,
        }
    }

    /// Ledger for an identifier that resolves to nothing.
    #[must_use]
    pub fn empty(partner_id: String) -> Self {
        Self::new(partner_id, Vec::new(), Vec::new())
    }
}

/// Whether a history row added or spent points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PointsKind {
    /// Points earned by a visit.
    Earned,
    /// Points spent on a reward.
    Redeemed,
}

/// One row of a customer's points history.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointsHistoryEntry {
    /// Visit the points belong to.
    pub visit_id: Option<String>,
    /// Partner of the visit.
    pub partner_id: String,
    /// Partner display name, if known.
    pub partner_label: Option<String>,
    /// Points moved (always positive; see `kind`).
    pub points: f64,
    /// Direction of the movement.
    pub kind: PointsKind,
    /// Visit timestamp as stored.
    pub date: Option<String>,
}

/// Points summary of one customer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    /// Aggregate over all of the customer's visits.
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Effective points of non-redemption visits.
    pub points_earned: f64,
    /// Points spent on redemptions.
    pub points_redeemed: f64,
    /// `points_earned - points_redeemed`, floored at zero.
    pub points_balance: f64,
    /// Distinct partners visited.
    pub partners_visited: u64,
}

/// Customer identity echoed in the bonus view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct UserRef {
    /// Lower-cased email.
    pub email: String,
}

/// Bonus view of one customer across every partner.
#[derive(Debug, Clone, PartialEq)]
pub struct UserBonus {
    /// Customer.
    pub user: UserRef,
    /// Points summary.
    pub statistics: UserStatistics,
    /// Visits, newest first.
    pub visits: Vec<Visit>,
    /// Earned and redeemed points, newest first.
    pub points_history: Vec<PointsHistoryEntry>,
    /// Reward-redemption visits.
    pub redemptions: Vec<Visit>,
    /// Rewards the balance can pay for.
    pub available_rewards: Vec<Reward>,
    /// Fetches that failed while loading.
    pub warnings: Vec<FetchWarning>,
}

impl UserBonus {
    /// Builds the projection from an already sorted ledger.
    #[must_use]
    pub fn new(
        email: String,
        visits: Vec<Visit>,
        catalog: &RewardCatalog,
        warnings: Vec<FetchWarning>,
    ) -> Self {
        let redemptions: Vec<Visit> = visits
            .iter()
            .filter(|v| v.is_bonus_redemption())
            .cloned()
            .collect();

        let points_earned: f64 = visits
            .iter()
            .filter(|v| !v.is_bonus_redemption())
            .map(Visit::effective_points)
            .sum();
        let points_redeemed: f64 = redemptions.iter().map(redemption_cost).sum();
        let points_balance = (points_earned - points_redeemed).max(0.0);

        let partners_visited = visits
            .iter()
            .map(|v| v.partner_id.to_lowercase())
            .filter(|p| !p.is_empty())
            .collect::<HashSet<_>>()
            .len() as u64;

        let statistics = UserStatistics {
            metrics: Metrics::from_ledger(&visits),
            points_earned,
            points_redeemed,
            points_balance,
            partners_visited,
        };

        Self {
            user: UserRef { email },
            statistics,
            points_history: points_history(&visits),
            available_rewards: catalog.available_for(points_balance),
            visits,
            redemptions,
            warnings,
        }
    }

    /// Bonus view for an email that resolves to nothing.
    #[must_use]
    pub fn empty(email: String, catalog: &RewardCatalog) -> Self {
        Self::new(email, Vec::new(), catalog, Vec::new())
    }
}

/// Points a redemption consumed: an explicit cost field when present,
/// otherwise the visit's effective points.
fn redemption_cost(visit: &Visit) -> f64 {
    REDEMPTION_COST_FIELDS
        .iter()
        .find_map(|field| {
            visit
                .details
                .get(*field)
                .filter(|v| !super::payload::is_blank(v))
        })
        .map_or_else(
            || visit.effective_points(),
            super::payload::value_as_number,
        )
}

fn points_history(visits: &[Visit]) -> Vec<PointsHistoryEntry> {
    let mut history: Vec<PointsHistoryEntry> = visits
        .iter()
        .filter_map(|visit| {
            let (points, kind) = if visit.is_bonus_redemption() {
                (redemption_cost(visit), PointsKind::Redeemed)
            } else {
                (visit.effective_points(), PointsKind::Earned)
            };
            (points != 0.0).then(|| PointsHistoryEntry {
                visit_id: visit.visit_id.clone(),
                partner_id: visit.partner_id.clone(),
                partner_label: visit.partner_label(),
                points,
                kind,
                date: visit.created_at.clone(),
            })
        })
        .collect();
    history.sort_by_key(|entry| std::cmp::Reverse(timestamp_millis(entry.date.as_deref())));
    history
}

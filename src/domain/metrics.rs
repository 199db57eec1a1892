//! Ledger ordering and aggregate metrics.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use super::visit::Visit;

/// Aggregate over a visit ledger.
///
/// Always fully populated; [`Metrics::default`] is the value for an empty
/// ledger.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Number of visits.
    pub count: u64,
    /// Visits whose reward was consumed.
    pub used: u64,
    /// `count - used`.
    pub unused: u64,
    /// Visits confirmed by the partner.
    pub visited: u64,
    /// `count - visited`.
    pub not_visited: u64,
    /// Sum of ticket prices.
    pub revenue: f64,
    /// Sum of effective points.
    pub points: f64,
    /// Visits tagged as reward redemptions.
    pub bonus_redemptions: u64,
    /// `revenue / count`, rounded; 0 for an empty ledger.
    pub average_revenue: i64,
    /// `points / count`, rounded; 0 for an empty ledger.
    pub average_points: i64,
}

impl Metrics {
    /// Folds a ledger into its summary.
    #[must_use]
    pub fn from_ledger(visits: &[Visit]) -> Self {
        let mut metrics = visits.iter().fold(Self::default(), |mut acc, visit| {
            acc.count += 1;
            acc.revenue += visit.total_price;
            acc.points += visit.effective_points();
            if visit.used {
                acc.used += 1;
            }
            if visit.visited {
                acc.visited += 1;
            }
            if visit.is_bonus_redemption() {
                acc.bonus_redemptions += 1;
            }
            acc
        });

        metrics.unused = metrics.count - metrics.used;
        metrics.not_visited = metrics.count - metrics.visited;
        metrics.average_revenue = rounded_average(metrics.revenue, metrics.count);
        metrics.average_points = rounded_average(metrics.points, metrics.count);
        metrics
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn rounded_average(total: f64, count: u64) -> i64 {
    if count == 0 {
        return 0;
    }
    (total / count as f64).round() as i64
}

/// Sorts a ledger newest first by `createdAt`.
///
/// The sort is stable; visits without a parseable timestamp are treated
/// as epoch 0 and therefore end up last.
pub fn sort_ledger(visits: &mut [Visit]) {
    visits.sort_by_key(|visit| Reverse(timestamp_millis(visit.created_at.as_deref())));
}

/// Milliseconds since the Unix epoch for a stored timestamp, `0` when
/// missing or unparseable.
///
/// Accepted forms: RFC 3339, naive ISO date-times (read as UTC), plain
/// dates, and integer epoch milliseconds.
#[must_use]
pub fn timestamp_millis(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_millis();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return dt.and_utc().timestamp_millis();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map_or(0, |dt| dt.and_utc().timestamp_millis());
    }
    raw.parse::<i64>().unwrap_or(0)
}

/// Display name of the partner behind a ledger: the first
/// `partnerName`/`attractionName` found scanning visits in order.
#[must_use]
pub fn ledger_partner_label(visits: &[Visit]) -> Option<String> {
    visits.iter().find_map(Visit::partner_label)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::record::{LoadedRecord, RawRecord, SourceKey};
    use crate::domain::visit::{NormalizeContext, normalize};

    fn visit(visit_id: &str, fields: &[(&str, &str)]) -> Visit {
        let key = format!("qr:a@x.com:P1:{visit_id}");
        let record: RawRecord = fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        normalize(
            &LoadedRecord::new(key.clone(), SourceKey::parse(&key), record),
            NormalizeContext::default(),
        )
    }

    #[test]
    fn empty_ledger_is_all_zeros() {
        let metrics = Metrics::from_ledger(&[]);
        assert_eq!(metrics, Metrics::default());
        assert_eq!(metrics.unused, metrics.count - metrics.used);
        assert_eq!(metrics.not_visited, metrics.count - metrics.visited);
        assert_eq!(metrics.average_revenue, 0);
        assert_eq!(metrics.average_points, 0);
    }

    #[test]
    fn revenue_points_and_rounded_averages() {
        let ledger = vec![
            visit("v1", &[("totalPrice", "100"), ("estimatedPoints", "10")]),
            visit("v2", &[("totalPrice", "200"), ("estimatedPoints", "20")]),
            visit("v3", &[("totalPrice", "0"), ("estimatedPoints", "5")]),
        ];
        let metrics = Metrics::from_ledger(&ledger);
        assert_eq!(metrics.count, 3);
        assert!((metrics.revenue - 300.0).abs() < f64::EPSILON);
        assert!((metrics.points - 35.0).abs() < f64::EPSILON);
        assert_eq!(metrics.average_revenue, 100);
        assert_eq!(metrics.average_points, 12);
    }

    #[test]
    fn awarded_points_replace_estimates() {
        let ledger = vec![
            visit("v1", &[("estimatedPoints", "10"), ("pointsAwarded", "25")]),
            visit("v2", &[("estimatedPoints", "10"), ("pointsAwarded", "0")]),
        ];
        let metrics = Metrics::from_ledger(&ledger);
        assert!((metrics.points - 35.0).abs() < f64::EPSILON);
    }

    #[test]
    fn status_counts_and_complements() {
        let ledger = vec![
            visit("v1", &[("status", "completed")]),
            visit("v2", &[("status", "checked-in")]),
            visit("v3", &[("used", "used")]),
            visit("v4", &[]),
        ];
        let metrics = Metrics::from_ledger(&ledger);
        assert_eq!(metrics.count, 4);
        assert_eq!(metrics.used, 2);
        assert_eq!(metrics.unused, 2);
        assert_eq!(metrics.visited, 2);
        assert_eq!(metrics.not_visited, 2);
    }

    #[test]
    fn counts_bonus_redemptions() {
        let ledger = vec![
            visit("v1", &[("payload", r#"{"ticketType":"BonusReward"}"#)]),
            visit("v2", &[("payload", r#"{"ticketType":"Standard"}"#)]),
        ];
        assert_eq!(Metrics::from_ledger(&ledger).bonus_redemptions, 1);
    }

    #[test]
    fn metrics_serialize_camel_case() {
        let Ok(json) = serde_json::to_value(Metrics::default()) else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("notVisited"), Some(&json!(0)));
        assert_eq!(json.get("bonusRedemptions"), Some(&json!(0)));
        assert_eq!(json.get("averageRevenue"), Some(&json!(0)));
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(timestamp_millis(Some("1970-01-01T00:00:01Z")), 1_000);
        assert_eq!(timestamp_millis(Some("1970-01-01T00:00:01.500+00:00")), 1_500);
        assert_eq!(timestamp_millis(Some("1970-01-02")), 86_400_000);
        assert_eq!(timestamp_millis(Some("1970-01-01 00:01:00")), 60_000);
        assert_eq!(timestamp_millis(Some("1704067200000")), 1_704_067_200_000);
        assert_eq!(timestamp_millis(Some("yesterday")), 0);
        assert_eq!(timestamp_millis(Some("  ")), 0);
        assert_eq!(timestamp_millis(None), 0);
    }

    #[test]
    fn sort_is_descending_with_unparseable_last_and_stable() {
        let mut ledger = vec![
            visit("old", &[("createdAt", "2024-01-01T00:00:00Z")]),
            visit("bad1", &[("createdAt", "not a date")]),
            visit("new", &[("createdAt", "2024-06-01T00:00:00Z")]),
            visit("none", &[]),
            visit("bad2", &[("createdAt", "??")]),
        ];
        sort_ledger(&mut ledger);
        let order: Vec<_> = ledger
            .iter()
            .filter_map(|v| v.visit_id.as_deref())
            .collect();
        assert_eq!(order, vec!["new", "old", "bad1", "none", "bad2"]);
    }

    #[test]
    fn label_is_first_found_in_ledger_order() {
        let ledger = vec![
            visit("v1", &[]),
            visit("v2", &[("payload", r#"{"attractionName":"Aqua Park"}"#)]),
            visit("v3", &[("partnerName", "Other")]),
        ];
        assert_eq!(ledger_partner_label(&ledger).as_deref(), Some("Aqua Park"));
        assert_eq!(ledger_partner_label(&[]), None);
    }
}

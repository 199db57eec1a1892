//! Canonical visit entity and the normalizer that builds it.
//!
//! A [`Visit`] is derived from one [`LoadedRecord`] (already merged with
//! its legacy counterpart, if any). Each canonical field is taken from the
//! first non-blank candidate in a fixed precedence order; every other
//! payload field is passed through for display.

use serde::Serialize;
use serde_json::Value;

use super::payload::{Payload, is_blank, value_as_number, value_as_text};
use super::record::{LoadedRecord, merge_records};
use super::status::RawStatus;

/// Ticket type that tags a reward-redemption visit.
pub const BONUS_REWARD_TICKET: &str = "BonusReward";

/// Serialized names of the canonical fields. Pass-through fields with
/// these names are dropped so they cannot shadow the canonical values.
const CANONICAL_FIELDS: &[&str] = &[
    "partnerId",
    "email",
    "visitId",
    "createdAt",
    "scannedAt",
    "visitedAt",
    "totalPrice",
    "pointsAwarded",
    "estimatedPoints",
    "used",
    "visited",
    "status",
    "sourceKey",
    "payload",
];

/// One customer interaction with one partner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    /// Partner identifier, trimmed, original casing.
    pub partner_id: String,
    /// Customer email.
    pub email: String,
    /// Stable visit identifier; absent for some legacy records.
    pub visit_id: Option<String>,
    /// Registration timestamp as stored.
    pub created_at: Option<String>,
    /// Scan timestamp as stored.
    pub scanned_at: Option<String>,
    /// Partner confirmation timestamp as stored.
    pub visited_at: Option<String>,
    /// Ticket price, never negative.
    pub total_price: f64,
    /// Points confirmed by the partner.
    pub points_awarded: f64,
    /// Points anticipated at registration.
    pub estimated_points: f64,
    /// Reward or ticket consumed.
    pub used: bool,
    /// Visit confirmed by the partner.
    pub visited: bool,
    /// Legacy free-text status, kept for audit.
    pub status: Option<String>,
    /// Key the record was read from.
    pub source_key: String,
    /// Pass-through attributes (ticket type, headcount, category, ...).
    #[serde(flatten)]
    pub details: Payload,
    /// Decoded payload as stored.
    pub payload: Payload,
}

/// Identity of a visit for deduplication, case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitIdentity {
    email: String,
    partner_id: String,
    discriminator: Option<String>,
}

/// Identifiers the ledger was requested for, used as fallbacks when a
/// record names no partner itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext<'a> {
    /// Trimmed, lower-cased identifier passed to the loader.
    pub normalized_id: Option<&'a str>,
    /// Identifier exactly as supplied by the caller.
    pub raw_id: Option<&'a str>,
}

impl Visit {
    /// Points this visit contributes to aggregates: `points_awarded` when
    /// non-zero, `estimated_points` otherwise.
    #[must_use]
    pub fn effective_points(&self) -> f64 {
        if self.points_awarded != 0.0 {
            self.points_awarded
        } else {
            self.estimated_points
        }
    }

    /// Ticket type, read from `ticketType` then `ticket`.
    #[must_use]
    pub fn ticket_type(&self) -> Option<&str> {
        ["ticketType", "ticket"]
            .iter()
            .find_map(|field| self.details.get(*field).and_then(Value::as_str))
    }

    /// Returns `true` for reward-redemption visits.
    #[must_use]
    pub fn is_bonus_redemption(&self) -> bool {
        self.ticket_type() == Some(BONUS_REWARD_TICKET)
    }

    /// Partner display name carried by the visit, looking at the
    /// pass-through fields first and the nested payload second.
    #[must_use]
    pub fn partner_label(&self) -> Option<String> {
        [&self.details, &self.payload].into_iter().find_map(|map| {
            ["partnerName", "attractionName"]
                .iter()
                .find_map(|field| map.get(*field).and_then(value_as_text))
        })
    }

    /// Deduplication identity: `(email, partnerId, visitId)`, with the
    /// creation timestamp standing in for a missing visit id.
    #[must_use]
    pub fn identity(&self) -> VisitIdentity {
        VisitIdentity {
            email: self.email.to_lowercase(),
            partner_id: self.partner_id.to_lowercase(),
            discriminator: self
                .visit_id
                .as_ref()
                .map(|id| id.to_lowercase())
                .or_else(|| self.created_at.clone()),
        }
    }

    /// Fills fields this visit lacks from a duplicate of itself.
    pub fn absorb(&mut self, other: &Self) {
        fill(&mut self.visit_id, &other.visit_id);
        fill(&mut self.created_at, &other.created_at);
        fill(&mut self.scanned_at, &other.scanned_at);
        fill(&mut self.visited_at, &other.visited_at);
        fill(&mut self.status, &other.status);
        if self.total_price == 0.0 {
            self.total_price = other.total_price;
        }
        if self.points_awarded == 0.0 {
            self.points_awarded = other.points_awarded;
        }
        if self.estimated_points == 0.0 {
            self.estimated_points = other.estimated_points;
        }
        for (key, value) in &other.details {
            self.details
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        for (key, value) in &other.payload {
            self.payload
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

fn fill(target: &mut Option<String>, source: &Option<String>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

/// Builds the canonical [`Visit`] for a loaded record.
#[must_use]
pub fn normalize(loaded: &LoadedRecord, ctx: NormalizeContext<'_>) -> Visit {
    let fields = FieldLookup::new(loaded);
    let source = loaded.source.as_ref();

    let total_price = fields
        .first(&[
            Field::Payload("totalPrice"),
            Field::Payload("price"),
            Field::Record("totalPrice"),
            Field::Record("price"),
        ])
        .map_or(0.0, |v| value_as_number(&v))
        .max(0.0);

    let estimated_points = fields
        .first(&[
            Field::Payload("estimatedPoints"),
            Field::Payload("points"),
            Field::Record("estimatedPoints"),
        ])
        .map_or(0.0, |v| value_as_number(&v));

    let points_awarded = fields
        .first(&[Field::Record("pointsAwarded"), Field::Payload("pointsAwarded")])
        .map_or(0.0, |v| value_as_number(&v));

    let visited_at = fields.text(&[Field::Record("visitedAt"), Field::Payload("visitedAt")]);

    let status_literals: Vec<String> = [
        Field::Record("used"),
        Field::Payload("used"),
        Field::Record("status"),
        Field::Payload("status"),
    ]
    .iter()
    .filter_map(|field| fields.get(*field).as_ref().and_then(value_as_text))
    .collect();
    let mut status = RawStatus::from_candidates(status_literals.iter().map(String::as_str));
    if visited_at.is_some() {
        status = status.with_visited();
    }

    let partner_id = fields
        .text(&[Field::Record("partnerId")])
        .or_else(|| source.and_then(|s| s.partner_id()).map(str::to_string))
        .or_else(|| non_blank(ctx.normalized_id))
        .or_else(|| ctx.raw_id.map(str::to_string))
        .unwrap_or_default();

    let email = fields
        .text(&[Field::Record("email"), Field::Payload("email")])
        .or_else(|| source.map(|s| s.email().to_string()))
        .unwrap_or_default();

    let visit_id = fields
        .text(&[Field::Record("visitId"), Field::Payload("visitId")])
        .or_else(|| source.and_then(|s| s.visit_id()).map(str::to_string));

    let created_at = fields.text(&[
        Field::Record("createdAt"),
        Field::Payload("createdAt"),
        Field::Record("updatedAt"),
        Field::Payload("updatedAt"),
        Field::Record("visitedAt"),
        Field::Payload("visitedAt"),
    ]);

    Visit {
        partner_id,
        email,
        visit_id,
        created_at,
        scanned_at: fields.text(&[Field::Record("scannedAt"), Field::Payload("scannedAt")]),
        visited_at,
        total_price,
        points_awarded,
        estimated_points,
        used: status.is_used(),
        visited: status.is_visited(),
        status: fields.text(&[Field::Record("status"), Field::Payload("status")]),
        source_key: loaded.key.clone(),
        details: pass_through(loaded),
        payload: loaded.payload.clone(),
    }
}

/// Merges a legacy record underneath the current one and normalizes the
/// result. Current fields win; legacy-only fields survive.
#[must_use]
pub fn merge_legacy_into_current(
    current: &LoadedRecord,
    legacy: &LoadedRecord,
    ctx: NormalizeContext<'_>,
) -> Visit {
    normalize(&merge_records(current, legacy), ctx)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Record hash fields (except the encoded payload) overlaid by payload
/// fields, minus the canonical names.
fn pass_through(loaded: &LoadedRecord) -> Payload {
    let mut details = Payload::new();
    for (key, value) in &loaded.record {
        if key != super::payload::PAYLOAD_FIELD {
            details.insert(key.clone(), Value::String(value.clone()));
        }
    }
    for (key, value) in &loaded.payload {
        details.insert(key.clone(), value.clone());
    }
    details.retain(|key, _| !CANONICAL_FIELDS.contains(&key.as_str()));
    details
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Record(&'static str),
    Payload(&'static str),
}

struct FieldLookup<'a> {
    loaded: &'a LoadedRecord,
}

impl<'a> FieldLookup<'a> {
    fn new(loaded: &'a LoadedRecord) -> Self {
        Self { loaded }
    }

    fn get(&self, field: Field) -> Option<Value> {
        let value = match field {
            Field::Record(name) => self.loaded.record.get(name).cloned().map(Value::String),
            Field::Payload(name) => self.loaded.payload.get(name).cloned(),
        }?;
        (!is_blank(&value)).then_some(value)
    }

    /// First non-blank candidate.
    fn first(&self, candidates: &[Field]) -> Option<Value> {
        candidates.iter().find_map(|field| self.get(*field))
    }

    fn text(&self, candidates: &[Field]) -> Option<String> {
        self.first(candidates).as_ref().and_then(value_as_text)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::record::{RawRecord, SourceKey};

    fn raw(fields: &[(&str, &str)]) -> RawRecord {
        fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn loaded(key: &str, fields: &[(&str, &str)]) -> LoadedRecord {
        LoadedRecord::new(key, SourceKey::parse(key), raw(fields))
    }

    fn visit_with_points(awarded: f64, estimated: f64) -> Visit {
        let mut visit = normalize(&loaded("qr:a@x.com:P1:v1", &[]), NormalizeContext::default());
        visit.points_awarded = awarded;
        visit.estimated_points = estimated;
        visit
    }

    #[test]
    fn key_context_fills_identity_fields() {
        let visit = normalize(&loaded("qr:a@x.com:P1:v1", &[]), NormalizeContext::default());
        assert_eq!(visit.email, "a@x.com");
        assert_eq!(visit.partner_id, "P1");
        assert_eq!(visit.visit_id.as_deref(), Some("v1"));
        assert_eq!(visit.source_key, "qr:a@x.com:P1:v1");
        assert!(!visit.used);
        assert!(!visit.visited);
        assert!(visit.total_price.abs() < f64::EPSILON);
    }

    #[test]
    fn record_fields_override_key_context() {
        let visit = normalize(
            &loaded(
                "qr:a@x.com:P1:v1",
                &[("partnerId", "Park"), ("email", "b@x.com"), ("visitId", "v9")],
            ),
            NormalizeContext::default(),
        );
        assert_eq!(visit.partner_id, "Park");
        assert_eq!(visit.email, "b@x.com");
        assert_eq!(visit.visit_id.as_deref(), Some("v9"));
    }

    #[test]
    fn partner_falls_back_to_context() {
        let record = loaded("qr:email:a@x.com", &[]);
        let visit = normalize(
            &record,
            NormalizeContext {
                normalized_id: Some("zoo"),
                raw_id: Some(" Zoo "),
            },
        );
        assert_eq!(visit.partner_id, "zoo");

        let visit = normalize(
            &record,
            NormalizeContext {
                normalized_id: Some(""),
                raw_id: Some("Zoo"),
            },
        );
        assert_eq!(visit.partner_id, "Zoo");
    }

    #[test]
    fn price_precedence_and_coercion() {
        let visit = normalize(
            &loaded(
                "qr:a@x.com:P1:v1",
                &[
                    ("totalPrice", "30"),
                    ("payload", r#"{"price":"45.5"}"#),
                ],
            ),
            NormalizeContext::default(),
        );
        assert!((visit.total_price - 45.5).abs() < f64::EPSILON);

        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("price", "abc")]),
            NormalizeContext::default(),
        );
        assert!(visit.total_price.abs() < f64::EPSILON);

        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("totalPrice", "-10")]),
            NormalizeContext::default(),
        );
        assert!(visit.total_price.abs() < f64::EPSILON);
    }

    #[test]
    fn blank_candidates_are_skipped() {
        let visit = normalize(
            &loaded(
                "qr:a@x.com:P1:v1",
                &[("totalPrice", "80"), ("payload", r#"{"totalPrice":""}"#)],
            ),
            NormalizeContext::default(),
        );
        assert!((visit.total_price - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn points_precedence() {
        let visit = normalize(
            &loaded(
                "qr:a@x.com:P1:v1",
                &[
                    ("estimatedPoints", "3"),
                    ("pointsAwarded", "15"),
                    ("payload", r#"{"points":7,"pointsAwarded":9}"#),
                ],
            ),
            NormalizeContext::default(),
        );
        assert!((visit.estimated_points - 7.0).abs() < f64::EPSILON);
        assert!((visit.points_awarded - 15.0).abs() < f64::EPSILON);
        assert!((visit.effective_points() - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn effective_points_for_all_combinations() {
        let cases = [
            (0.0, 0.0, 0.0),
            (0.0, 8.0, 8.0),
            (5.0, 0.0, 5.0),
            (5.0, 8.0, 5.0),
        ];
        for (awarded, estimated, expected) in cases {
            let visit = visit_with_points(awarded, estimated);
            assert!(
                (visit.effective_points() - expected).abs() < f64::EPSILON,
                "awarded={awarded} estimated={estimated}"
            );
        }
    }

    #[test]
    fn status_fields_drive_flags() {
        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("status", "Completed")]),
            NormalizeContext::default(),
        );
        assert!(visit.used);
        assert!(visit.visited);
        assert_eq!(visit.status.as_deref(), Some("Completed"));

        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("payload", r#"{"used":true}"#)]),
            NormalizeContext::default(),
        );
        assert!(visit.used);
        assert!(visit.visited);

        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("used", "awarded")]),
            NormalizeContext::default(),
        );
        assert!(visit.used);
        assert!(!visit.visited);
    }

    #[test]
    fn visited_at_marks_visited() {
        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("payload", r#"{"visitedAt":"2024-03-01"}"#)]),
            NormalizeContext::default(),
        );
        assert!(visit.visited);
        assert!(!visit.used);
        assert_eq!(visit.visited_at.as_deref(), Some("2024-03-01"));
        assert_eq!(visit.created_at.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn created_at_precedence() {
        let visit = normalize(
            &loaded(
                "qr:a@x.com:P1:v1",
                &[
                    ("updatedAt", "2024-02-02"),
                    ("payload", r#"{"createdAt":"2024-01-01"}"#),
                ],
            ),
            NormalizeContext::default(),
        );
        assert_eq!(visit.created_at.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn payload_fields_pass_through() {
        let visit = normalize(
            &loaded(
                "qr:a@x.com:P1:v1",
                &[
                    ("partnerName", "Aqua Park"),
                    ("payload", r#"{"ticketType":"Family","headcount":4,"email":"x@y.z"}"#),
                ],
            ),
            NormalizeContext::default(),
        );
        assert_eq!(visit.details.get("ticketType"), Some(&json!("Family")));
        assert_eq!(visit.details.get("headcount"), Some(&json!(4)));
        assert_eq!(visit.details.get("partnerName"), Some(&json!("Aqua Park")));
        assert!(!visit.details.contains_key("email"));
        assert!(!visit.details.contains_key("payload"));
        assert_eq!(visit.email, "x@y.z");
        assert_eq!(visit.ticket_type(), Some("Family"));
    }

    #[test]
    fn serialized_visit_is_flat_camel_case() {
        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("payload", r#"{"ticketType":"VIP"}"#)]),
            NormalizeContext::default(),
        );
        let Ok(json) = serde_json::to_value(&visit) else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("partnerId"), Some(&json!("P1")));
        assert_eq!(json.get("ticketType"), Some(&json!("VIP")));
        assert_eq!(
            json.get("payload").and_then(|p| p.get("ticketType")),
            Some(&json!("VIP"))
        );
    }

    #[test]
    fn legacy_and_current_merge_into_one_visit() {
        let current = loaded(
            "qr:a@x.com:P1:v1",
            &[("visited", "true"), ("visitedAt", "2024-01-01")],
        );
        let legacy = loaded("qr:email:a@x.com", &[("totalPrice", "100")]);

        let visit = merge_legacy_into_current(&current, &legacy, NormalizeContext::default());
        assert!((visit.total_price - 100.0).abs() < f64::EPSILON);
        assert!(visit.visited);
        assert_eq!(visit.visit_id.as_deref(), Some("v1"));
        assert_eq!(visit.source_key, "qr:a@x.com:P1:v1");
    }

    #[test]
    fn bonus_redemption_is_case_sensitive() {
        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("payload", r#"{"ticketType":"BonusReward"}"#)]),
            NormalizeContext::default(),
        );
        assert!(visit.is_bonus_redemption());

        let visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("payload", r#"{"ticketType":"bonusreward"}"#)]),
            NormalizeContext::default(),
        );
        assert!(!visit.is_bonus_redemption());
    }

    #[test]
    fn partner_label_checks_details_then_payload() {
        let mut visit = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("payload", r#"{"attractionName":"Zoo"}"#)]),
            NormalizeContext::default(),
        );
        assert_eq!(visit.partner_label().as_deref(), Some("Zoo"));

        visit.details.clear();
        assert_eq!(visit.partner_label().as_deref(), Some("Zoo"));

        visit.payload.clear();
        assert_eq!(visit.partner_label(), None);
    }

    #[test]
    fn identity_ignores_case_and_falls_back_to_created_at() {
        let a = normalize(&loaded("qr:A@x.com:P1:V1", &[]), NormalizeContext::default());
        let b = normalize(&loaded("qr:a@x.com:p1:v1", &[]), NormalizeContext::default());
        assert_eq!(a.identity(), b.identity());

        let c = normalize(
            &loaded("qr:email:a@x.com", &[("createdAt", "2024-01-01")]),
            NormalizeContext {
                normalized_id: Some("p1"),
                raw_id: Some("P1"),
            },
        );
        let d = normalize(
            &loaded("qr:email:a@x.com", &[("createdAt", "2024-02-01")]),
            NormalizeContext {
                normalized_id: Some("p1"),
                raw_id: Some("P1"),
            },
        );
        assert_ne!(c.identity(), d.identity());
    }

    #[test]
    fn absorb_fills_missing_fields_only() {
        let mut first = normalize(
            &loaded("qr:a@x.com:P1:v1", &[("status", "visited")]),
            NormalizeContext::default(),
        );
        let second = normalize(
            &loaded(
                "qr:a@x.com:p1:v1",
                &[
                    ("status", "registered"),
                    ("totalPrice", "40"),
                    ("payload", r#"{"headcount":3}"#),
                ],
            ),
            NormalizeContext::default(),
        );
        first.absorb(&second);
        assert_eq!(first.status.as_deref(), Some("visited"));
        assert!((first.total_price - 40.0).abs() < f64::EPSILON);
        assert_eq!(first.details.get("headcount"), Some(&json!(3)));
        assert_eq!(first.partner_id, "P1");
    }
}

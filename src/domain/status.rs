//! Status vocabulary for stored visit records.
//!
//! Records mark consumption and confirmation through several loosely
//! typed fields (`used`, `status`, ...). [`RawStatus`] maps each literal
//! to two independent flags. The vocabularies overlap on purpose:
//! `completed` and `redeemed` mark a visit both used and visited.

/// Literals that mark a visit's reward or ticket as consumed.
pub const USED_LITERALS: &[&str] = &[
    "true", "used", "redeemed", "completed", "yes", "awarded", "1",
];

/// Literals that mark a visit as confirmed by the partner.
pub const VISITED_LITERALS: &[&str] = &[
    "true",
    "visited",
    "completed",
    "redeemed",
    "checkedin",
    "checked-in",
    "checked_in",
    "approved",
    "yes",
    "1",
];

/// Whether a visit's reward has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsedFlag {
    /// Reward or ticket consumed.
    Used,
    /// Not consumed yet.
    #[default]
    NotUsed,
}

/// Whether the partner confirmed the customer's physical visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitedFlag {
    /// Visit confirmed.
    Visited,
    /// Not confirmed yet.
    #[default]
    NotVisited,
}

/// Pair of status flags derived from one or more raw status literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawStatus {
    /// Consumption flag.
    pub used: UsedFlag,
    /// Confirmation flag.
    pub visited: VisitedFlag,
}

impl RawStatus {
    /// Parses a single literal (trimmed, case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let literal = raw.trim().to_lowercase();
        let used = if USED_LITERALS.contains(&literal.as_str()) {
            UsedFlag::Used
        } else {
            UsedFlag::NotUsed
        };
        let visited = if VISITED_LITERALS.contains(&literal.as_str()) {
            VisitedFlag::Visited
        } else {
            VisitedFlag::NotVisited
        };
        Self { used, visited }
    }

    /// Combines several candidate literals: a flag is set if any
    /// candidate sets it.
    #[must_use]
    pub fn from_candidates<'a, I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .map(Self::parse)
            .fold(Self::default(), Self::union)
    }

    /// Flag-wise OR of two statuses.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let used = if self.is_used() || other.is_used() {
            UsedFlag::Used
        } else {
            UsedFlag::NotUsed
        };
        let visited = if self.is_visited() || other.is_visited() {
            VisitedFlag::Visited
        } else {
            VisitedFlag::NotVisited
        };
        Self { used, visited }
    }

    /// Marks the status visited regardless of the literals seen.
    #[must_use]
    pub fn with_visited(self) -> Self {
        Self {
            visited: VisitedFlag::Visited,
            ..self
        }
    }

    /// Returns `true` if the reward was consumed.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.used == UsedFlag::Used
    }

    /// Returns `true` if the visit was confirmed.
    #[must_use]
    pub fn is_visited(&self) -> bool {
        self.visited == VisitedFlag::Visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_only_literals() {
        for literal in ["used", "awarded", "USED", " Awarded "] {
            let status = RawStatus::parse(literal);
            assert!(status.is_used(), "{literal}");
            assert!(!status.is_visited(), "{literal}");
        }
    }

    #[test]
    fn visited_only_literals() {
        for literal in ["visited", "checkedin", "Checked-In", "checked_in", "approved"] {
            let status = RawStatus::parse(literal);
            assert!(status.is_visited(), "{literal}");
            assert!(!status.is_used(), "{literal}");
        }
    }

    #[test]
    fn overlapping_literals_set_both() {
        for literal in ["completed", "redeemed", "true", "yes", "1"] {
            let status = RawStatus::parse(literal);
            assert!(status.is_used(), "{literal}");
            assert!(status.is_visited(), "{literal}");
        }
    }

    #[test]
    fn unknown_literals_set_nothing() {
        for literal in ["", "pending", "false", "0", "no", "registered"] {
            assert_eq!(RawStatus::parse(literal), RawStatus::default(), "{literal}");
        }
    }

    #[test]
    fn candidates_are_or_combined() {
        let status = RawStatus::from_candidates(["pending", "used", "checked-in"]);
        assert!(status.is_used());
        assert!(status.is_visited());

        let none = RawStatus::from_candidates(std::iter::empty());
        assert_eq!(none, RawStatus::default());
    }

    #[test]
    fn with_visited_keeps_used_flag() {
        let status = RawStatus::parse("used").with_visited();
        assert!(status.is_used());
        assert!(status.is_visited());
    }
}

//! Reward catalog offered in exchange for points.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A reward a customer can redeem points for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in points.
    pub cost: f64,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered set of rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardCatalog {
    rewards: Vec<Reward>,
}

impl RewardCatalog {
    /// Creates a catalog from explicit entries, ordered by cost.
    #[must_use]
    pub fn new(mut rewards: Vec<Reward>) -> Self {
        rewards.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        Self { rewards }
    }

    /// Parses a catalog from a JSON array of rewards.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if the input is not a
    /// valid reward array.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Vec<Reward>>(raw).map(Self::new)
    }

    /// All rewards, cheapest first.
    #[must_use]
    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    /// Rewards whose cost does not exceed `balance`.
    #[must_use]
    pub fn available_for(&self, balance: f64) -> Vec<Reward> {
        self.rewards
            .iter()
            .filter(|reward| reward.cost <= balance)
            .cloned()
            .collect()
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::new(vec![
            reward("coffee", "Free coffee", 50.0, "One hot drink at a participating venue"),
            reward("discount-10", "10% discount", 100.0, "10% off the next ticket"),
            reward("free-entry", "Free entry", 250.0, "One free single entry ticket"),
            reward("family-pass", "Family pass", 600.0, "Entry for up to four people"),
        ])
    }
}

fn reward(id: &str, name: &str, cost: f64, description: &str) -> Reward {
    Reward {
        id: id.to_string(),
        name: name.to_string(),
        cost,
        description: Some(description.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_sorted_by_cost() {
        let catalog = RewardCatalog::default();
        let costs: Vec<f64> = catalog.rewards().iter().map(|r| r.cost).collect();
        let mut sorted = costs.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(costs, sorted);
        assert!(!costs.is_empty());
    }

    #[test]
    fn available_for_respects_balance() {
        let catalog = RewardCatalog::default();
        assert!(catalog.available_for(0.0).is_empty());

        let affordable = catalog.available_for(100.0);
        let ids: Vec<&str> = affordable.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["coffee", "discount-10"]);
    }

    #[test]
    fn parses_catalog_from_json() {
        let catalog =
            RewardCatalog::from_json(r#"[{"id":"b","name":"B","cost":20},{"id":"a","name":"A","cost":5}]"#);
        let Ok(catalog) = catalog else {
            panic!("catalog should parse");
        };
        assert_eq!(catalog.rewards().len(), 2);
        assert_eq!(catalog.rewards().first().map(|r| r.id.as_str()), Some("a"));
        assert!(RewardCatalog::from_json("{}").is_err());
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakdownEntry {
    pub key: String,
    #[schema(value_type = String, example = "7.50")]
    pub amount: Money,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "7.5")]
    pub rate: Option<Decimal>,
}

/// Adjustments between subtotal and total, in the order stages added them.
///
/// Serialised as a JSON array so the order survives a round trip through
/// the `orders.pricing_breakdown` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Breakdown(Vec<BreakdownEntry>);

impl Breakdown {
    /// Inserts under `key`; an existing entry is replaced where it stands.
    pub fn insert(
        &mut self,
        key: &str,
        amount: Money,
        label: impl Into<String>,
    ) -> &mut BreakdownEntry {
        let entry = BreakdownEntry {
            key: key.to_string(),
            amount,
            label: label.into(),
            rate: None,
        };
        let idx = match self.0.iter().position(|e| e.key == key) {
            Some(idx) => {
                self.0[idx] = entry;
                idx
            }
            None => {
                self.0.push(entry);
                self.0.len() - 1
            }
        };
        &mut self.0[idx]
    }

    pub fn get(&self, key: &str) -> Option<&BreakdownEntry> {
        self.0.iter().find(|e| e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreakdownEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> Money {
        self.0.iter().map(|e| e.amount).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PricingResult {
    #[schema(value_type = String, example = "100.00")]
    pub subtotal: Money,
    pub breakdown: Breakdown,
    #[schema(value_type = String, example = "107.50")]
    pub total: Money,
}

impl PricingResult {
    pub fn add_breakdown(
        &mut self,
        key: &str,
        amount: Money,
        label: impl Into<String>,
    ) -> &mut BreakdownEntry {
        self.breakdown.insert(key, amount, label)
    }

    pub fn vat(&self) -> Option<&BreakdownEntry> {
        self.breakdown.get("vat")
    }

    /// `total == subtotal + Σ breakdown`.
    pub fn is_balanced(&self) -> bool {
        self.subtotal + self.breakdown.sum() == self.total
    }
}

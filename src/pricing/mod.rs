//! Order pricing as an ordered chain of stages over a [`PricingResult`].
//!
//! Stage order is fixed (subtotal, VAT, then an optional discount); the
//! calculator only decides which optional stages take part.

pub mod result;
pub mod stages;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{Money, MoneyError};

pub use result::{Breakdown, BreakdownEntry, PricingResult};
pub use stages::{DiscountStage, SubtotalStage, VatStage};

pub trait PricingStage: Send + Sync {
    fn apply(&self, pricing: PricingResult) -> Result<PricingResult, MoneyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Money,
    pub quantity: i32,
}

impl PricedLine {
    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Default)]
pub struct PricingPipeline<'a> {
    stages: Vec<Box<dyn PricingStage + 'a>>,
}

impl<'a> PricingPipeline<'a> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn through(mut self, stage: impl PricingStage + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn run(&self) -> Result<PricingResult, MoneyError> {
        let mut pricing = PricingResult::default();
        for stage in &self.stages {
            pricing = stage.apply(pricing)?;
        }
        Ok(pricing)
    }
}

/// A VAT percentage such as `7.5`, at most two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct VatRate(Decimal);

impl VatRate {
    pub fn new(percent: Decimal) -> Result<Self, MoneyError> {
        if percent.is_sign_negative() || percent.normalize().scale() > 2 {
            return Err(MoneyError::InvalidFormat(percent.to_string()));
        }
        Ok(Self(percent.normalize()))
    }

    /// `750` → `7.5%`.
    pub fn from_basis_points(bps: i32) -> Self {
        Self(Decimal::new(i64::from(bps), 2).normalize())
    }

    pub fn basis_points(self) -> i32 {
        let mut scaled = self.0;
        scaled.rescale(2);
        // Constructor caps scale at two places, so the mantissa fits easily.
        i32::try_from(scaled.mantissa()).unwrap_or(i32::MAX)
    }

    pub fn percent(self) -> Decimal {
        self.0
    }
}

impl Default for VatRate {
    fn default() -> Self {
        Self::from_basis_points(750)
    }
}

impl fmt::Display for VatRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VatRate {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str_exact(trimmed)
            .map_err(|_| MoneyError::InvalidFormat(trimmed.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for VatRate {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VatRate> for Decimal {
    fn from(rate: VatRate) -> Self {
        rate.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDiscount {
    pub amount: Money,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct PriceCalculator {
    default_vat: VatRate,
    discount: Option<FixedDiscount>,
}

impl PriceCalculator {
    pub fn new(default_vat: VatRate) -> Self {
        Self {
            default_vat,
            discount: None,
        }
    }

    pub fn with_discount(mut self, discount: Option<FixedDiscount>) -> Self {
        self.discount = discount;
        self
    }

    pub fn default_vat(&self) -> VatRate {
        self.default_vat
    }

    pub fn calculate_order_pricing(
        &self,
        lines: &[PricedLine],
        vat_rate: Option<VatRate>,
    ) -> Result<PricingResult, MoneyError> {
        let rate = vat_rate.unwrap_or(self.default_vat);
        let mut pipeline = PricingPipeline::new()
            .through(SubtotalStage::new(lines))
            .through(VatStage::new(rate));
        if let Some(discount) = &self.discount {
            pipeline = pipeline.through(DiscountStage::new(discount.amount, discount.label.clone()));
        }
        pipeline.run()
    }
}

use rust_decimal::Decimal;

use crate::money::{self, Money, MoneyError};

use super::{PricedLine, PricingResult, PricingStage, VatRate};

pub const VAT_KEY: &str = "vat";
pub const DISCOUNT_KEY: &str = "discount";

/// Sums `unit_price × quantity` per line, each line rounded before summing.
#[derive(Debug)]
pub struct SubtotalStage<'a> {
    lines: &'a [PricedLine],
}

impl<'a> SubtotalStage<'a> {
    pub fn new(lines: &'a [PricedLine]) -> Self {
        Self { lines }
    }
}

impl PricingStage for SubtotalStage<'_> {
    fn apply(&self, mut pricing: PricingResult) -> Result<PricingResult, MoneyError> {
        let mut subtotal = Money::ZERO;
        for line in self.lines {
            subtotal = subtotal.checked_add(line.line_total()?)?;
        }
        pricing.subtotal = subtotal;
        pricing.total = subtotal;
        Ok(pricing)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VatStage {
    rate: VatRate,
}

impl VatStage {
    pub fn new(rate: VatRate) -> Self {
        Self { rate }
    }
}

impl PricingStage for VatStage {
    fn apply(&self, mut pricing: PricingResult) -> Result<PricingResult, MoneyError> {
        let fraction = money::divide(self.rate.percent(), Decimal::ONE_HUNDRED, 4)?;
        let vat = pricing.subtotal.multiply(fraction)?;

        pricing
            .add_breakdown(VAT_KEY, vat, format!("VAT ({}%)", self.rate))
            .rate = Some(self.rate.percent().normalize());
        pricing.total = pricing.total.checked_add(vat)?;
        Ok(pricing)
    }
}

/// Fixed amount off the total, recorded as a negative adjustment. Never takes
/// the total below zero.
#[derive(Debug, Clone)]
pub struct DiscountStage {
    amount: Money,
    label: String,
}

impl DiscountStage {
    pub fn new(amount: Money, label: impl Into<String>) -> Self {
        Self {
            amount,
            label: label.into(),
        }
    }
}

impl PricingStage for DiscountStage {
    fn apply(&self, mut pricing: PricingResult) -> Result<PricingResult, MoneyError> {
        let applied = self.amount.clamp(Money::ZERO, pricing.total.max(Money::ZERO));
        let adjustment = -applied;
        pricing.add_breakdown(DISCOUNT_KEY, adjustment, self.label.clone());
        pricing.total = pricing.total.checked_add(adjustment)?;
        Ok(pricing)
    }
}

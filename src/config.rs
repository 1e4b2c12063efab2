use std::env;

use anyhow::Context;

use crate::entity::OrderStatus;
use crate::money::Money;
use crate::pricing::{FixedDiscount, VatRate};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_email: Option<String>,
    pub checkout: CheckoutSettings,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub vat_rate: VatRate,
    pub low_stock_threshold: i32,
    pub initial_status: OrderStatus,
    /// Whole-transaction attempts when the database reports a lock conflict.
    pub max_attempts: u32,
    pub order_number_attempts: u32,
    pub discount: Option<FixedDiscount>,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            vat_rate: VatRate::default(),
            low_stock_threshold: 10,
            initial_status: OrderStatus::Completed,
            max_attempts: 3,
            order_number_attempts: 10,
            discount: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let admin_email = env::var("ADMIN_EMAIL").ok().filter(|e| !e.trim().is_empty());
        Ok(Self {
            port,
            database_url,
            host,
            admin_email,
            checkout: CheckoutSettings::from_env()?,
        })
    }
}

impl CheckoutSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let vat_rate = match env::var("VAT_RATE") {
            Ok(raw) => raw
                .parse::<VatRate>()
                .with_context(|| format!("VAT_RATE '{raw}' is not a valid percentage"))?,
            Err(_) => defaults.vat_rate,
        };
        let initial_status = match env::var("ORDER_INITIAL_STATUS") {
            Ok(raw) => raw.parse::<OrderStatus>().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.initial_status,
        };
        let discount = match env::var("DISCOUNT_AMOUNT") {
            Ok(raw) => Some(parse_discount(&raw, env::var("DISCOUNT_LABEL").ok())?),
            Err(_) => None,
        };

        Ok(Self {
            vat_rate,
            low_stock_threshold: parse_or("LOW_STOCK_THRESHOLD", defaults.low_stock_threshold),
            initial_status,
            max_attempts: parse_or("CHECKOUT_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            order_number_attempts: parse_or(
                "ORDER_NUMBER_MAX_ATTEMPTS",
                defaults.order_number_attempts,
            )
            .max(1),
            discount,
        })
    }
}

fn parse_discount(raw: &str, label: Option<String>) -> anyhow::Result<FixedDiscount> {
    let amount = raw
        .parse::<Money>()
        .with_context(|| format!("DISCOUNT_AMOUNT '{raw}' is not a valid amount"))?;
    anyhow::ensure!(
        !amount.is_negative(),
        "DISCOUNT_AMOUNT '{raw}' must not be negative"
    );
    Ok(FixedDiscount {
        amount,
        label: label.unwrap_or_else(|| "Discount".to_string()),
    })
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

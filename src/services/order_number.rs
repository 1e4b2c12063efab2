use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;

use crate::error::{AppError, AppResult};

const PREFIX: &str = "ORD";

type SuffixSource = Arc<dyn Fn() -> u16 + Send + Sync>;

/// Random `ORD-YYYYMMDD-NNNN` numbers, made unique by the caller's storage.
///
/// Uniqueness is never decided here: the claim callback tries to persist a
/// candidate and reports a collision by returning `Ok(None)`.
#[derive(Clone)]
pub struct OrderNumberGenerator {
    max_attempts: u32,
    suffixes: SuffixSource,
}

impl fmt::Debug for OrderNumberGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNumberGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl OrderNumberGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            suffixes: Arc::new(random_suffix),
        }
    }

    /// Replaces the random suffix source; values must lie in `1..=9999`.
    pub fn with_suffixes(mut self, source: impl Fn() -> u16 + Send + Sync + 'static) -> Self {
        self.suffixes = Arc::new(source);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn format(date: NaiveDate, suffix: u16) -> String {
        format!("{PREFIX}-{}-{suffix:04}", date.format("%Y%m%d"))
    }

    pub fn candidate(&self, date: NaiveDate) -> String {
        Self::format(date, (self.suffixes)())
    }

    pub async fn reserve<T, F, Fut>(&self, date: NaiveDate, mut claim: F) -> AppResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = AppResult<Option<T>>>,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate(date);
            if let Some(claimed) = claim(candidate.clone()).await? {
                return Ok(claimed);
            }
            tracing::debug!(attempt, order_number = %candidate, "order number taken, retrying");
        }

        tracing::error!(attempts = self.max_attempts, "order number space exhausted");
        Err(AppError::OrderNumberGeneration {
            attempts: self.max_attempts,
        })
    }
}

fn random_suffix() -> u16 {
    rand::thread_rng().gen_range(1..=9999)
}

pub fn is_well_formed(order_number: &str) -> bool {
    let mut parts = order_number.split('-');
    let (Some(prefix), Some(date), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == PREFIX
        && date.len() == 8
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && suffix.len() == 4
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && suffix != "0000"
}

//! Currency conversion collaborator. The core only needs `convert`; the rate
//! table implementation here is enough for reporting in the opportunity's
//! default currency, with rate maintenance living outside this crate.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::errors::CurrencyError;

pub trait CurrencyConverter: Send + Sync {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, CurrencyError>;
}

/// Directed rate table with inverse fallback. Same-currency conversion is
/// always the identity and needs no entry.
#[derive(Clone, Debug, Default)]
pub struct RateTable {
    rates: HashMap<(String, String), Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.set_rate(from, to, rate);
        self
    }

    pub fn set_rate(&mut self, from: &str, to: &str, rate: Decimal) {
        self.rates.insert((from.to_string(), to.to_string()), rate);
    }
}

impl CurrencyConverter for RateTable {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, CurrencyError> {
        if from == to {
            return Ok(amount);
        }

        if let Some(rate) = self.rates.get(&(from.to_string(), to.to_string())) {
            return Ok(amount * rate);
        }

        if let Some(inverse) = self.rates.get(&(to.to_string(), from.to_string())) {
            if !inverse.is_zero() {
                return Ok(amount / inverse);
            }
        }

        Err(CurrencyError::MissingRate { from: from.to_string(), to: to.to_string() })
    }
}

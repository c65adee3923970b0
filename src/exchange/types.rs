//! Exchange-level reference data.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

/// Taker fee per pair, as a decimal fraction (0.0065 = 0.65%).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeeSchedule(HashMap<String, Decimal>);

impl FeeSchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the taker fee for a pair.
    pub fn insert(&mut self, pair: impl Into<String>, taker_fee: Decimal) {
        self.0.insert(pair.into(), taker_fee);
    }

    /// Taker fee for a pair.
    pub fn taker_fee(&self, pair: &str) -> Option<Decimal> {
        self.0.get(pair).copied()
    }

    /// Number of pairs in the schedule.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the schedule is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for FeeSchedule {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut fees = FeeSchedule::new();
        for (pair, fee) in iter {
            fees.insert(pair, fee);
        }
        fees
    }
}

/// Exchange-declared trade size bounds for a pair, in base asset units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookLimits {
    /// Smallest accepted amount.
    pub minimum_amount: Decimal,
    /// Largest accepted amount.
    pub maximum_amount: Decimal,
}

impl BookLimits {
    /// Create new limits.
    pub fn new(minimum_amount: Decimal, maximum_amount: Decimal) -> Self {
        Self {
            minimum_amount,
            maximum_amount,
        }
    }
}

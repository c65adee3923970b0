//! Account balances.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

/// Available balance per asset, as last reported by the exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Balances(HashMap<String, Decimal>);

impl Balances {
    /// Create an empty balance set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the available amount for an asset.
    pub fn insert(&mut self, asset: impl Into<String>, available: Decimal) {
        self.0.insert(asset.into().to_lowercase(), available);
    }

    /// Available amount for an asset, zero when the exchange omitted it.
    pub fn available(&self, asset: &str) -> Decimal {
        self.0
            .get(&asset.to_lowercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Keep only the given assets.
    pub fn retain_assets(&mut self, assets: &[String]) {
        self.0.retain(|asset, _| assets.iter().any(|a| a == asset));
    }

    /// Number of assets reported.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no asset was reported.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (asset, available) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for Balances {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        let mut balances = Balances::new();
        for (asset, available) in iter {
            balances.insert(asset, available);
        }
        balances
    }
}

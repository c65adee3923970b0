//! Trading pair and triangle types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of legs in a triangular trade.
pub const LEGS: usize = 3;

/// A trading pair in exchange form, e.g. `eth_btc` (base `eth`, quote `btc`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingPair {
    /// Exchange identifier (`base_quote`).
    pub id: String,
    /// Base asset.
    pub base: String,
    /// Quote asset.
    pub quote: String,
}

impl TradingPair {
    /// Build a pair from its base and quote assets.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        let base = base.into().to_lowercase();
        let quote = quote.into().to_lowercase();
        Self {
            id: format!("{}_{}", base, quote),
            base,
            quote,
        }
    }

    /// Whether the pair trades the given asset on either side.
    pub fn contains(&self, asset: &str) -> bool {
        self.base == asset || self.quote == asset
    }

    /// The asset on the other side of `asset`, if the pair contains it.
    pub fn counter_asset(&self, asset: &str) -> Option<&str> {
        if self.base == asset {
            Some(&self.quote)
        } else if self.quote == asset {
            Some(&self.base)
        } else {
            None
        }
    }
}

impl FromStr for TradingPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.split_once('_') {
            Some((base, quote))
                if !base.is_empty() && !quote.is_empty() && !quote.contains('_') =>
            {
                if base == quote {
                    return Err(format!("pair {} trades an asset against itself", s));
                }
                Ok(TradingPair::new(base, quote))
            }
            _ => Err(format!("pair {} is not of the form base_quote", s)),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// The configured triangle: three pairs over three assets.
///
/// Every asset appears in exactly two of the three pairs, so any two pairs
/// share exactly one asset. The asset shared by pair A and pair C is the
/// *anchor*: both routes start and end in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triangle {
    pairs: [TradingPair; LEGS],
    assets: [String; LEGS],
}

impl Triangle {
    /// Build and validate a triangle from pair and asset identifiers.
    pub fn new(pairs: [&str; LEGS], assets: [&str; LEGS]) -> Result<Self, String> {
        let pairs = [
            pairs[0].parse::<TradingPair>()?,
            pairs[1].parse::<TradingPair>()?,
            pairs[2].parse::<TradingPair>()?,
        ];
        let assets = assets.map(|a| a.trim().to_lowercase());

        for (i, asset) in assets.iter().enumerate() {
            if asset.is_empty() {
                return Err("asset identifiers must not be empty".to_string());
            }
            if assets[..i].contains(asset) {
                return Err(format!("asset {} configured twice", asset));
            }
        }

        for (i, pair) in pairs.iter().enumerate() {
            if pairs[..i].contains(pair) {
                return Err(format!("pair {} configured twice", pair));
            }
            for side in [&pair.base, &pair.quote] {
                if !assets.contains(side) {
                    return Err(format!(
                        "pair {} trades {} which is not one of the configured assets",
                        pair, side
                    ));
                }
            }
        }

        for asset in &assets {
            let count = pairs.iter().filter(|p| p.contains(asset)).count();
            if count != 2 {
                return Err(format!(
                    "asset {} appears in {} pairs, a closed triangle needs 2",
                    asset, count
                ));
            }
        }

        Ok(Self { pairs, assets })
    }

    /// Pairs in configured order (A, B, C).
    pub fn pairs(&self) -> &[TradingPair; LEGS] {
        &self.pairs
    }

    /// Assets in configured order (A, B, C).
    pub fn assets(&self) -> &[String; LEGS] {
        &self.assets
    }

    /// Pair identifiers in configured order.
    pub fn pair_ids(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.id.clone()).collect()
    }

    /// Asset shared by pair A and pair C.
    pub fn anchor(&self) -> &str {
        let (a, c) = (&self.pairs[0], &self.pairs[2]);
        if c.contains(&a.base) {
            &a.base
        } else {
            &a.quote
        }
    }

    /// Short label such as `eth_mxn/eth_btc/btc_mxn`.
    pub fn label(&self) -> String {
        self.pair_ids().join("/")
    }
}

//! Linear price-impact model.
//!
//! The only slippage model the engine provides: a per-symbol dimensionless
//! coefficient `k` worsens the fill price linearly in traded quantity,
//! `reference * (1 + k*qty)` for buys and `reference * (1 - k*qty)` for
//! sells. `k = 0` (the default for unconfigured symbols) fills exactly at
//! the reference price.

use crate::domain::Side;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SlippageTable {
    coeffs: BTreeMap<String, f64>,
}

impl SlippageTable {
    pub fn new(coeffs: BTreeMap<String, f64>) -> Self {
        Self { coeffs }
    }

    /// Linear coefficient for a symbol; 0 when unconfigured.
    pub fn coeff(&self, symbol: &str) -> f64 {
        self.coeffs.get(symbol).copied().unwrap_or(0.0)
    }

    /// Worsen the reference price by the symbol's impact for this quantity.
    pub fn fill_price(&self, symbol: &str, side: Side, reference: f64, quantity: u64) -> f64 {
        let impact = self.coeff(symbol) * quantity as f64;
        match side {
            Side::Buy => reference * (1.0 + impact),
            Side::Sell => reference * (1.0 - impact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SlippageTable {
        SlippageTable::new(BTreeMap::from([("TEST".to_string(), 0.001)]))
    }

    #[test]
    fn buy_impact_worsens_upward() {
        // 50 * (1 + 0.001 * 100) = 55
        assert_eq!(table().fill_price("TEST", Side::Buy, 50.0, 100), 55.0);
    }

    #[test]
    fn sell_impact_worsens_downward() {
        assert_eq!(table().fill_price("TEST", Side::Sell, 50.0, 100), 45.0);
    }

    #[test]
    fn unconfigured_symbol_fills_at_reference() {
        assert_eq!(table().fill_price("OTHER", Side::Buy, 50.0, 1_000_000), 50.0);
        assert_eq!(table().coeff("OTHER"), 0.0);
    }
}

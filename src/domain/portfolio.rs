//! Portfolio of held positions and its valuation.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use super::error::AutotraderError;
use super::position::{AssetType, Position, NewPosition};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    pub account_number: Option<String>,
    pub positions: BTreeMap<String, Position>,
    pub market_value: f64,
    pub profit_loss: f64,
    pub risk_tolerance: f64,
}

/// Snapshot of the portfolio valuation at a set of prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub positions_count: usize,
    pub market_value: f64,
    pub profit_loss: f64,
    pub allocation: BTreeMap<AssetType, f64>,
    pub risk_exposure: Vec<(String, f64)>,
}

impl Portfolio {
    pub fn new(account_number: Option<String>) -> Self {
        Portfolio {
            account_number,
            ..Default::default()
        }
    }

    pub fn add_position(
        &mut self,
        symbol: &str,
        asset_type: AssetType,
        quantity: i64,
        purchase_price: f64,
        purchase_date: Option<NaiveDate>,
    ) -> &Position {
        let position = Position {
            symbol: symbol.to_string(),
            asset_type,
            quantity,
            purchase_price,
            purchase_date,
        };
        self.positions.insert(symbol.to_string(), position);
        &self.positions[symbol]
    }

    pub fn add_positions(&mut self, positions: Vec<NewPosition>) -> &BTreeMap<String, Position> {
        for new in positions {
            self.add_position(
                &new.symbol,
                new.asset_type,
                new.quantity,
                new.purchase_price,
                new.purchase_date,
            );
        }
        &self.positions
    }

    pub fn remove_position(&mut self, symbol: &str) -> Result<Position, AutotraderError> {
        let removed = self
            .positions
            .remove(symbol)
            .ok_or_else(|| AutotraderError::UnknownSymbol {
                symbol: symbol.to_string(),
            })?;
        info!("{symbol} was successfully removed");
        Ok(removed)
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn in_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn positions_count(&self) -> usize {
        self.positions.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    /// `None` when the symbol is not held; a flat position counts as profitable.
    pub fn is_profitable(&self, symbol: &str, current_price: f64) -> Option<bool> {
        self.positions
            .get(symbol)
            .map(|pos| pos.purchase_price <= current_price)
    }

    /// Share of total cost basis per asset type.
    pub fn total_allocation(&self) -> BTreeMap<AssetType, f64> {
        let total: f64 = self.positions.values().map(Position::cost_basis).sum();
        if total == 0.0 {
            return BTreeMap::new();
        }
        let mut allocation = BTreeMap::new();
        for pos in self.positions.values() {
            *allocation.entry(pos.asset_type).or_insert(0.0) += pos.cost_basis() / total;
        }
        allocation
    }

    fn price_for(pos: &Position, prices: &HashMap<String, f64>) -> f64 {
        prices
            .get(&pos.symbol)
            .copied()
            .unwrap_or(pos.purchase_price)
    }

    /// Sum of `quantity * price`, falling back to the purchase price for
    /// symbols without a quote.
    pub fn total_market_value(&mut self, prices: &HashMap<String, f64>) -> f64 {
        self.market_value = self
            .positions
            .values()
            .map(|pos| pos.market_value(Self::price_for(pos, prices)))
            .sum();
        self.market_value
    }

    pub fn projected_profit_loss(&mut self, prices: &HashMap<String, f64>) -> f64 {
        self.profit_loss = self
            .positions
            .values()
            .map(|pos| pos.unrealized_pnl(Self::price_for(pos, prices)))
            .sum();
        self.profit_loss
    }

    /// Each symbol's share of market value, largest first. The largest share
    /// becomes the portfolio's `risk_tolerance`.
    pub fn risk_exposure(&mut self, prices: &HashMap<String, f64>) -> Vec<(String, f64)> {
        let total = self.total_market_value(prices);
        if total == 0.0 {
            self.risk_tolerance = 0.0;
            return Vec::new();
        }
        let mut exposure: Vec<(String, f64)> = self
            .positions
            .values()
            .map(|pos| {
                (
                    pos.symbol.clone(),
                    pos.market_value(Self::price_for(pos, prices)) / total,
                )
            })
            .collect();
        exposure.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self.risk_tolerance = exposure.first().map(|(_, w)| *w).unwrap_or(0.0);
        exposure
    }

    pub fn summary(&mut self, prices: &HashMap<String, f64>) -> PortfolioSummary {
        let risk_exposure = self.risk_exposure(prices);
        PortfolioSummary {
            positions_count: self.positions_count(),
            market_value: self.market_value,
            profit_loss: self.projected_profit_loss(prices),
            allocation: self.total_allocation(),
            risk_exposure,
        }
    }
}

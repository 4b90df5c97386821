//! Trading robot: ties a broker session to the portfolio, the price frame
//! and registered trades, and turns signals into orders.

use chrono::{DateTime, Duration, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::error::AutotraderError;
use super::market_hours::MarketHours;
use super::order::{OrderResponse, OrderStatus, OrderType};
use super::portfolio::Portfolio;
use super::position::AssetType;
use super::price_bar::{BarType, PriceBar, Quote};
use super::signal::{Signal, SignalAction};
use super::stock_frame::StockFrame;
use super::trade::{NewTrade, Trade};
use crate::ports::broker_port::{BrokerPort, Credentials};

/// Number of bars requested when looking for the latest one.
const LATEST_BAR_LOOKBACK: i32 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub credentials_path: Option<String>,
    pub trading_account: Option<String>,
    pub paper_trading: bool,
}

impl RobotConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            credentials_path: self.credentials_path.clone(),
        }
    }
}

/// Trade ids to place when a symbol fires a buy or sell signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalTrades {
    pub buy: Option<String>,
    pub sell: Option<String>,
}

pub struct Robot {
    config: RobotConfig,
    broker: Box<dyn BrokerPort>,
    pub trades: BTreeMap<String, Trade>,
    pub historical_prices: BTreeMap<String, Vec<PriceBar>>,
    pub stock_frame: Option<StockFrame>,
    pub portfolio: Portfolio,
    pub market_hours: MarketHours,
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("config", &self.config)
            .field("trades", &self.trades.keys().collect::<Vec<_>>())
            .field("portfolio", &self.portfolio)
            .finish_non_exhaustive()
    }
}

impl Robot {
    /// Opens the broker session. Any login failure surfaces as a broker error.
    pub fn new(config: RobotConfig, mut broker: Box<dyn BrokerPort>) -> Result<Self, AutotraderError> {
        broker
            .login(&config.credentials())
            .map_err(|e| match e {
                AutotraderError::Broker { .. } => e,
                other => AutotraderError::Broker {
                    reason: format!("login failed: {other}"),
                },
            })?;
        info!(
            client_id = %config.client_id,
            paper_trading = config.paper_trading,
            "broker session opened"
        );
        let portfolio = Portfolio::new(config.trading_account.clone());
        Ok(Robot {
            config,
            broker,
            trades: BTreeMap::new(),
            historical_prices: BTreeMap::new(),
            stock_frame: None,
            portfolio,
            market_hours: MarketHours::default(),
        })
    }

    pub fn with_market_hours(mut self, market_hours: MarketHours) -> Self {
        self.market_hours = market_hours;
        self
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn pre_market_open(&self) -> bool {
        self.market_hours.pre_market_open(Utc::now())
    }

    pub fn regular_market_open(&self) -> bool {
        self.market_hours.regular_market_open(Utc::now())
    }

    pub fn post_market_open(&self) -> bool {
        self.market_hours.post_market_open(Utc::now())
    }

    /// Replaces the portfolio with an empty one bound to the trading account.
    pub fn create_portfolio(&mut self) -> &mut Portfolio {
        self.portfolio = Portfolio::new(self.config.trading_account.clone());
        &mut self.portfolio
    }

    /// Registers a trade under its id, replacing any trade with the same id.
    pub fn create_trade(&mut self, params: NewTrade) -> Result<&mut Trade, AutotraderError> {
        let trade = Trade::new(params)?;
        let trade = match self.trades.entry(trade.trade_id().to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(trade);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(trade),
        };
        Ok(trade)
    }

    pub fn grab_current_quotes(&self) -> Result<BTreeMap<String, Quote>, AutotraderError> {
        let symbols = self.portfolio.symbols();
        if symbols.is_empty() {
            return Ok(BTreeMap::new());
        }
        self.broker.get_quotes(&symbols)
    }

    fn resolve_symbols(&self, symbols: Option<&[String]>) -> Vec<String> {
        match symbols {
            Some(symbols) => symbols.to_vec(),
            None => self.portfolio.symbols(),
        }
    }

    /// Fetches and stores history for each symbol (the portfolio's when
    /// `symbols` is `None`) and returns every bar.
    pub fn grab_historical_prices(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bar_size: u32,
        bar_type: BarType,
        symbols: Option<&[String]>,
    ) -> Result<Vec<PriceBar>, AutotraderError> {
        let mut all_bars = Vec::new();
        for symbol in self.resolve_symbols(symbols) {
            let bars = self
                .broker
                .get_price_history(&symbol, start, end, bar_size, bar_type)?;
            debug!(symbol = %symbol, bars = bars.len(), "historical prices loaded");
            all_bars.extend(bars.iter().cloned());
            self.historical_prices.insert(symbol, bars);
        }
        info!(
            bars = all_bars.len(),
            symbols = self.historical_prices.len(),
            "historical prices grabbed"
        );
        Ok(all_bars)
    }

    /// Newest bar per symbol over a short window ending at `end`. Symbols
    /// without data in that window are left out.
    pub fn get_latest_bar(
        &self,
        end: DateTime<Utc>,
        bar_size: u32,
        bar_type: BarType,
        symbols: Option<&[String]>,
    ) -> Result<Vec<PriceBar>, AutotraderError> {
        let start = bar_type
            .duration(bar_size)?
            .checked_mul(LATEST_BAR_LOOKBACK)
            .and_then(|window| end.checked_sub_signed(window))
            .ok_or_else(|| {
                AutotraderError::data(format!(
                    "{LATEST_BAR_LOOKBACK} bars of {bar_size} {bar_type} before {end} is out of range"
                ))
            })?;
        let mut latest = Vec::new();
        for symbol in self.resolve_symbols(symbols) {
            let bars = self
                .broker
                .get_price_history(&symbol, start, end, bar_size, bar_type)?;
            match bars.into_iter().last() {
                Some(bar) => latest.push(bar),
                None => debug!(symbol = %symbol, "no recent bar"),
            }
        }
        Ok(latest)
    }

    pub fn create_stock_frame(&mut self, bars: &[PriceBar]) -> &mut StockFrame {
        self.stock_frame.insert(StockFrame::new(bars))
    }

    /// Time left until `last_bar_time + bar_duration`, zero once it has passed.
    pub fn wait_till_next_bar(
        last_bar_time: DateTime<Utc>,
        bar_duration: Duration,
        now: DateTime<Utc>,
    ) -> std::time::Duration {
        let Some(next_bar) = last_bar_time.checked_add_signed(bar_duration) else {
            return std::time::Duration::ZERO;
        };
        if next_bar <= now {
            return std::time::Duration::ZERO;
        }
        (next_bar - now).to_std().unwrap_or(std::time::Duration::ZERO)
    }

    /// Buys on a buy signal when flat and sells on a sell signal when held.
    /// Returns the responses for the orders that were placed.
    pub fn execute_signals(
        &mut self,
        signals: &[Signal],
        trades_to_execute: &BTreeMap<String, SignalTrades>,
    ) -> Result<Vec<OrderResponse>, AutotraderError> {
        let mut responses = Vec::new();
        for signal in signals {
            let Some(plan) = trades_to_execute.get(&signal.symbol) else {
                debug!(symbol = %signal.symbol, "no trades configured, skipping signal");
                continue;
            };
            let held = self.portfolio.in_position(&signal.symbol);
            match signal.action {
                SignalAction::Buy => {
                    let Some(trade_id) = plan.buy.as_deref() else {
                        debug!(symbol = %signal.symbol, "no buy trade configured");
                        continue;
                    };
                    if held {
                        debug!(symbol = %signal.symbol, "already in position, skipping buy");
                        continue;
                    }
                    let response = self.submit(trade_id, signal)?;
                    let asset_type = self.trades[trade_id]
                        .asset_type()
                        .unwrap_or(AssetType::Equity);
                    self.portfolio.add_position(
                        &response.symbol,
                        asset_type,
                        response.quantity,
                        response.fill_price.unwrap_or(signal.close),
                        Some(response.entered_time.date_naive()),
                    );
                    responses.push(response);
                }
                SignalAction::Sell => {
                    let Some(trade_id) = plan.sell.as_deref() else {
                        debug!(symbol = %signal.symbol, "no sell trade configured");
                        continue;
                    };
                    if !held {
                        debug!(symbol = %signal.symbol, "not in position, skipping sell");
                        continue;
                    }
                    let response = self.submit(trade_id, signal)?;
                    self.portfolio.remove_position(&signal.symbol)?;
                    responses.push(response);
                }
            }
        }
        Ok(responses)
    }

    fn submit(&mut self, trade_id: &str, signal: &Signal) -> Result<OrderResponse, AutotraderError> {
        let trade = self.trades.get(trade_id).ok_or_else(|| {
            AutotraderError::invalid_order(format!("no trade registered under '{trade_id}'"))
        })?;
        let symbol = trade.symbol().ok_or_else(|| AutotraderError::TradeNotReady {
            reason: format!("trade '{trade_id}' has no instrument"),
        })?;
        if symbol != signal.symbol {
            warn!(
                trade_id,
                trade_symbol = symbol,
                signal_symbol = %signal.symbol,
                "trade symbol differs from signal symbol"
            );
        }

        let account = self.config.trading_account.clone().unwrap_or_default();
        let response = if self.config.paper_trading {
            simulated_fill(trade, &account, signal.close, Utc::now())
        } else {
            if account.is_empty() {
                return Err(AutotraderError::Broker {
                    reason: "live orders need a trading account".into(),
                });
            }
            self.broker.place_order(&account, trade.order())?
        };
        info!(
            trade_id,
            order_id = %response.order_id,
            symbol = %response.symbol,
            quantity = response.quantity,
            fill_price = ?response.fill_price,
            simulated = response.simulated,
            "order placed"
        );
        if let Some(trade) = self.trades.get_mut(trade_id) {
            trade.set_order_response(response.clone());
        }
        Ok(response)
    }

    /// Writes every recorded order response, keyed by trade id, as JSON.
    pub fn save_orders(&self, path: &Path) -> Result<(), AutotraderError> {
        let responses: BTreeMap<&str, &OrderResponse> = self
            .trades
            .iter()
            .filter_map(|(id, trade)| trade.order_response().map(|r| (id.as_str(), r)))
            .collect();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&responses)?)?;
        info!(path = %path.display(), orders = responses.len(), "orders saved");
        Ok(())
    }
}

/// FILLED response for a paper trade. Market orders (or trades without a
/// price) fill at `last_close`, everything else at the trade price.
fn simulated_fill(trade: &Trade, account: &str, last_close: f64, now: DateTime<Utc>) -> OrderResponse {
    let fill_price = if trade.order_type() == OrderType::Market || trade.price() <= 0.0 {
        last_close
    } else {
        trade.price()
    };
    let leg = trade.order().order_leg_collection.first();
    OrderResponse {
        order_id: trade.generate_order_id(now),
        account: account.to_string(),
        status: OrderStatus::Filled,
        symbol: trade.symbol().unwrap_or_default().to_string(),
        instruction: leg
            .map(|l| l.instruction)
            .unwrap_or(super::order::Instruction::Buy),
        quantity: trade.order_size(),
        fill_price: Some(fill_price),
        entered_time: now,
        simulated: true,
    }
}

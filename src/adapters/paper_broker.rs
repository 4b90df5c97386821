//! Offline broker that answers from stored price history and fills every
//! order immediately.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::domain::error::AutotraderError;
use crate::domain::order::{Order, OrderResponse, OrderStatus, OrderType};
use crate::domain::price_bar::{BarType, PriceBar, Quote};
use crate::ports::broker_port::{BrokerPort, Credentials};
use crate::ports::data_port::DataPort;

/// A placed order and the fill it received.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFill {
    pub order: Order,
    pub response: OrderResponse,
}

pub struct PaperBroker<D: DataPort> {
    data: D,
    logged_in: bool,
    next_order_id: u64,
    fills: Vec<PaperFill>,
}

impl<D: DataPort> PaperBroker<D> {
    pub fn new(data: D) -> Self {
        Self {
            data,
            logged_in: false,
            next_order_id: 1,
            fills: Vec::new(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn fills(&self) -> &[PaperFill] {
        &self.fills
    }

    fn ensure_session(&self) -> Result<(), AutotraderError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(AutotraderError::Broker {
                reason: "not logged in".into(),
            })
        }
    }

    fn last_bar(&self, symbol: &str) -> Result<Option<PriceBar>, AutotraderError> {
        let bars = self
            .data
            .fetch_bars(symbol, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)?;
        Ok(bars.into_iter().last())
    }
}

/// Aggregates bars into buckets of `width` aligned to the Unix epoch:
/// first open, max high, min low, last close, summed volume. Each bucket is
/// stamped with its start time. Input must be one symbol, oldest first.
pub fn resample(bars: &[PriceBar], width: Duration) -> Vec<PriceBar> {
    let width_ms = width.num_milliseconds().max(1);
    let mut out: Vec<PriceBar> = Vec::new();
    let mut current_bucket = None;

    for bar in bars {
        let bucket = bar.epoch_millis().div_euclid(width_ms);
        match out.last_mut() {
            Some(agg) if current_bucket == Some(bucket) => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                let start = Utc
                    .timestamp_millis_opt(bucket * width_ms)
                    .single()
                    .unwrap_or(bar.datetime);
                out.push(PriceBar {
                    datetime: start,
                    ..bar.clone()
                });
                current_bucket = Some(bucket);
            }
        }
    }
    out
}

impl<D: DataPort> BrokerPort for PaperBroker<D> {
    fn login(&mut self, credentials: &Credentials) -> Result<(), AutotraderError> {
        if credentials.client_id.trim().is_empty() {
            return Err(AutotraderError::Broker {
                reason: "client id is required to log in".into(),
            });
        }
        self.logged_in = true;
        info!(client_id = %credentials.client_id, "paper broker session started");
        Ok(())
    }

    fn get_quotes(&self, symbols: &[String]) -> Result<BTreeMap<String, Quote>, AutotraderError> {
        self.ensure_session()?;
        let mut quotes = BTreeMap::new();
        for symbol in symbols {
            match self.last_bar(symbol)? {
                Some(bar) => {
                    quotes.insert(symbol.clone(), Quote::from(&bar));
                }
                None => warn!(symbol = %symbol, "no data to quote"),
            }
        }
        Ok(quotes)
    }

    fn get_price_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bar_size: u32,
        bar_type: BarType,
    ) -> Result<Vec<PriceBar>, AutotraderError> {
        self.ensure_session()?;
        let width = bar_type.duration(bar_size)?;
        let bars = self.data.fetch_bars(symbol, start, end)?;
        let resampled = resample(&bars, width);
        debug!(
            symbol,
            raw = bars.len(),
            resampled = resampled.len(),
            bar_size,
            bar_type = %bar_type,
            "price history"
        );
        Ok(resampled)
    }

    fn place_order(&mut self, account: &str, order: &Order) -> Result<OrderResponse, AutotraderError> {
        self.ensure_session()?;
        let leg = order
            .order_leg_collection
            .first()
            .ok_or_else(|| AutotraderError::invalid_order("order has no legs"))?;
        let instrument = leg
            .instrument
            .as_ref()
            .ok_or_else(|| AutotraderError::invalid_order("order leg has no instrument"))?;

        let quoted = || -> Result<f64, AutotraderError> {
            self.last_bar(&instrument.symbol)?
                .map(|bar| bar.close)
                .ok_or_else(|| AutotraderError::NoData {
                    symbol: instrument.symbol.clone(),
                })
        };
        let fill_price = match order.order_type {
            OrderType::Market | OrderType::TrailingStop => quoted()?,
            OrderType::Limit | OrderType::StopLimit => match order.price {
                Some(price) => price,
                None => quoted()?,
            },
            OrderType::Stop => match order.stop_price {
                Some(price) => price,
                None => quoted()?,
            },
        };

        let response = OrderResponse {
            order_id: self.next_order_id.to_string(),
            account: account.to_string(),
            status: OrderStatus::Filled,
            symbol: instrument.symbol.clone(),
            instruction: leg.instruction,
            quantity: leg.quantity,
            fill_price: Some(fill_price),
            entered_time: Utc::now(),
            simulated: true,
        };
        self.next_order_id += 1;
        info!(
            order_id = %response.order_id,
            symbol = %response.symbol,
            quantity = response.quantity,
            fill_price,
            "paper order filled"
        );
        self.fills.push(PaperFill {
            order: order.clone(),
            response: response.clone(),
        });
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{Instruction, Instrument, OrderLeg};
    use crate::domain::position::AssetType;

    struct VecData(Vec<PriceBar>);

    impl DataPort for VecData {
        fn fetch_bars(
            &self,
            symbol: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<PriceBar>, AutotraderError> {
            Ok(self
                .0
                .iter()
                .filter(|b| b.symbol == symbol && b.datetime >= start && b.datetime <= end)
                .cloned()
                .collect())
        }

        fn list_symbols(&self) -> Result<Vec<String>, AutotraderError> {
            let mut symbols: Vec<String> = self.0.iter().map(|b| b.symbol.clone()).collect();
            symbols.dedup();
            Ok(symbols)
        }
    }

    fn minute_bar(minute: u32, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            symbol: "MSFT".into(),
            datetime: Utc.with_ymd_and_hms(2020, 11, 16, 15, minute, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 10,
        }
    }

    fn logged_in_broker() -> PaperBroker<VecData> {
        let bars = (0..10)
            .map(|m| {
                let p = 100.0 + m as f64;
                minute_bar(m, p, p + 0.5, p - 0.5, p + 0.25)
            })
            .collect();
        let mut broker = PaperBroker::new(VecData(bars));
        broker
            .login(&Credentials {
                client_id: "client".into(),
                ..Credentials::default()
            })
            .unwrap();
        broker
    }

    fn order(order_type: OrderType) -> Order {
        let mut order = Order::single(order_type);
        order.order_leg_collection.push(OrderLeg {
            instruction: Instruction::Buy,
            quantity: 3,
            instrument: Some(Instrument {
                symbol: "MSFT".into(),
                asset_type: AssetType::Equity,
                sub_asset_type: None,
            }),
        });
        order
    }

    #[test]
    fn login_requires_client_id() {
        let mut broker = PaperBroker::new(VecData(Vec::new()));
        assert!(broker.login(&Credentials::default()).is_err());
        assert!(!broker.is_logged_in());
        assert!(broker.get_quotes(&["MSFT".to_string()]).is_err());
    }

    #[test]
    fn quote_is_last_bar() {
        let broker = logged_in_broker();
        let quotes = broker
            .get_quotes(&["MSFT".to_string(), "NOPE".to_string()])
            .unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["MSFT"].close, 109.25);
    }

    #[test]
    fn history_resamples_to_bar_size() {
        let broker = logged_in_broker();
        let start = Utc.with_ymd_and_hms(2020, 11, 16, 15, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 11, 16, 15, 9, 0).unwrap();
        let bars = broker
            .get_price_history("MSFT", start, end, 5, BarType::Minute)
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].datetime, start);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 104.5);
        assert_eq!(bars[0].low, 99.5);
        assert_eq!(bars[0].close, 104.25);
        assert_eq!(bars[0].volume, 50);
        assert_eq!(bars[1].open, 105.0);
    }

    #[test]
    fn history_respects_range() {
        let broker = logged_in_broker();
        let start = Utc.with_ymd_and_hms(2020, 11, 16, 15, 2, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 11, 16, 15, 3, 0).unwrap();
        let bars = broker
            .get_price_history("MSFT", start, end, 1, BarType::Minute)
            .unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn market_order_fills_at_last_close() {
        let mut broker = logged_in_broker();
        let response = broker.place_order("acct", &order(OrderType::Market)).unwrap();
        assert_eq!(response.order_id, "1");
        assert_eq!(response.status, OrderStatus::Filled);
        assert_eq!(response.fill_price, Some(109.25));
        assert_eq!(response.quantity, 3);
        assert_eq!(broker.fills().len(), 1);
    }

    #[test]
    fn limit_and_stop_fill_at_their_price() {
        let mut broker = logged_in_broker();
        let mut limit = order(OrderType::Limit);
        limit.price = Some(101.0);
        let mut stop = order(OrderType::Stop);
        stop.stop_price = Some(95.0);
        assert_eq!(broker.place_order("a", &limit).unwrap().fill_price, Some(101.0));
        let response = broker.place_order("a", &stop).unwrap();
        assert_eq!(response.fill_price, Some(95.0));
        assert_eq!(response.order_id, "2");
    }

    #[test]
    fn order_without_instrument_rejected() {
        let mut broker = logged_in_broker();
        let mut blank = Order::single(OrderType::Market);
        blank.order_leg_collection.push(OrderLeg {
            instruction: Instruction::Buy,
            quantity: 1,
            instrument: None,
        });
        let err = broker.place_order("a", &blank).unwrap_err();
        assert!(matches!(err, AutotraderError::InvalidOrder { .. }));
        assert!(broker.fills().is_empty());
    }

    #[test]
    fn resample_empty() {
        assert!(resample(&[], Duration::minutes(5)).is_empty());
    }
}

//! Multi-index price table keyed by `(symbol, datetime)`.
//!
//! Rows are grouped per symbol and kept sorted by datetime. Besides the base
//! price columns (`open`, `close`, `high`, `low`, `volume`) the frame holds
//! any number of named indicator columns; a cell is missing until written.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::domain::error::AutotraderError;
use crate::domain::price_bar::{PriceBar, Quote};
use crate::domain::signal::{Signal, SignalAction, SignalThreshold};

pub const BASE_COLUMNS: [&str; 5] = ["open", "close", "high", "low", "volume"];

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: i64,
    pub columns: BTreeMap<String, f64>,
}

impl FrameRow {
    fn from_bar(bar: &PriceBar) -> Self {
        FrameRow {
            datetime: bar.datetime,
            open: bar.open,
            close: bar.close,
            high: bar.high,
            low: bar.low,
            volume: bar.volume,
            columns: BTreeMap::new(),
        }
    }

    /// Value of any column, base or indicator. NaN cells read as missing.
    pub fn get(&self, column: &str) -> Option<f64> {
        let value = match column {
            "open" => self.open,
            "close" => self.close,
            "high" => self.high,
            "low" => self.low,
            "volume" => self.volume as f64,
            other => *self.columns.get(other)?,
        };
        if value.is_nan() { None } else { Some(value) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGroup {
    pub symbol: String,
    rows: Vec<FrameRow>,
}

impl SymbolGroup {
    fn new(symbol: &str) -> Self {
        SymbolGroup {
            symbol: symbol.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    pub fn column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    pub fn last(&self) -> Option<&FrameRow> {
        self.rows.last()
    }

    /// Insert or overwrite the base columns at `bar.datetime`, keeping order.
    fn upsert(&mut self, bar: &PriceBar) {
        match self
            .rows
            .binary_search_by(|row| row.datetime.cmp(&bar.datetime))
        {
            Ok(i) => {
                let row = &mut self.rows[i];
                row.open = bar.open;
                row.close = bar.close;
                row.high = bar.high;
                row.low = bar.low;
                row.volume = bar.volume;
            }
            Err(i) => self.rows.insert(i, FrameRow::from_bar(bar)),
        }
    }
}

/// A trailing window of `size` rows for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct RollingWindow<'a> {
    pub symbol: &'a str,
    pub rows: &'a [FrameRow],
}

impl RollingWindow<'_> {
    pub fn end(&self) -> DateTime<Utc> {
        self.rows[self.rows.len() - 1].datetime
    }

    pub fn mean(&self, column: &str) -> Option<f64> {
        let mut sum = 0.0;
        for row in self.rows {
            sum += row.get(column)?;
        }
        Some(sum / self.rows.len() as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockFrame {
    groups: BTreeMap<String, SymbolGroup>,
    columns: BTreeSet<String>,
}

impl StockFrame {
    /// Build a frame from raw bars, normally the historical price response.
    /// A repeated `(symbol, datetime)` keeps the last bar seen.
    pub fn new(bars: &[PriceBar]) -> Self {
        let mut frame = StockFrame::default();
        for bar in bars {
            frame
                .groups
                .entry(bar.symbol.clone())
                .or_insert_with(|| SymbolGroup::new(&bar.symbol))
                .upsert(bar);
        }
        frame
    }

    pub fn frame(&self) -> &BTreeMap<String, SymbolGroup> {
        &self.groups
    }

    /// Every row in index order: symbol ascending, then datetime ascending.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &FrameRow)> {
        self.groups
            .values()
            .flat_map(|g| g.rows.iter().map(move |r| (g.symbol.as_str(), r)))
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(SymbolGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn symbols(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn symbol_groups(&self) -> impl Iterator<Item = (&str, &SymbolGroup)> {
        self.groups.iter().map(|(s, g)| (s.as_str(), g))
    }

    pub fn group(&self, symbol: &str) -> Option<&SymbolGroup> {
        self.groups.get(symbol)
    }

    pub fn symbol_rolling_groups(
        &self,
        size: usize,
    ) -> Result<Vec<RollingWindow<'_>>, AutotraderError> {
        if size == 0 {
            return Err(AutotraderError::data("rolling window size must be at least 1"));
        }
        Ok(self
            .groups
            .values()
            .flat_map(|g| {
                g.rows.windows(size).map(move |rows| RollingWindow {
                    symbol: g.symbol.as_str(),
                    rows,
                })
            })
            .collect())
    }

    /// Upsert one row per quote. Indicator cells on an existing row are kept
    /// until the next indicator refresh.
    pub fn add_rows(&mut self, quotes: &BTreeMap<String, Quote>) {
        for (symbol, quote) in quotes {
            let mut bar = quote.to_bar();
            bar.symbol = symbol.clone();
            debug!(symbol = %symbol, datetime = %bar.datetime, "adding row to stock frame");
            self.groups
                .entry(symbol.clone())
                .or_insert_with(|| SymbolGroup::new(symbol))
                .upsert(&bar);
        }
    }

    /// All column names: base columns followed by indicator columns.
    pub fn column_names(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        BASE_COLUMNS.contains(&name) || self.columns.contains(name)
    }

    pub fn set_column(
        &mut self,
        name: &str,
        symbol: &str,
        values: &[Option<f64>],
    ) -> Result<(), AutotraderError> {
        if BASE_COLUMNS.contains(&name) {
            return Err(AutotraderError::data(format!(
                "cannot overwrite base column '{name}'"
            )));
        }
        let group = self
            .groups
            .get_mut(symbol)
            .ok_or_else(|| AutotraderError::NoData {
                symbol: symbol.to_string(),
            })?;
        if group.rows.len() != values.len() {
            return Err(AutotraderError::data(format!(
                "column '{name}' for {symbol} has {} values, expected {}",
                values.len(),
                group.rows.len()
            )));
        }
        for (row, value) in group.rows.iter_mut().zip(values) {
            row.columns
                .insert(name.to_string(), value.unwrap_or(f64::NAN));
        }
        self.columns.insert(name.to_string());
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[&str]) {
        for name in names {
            if self.columns.remove(*name) {
                for group in self.groups.values_mut() {
                    for row in &mut group.rows {
                        row.columns.remove(*name);
                    }
                }
            }
        }
    }

    /// Check that every named column exists before it is read or modified.
    pub fn do_indicators_exist(&self, names: &[&str]) -> Result<bool, AutotraderError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.has_column(n))
            .map(|n| n.to_string())
            .collect();
        if missing.is_empty() {
            Ok(true)
        } else {
            Err(AutotraderError::MissingColumns { missing })
        }
    }

    /// Compare the last row of each symbol against the buy/sell thresholds.
    /// Returns `None` when no threshold is hit.
    pub fn check_signals(
        &self,
        signals: &BTreeMap<String, SignalThreshold>,
    ) -> Option<Vec<Signal>> {
        let mut active = Vec::with_capacity(signals.len());
        for (indicator, threshold) in signals {
            if self.has_column(indicator) {
                active.push((indicator, threshold));
            } else {
                warn!(indicator = %indicator, "signal configured for a column not in the frame");
            }
        }

        let mut hits = Vec::new();
        for group in self.groups.values() {
            let Some(row) = group.last() else { continue };
            for (indicator, threshold) in &active {
                let Some(value) = row.get(indicator) else {
                    continue;
                };
                if threshold.buy_operator.compare(value, threshold.buy) {
                    hits.push(Signal {
                        symbol: group.symbol.clone(),
                        datetime: row.datetime,
                        indicator: indicator.to_string(),
                        value,
                        close: row.close,
                        action: SignalAction::Buy,
                    });
                }
                if threshold.sell_operator.compare(value, threshold.sell) {
                    hits.push(Signal {
                        symbol: group.symbol.clone(),
                        datetime: row.datetime,
                        indicator: indicator.to_string(),
                        value,
                        close: row.close,
                        action: SignalAction::Sell,
                    });
                }
            }
        }

        if hits.is_empty() { None } else { Some(hits) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Comparison;

    const T0: i64 = 1_586_390_340_000;
    const MINUTE: i64 = 60_000;

    fn bar(symbol: &str, minute: i64, close: f64) -> PriceBar {
        PriceBar::from_epoch_millis(
            symbol,
            T0 + minute * MINUTE,
            close - 0.5,
            close + 1.0,
            close - 1.0,
            close,
            1_000,
        )
        .unwrap()
    }

    fn sample_frame() -> StockFrame {
        StockFrame::new(&[
            bar("MSFT", 1, 166.0),
            bar("AAPL", 0, 260.0),
            bar("MSFT", 0, 165.0),
            bar("AAPL", 1, 261.0),
            bar("MSFT", 2, 167.0),
        ])
    }

    #[test]
    fn new_groups_and_sorts_by_symbol_then_datetime() {
        let frame = sample_frame();
        let order: Vec<(String, f64)> = frame
            .rows()
            .map(|(s, r)| (s.to_string(), r.close))
            .collect();
        assert_eq!(
            order,
            vec![
                ("AAPL".to_string(), 260.0),
                ("AAPL".to_string(), 261.0),
                ("MSFT".to_string(), 165.0),
                ("MSFT".to_string(), 166.0),
                ("MSFT".to_string(), 167.0),
            ]
        );
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.symbols(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn duplicate_index_keeps_last_bar() {
        let frame = StockFrame::new(&[bar("MSFT", 0, 100.0), bar("MSFT", 0, 101.0)]);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.group("MSFT").unwrap().closes(), vec![101.0]);
    }

    #[test]
    fn empty_frame() {
        let frame = StockFrame::new(&[]);
        assert!(frame.is_empty());
        assert!(frame.check_signals(&BTreeMap::new()).is_none());
    }

    #[test]
    fn rolling_groups_per_symbol() {
        let frame = sample_frame();
        let windows = frame.symbol_rolling_groups(2).unwrap();
        // AAPL: 1 window, MSFT: 2 windows
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].symbol, "AAPL");
        assert_eq!(windows[1].symbol, "MSFT");
        assert_eq!(windows[2].mean("close"), Some(166.5));
        assert_eq!(windows[2].end(), bar("MSFT", 2, 0.0).datetime);
    }

    #[test]
    fn rolling_groups_rejects_zero_size() {
        assert!(sample_frame().symbol_rolling_groups(0).is_err());
    }

    #[test]
    fn add_rows_appends_and_overwrites() {
        let mut frame = sample_frame();
        frame
            .set_column("sma", "MSFT", &[None, Some(165.5), Some(166.5)])
            .unwrap();

        let mut quotes = BTreeMap::new();
        quotes.insert("MSFT".to_string(), Quote::from(&bar("MSFT", 3, 168.0)));
        quotes.insert("AAPL".to_string(), Quote::from(&bar("AAPL", 1, 262.5)));
        quotes.insert("TSLA".to_string(), Quote::from(&bar("TSLA", 0, 700.0)));
        frame.add_rows(&quotes);

        assert_eq!(frame.group("MSFT").unwrap().len(), 4);
        assert_eq!(frame.group("AAPL").unwrap().closes(), vec![260.0, 262.5]);
        assert_eq!(frame.group("TSLA").unwrap().len(), 1);
        // existing indicator cells survive, new row has none yet
        let sma = frame.group("MSFT").unwrap().column("sma");
        assert_eq!(sma, vec![None, Some(165.5), Some(166.5), None]);
    }

    #[test]
    fn add_rows_inserts_out_of_order_quote_in_place() {
        let mut frame = StockFrame::new(&[bar("MSFT", 0, 1.0), bar("MSFT", 2, 3.0)]);
        let mut quotes = BTreeMap::new();
        quotes.insert("MSFT".to_string(), Quote::from(&bar("MSFT", 1, 2.0)));
        frame.add_rows(&quotes);
        assert_eq!(frame.group("MSFT").unwrap().closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn set_column_validates_length_and_base_names() {
        let mut frame = sample_frame();
        assert!(frame.set_column("rsi", "MSFT", &[Some(1.0)]).is_err());
        assert!(frame.set_column("close", "MSFT", &[None, None, None]).is_err());
        assert!(frame.set_column("rsi", "NOPE", &[]).is_err());
    }

    #[test]
    fn do_indicators_exist_reports_missing() {
        let mut frame = sample_frame();
        assert!(frame.do_indicators_exist(&["close", "volume"]).unwrap());
        frame
            .set_column("rsi", "AAPL", &[Some(40.0), Some(45.0)])
            .unwrap();
        assert!(frame.do_indicators_exist(&["rsi"]).unwrap());

        match frame.do_indicators_exist(&["rsi", "ema", "sma"]) {
            Err(AutotraderError::MissingColumns { missing }) => {
                assert_eq!(missing, vec!["ema", "sma"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn drop_columns_removes_cells() {
        let mut frame = sample_frame();
        frame
            .set_column("tmp", "AAPL", &[Some(1.0), Some(2.0)])
            .unwrap();
        frame.drop_columns(&["tmp", "never_there"]);
        assert!(!frame.has_column("tmp"));
        assert!(frame.group("AAPL").unwrap().rows()[0].columns.is_empty());
    }

    #[test]
    fn check_signals_uses_last_row_per_symbol() {
        let mut frame = sample_frame();
        frame
            .set_column("rsi", "AAPL", &[Some(10.0), Some(75.0)])
            .unwrap();
        frame
            .set_column("rsi", "MSFT", &[Some(80.0), Some(50.0), Some(25.0)])
            .unwrap();

        let mut signals = BTreeMap::new();
        signals.insert(
            "rsi".to_string(),
            SignalThreshold {
                buy: 30.0,
                sell: 70.0,
                buy_operator: Comparison::Lt,
                sell_operator: Comparison::Gt,
            },
        );

        let hits = frame.check_signals(&signals).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].symbol, "AAPL");
        assert_eq!(hits[0].action, SignalAction::Sell);
        assert_eq!(hits[0].value, 75.0);
        assert_eq!(hits[1].symbol, "MSFT");
        assert_eq!(hits[1].action, SignalAction::Buy);
        assert_eq!(hits[1].close, 167.0);
    }

    #[test]
    fn check_signals_skips_missing_cells_and_unknown_columns() {
        let mut frame = sample_frame();
        frame
            .set_column("sma", "MSFT", &[Some(1.0), Some(2.0), None])
            .unwrap();
        let mut signals = BTreeMap::new();
        let threshold = SignalThreshold {
            buy: 0.0,
            sell: 0.0,
            buy_operator: Comparison::Gt,
            sell_operator: Comparison::Lt,
        };
        signals.insert("sma".to_string(), threshold);
        signals.insert("ema".to_string(), threshold);
        assert!(frame.check_signals(&signals).is_none());
    }
}

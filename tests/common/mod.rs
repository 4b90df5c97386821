#![allow(dead_code)]

use autotrader::adapters::csv_adapter::write_bars;
use autotrader::adapters::paper_broker::PaperBroker;
use autotrader::domain::error::AutotraderError;
pub use autotrader::domain::price_bar::PriceBar;
use autotrader::domain::robot::{Robot, RobotConfig};
use autotrader::ports::data_port::DataPort;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, AutotraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(AutotraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.datetime >= start && b.datetime <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, AutotraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Monday 2020-11-16 15:00 UTC, inside regular hours.
pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 11, 16, 15, 0, 0).unwrap()
}

pub fn make_bar(symbol: &str, datetime: DateTime<Utc>, close: f64) -> PriceBar {
    PriceBar {
        symbol: symbol.to_string(),
        datetime,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1000,
    }
}

/// One-minute bars from [`session_start`] with the given closes.
pub fn minute_bars(symbol: &str, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(symbol, session_start() + Duration::minutes(i as i64), close))
        .collect()
}

/// `n` one-minute closes falling steadily from `from`.
pub fn falling(from: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| from - i as f64).collect()
}

/// `n` one-minute closes rising steadily from `from`.
pub fn rising(from: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| from + i as f64).collect()
}

pub fn paper_config() -> RobotConfig {
    RobotConfig {
        client_id: "TESTCLIENT".into(),
        redirect_uri: "https://localhost".into(),
        credentials_path: None,
        trading_account: Some("123456".into()),
        paper_trading: true,
    }
}

pub fn paper_robot(data: MockDataPort) -> Robot {
    Robot::new(paper_config(), Box::new(PaperBroker::new(data))).unwrap()
}

pub fn write_symbol_csv(dir: &Path, symbol: &str, bars: &[PriceBar]) {
    write_bars(&dir.join(format!("{symbol}.csv")), bars).unwrap();
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// A complete config reading CSVs from `data_dir`.
pub fn robot_ini(data_dir: &Path, symbols: &str) -> String {
    format!(
        r#"
[broker]
client_id = TESTCLIENT
account_number = 123456
paper_trading = true

[data]
path = {}

[robot]
symbols = {symbols}
bar_size = 1
bar_type = minute
lookback_days = 1
quantity = 10

[indicators]
rsi_period = 14
sma_period = 5

[signals]
rsi_buy = 30
rsi_buy_operator = <
rsi_sell = 70
rsi_sell_operator = >
"#,
        data_dir.display()
    )
}

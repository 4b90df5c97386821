//! Historical price data port.

use chrono::{DateTime, Utc};

use crate::domain::error::AutotraderError;
use crate::domain::price_bar::PriceBar;

pub trait DataPort {
    /// Bars for `symbol` with `start <= datetime <= end`, oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, AutotraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, AutotraderError>;
}

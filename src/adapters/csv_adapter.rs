//! CSV file price data adapter. One `<SYMBOL>.csv` per symbol with the
//! header `datetime,open,high,low,close,volume` and epoch-millisecond times.

use chrono::{DateTime, Utc};
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::error::AutotraderError;
use crate::domain::price_bar::PriceBar;
use crate::ports::data_port::DataPort;

pub const CSV_HEADER: [&str; 6] = ["datetime", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn field<T: FromStr>(
    record: &StringRecord,
    index: usize,
    path: &Path,
) -> Result<T, AutotraderError>
where
    T::Err: std::fmt::Display,
{
    let name = CSV_HEADER[index];
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let raw = record.get(index).ok_or_else(|| {
        AutotraderError::data(format!(
            "{}:{line}: missing {name} column",
            path.display()
        ))
    })?;
    raw.trim().parse().map_err(|e| {
        AutotraderError::data(format!(
            "{}:{line}: invalid {name} value '{raw}': {e}",
            path.display()
        ))
    })
}

/// Writes bars in the layout [`CsvAdapter`] reads.
pub fn write_bars(path: &Path, bars: &[PriceBar]) -> Result<(), AutotraderError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AutotraderError::data(format!("failed to create {}: {e}", path.display())))?;
    let to_data = |e: csv::Error| AutotraderError::data(format!("CSV write error: {e}"));
    writer.write_record(CSV_HEADER).map_err(to_data)?;
    for bar in bars {
        writer
            .write_record([
                bar.epoch_millis().to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(to_data)?;
    }
    writer.flush()?;
    Ok(())
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, AutotraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| AutotraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| {
                AutotraderError::data(format!("{}: CSV parse error: {e}", path.display()))
            })?;

            let millis: i64 = field(&record, 0, &path)?;
            let bar = PriceBar::from_epoch_millis(
                symbol,
                millis,
                field(&record, 1, &path)?,
                field(&record, 2, &path)?,
                field(&record, 3, &path)?,
                field(&record, 4, &path)?,
                field(&record, 5, &path)?,
            )?;

            if bar.datetime < start || bar.datetime > end {
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.datetime);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, AutotraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AutotraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| AutotraderError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

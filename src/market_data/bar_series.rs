use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One daily OHLCV bar in the canonical internal schema.
///
/// Only `date` and `close` are mandatory.  High / low fall back to the close
/// and volume stays absent when the source does not provide it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PriceBar {
    /// Close-only bar.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    pub fn with_range(mut self, high: f64, low: f64) -> Self {
        self.high = Some(high);
        self.low = Some(low);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// High of the bar, or the close when no high was supplied.
    pub fn high(&self) -> f64 {
        self.high.filter(|h| h.is_finite()).unwrap_or(self.close)
    }

    /// Low of the bar, or the close when no low was supplied.
    pub fn low(&self) -> f64 {
        self.low.filter(|l| l.is_finite()).unwrap_or(self.close)
    }

    /// Volume, if present and finite.
    pub fn volume(&self) -> Option<f64> {
        self.volume.filter(|v| v.is_finite())
    }
}

/// Bar record as it arrives from a file.  The aliases cover the usual
/// capitalisations so naming is resolved once, here, and nowhere else.
///
/// `Adj Close` and `timestamp` are separate columns rather than aliases:
/// Yahoo-style files carry both `Close` and `Adj Close`, and serde rejects a
/// row in which two aliases of one field are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBar {
    #[serde(default, alias = "Date", alias = "DATE", alias = "trade_date")]
    pub date: Option<String>,
    #[serde(default, alias = "Timestamp", alias = "TIMESTAMP")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "Open", alias = "OPEN")]
    pub open: Option<f64>,
    #[serde(default, alias = "High", alias = "HIGH")]
    pub high: Option<f64>,
    #[serde(default, alias = "Low", alias = "LOW")]
    pub low: Option<f64>,
    #[serde(default, alias = "Close", alias = "CLOSE")]
    pub close: Option<f64>,
    #[serde(default, alias = "Adj Close", alias = "adj close", alias = "ADJ CLOSE")]
    pub adj_close: Option<f64>,
    #[serde(default, alias = "Volume", alias = "VOLUME", alias = "vol")]
    pub volume: Option<f64>,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    // Accept "2024-01-02 00:00:00" style stamps by keeping the date part.
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

impl RawBar {
    /// Convert into the canonical bar, or `None` when the row is unusable
    /// (no parseable date, no finite close or adjusted close).
    pub fn canonicalize(&self) -> Option<PriceBar> {
        let date = [&self.date, &self.timestamp]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_date(raw))?;
        // Close first, adjusted close only when the plain close is unusable.
        let close = [self.close, self.adj_close]
            .into_iter()
            .flatten()
            .find(|c| c.is_finite())?;
        Some(PriceBar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close,
            volume: self.volume,
        })
    }
}

// ---------------------------------------------------------------------------
// BarSeries — ordered, unique-by-date bar sequence
// ---------------------------------------------------------------------------

/// Chronologically ordered bars with unique dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<PriceBar>,
}

impl BarSeries {
    /// Sort by date and de-duplicate.  When a date appears more than once the
    /// last occurrence wins.  Bars with a non-finite close are dropped.
    pub fn from_bars(bars: impl IntoIterator<Item = PriceBar>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
        let mut dropped = 0usize;
        for bar in bars {
            if !bar.close.is_finite() {
                dropped += 1;
                continue;
            }
            by_date.insert(bar.date, bar);
        }
        if dropped > 0 {
            warn!(dropped, "dropped bars with non-finite close");
        }
        Self {
            bars: by_date.into_values().collect(),
        }
    }

    /// Canonicalise raw file rows.  Fails with `MissingInput` when no usable
    /// row remains.
    pub fn from_raw(rows: &[RawBar]) -> std::result::Result<Self, CoreError> {
        let total = rows.len();
        let series = Self::from_bars(rows.iter().filter_map(RawBar::canonicalize));
        if series.is_empty() {
            return Err(CoreError::MissingInput(format!(
                "no usable bars among {total} rows"
            )));
        }
        if series.len() < total {
            debug!(total, kept = series.len(), "canonicalised bar rows");
        }
        Ok(series)
    }

    /// Read a CSV file of bars.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open bar file {}", path.display()))?;

        let mut rows = Vec::new();
        for (line, record) in reader.deserialize::<RawBar>().enumerate() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) => warn!(path = %path.display(), line = line + 2, error = %e, "skipping malformed bar row"),
            }
        }

        Self::from_raw(&rows).with_context(|| format!("no bars in {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }
}

// =============================================================================
// Output writers — signal table as CSV, any record set as JSON
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::persistence::write_atomic;
use crate::pipeline::SignalRecord;

/// Write the signal table, one row per date, with a header.
pub fn write_signals_csv(path: impl AsRef<Path>, rows: &[SignalRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to encode signal row {}", row.date))?;
    }
    let bytes = writer.into_inner().context("failed to flush signal table")?;
    let content = String::from_utf8(bytes).context("signal table is not UTF-8")?;

    write_atomic(path, &content)?;
    info!(path = %path.display(), rows = rows.len(), "signal table written");
    Ok(())
}

/// Pretty-printed JSON, written atomically.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialise {}", path.display()))?;
    write_atomic(path, &content)?;
    info!(path = %path.display(), "json written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signal;
    use chrono::NaiveDate;

    fn row(day: u32, signal: Signal, tags: &str) -> SignalRecord {
        SignalRecord {
            date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            signal,
            composite_score: 61.5,
            indicator_score: 70.0,
            pattern_score: 50.0,
            volume_score: 55.0,
            tags: tags.to_string(),
            regime_match: true,
            regime: "trend".to_string(),
        }
    }

    #[test]
    fn csv_has_header_and_signed_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("AAA.csv");
        let rows = [row(1, Signal::Buy, "ma_aligned,regime:trend"), row(2, Signal::Sell, "")];
        write_signals_csv(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,signal,composite_score,indicator_score,pattern_score,volume_score,tags,regime_match,regime"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-02-01,1,61.5,70.0,50.0,55.0,\"ma_aligned,regime:trend\",true,trend"
        );
        assert!(lines.next().unwrap().starts_with("2024-02-02,-1,"));
    }

    #[test]
    fn csv_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAA.csv");
        let rows = vec![row(1, Signal::Hold, "x,y")];
        write_signals_csv(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let back: Vec<SignalRecord> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn json_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        write_json(&path, &[row(1, Signal::Buy, "")]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["signal"], 1);
    }
}

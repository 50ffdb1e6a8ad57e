// =============================================================================
// Symbol Pipeline — bars -> features -> composite scores -> signals
// =============================================================================
//
// One symbol at a time.  The regime timeline is computed once for the index
// and shared read-only by every symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::indicators::FeatureFrame;
use crate::market_data::BarSeries;
use crate::regime::tracker::RegimeTimeline;
use crate::runtime_config::RuntimeConfig;
use crate::signals::aggregator::ScoreAggregator;
use crate::signals::generator::SignalGenerator;
use crate::signals::pattern_score::PatternEvidence;
use crate::types::Signal;

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub date: NaiveDate,
    /// -1 / 0 / 1.
    pub signal: Signal,
    pub composite_score: f64,
    pub indicator_score: f64,
    pub pattern_score: f64,
    pub volume_score: f64,
    /// Comma-joined explanatory tags.
    pub tags: String,
    pub regime_match: bool,
    /// Stabilised regime in force, empty when there was none.
    pub regime: String,
}

pub struct SymbolPipeline {
    aggregator: ScoreAggregator,
    generator: SignalGenerator,
}

impl SymbolPipeline {
    pub fn new(aggregator: ScoreAggregator, generator: SignalGenerator) -> Self {
        Self {
            aggregator,
            generator,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            ScoreAggregator::from_config(config),
            SignalGenerator::new(config.signal),
        )
    }

    /// Score and signal every bar of `bars`.
    pub fn run(
        &self,
        symbol: &str,
        bars: &BarSeries,
        timeline: &RegimeTimeline,
        patterns: &PatternEvidence,
    ) -> Vec<SignalRecord> {
        let frame = FeatureFrame::compute(bars.bars(), self.aggregator.indicator_params());
        let scores = self.aggregator.score_series(&frame, timeline, patterns);
        let composites: Vec<f64> = scores.iter().map(|s| s.composite).collect();
        let steps = self.generator.run(&composites);

        let records: Vec<SignalRecord> = scores
            .into_iter()
            .zip(steps)
            .map(|(score, step)| {
                if step.signal != Signal::Hold {
                    debug!(
                        symbol,
                        date = %score.date,
                        signal = %step.signal,
                        composite = format!("{:.2}", score.composite),
                        "signal emitted"
                    );
                }
                SignalRecord {
                    date: score.date,
                    signal: step.signal,
                    composite_score: score.composite,
                    indicator_score: score.indicator_score,
                    pattern_score: score.pattern_score,
                    volume_score: score.volume_score,
                    tags: score.tags.join(","),
                    regime_match: score.regime_match,
                    regime: score.regime.map(|r| r.to_string()).unwrap_or_default(),
                }
            })
            .collect();

        let buys = records.iter().filter(|r| r.signal == Signal::Buy).count();
        let sells = records.iter().filter(|r| r.signal == Signal::Sell).count();
        info!(symbol, rows = records.len(), buys, sells, "symbol scored");
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::PriceBar;
    use crate::types::RegimeLabel;

    fn series(closes: impl IntoIterator<Item = f64>) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        BarSeries::from_bars(closes.into_iter().enumerate().map(|(i, c)| {
            PriceBar::new(start + chrono::Duration::days(i as i64), c)
                .with_range(c * 1.01, c * 0.99)
                .with_volume(1_000.0 + (i % 7) as f64 * 100.0)
        }))
    }

    #[test]
    fn one_row_per_bar_with_valid_fields() {
        let bars = series((0..150).map(|i| 100.0 + (i as f64 * 0.15).sin() * 15.0));
        let timeline: RegimeTimeline = bars
            .bars()
            .iter()
            .skip(60)
            .map(|b| (b.date, RegimeLabel::Reversion))
            .collect();
        let pipeline = SymbolPipeline::from_config(&RuntimeConfig::default());
        let rows = pipeline.run("TEST", &bars, &timeline, &PatternEvidence::default());

        assert_eq!(rows.len(), 150);
        for row in &rows {
            for v in [row.composite_score, row.indicator_score, row.pattern_score, row.volume_score] {
                assert!((0.0..=100.0).contains(&v));
            }
        }
        assert_eq!(rows[0].regime, "");
        assert_eq!(rows[149].regime, "reversion");
        assert!(rows[149].tags.contains("regime:reversion"));
    }

    #[test]
    fn signals_alternate_buy_then_sell() {
        let bars = series((0..250).map(|i| 100.0 + (i as f64 * 0.08).sin() * 25.0));
        let pipeline = SymbolPipeline::from_config(&RuntimeConfig::default());
        let rows = pipeline.run("WAVE", &bars, &RegimeTimeline::default(), &PatternEvidence::default());

        let trades: Vec<Signal> = rows
            .iter()
            .map(|r| r.signal)
            .filter(|s| *s != Signal::Hold)
            .collect();
        for (i, s) in trades.iter().enumerate() {
            let expected = if i % 2 == 0 { Signal::Buy } else { Signal::Sell };
            assert_eq!(*s, expected, "trade {i}");
        }
    }
}

// =============================================================================
// Regime Tracker — classifier + hysteresis over an index timeline
// =============================================================================
//
// Walks the index bars in date order, classifies each date from the bars up to
// and including it, and debounces the label through `RegimeHysteresis`.
//
// Dates whose classification degraded (warm-up, missing or broken data) are
// kept out of the history store.  They inherit the last stabilised label when
// there is one; before the first successful classification they have no
// regime at all and scoring falls back to the base weights.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AssessmentKind;
use crate::market_data::BarSeries;
use crate::regime::detector::RegimeClassifier;
use crate::regime::history::RegimeHistoryStore;
use crate::regime::hysteresis::RegimeHysteresis;
use crate::types::RegimeLabel;

/// Full regime record for one evaluation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDecision {
    pub date: NaiveDate,
    pub kind: AssessmentKind,
    /// Label produced by the classifier for this date alone.
    pub classified: RegimeLabel,
    /// Label after debouncing.
    pub stabilized: RegimeLabel,
    pub confidence: f64,
    pub evidence: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Stabilised regime per index date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeTimeline {
    labels: BTreeMap<NaiveDate, RegimeLabel>,
}

impl RegimeTimeline {
    pub fn insert(&mut self, date: NaiveDate, label: RegimeLabel) {
        self.labels.insert(date, label);
    }

    pub fn get(&self, date: NaiveDate) -> Option<RegimeLabel> {
        self.labels.get(&date).copied()
    }

    /// Regime in force on `date`: the latest index date on or before it.
    pub fn as_of(&self, date: NaiveDate) -> Option<RegimeLabel> {
        self.labels.range(..=date).next_back().map(|(_, l)| *l)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, RegimeLabel)> + '_ {
        self.labels.iter().map(|(d, l)| (*d, *l))
    }
}

impl FromIterator<(NaiveDate, RegimeLabel)> for RegimeTimeline {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, RegimeLabel)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Output of one tracker pass.
#[derive(Debug, Clone, Default)]
pub struct RegimeRun {
    pub timeline: RegimeTimeline,
    pub decisions: Vec<RegimeDecision>,
}

pub struct RegimeTracker<S: RegimeHistoryStore> {
    classifier: RegimeClassifier,
    hysteresis: RegimeHysteresis<S>,
}

impl<S: RegimeHistoryStore> RegimeTracker<S> {
    pub fn new(classifier: RegimeClassifier, hysteresis: RegimeHysteresis<S>) -> Self {
        Self {
            classifier,
            hysteresis: hysteresis.with_autosave(false),
        }
    }

    pub fn hysteresis(&self) -> &RegimeHysteresis<S> {
        &self.hysteresis
    }

    /// Classify and stabilise every date of `index`, then save the history
    /// once.
    pub fn run(&self, index: &BarSeries) -> RegimeRun {
        let bars = index.bars();
        let mut run = RegimeRun::default();
        let mut last_stable: Option<RegimeLabel> = None;
        let mut degraded = 0usize;

        for (i, bar) in bars.iter().enumerate() {
            let assessment = self.classifier.assess(&bars[..=i]);

            let stabilized = if assessment.kind.is_ok() {
                let decision = self.hysteresis.stabilize(bar.date, assessment.label);
                last_stable = Some(decision.stabilized);
                Some(decision.stabilized)
            } else {
                degraded += 1;
                last_stable
            };

            if let Some(label) = stabilized {
                run.timeline.insert(bar.date, label);
            }
            run.decisions.push(RegimeDecision {
                date: bar.date,
                kind: assessment.kind,
                classified: assessment.label,
                stabilized: stabilized.unwrap_or(assessment.label),
                confidence: assessment.confidence,
                evidence: assessment.evidence,
                detail: assessment.detail,
            });
        }

        self.hysteresis.flush();

        info!(
            dates = bars.len(),
            stabilised = run.timeline.len(),
            degraded,
            "Regime timeline built"
        );
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::PriceBar;
    use crate::regime::history::InMemoryHistoryStore;
    use crate::runtime_config::{HysteresisParams, RegimeParams};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn index(closes: impl IntoIterator<Item = f64>) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        BarSeries::from_bars(
            closes
                .into_iter()
                .enumerate()
                .map(|(i, c)| PriceBar::new(start + chrono::Duration::days(i as i64), c)),
        )
    }

    fn tracker() -> RegimeTracker<InMemoryHistoryStore> {
        let store = Arc::new(Mutex::new(InMemoryHistoryStore::new()));
        RegimeTracker::new(
            RegimeClassifier::new(RegimeParams::default()),
            RegimeHysteresis::new(store, HysteresisParams::default()),
        )
    }

    #[test]
    fn warm_up_dates_have_no_regime() {
        let series = index((0..90).map(|i| 100.0 + i as f64));
        let t = tracker();
        let run = t.run(&series);

        assert_eq!(run.decisions.len(), 90);
        assert_eq!(run.timeline.len(), 31);
        assert_eq!(run.decisions[10].kind, AssessmentKind::InsufficientData);
        assert!(run.timeline.get(series.bars()[58].date).is_none());
        assert_eq!(run.timeline.get(series.bars()[59].date), Some(RegimeLabel::Trend));
        // Only classified dates are recorded.
        assert_eq!(t.hysteresis().store().lock().load_all().len(), 31);
    }

    #[test]
    fn as_of_uses_latest_prior_date() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        let timeline: RegimeTimeline = [(d(1), RegimeLabel::Trend), (d(3), RegimeLabel::Breakout)]
            .into_iter()
            .collect();
        assert_eq!(timeline.as_of(d(2)), Some(RegimeLabel::Trend));
        assert_eq!(timeline.as_of(d(4)), Some(RegimeLabel::Breakout));
        assert_eq!(timeline.as_of(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()), None);
    }

    #[test]
    fn rerun_reproduces_timeline() {
        let series = index((0..100).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0 + i as f64 * 0.05));
        let t = tracker();
        let first = t.run(&series);
        let second = t.run(&series);
        assert_eq!(first.timeline, second.timeline);
    }
}

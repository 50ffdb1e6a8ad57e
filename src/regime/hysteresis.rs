// =============================================================================
// Regime Hysteresis — debounce of the classified regime label
// =============================================================================
//
// Two-slot debounce over {stable, candidate}:
//
//   classified == stable      -> keep, clear the candidate
//   classified != stable      -> count consecutive days of the candidate
//     within cooldown         -> keep stable (suppressed), keep counting
//     candidate days >= confirm -> switch, restart the cooldown clock
//     otherwise               -> keep stable (pending)
//
// A switch on day S blocks the next switch until day S + cooldown_days.
//
// The state is rebuilt for every date from the persisted history, so the
// history file stays the only cross-run state.  Each entry stores both the
// stabilised and the classified label; a pending candidate day is therefore
// never mistaken for a stabilised decision.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::regime::history::{RegimeHistoryEntry, RegimeHistoryStore};
use crate::runtime_config::HysteresisParams;
use crate::types::RegimeLabel;

/// Debounce state carried from one evaluation date to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisState {
    pub stable: RegimeLabel,
    pub candidate: Option<RegimeLabel>,
    /// Consecutive days the candidate has been classified, today included.
    pub candidate_days: usize,
    /// Days since the last switch (0 on the switch day); `None` when no switch
    /// is recent enough to matter.
    pub days_since_switch: Option<usize>,
}

/// What happened to the classified label on one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HysteresisOutcome {
    /// No history: the classified label is accepted as is.
    Initial,
    /// Classified label equals the stable one.
    Unchanged,
    /// Candidate seen, not yet confirmed.
    Pending,
    /// Candidate blocked by the post-switch cooldown.
    Suppressed,
    /// Stable label switched to the candidate.
    Switched,
}

impl HysteresisState {
    pub fn new(stable: RegimeLabel) -> Self {
        Self {
            stable,
            candidate: None,
            candidate_days: 0,
            days_since_switch: None,
        }
    }

    /// Rebuild the state from persisted entries, newest first.
    pub fn from_recent(recent: &[RegimeHistoryEntry]) -> Option<Self> {
        let newest = recent.first()?;
        let stable = newest.label;

        let days_since_switch = recent
            .iter()
            .position(|e| e.label != stable)
            .map(|first_other| first_other - 1);

        let candidate = Some(newest.classified_label()).filter(|c| *c != stable);
        let candidate_days = match candidate {
            Some(c) => recent
                .iter()
                .take_while(|e| e.label == stable && e.classified_label() == c)
                .count(),
            None => 0,
        };

        Some(Self {
            stable,
            candidate,
            candidate_days,
            days_since_switch,
        })
    }
}

/// Advance the debounce by one date.  Pure.
pub fn step(
    state: &HysteresisState,
    classified: RegimeLabel,
    params: &HysteresisParams,
) -> (HysteresisState, HysteresisOutcome) {
    let elapsed = state.days_since_switch.map(|d| d + 1);

    if classified == state.stable {
        let next = HysteresisState {
            candidate: None,
            candidate_days: 0,
            days_since_switch: elapsed,
            ..*state
        };
        return (next, HysteresisOutcome::Unchanged);
    }

    let candidate_days = if state.candidate == Some(classified) {
        state.candidate_days + 1
    } else {
        1
    };

    if elapsed.is_some_and(|e| e < params.cooldown_days) {
        let next = HysteresisState {
            stable: state.stable,
            candidate: Some(classified),
            candidate_days,
            days_since_switch: elapsed,
        };
        return (next, HysteresisOutcome::Suppressed);
    }

    if candidate_days >= params.min_confirm_days.max(1) {
        let next = HysteresisState {
            stable: classified,
            candidate: None,
            candidate_days: 0,
            days_since_switch: Some(0),
        };
        return (next, HysteresisOutcome::Switched);
    }

    let next = HysteresisState {
        stable: state.stable,
        candidate: Some(classified),
        candidate_days,
        days_since_switch: elapsed,
    };
    (next, HysteresisOutcome::Pending)
}

/// Result of stabilising one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisDecision {
    pub date: NaiveDate,
    pub classified: RegimeLabel,
    pub stabilized: RegimeLabel,
    pub outcome: HysteresisOutcome,
}

// =============================================================================
// RegimeHysteresis — store-driven wrapper
// =============================================================================

/// Debouncer backed by a shared history store.
///
/// The store sits behind a mutex held for the whole read-step-write cycle, so
/// concurrent callers never interleave inside one date.
pub struct RegimeHysteresis<S: RegimeHistoryStore> {
    store: Arc<Mutex<S>>,
    params: HysteresisParams,
    autosave: bool,
}

impl<S: RegimeHistoryStore> RegimeHysteresis<S> {
    pub fn new(store: Arc<Mutex<S>>, params: HysteresisParams) -> Self {
        Self {
            store,
            params,
            autosave: true,
        }
    }

    /// Save after every date (default) or only on `flush`.
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    pub fn params(&self) -> HysteresisParams {
        self.params
    }

    /// Stabilise the label classified for `date` and record it.
    ///
    /// Only entries strictly before `date` are consulted, so re-running a date
    /// reproduces the same decision.  A failed save is logged and ignored.
    pub fn stabilize(&self, date: NaiveDate, classified: RegimeLabel) -> HysteresisDecision {
        let window = (self.params.min_confirm_days + self.params.cooldown_days).max(1);
        let mut store = self.store.lock();

        let recent: Vec<RegimeHistoryEntry> = store
            .recent_before(date, window)
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();

        let (state, outcome) = match HysteresisState::from_recent(&recent) {
            Some(prior) => step(&prior, classified, &self.params),
            None => (HysteresisState::new(classified), HysteresisOutcome::Initial),
        };

        store.append(date, RegimeHistoryEntry::new(state.stable, classified));
        if self.autosave {
            if let Err(err) = store.save() {
                warn!(date = %date, error = %err, "regime history save failed, continuing in memory");
            }
        }

        match outcome {
            HysteresisOutcome::Switched => info!(
                date = %date,
                from = %recent.first().map(|e| e.label).unwrap_or(state.stable),
                to = %state.stable,
                "Regime switch confirmed"
            ),
            HysteresisOutcome::Suppressed | HysteresisOutcome::Pending => debug!(
                date = %date,
                stable = %state.stable,
                candidate = %classified,
                candidate_days = state.candidate_days,
                outcome = ?outcome,
                "Regime change held back"
            ),
            _ => {}
        }

        HysteresisDecision {
            date,
            classified,
            stabilized: state.stable,
            outcome,
        }
    }

    /// Save pending writes.  Failures are logged, never raised.
    pub fn flush(&self) {
        if let Err(err) = self.store.lock().save() {
            warn!(error = %err, "regime history save failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::regime::history::{InMemoryHistoryStore, RegimeHistory};
    use crate::types::RegimeLabel::{Breakout as B, Reversion as R, Trend as T};

    fn params(confirm: usize, cooldown: usize) -> HysteresisParams {
        HysteresisParams {
            min_confirm_days: confirm,
            cooldown_days: cooldown,
        }
    }

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    fn run(labels: &[RegimeLabel], p: HysteresisParams) -> Vec<HysteresisDecision> {
        let h = RegimeHysteresis::new(Arc::new(Mutex::new(InMemoryHistoryStore::new())), p);
        dates(labels.len())
            .into_iter()
            .zip(labels)
            .map(|(d, l)| h.stabilize(d, *l))
            .collect()
    }

    fn stabilized(decisions: &[HysteresisDecision]) -> Vec<RegimeLabel> {
        decisions.iter().map(|d| d.stabilized).collect()
    }

    #[test]
    fn first_date_accepts_classified_label() {
        let out = run(&[B], params(2, 3));
        assert_eq!(out[0].stabilized, B);
        assert_eq!(out[0].outcome, HysteresisOutcome::Initial);
    }

    #[test]
    fn single_day_flip_is_ignored() {
        let out = run(&[T, T, R, T, T], params(2, 3));
        assert_eq!(stabilized(&out), vec![T, T, T, T, T]);
        assert_eq!(out[2].outcome, HysteresisOutcome::Pending);
    }

    #[test]
    fn two_day_agreement_switches() {
        let out = run(&[T, T, R, R, R], params(2, 3));
        assert_eq!(stabilized(&out), vec![T, T, T, R, R]);
        assert_eq!(out[3].outcome, HysteresisOutcome::Switched);
    }

    #[test]
    fn interleaved_candidates_do_not_confirm_each_other() {
        // R then B: two different candidates, neither confirmed.
        let out = run(&[T, R, B, R, B], params(2, 0));
        assert_eq!(stabilized(&out), vec![T; 5]);
    }

    #[test]
    fn cooldown_blocks_switch_back() {
        // Switch to R on day 2; T on days 3 and 4 is suppressed; the switch
        // back lands on day 5 = 2 + cooldown.
        let out = run(&[T, R, R, T, T, T, T], params(2, 3));
        assert_eq!(stabilized(&out), vec![T, T, R, R, R, T, T]);
        assert_eq!(out[3].outcome, HysteresisOutcome::Suppressed);
        assert_eq!(out[4].outcome, HysteresisOutcome::Suppressed);
        assert_eq!(out[5].outcome, HysteresisOutcome::Switched);
    }

    #[test]
    fn no_two_changes_within_cooldown() {
        let p = params(2, 3);
        // Deterministic noisy sequence.
        let labels: Vec<RegimeLabel> = (0..200u64)
            .map(|i| match (i * 7 + i / 3) % 5 {
                0 | 1 => T,
                2 | 3 => R,
                _ => B,
            })
            .collect();
        let out = run(&labels, p);
        let switches: Vec<usize> = out
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0].stabilized != w[1].stabilized)
            .map(|(i, _)| i + 1)
            .collect();
        for pair in switches.windows(2) {
            assert!(pair[1] - pair[0] >= p.cooldown_days, "switches at {pair:?}");
        }
    }

    #[test]
    fn reconstruction_matches_sequential_stepping() {
        let p = params(2, 3);
        let labels = [T, R, R, B, B, B, T, R, T, T, R, R, R, B, T, T, T];
        let persisted = run(&labels, p);

        let mut state = HysteresisState::new(labels[0]);
        for (i, label) in labels.iter().enumerate().skip(1) {
            let (next, _) = step(&state, *label, &p);
            assert_eq!(next.stable, persisted[i].stabilized, "day {i}");
            state = next;
        }
    }

    #[test]
    fn rerun_of_same_date_is_idempotent() {
        let h = RegimeHysteresis::new(Arc::new(Mutex::new(InMemoryHistoryStore::new())), params(2, 3));
        let ds = dates(4);
        for (d, l) in ds.iter().zip([T, T, R, R]) {
            h.stabilize(*d, l);
        }
        let before = h.store().lock().load_all().clone();
        let again = h.stabilize(ds[3], R);
        assert_eq!(again.stabilized, R);
        let after = h.store().lock().load_all().clone();
        assert_eq!(before.len(), after.len());
        assert_eq!(before[&ds[3]].label, after[&ds[3]].label);
    }

    #[test]
    fn legacy_history_without_classified_field() {
        let ds = dates(3);
        let mut history = RegimeHistory::new();
        for d in &ds[..2] {
            history.insert(
                *d,
                RegimeHistoryEntry {
                    label: B,
                    classified: None,
                    timestamp: chrono::Utc::now(),
                },
            );
        }
        let store = InMemoryHistoryStore::with_entries(history);
        let h = RegimeHysteresis::new(Arc::new(Mutex::new(store)), params(2, 3));
        let out = h.stabilize(ds[2], T);
        assert_eq!(out.stabilized, B);
        assert_eq!(out.outcome, HysteresisOutcome::Pending);
    }

    struct FailingStore(InMemoryHistoryStore);

    impl RegimeHistoryStore for FailingStore {
        fn load_all(&self) -> &RegimeHistory {
            self.0.load_all()
        }
        fn append(&mut self, date: NaiveDate, entry: RegimeHistoryEntry) {
            self.0.append(date, entry);
        }
        fn save(&mut self) -> Result<(), CoreError> {
            Err(CoreError::Persistence("disk full".into()))
        }
    }

    #[test]
    fn save_failure_does_not_break_sequence() {
        let h = RegimeHysteresis::new(
            Arc::new(Mutex::new(FailingStore(InMemoryHistoryStore::new()))),
            params(2, 3),
        );
        let out: Vec<RegimeLabel> = dates(4)
            .into_iter()
            .zip([T, R, R, R])
            .map(|(d, l)| h.stabilize(d, l).stabilized)
            .collect();
        assert_eq!(out, vec![T, T, R, R]);
    }

    #[test]
    fn confirm_of_one_switches_immediately() {
        let out = run(&[T, R, B], params(1, 0));
        assert_eq!(stabilized(&out), vec![T, R, B]);
    }
}

// =============================================================================
// Signal Generator — confirmed, cooled-down BUY / SELL from composite scores
// =============================================================================
//
// Life-cycle (long-only):
//   Flat  --buy ready, not cooling-->  Long   emits BUY
//   Long  --sell ready, not cooling--> Flat   emits SELL
//   anything else                             emits HOLD
//
// "Ready" is a pulse: the qualifying run (score >= buy_score, or
// score <= sell_score) reaches exactly its confirmation length on this bar.
// Later bars of the same run are not ready again.
//
// Cooldown: within `cooldown_days` bars of a trade, readiness in the opposite
// direction is blocked.  Same-direction readiness is never blocked.
//
// Days are bar positions of the scored series (trading days).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::runtime_config::SignalParams;
use crate::types::{PositionState, Signal, TradeDirection};

/// Last executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTrade {
    pub index: usize,
    pub direction: TradeDirection,
}

/// Generator state between bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub position: PositionState,
    /// Consecutive bars with score >= buy_score, up to and including the last.
    pub buy_run: usize,
    /// Consecutive bars with score <= sell_score.
    pub sell_run: usize,
    pub last_trade: Option<LastTrade>,
    /// Position of the next bar.
    pub index: usize,
}

/// Per-bar detail of a step, for explanation and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStep {
    pub index: usize,
    pub signal: Signal,
    pub buy_ready: bool,
    pub sell_ready: bool,
    pub in_cooldown: bool,
}

/// Advance the generator by one bar.  Pure.
pub fn step(state: &SignalState, score: f64, params: &SignalParams) -> (SignalState, SignalStep) {
    let index = state.index;
    let finite = score.is_finite();

    let buy_run = if finite && score >= params.buy_score {
        state.buy_run + 1
    } else {
        0
    };
    let sell_run = if finite && score <= params.sell_score {
        state.sell_run + 1
    } else {
        0
    };
    let buy_ready = buy_run == params.buy_confirm_days.max(1);
    let sell_ready = sell_run == params.sell_confirm_days.max(1);

    let ready_direction = if buy_ready {
        Some(TradeDirection::Buy)
    } else if sell_ready {
        Some(TradeDirection::Sell)
    } else {
        None
    };
    let in_cooldown = match (ready_direction, state.last_trade) {
        (Some(dir), Some(last)) => {
            dir == last.direction.opposite() && index - last.index < params.cooldown_days
        }
        _ => false,
    };

    let mut next = SignalState {
        buy_run,
        sell_run,
        index: index + 1,
        ..*state
    };

    let signal = match state.position {
        PositionState::Flat if buy_ready && !in_cooldown => {
            next.position = PositionState::Long;
            next.last_trade = Some(LastTrade {
                index,
                direction: TradeDirection::Buy,
            });
            Signal::Buy
        }
        PositionState::Long if sell_ready && !in_cooldown => {
            next.position = PositionState::Flat;
            next.last_trade = Some(LastTrade {
                index,
                direction: TradeDirection::Sell,
            });
            Signal::Sell
        }
        _ => Signal::Hold,
    };

    if in_cooldown {
        debug!(index, score = format!("{:.2}", score), "signal ready but cooling down");
    }

    (
        next,
        SignalStep {
            index,
            signal,
            buy_ready,
            sell_ready,
            in_cooldown,
        },
    )
}

/// Runs `step` over whole score series.
#[derive(Debug, Clone, Default)]
pub struct SignalGenerator {
    params: SignalParams,
}

impl SignalGenerator {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Chronological scores in, one step per score out.
    pub fn run(&self, scores: &[f64]) -> Vec<SignalStep> {
        let mut state = SignalState::default();
        scores
            .iter()
            .map(|score| {
                let (next, out) = step(&state, *score, &self.params);
                state = next;
                out
            })
            .collect()
    }

    pub fn generate(&self, scores: &[f64]) -> Vec<Signal> {
        self.run(scores).into_iter().map(|s| s.signal).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn params(confirm: usize, cooldown: usize) -> SignalParams {
        SignalParams {
            buy_score: 60.0,
            sell_score: 40.0,
            buy_confirm_days: confirm,
            sell_confirm_days: confirm,
            cooldown_days: cooldown,
        }
    }

    #[test]
    fn buy_fires_on_second_confirmed_day() {
        let signals = SignalGenerator::new(params(2, 3)).generate(&[65.0, 66.0, 64.0, 63.0, 62.0]);
        assert_eq!(
            signals,
            vec![Signal::Hold, Signal::Buy, Signal::Hold, Signal::Hold, Signal::Hold]
        );
    }

    #[test]
    fn ready_is_a_pulse() {
        let steps = SignalGenerator::new(params(2, 3)).run(&[65.0, 66.0, 64.0, 50.0, 61.0, 62.0]);
        let ready: Vec<bool> = steps.iter().map(|s| s.buy_ready).collect();
        assert_eq!(ready, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn sell_blocked_inside_cooldown() {
        // BUY at D = 1, then a one-bar sell pulse at D + k for k in 1..=5.
        let p = SignalParams {
            sell_confirm_days: 1,
            ..params(2, 3)
        };
        for k in 1..=5usize {
            let mut scores = vec![65.0, 65.0];
            scores.extend(std::iter::repeat(50.0).take(k - 1));
            scores.push(30.0);
            scores.push(50.0);
            let steps = SignalGenerator::new(p).run(&scores);
            assert_eq!(steps[1].signal, Signal::Buy);
            let sell_at = 1 + k;
            assert!(steps[sell_at].sell_ready);
            if k < 3 {
                assert!(steps[sell_at].in_cooldown, "k = {k}");
                assert_eq!(steps[sell_at].signal, Signal::Hold, "k = {k}");
            } else {
                assert!(!steps[sell_at].in_cooldown, "k = {k}");
                assert_eq!(steps[sell_at].signal, Signal::Sell, "k = {k}");
            }
        }
    }

    #[test]
    fn blocked_pulse_then_sell_at_d_plus_3() {
        let p = SignalParams {
            sell_confirm_days: 1,
            ..params(2, 3)
        };
        // BUY at D = 1; sell pulses at D+1 (blocked) and D+3.
        let scores = [65.0, 65.0, 30.0, 50.0, 30.0];
        let signals = SignalGenerator::new(p).generate(&scores);
        assert_eq!(
            signals,
            vec![Signal::Hold, Signal::Buy, Signal::Hold, Signal::Hold, Signal::Sell]
        );
    }

    #[test]
    fn same_direction_is_never_cooled() {
        // Flat after a BUY only happens with a hand-built state.
        let state = SignalState {
            last_trade: Some(LastTrade {
                index: 0,
                direction: TradeDirection::Buy,
            }),
            index: 1,
            buy_run: 1,
            ..SignalState::default()
        };
        let (_, out) = step(&state, 70.0, &params(2, 3));
        assert!(out.buy_ready);
        assert!(!out.in_cooldown);
        assert_eq!(out.signal, Signal::Buy);
    }

    #[test]
    fn never_buys_while_long_nor_sells_while_flat() {
        let g = SignalGenerator::new(params(2, 2));
        let scores: Vec<f64> = (0..400u64)
            .map(|i| ((i * 37 + i * i * 11) % 100) as f64)
            .collect();
        let mut position = PositionState::Flat;
        for s in g.run(&scores) {
            match s.signal {
                Signal::Buy => {
                    assert_eq!(position, PositionState::Flat, "bar {}", s.index);
                    position = PositionState::Long;
                }
                Signal::Sell => {
                    assert_eq!(position, PositionState::Long, "bar {}", s.index);
                    position = PositionState::Flat;
                }
                Signal::Hold => {}
            }
        }
    }

    #[test]
    fn non_finite_scores_break_runs() {
        let signals = SignalGenerator::new(params(2, 3)).generate(&[65.0, f64::NAN, 65.0, 65.0]);
        assert_eq!(signals, vec![Signal::Hold, Signal::Hold, Signal::Hold, Signal::Buy]);
    }

    #[test]
    fn sell_without_position_is_hold() {
        let signals = SignalGenerator::new(params(1, 0)).generate(&[10.0, 10.0, 10.0]);
        assert!(signals.iter().all(|s| *s == Signal::Hold));
    }
}

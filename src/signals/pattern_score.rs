// =============================================================================
// Pattern Score — externally detected chart patterns mapped to 0..100
// =============================================================================
//
// Pattern recognition itself happens elsewhere; this module consumes its hits
// as `{date, pattern, direction, strength}` rows and scores the date:
//
//   score = 50 + 25 * sum(direction * strength)   over selected patterns
//
// clamped to [0, 100].  A date with no selected hit scores a neutral 50.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicators::stats::clamp_score;

/// One pattern detected on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHit {
    #[serde(alias = "Date", alias = "DATE")]
    pub date: NaiveDate,
    #[serde(alias = "Pattern", alias = "name")]
    pub pattern: String,
    /// +1 bullish, -1 bearish.
    #[serde(alias = "Direction")]
    pub direction: i8,
    /// Detector confidence in [0, 1].
    #[serde(alias = "Strength", default = "default_strength")]
    pub strength: f64,
}

fn default_strength() -> f64 {
    1.0
}

impl PatternHit {
    pub fn new(date: NaiveDate, pattern: impl Into<String>, direction: i8, strength: f64) -> Self {
        Self {
            date,
            pattern: pattern.into(),
            direction,
            strength,
        }
    }

    /// Signed contribution, `0` for malformed rows.
    fn weight(&self) -> f64 {
        let strength = if self.strength.is_finite() {
            self.strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
        f64::from(self.direction.signum()) * strength
    }
}

/// Pattern hits for one symbol, grouped by date.
#[derive(Debug, Clone, Default)]
pub struct PatternEvidence {
    by_date: BTreeMap<NaiveDate, Vec<PatternHit>>,
}

impl PatternEvidence {
    pub fn from_hits(hits: impl IntoIterator<Item = PatternHit>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<PatternHit>> = BTreeMap::new();
        for hit in hits {
            by_date.entry(hit.date).or_default().push(hit);
        }
        Self { by_date }
    }

    /// Read hits from a CSV with `date,pattern,direction,strength` columns.
    /// Unparseable rows are skipped with a warning.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open pattern file {}", path.display()))?;

        let mut hits = Vec::new();
        for (row, record) in reader.deserialize::<PatternHit>().enumerate() {
            match record {
                Ok(hit) => hits.push(hit),
                Err(e) => warn!(path = %path.display(), row, error = %e, "skipping pattern row"),
            }
        }
        info!(path = %path.display(), hits = hits.len(), "pattern evidence loaded");
        Ok(Self::from_hits(hits))
    }

    pub fn hits_on(&self, date: NaiveDate) -> &[PatternHit] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

/// Score of one date plus the names of the patterns that counted.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternScore {
    pub score: f64,
    pub matched: Vec<String>,
}

/// Score `hits` against the `selected` pattern names (case-insensitive).
pub fn pattern_score(hits: &[PatternHit], selected: &[String]) -> PatternScore {
    let selected: HashSet<String> = selected.iter().map(|s| s.trim().to_ascii_lowercase()).collect();

    let mut total = 0.0;
    let mut matched = Vec::new();
    for hit in hits {
        let name = hit.pattern.trim().to_ascii_lowercase();
        if !selected.contains(&name) {
            continue;
        }
        total += hit.weight();
        if !matched.contains(&name) {
            matched.push(name);
        }
    }

    PatternScore {
        score: clamp_score(50.0 + 25.0 * total),
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn selected() -> Vec<String> {
        vec!["hammer".into(), "bearish_engulfing".into()]
    }

    #[test]
    fn no_hits_is_neutral() {
        let s = pattern_score(&[], &selected());
        assert_eq!(s.score, 50.0);
        assert!(s.matched.is_empty());
    }

    #[test]
    fn unselected_patterns_are_ignored() {
        let hits = [PatternHit::new(d(1), "doji", 1, 1.0)];
        assert_eq!(pattern_score(&hits, &selected()).score, 50.0);
    }

    #[test]
    fn direction_and_strength_combine() {
        let hits = [
            PatternHit::new(d(1), "Hammer", 1, 0.8),
            PatternHit::new(d(1), "bearish_engulfing", -1, 0.4),
        ];
        let s = pattern_score(&hits, &selected());
        assert!((s.score - 60.0).abs() < 1e-12);
        assert_eq!(s.matched, vec!["hammer".to_string(), "bearish_engulfing".to_string()]);
    }

    #[test]
    fn many_hits_are_clamped() {
        let hits: Vec<PatternHit> = (0..10).map(|_| PatternHit::new(d(1), "hammer", 1, 1.0)).collect();
        assert_eq!(pattern_score(&hits, &selected()).score, 100.0);
        let weird = [PatternHit::new(d(1), "hammer", 1, f64::NAN)];
        assert_eq!(pattern_score(&weird, &selected()).score, 50.0);
    }

    #[test]
    fn evidence_loads_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAA.csv");
        std::fs::write(
            &path,
            "Date,Pattern,Direction,Strength\n2024-06-01,hammer,1,0.5\n2024-06-01,doji,1,1\nbad,row,x,y\n2024-06-03,bearish_engulfing,-1,1\n",
        )
        .unwrap();
        let evidence = PatternEvidence::load_csv(&path).unwrap();
        assert_eq!(evidence.hits_on(d(1)).len(), 2);
        assert!(evidence.hits_on(d(2)).is_empty());
        assert_eq!(pattern_score(evidence.hits_on(d(3)), &selected()).score, 25.0);
    }
}

// =============================================================================
// Regime Signal Engine — Batch Entry Point
// =============================================================================
//
// 1. Build the regime timeline once from the index series (history persisted
//    across runs).
// 2. Score every symbol CSV concurrently against that timeline.
// 3. Write one signal table per symbol plus the regime decisions.
//
// Paths come from the environment (a `.env` file is honoured):
//   ENGINE_CONFIG          runtime config JSON     (runtime_config.json)
//   ENGINE_INDEX_CSV       index bars              (required)
//   ENGINE_SYMBOL_DIR      one CSV per symbol      (data/symbols)
//   ENGINE_PATTERN_DIR     optional <SYMBOL>.csv pattern hits
//   ENGINE_OUTPUT_DIR      output directory        (output)
//   ENGINE_REGIME_HISTORY  regime history JSON     (data/regime_history.json)
//   ENGINE_SYMBOLS         optional comma-separated symbol filter
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use regime_signal_engine::output::{write_json, write_signals_csv};
use regime_signal_engine::regime::{JsonFileHistoryStore, RegimeHysteresis, RegimeTimeline};
use regime_signal_engine::signals::PatternEvidence;
use regime_signal_engine::{BarSeries, RegimeClassifier, RegimeTracker, RuntimeConfig, SymbolPipeline};

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Symbol CSVs in `dir`, sorted by symbol, optionally filtered.
fn discover_symbols(dir: &Path, filter: &[String]) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list symbol directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        let Some(symbol) = path.file_stem().and_then(|s| s.to_str()).map(str::to_uppercase) else {
            continue;
        };
        if filter.is_empty() || filter.contains(&symbol) {
            found.push((symbol, path));
        }
    }
    found.sort();
    Ok(found)
}

fn load_patterns(dir: Option<&Path>, symbol: &str) -> PatternEvidence {
    let Some(path) = dir.map(|d| d.join(format!("{symbol}.csv"))) else {
        return PatternEvidence::default();
    };
    if !path.exists() {
        return PatternEvidence::default();
    }
    PatternEvidence::load_csv(&path).unwrap_or_else(|e| {
        warn!(symbol, error = %e, "pattern evidence unreadable, scoring without it");
        PatternEvidence::default()
    })
}

fn score_symbol(
    symbol: &str,
    bars_path: &Path,
    pattern_dir: Option<&Path>,
    output_dir: &Path,
    pipeline: &SymbolPipeline,
    timeline: &RegimeTimeline,
) -> Result<usize> {
    let bars = BarSeries::load_csv(bars_path)?;
    let patterns = load_patterns(pattern_dir, symbol);
    let rows = pipeline.run(symbol, &bars, timeline, &patterns);
    write_signals_csv(output_dir.join(format!("{symbol}.csv")), &rows)?;
    Ok(rows.len())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Regime Signal Engine — batch run starting");

    let config_path = env_path("ENGINE_CONFIG", "runtime_config.json");
    let config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    let index_path = std::env::var("ENGINE_INDEX_CSV")
        .map(PathBuf::from)
        .context("ENGINE_INDEX_CSV must point at the index bar file")?;
    let symbol_dir = env_path("ENGINE_SYMBOL_DIR", "data/symbols");
    let pattern_dir = std::env::var("ENGINE_PATTERN_DIR").ok().map(PathBuf::from);
    let output_dir = env_path("ENGINE_OUTPUT_DIR", "output");
    let history_path = env_path("ENGINE_REGIME_HISTORY", "data/regime_history.json");

    let symbol_filter: Vec<String> = std::env::var("ENGINE_SYMBOLS")
        .map(|syms| {
            syms.split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    // ── 2. Regime timeline (once, for the index) ─────────────────────────
    let index = BarSeries::load_csv(&index_path)?;
    info!(path = %index_path.display(), bars = index.len(), "Index loaded");

    let store = Arc::new(Mutex::new(JsonFileHistoryStore::open(&history_path)));
    let tracker = RegimeTracker::new(
        RegimeClassifier::new(config.regime.clone()),
        RegimeHysteresis::new(store, config.hysteresis),
    );
    let regime_run = tokio::task::spawn_blocking(move || tracker.run(&index))
        .await
        .context("regime tracker task failed")?;

    if let Some(last) = regime_run.decisions.last() {
        info!(
            date = %last.date,
            classified = %last.classified,
            stabilized = %last.stabilized,
            confidence = format!("{:.2}", last.confidence),
            "Latest regime"
        );
    }
    write_json(output_dir.join("regime_decisions.json"), &regime_run.decisions)?;
    let timeline = Arc::new(regime_run.timeline);

    // ── 3. Score symbols concurrently ────────────────────────────────────
    let symbols = discover_symbols(&symbol_dir, &symbol_filter)?;
    if symbols.is_empty() {
        warn!(dir = %symbol_dir.display(), "No symbol files found");
    }
    info!(count = symbols.len(), "Scoring symbols");

    let pipeline = Arc::new(SymbolPipeline::from_config(&config));
    let pattern_dir = Arc::new(pattern_dir);
    let output_dir = Arc::new(output_dir);

    let mut handles = Vec::with_capacity(symbols.len());
    for (symbol, path) in symbols {
        let pipeline = pipeline.clone();
        let timeline = timeline.clone();
        let pattern_dir = pattern_dir.clone();
        let output_dir = output_dir.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let result = score_symbol(
                &symbol,
                &path,
                pattern_dir.as_deref(),
                &output_dir,
                &pipeline,
                &timeline,
            );
            (symbol, result)
        });
        handles.push(handle);
    }

    let mut scored = 0usize;
    let mut failed = 0usize;
    for handle in handles {
        match handle.await {
            Ok((_, Ok(_rows))) => scored += 1,
            Ok((symbol, Err(e))) => {
                failed += 1;
                error!(symbol = %symbol, error = format!("{e:#}"), "Symbol failed");
            }
            Err(e) => {
                failed += 1;
                error!(error = %e, "Symbol task panicked");
            }
        }
    }

    info!(scored, failed, output = %output_dir.display(), "Batch run complete");
    Ok(())
}

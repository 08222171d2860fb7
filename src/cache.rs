//! Memoization of compute results across repeated calls.
//!
//! `compute()` itself is stateless; callers that re-run the engine on every
//! UI tick or strategy step wrap it in a [`ComputeCache`]. The key pins the
//! series identity (symbol, timeframe, last bar timestamp) and the full
//! configuration fingerprint, so a new bar or any parameter change is
//! automatically a miss. Results are shared as `Arc` slices; hits clone the
//! pointer, never the lines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::TrendlineConfig;
use crate::{OHLCV, Result, ScoredLine, TrendlineEngine};

/// Identity of one memoized computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: String,
    /// Timestamp of the final bar; advancing data changes the key
    pub last_bar_ts: i64,
    /// [`TrendlineConfig::config_hash`] of the engine's configuration
    pub config_hash: u64,
}

/// Shared, thread-safe memoization layer over [`TrendlineEngine::compute`].
#[derive(Default)]
pub struct ComputeCache {
    entries: Arc<Mutex<HashMap<CacheKey, Arc<Vec<ScoredLine>>>>>,
}

impl Clone for ComputeCache {
    fn clone(&self) -> Self {
        // Clones share one underlying map.
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl ComputeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `(symbol, timeframe, bars, config)`,
    /// computing and storing it on a miss.
    ///
    /// A poisoned lock (a panic in another holder) falls back to computing
    /// without the cache rather than propagating the panic.
    pub fn get_or_compute<T: OHLCV>(
        &self,
        engine: &TrendlineEngine,
        symbol: &str,
        timeframe: &str,
        bars: &[T],
    ) -> Result<Arc<Vec<ScoredLine>>> {
        let last_bar_ts = bars
            .last()
            .and_then(|b| b.timestamp())
            .unwrap_or(bars.len() as i64 - 1);
        let key = CacheKey {
            symbol: symbol.to_owned(),
            timeframe: timeframe.to_owned(),
            last_bar_ts,
            config_hash: engine.config().config_hash(),
        };

        if let Ok(entries) = self.entries.lock() {
            if let Some(hit) = entries.get(&key) {
                return Ok(Arc::clone(hit));
            }
        }

        let computed = Arc::new(engine.compute(bars)?);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, Arc::clone(&computed));
        }
        Ok(computed)
    }

    /// Drop every entry for one symbol, across timeframes and configs.
    pub fn invalidate(&self, symbol: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|k, _| k.symbol != symbol);
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================
// TESTS
// ============================================================

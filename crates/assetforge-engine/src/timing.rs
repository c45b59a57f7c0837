//! Per-operation timing.
//!
//! The engine times each materializer call it makes (cache misses only) and
//! accumulates the durations by operation kind. [`TimerMap::render`] turns the
//! totals into the table printed by `--print_timers`.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use indexmap::IndexMap;

/// Accumulated calls and wall time for one operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStat {
    pub count: u64,
    pub total: Duration,
}

impl TimerStat {
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.count as f64),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerMap {
    timers: IndexMap<String, TimerStat>,
}

impl TimerMap {
    pub fn new() -> Self {
        TimerMap::default()
    }

    pub fn record(&mut self, kind: &str, elapsed: Duration) {
        if let Some(stat) = self.timers.get_mut(kind) {
            stat.count += 1;
            stat.total += elapsed;
            return;
        }
        self.timers.insert(
            kind.to_string(),
            TimerStat {
                count: 1,
                total: elapsed,
            },
        );
    }

    /// Starts a scoped timer that records under `kind` when stopped or dropped.
    pub fn start<'a>(&'a mut self, kind: &'a str) -> Stopwatch<'a> {
        Stopwatch {
            timers: self,
            kind,
            started: Instant::now(),
            stopped: false,
        }
    }

    pub fn get(&self, kind: &str) -> Option<TimerStat> {
        self.timers.get(kind).copied()
    }

    /// All timers, longest total first; ties broken by name.
    pub fn entries(&self) -> Vec<(&str, TimerStat)> {
        let mut entries: Vec<(&str, TimerStat)> = self
            .timers
            .iter()
            .map(|(kind, stat)| (kind.as_str(), *stat))
            .collect();
        entries.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Adds every timer from `other` into this map.
    pub fn merge(&mut self, other: &TimerMap) {
        for (kind, stat) in &other.timers {
            let mine = self.timers.entry(kind.clone()).or_default();
            mine.count += stat.count;
            mine.total += stat.total;
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Fixed-width table: kind, calls, total ms, mean ms.
    pub fn render(&self) -> String {
        let entries = self.entries();
        let width = entries
            .iter()
            .map(|(kind, _)| kind.len())
            .max()
            .unwrap_or(0)
            .max("operation".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}  {:>8}  {:>12}  {:>12}",
            "operation", "calls", "total ms", "mean ms"
        );
        for (kind, stat) in entries {
            let _ = writeln!(
                out,
                "{:<width$}  {:>8}  {:>12.3}  {:>12.3}",
                kind,
                stat.count,
                millis(stat.total),
                millis(stat.mean())
            );
        }
        out
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Scoped timer handed out by [`TimerMap::start`].
pub struct Stopwatch<'a> {
    timers: &'a mut TimerMap,
    kind: &'a str,
    started: Instant,
    stopped: bool,
}

impl Stopwatch<'_> {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records now and returns the measured duration.
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timers.record(self.kind, elapsed);
        }
        elapsed
    }
}

impl Drop for Stopwatch<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

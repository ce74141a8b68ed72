//! Session state: phases, laps, runs, ratings and history statistics.
//!
//! `TimerSession` is the single mutable aggregate the engine owns. It is
//! serialized verbatim to the `session` storage key; the current label has
//! its own key and the overflow sub-timers are rebuilt from wall clock, so
//! neither is part of the record.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::display::format_time;

/// Timer phase. `Completed` only ever appears in records persisted by
/// earlier revisions of the stored format; loading normalizes it to
/// `Ready` and no transition enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    Ready,
    Setup,
    HeistReady,
    Heist,
    Completed,
}

impl Phase {
    /// Human-readable status label.
    pub fn status_label(self) -> &'static str {
        match self {
            Phase::Ready => "Ready",
            Phase::Setup => "Setup Phase",
            Phase::HeistReady => "Ready for Heist",
            Phase::Heist => "Heist Phase",
            Phase::Completed => "Completed",
        }
    }
}

/// Relative classification of a lap against the other laps of the same
/// attempt. `Unset` serializes as the empty string, matching records of
/// laps captured before their attempt's ratings were computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Average,
    Slow,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Rating::Good => "good",
            Rating::Average => "average",
            Rating::Slow => "slow",
            Rating::Unset => "",
        };
        f.write_str(text)
    }
}

/// One completed setup interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SetupLap {
    pub duration_ms: u64,
    /// Formatted duration, derived once at capture.
    pub display: String,
    pub completed_at_ms: u64,
    pub rating: Rating,
    /// User-supplied name at capture time; may be empty.
    pub label: String,
}

impl SetupLap {
    /// Capture a lap of `duration_ms` finished at `completed_at_ms`.
    pub fn capture(duration_ms: u64, completed_at_ms: u64, label: &str) -> Self {
        Self {
            duration_ms,
            display: format_time(duration_ms),
            completed_at_ms,
            rating: Rating::Unset,
            label: label.to_string(),
        }
    }
}

/// One completed heist: the timed execution phase plus a snapshot of the
/// setup laps that led into it. Immutable after capture except for the
/// `failed` flag, which is derived across the whole history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HeistRun {
    pub heist_duration_ms: u64,
    pub total_duration_ms: u64,
    pub completed_at_ms: u64,
    pub setup_count: usize,
    pub label: String,
    pub laps: Vec<SetupLap>,
    /// True when a more recent run reused this run's non-empty label.
    pub failed: bool,
}

/// A sub-timer spawned while a single setup lap runs past the threshold.
/// Transient: rebuilt from wall clock, cleared on every exit from `Setup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowTimer {
    pub start_offset_ms: u64,
}

/// Aggregate statistics over the completed-run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_runs: usize,
    pub failed_runs: usize,
    pub total_setups: usize,
    pub best_lap_ms: Option<u64>,
    pub worst_lap_ms: Option<u64>,
    pub best_total_ms: Option<u64>,
}

/// The live session aggregate. Stored-field names follow the persisted
/// record shape (`pendingLaps`, `elapsedTotal`, ...); the aggregates are
/// redundant with the lap list and are recomputed on load rather than
/// trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerSession {
    pub phase: Phase,
    /// Laps of the in-progress attempt, most-recent first.
    pub pending_laps: Vec<SetupLap>,
    /// Finalized runs, most-recent first, unbounded.
    pub completed_runs: Vec<HeistRun>,
    #[serde(rename = "elapsedTotal")]
    pub elapsed_total_ms: u64,
    #[serde(rename = "setupElapsedTotal")]
    pub setup_elapsed_total_ms: u64,
    #[serde(rename = "overallStart")]
    pub overall_start_ms: u64,
    #[serde(rename = "lapStart")]
    pub lap_start_ms: u64,
    #[serde(rename = "heistStart")]
    pub heist_start_ms: u64,
    #[serde(rename = "lastLapDuration")]
    pub last_lap_duration_ms: u64,
    #[serde(skip)]
    pub current_label: String,
    #[serde(skip)]
    pub overflow_timers: Vec<OverflowTimer>,
}

impl TimerSession {
    /// Sum of pending lap durations. The persisted `setupElapsedTotal` is
    /// redundant with this and always recomputed from it.
    pub fn pending_total_ms(&self) -> u64 {
        self.pending_laps.iter().map(|lap| lap.duration_ms).sum()
    }

    /// Aggregate statistics across all completed runs.
    pub fn history_stats(&self) -> HistoryStats {
        let lap_durations = || {
            self.completed_runs
                .iter()
                .flat_map(|run| &run.laps)
                .map(|lap| lap.duration_ms)
        };
        HistoryStats {
            total_runs: self.completed_runs.len(),
            failed_runs: self.completed_runs.iter().filter(|run| run.failed).count(),
            total_setups: self.completed_runs.iter().map(|run| run.setup_count).sum(),
            best_lap_ms: lap_durations().min(),
            worst_lap_ms: lap_durations().max(),
            best_total_ms: self
                .completed_runs
                .iter()
                .map(|run| run.total_duration_ms)
                .min(),
        }
    }

    /// Normalize a freshly-loaded record: the legacy `completed` phase
    /// becomes `ready` and every derived field is recomputed.
    pub fn normalize(&mut self) {
        if self.phase == Phase::Completed {
            self.phase = Phase::Ready;
        }
        self.setup_elapsed_total_ms = self.pending_total_ms();
        self.elapsed_total_ms = self.setup_elapsed_total_ms;
        if let Some(latest) = self.pending_laps.first() {
            self.last_lap_duration_ms = latest.duration_ms;
        }
        recompute_ratings(&mut self.pending_laps);
        recompute_failed(&mut self.completed_runs);
        self.overflow_timers.clear();
    }
}

/// Recompute ratings across `laps`: the global minimum duration is `Good`,
/// the global maximum `Slow`, everything else `Average`. Ties keep the
/// earliest candidate in iteration order; a lone lap rates `Good`.
pub fn recompute_ratings(laps: &mut [SetupLap]) {
    if laps.is_empty() {
        return;
    }
    let mut min_index = 0;
    let mut max_index = 0;
    for (index, lap) in laps.iter().enumerate() {
        if lap.duration_ms < laps[min_index].duration_ms {
            min_index = index;
        }
        if lap.duration_ms > laps[max_index].duration_ms {
            max_index = index;
        }
    }
    for (index, lap) in laps.iter_mut().enumerate() {
        lap.rating = if index == min_index {
            Rating::Good
        } else if index == max_index {
            Rating::Slow
        } else {
            Rating::Average
        };
    }
}

/// Mark label collisions across `runs` (most-recent first): the first run
/// carrying a given non-empty trimmed label keeps `failed = false`, every
/// older run with the same label is marked failed. Unlabeled runs are
/// never failed.
pub fn recompute_failed(runs: &mut [HeistRun]) {
    let mut seen: HashSet<String> = HashSet::new();
    for run in runs.iter_mut() {
        let label = run.label.trim();
        if label.is_empty() {
            run.failed = false;
            continue;
        }
        run.failed = !seen.insert(label.to_string());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change in the engine produces an Event.
/// Shells receive them from commands and poll `snapshot()` between ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SetupStarted {
        /// 1-based position of the lap being attempted within the attempt.
        lap_number: usize,
        at: DateTime<Utc>,
    },
    SetupCompleted {
        duration_ms: u64,
        display: String,
        at: DateTime<Utc>,
    },
    HeistStarted {
        setup_count: usize,
        at: DateTime<Utc>,
    },
    HeistCompleted {
        heist_duration_ms: u64,
        total_duration_ms: u64,
        setup_count: usize,
        at: DateTime<Utc>,
    },
    /// Reset was requested without `force`; the shell should confirm with
    /// the user before calling `reset(true)`.
    ResetRequested {
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    HistoryCleared {
        at: DateTime<Utc>,
    },
    /// A setup lap ran long enough to spawn overflow sub-timer `index`.
    OverflowSpawned {
        index: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        status: String,
        display: String,
        ring_fraction: f64,
        ring_color: String,
        setup_elapsed_total_ms: u64,
        pending_lap_count: usize,
        completed_run_count: usize,
        at: DateTime<Utc>,
    },
}

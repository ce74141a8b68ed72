//! Phase timer engine.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically while `is_ticking()` reports an active interval.
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Setup <-> HeistReady -> Heist -> Ready
//! ```
//!
//! `HeistReady -> Setup` adds another lap to the same attempt. Commands
//! issued from any other phase are silent no-ops: duplicate or late shell
//! events must be tolerated, so invalid transitions are not errors.
//!
//! Elapsed time is always recomputed from `now - start`, never
//! accumulated, so missed ticks self-correct on the next one.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::display::{self, format_time, OverflowRing, RingState, OVERFLOW_THRESHOLD_MS};
use super::session::{
    recompute_failed, recompute_ratings, HeistRun, HistoryStats, OverflowTimer, Phase, SetupLap,
    TimerSession,
};
use crate::events::Event;
use crate::storage::Store;

const SESSION_KEY: &str = "session";
const LABEL_KEY: &str = "current_label";

/// Which transition commands the current phase admits. Shells use this to
/// enable/disable their controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMask {
    pub start_setup: bool,
    pub complete_setup: bool,
    pub start_heist: bool,
    pub complete_heist: bool,
}

/// The phase timer state machine.
///
/// Owns the [`TimerSession`] and, when constructed with [`PhaseTimer::load`],
/// a [`Store`] it writes through after every transition that changes the
/// pending laps, the run history or the phase. It is the sole writer of its
/// two keys.
pub struct PhaseTimer {
    session: TimerSession,
    ticking: bool,
    store: Option<Box<dyn Store>>,
}

impl PhaseTimer {
    /// Create an engine with a fresh session and no persistence.
    pub fn new() -> Self {
        Self {
            session: TimerSession::default(),
            ticking: false,
            store: None,
        }
    }

    /// Create an engine backed by `store`, restoring any persisted session
    /// and label. Missing or corrupt fields default independently and
    /// derived fields are recomputed rather than trusted; this never fails.
    pub fn load(store: Box<dyn Store>) -> Self {
        let mut session = store
            .get(SESSION_KEY)
            .and_then(|json| match serde_json::from_str::<TimerSession>(&json) {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!("discarding unreadable session record: {err}");
                    None
                }
            })
            .unwrap_or_default();
        session.current_label = store.get(LABEL_KEY).unwrap_or_default();
        session.normalize();
        let ticking = matches!(session.phase, Phase::Setup | Phase::Heist);
        Self {
            session,
            ticking,
            store: Some(store),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a setup lap. Allowed from `Ready` or `HeistReady`.
    ///
    /// Restarting from `HeistReady` without changing a non-empty label is
    /// treated as resuming the same attempt: the pending laps are
    /// abandoned, not folded into a new attempt.
    pub fn start_setup(&mut self) -> Option<Event> {
        self.start_setup_at(now_ms())
    }

    /// [`Self::start_setup`] against an explicit epoch-milliseconds clock.
    pub fn start_setup_at(&mut self, now_ms: u64) -> Option<Event> {
        if !matches!(self.session.phase, Phase::Ready | Phase::HeistReady) {
            return None;
        }
        if self.session.phase == Phase::HeistReady && self.resuming_same_attempt() {
            debug!("label unchanged since last lap; abandoning pending attempt");
            self.session.pending_laps.clear();
            self.session.setup_elapsed_total_ms = 0;
            self.session.elapsed_total_ms = 0;
            self.session.last_lap_duration_ms = 0;
        }
        self.session.phase = Phase::Setup;
        self.session.lap_start_ms = now_ms;
        if self.session.pending_laps.is_empty() {
            self.session.overall_start_ms = now_ms;
        }
        self.session.overflow_timers.clear();
        self.ticking = true;
        self.persist_session();
        Some(Event::SetupStarted {
            lap_number: self.session.pending_laps.len() + 1,
            at: at(now_ms),
        })
    }

    /// Complete the running setup lap. Allowed only from `Setup`.
    pub fn complete_setup(&mut self) -> Option<Event> {
        self.complete_setup_at(now_ms())
    }

    /// [`Self::complete_setup`] against an explicit clock.
    pub fn complete_setup_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.session.phase != Phase::Setup {
            return None;
        }
        let duration_ms = now_ms.saturating_sub(self.session.lap_start_ms);
        let lap = SetupLap::capture(duration_ms, now_ms, &self.session.current_label);
        let display = lap.display.clone();
        self.session.pending_laps.insert(0, lap);
        self.session.setup_elapsed_total_ms += duration_ms;
        self.session.elapsed_total_ms = self.session.setup_elapsed_total_ms;
        self.session.last_lap_duration_ms = duration_ms;
        self.session.lap_start_ms = 0;
        recompute_ratings(&mut self.session.pending_laps);
        self.session.overflow_timers.clear();
        self.session.phase = Phase::HeistReady;
        self.ticking = false;
        self.persist_session();
        Some(Event::SetupCompleted {
            duration_ms,
            display,
            at: at(now_ms),
        })
    }

    /// Start the heist phase. Allowed only from `HeistReady`.
    pub fn start_heist(&mut self) -> Option<Event> {
        self.start_heist_at(now_ms())
    }

    /// [`Self::start_heist`] against an explicit clock.
    pub fn start_heist_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.session.phase != Phase::HeistReady {
            return None;
        }
        self.session.phase = Phase::Heist;
        self.session.heist_start_ms = now_ms;
        self.ticking = true;
        self.persist_session();
        Some(Event::HeistStarted {
            setup_count: self.session.pending_laps.len(),
            at: at(now_ms),
        })
    }

    /// Complete the heist, fold the pending laps into a finalized run and
    /// return the session to `Ready`. Allowed only from `Heist`.
    pub fn complete_heist(&mut self) -> Option<Event> {
        self.complete_heist_at(now_ms())
    }

    /// [`Self::complete_heist`] against an explicit clock.
    pub fn complete_heist_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.session.phase != Phase::Heist {
            return None;
        }
        let heist_duration_ms = now_ms.saturating_sub(self.session.heist_start_ms);
        let total_duration_ms = self.session.setup_elapsed_total_ms + heist_duration_ms;
        let setup_count = self.session.pending_laps.len();
        let run = HeistRun {
            heist_duration_ms,
            total_duration_ms,
            completed_at_ms: now_ms,
            setup_count,
            label: self.session.current_label.clone(),
            laps: self.session.pending_laps.clone(),
            failed: false,
        };
        self.session.completed_runs.insert(0, run);
        recompute_failed(&mut self.session.completed_runs);
        self.session.pending_laps.clear();
        self.session.setup_elapsed_total_ms = 0;
        self.session.elapsed_total_ms = total_duration_ms;
        self.session.last_lap_duration_ms = 0;
        self.session.overall_start_ms = 0;
        self.session.lap_start_ms = 0;
        self.session.heist_start_ms = 0;
        self.session.overflow_timers.clear();
        self.session.phase = Phase::Ready;
        self.ticking = false;
        self.persist_session();
        Some(Event::HeistCompleted {
            heist_duration_ms,
            total_duration_ms,
            setup_count,
            at: at(now_ms),
        })
    }

    /// Reset the in-progress attempt.
    ///
    /// Without `force` this only signals that the shell should confirm
    /// with the user; no state changes. With `force` the attempt is
    /// dropped and the phase returns to `Ready`. Run history is untouched
    /// either way - clearing it is a separate explicit operation.
    pub fn reset(&mut self, force: bool) -> Option<Event> {
        self.reset_at(force, now_ms())
    }

    /// [`Self::reset`] against an explicit clock.
    pub fn reset_at(&mut self, force: bool, now_ms: u64) -> Option<Event> {
        if !force {
            return Some(Event::ResetRequested { at: at(now_ms) });
        }
        self.ticking = false;
        self.session.phase = Phase::Ready;
        self.session.pending_laps.clear();
        self.session.setup_elapsed_total_ms = 0;
        self.session.elapsed_total_ms = 0;
        self.session.last_lap_duration_ms = 0;
        self.session.overall_start_ms = 0;
        self.session.lap_start_ms = 0;
        self.session.heist_start_ms = 0;
        self.session.overflow_timers.clear();
        self.persist_session();
        Some(Event::TimerReset { at: at(now_ms) })
    }

    /// Clear the completed-run history. Never implied by [`Self::reset`].
    pub fn clear_history(&mut self) -> Option<Event> {
        self.clear_history_at(now_ms())
    }

    /// [`Self::clear_history`] against an explicit clock.
    pub fn clear_history_at(&mut self, now_ms: u64) -> Option<Event> {
        self.session.completed_runs.clear();
        self.persist_session();
        Some(Event::HistoryCleared { at: at(now_ms) })
    }

    /// Set the label applied to the next captured lap and run. Persisted
    /// under its own key, independently of the session record.
    pub fn set_label(&mut self, text: &str) {
        self.session.current_label = text.to_string();
        self.persist_label();
    }

    /// Drive whichever transition the current phase admits - a convenience
    /// for single-control shells.
    pub fn advance(&mut self) -> Option<Event> {
        self.advance_at(now_ms())
    }

    /// [`Self::advance`] against an explicit clock.
    pub fn advance_at(&mut self, now_ms: u64) -> Option<Event> {
        match self.session.phase {
            Phase::Ready => self.start_setup_at(now_ms),
            Phase::Setup => self.complete_setup_at(now_ms),
            Phase::HeistReady => self.start_heist_at(now_ms),
            Phase::Heist => self.complete_heist_at(now_ms),
            Phase::Completed => None,
        }
    }

    /// Call periodically while [`Self::is_ticking`]. During a setup lap
    /// this reconciles the overflow sub-timers against the wall clock and
    /// reports a newly-spawned one; in every other phase it is a no-op.
    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    /// [`Self::tick`] against an explicit clock.
    pub fn tick_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.session.phase != Phase::Setup {
            return None;
        }
        let elapsed = self.lap_elapsed_at(now_ms);
        let target = expected_overflow_count(elapsed);
        let mut spawned = None;
        while self.session.overflow_timers.len() < target {
            let index = self.session.overflow_timers.len() + 1;
            self.session.overflow_timers.push(OverflowTimer {
                start_offset_ms: index as u64 * OVERFLOW_THRESHOLD_MS,
            });
            debug!("overflow sub-timer {index} spawned at {elapsed}ms into the lap");
            spawned = Some(Event::OverflowSpawned {
                index,
                at: at(now_ms),
            });
        }
        spawned
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn status_label(&self) -> &'static str {
        self.session.phase.status_label()
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn current_label(&self) -> &str {
        &self.session.current_label
    }

    /// Whether the shell should keep polling `tick()`.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Laps of the in-progress attempt, most-recent first.
    pub fn setup_laps(&self) -> &[SetupLap] {
        &self.session.pending_laps
    }

    /// Finalized runs, most-recent first.
    pub fn heist_runs(&self) -> &[HeistRun] {
        &self.session.completed_runs
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.session.history_stats()
    }

    pub fn button_mask(&self) -> ButtonMask {
        ButtonMask {
            start_setup: matches!(self.session.phase, Phase::Ready | Phase::HeistReady),
            complete_setup: self.session.phase == Phase::Setup,
            start_heist: self.session.phase == Phase::HeistReady,
            complete_heist: self.session.phase == Phase::Heist,
        }
    }

    /// The big timer readout for the current instant.
    pub fn display_string(&self) -> String {
        self.display_string_at(now_ms())
    }

    /// [`Self::display_string`] against an explicit clock.
    pub fn display_string_at(&self, now_ms: u64) -> String {
        let shown = match self.session.phase {
            Phase::Setup => self.lap_elapsed_at(now_ms),
            Phase::Heist => self.total_elapsed_at(now_ms),
            Phase::Completed => self
                .session
                .completed_runs
                .first()
                .map(|run| run.total_duration_ms)
                .unwrap_or(self.session.setup_elapsed_total_ms),
            Phase::Ready | Phase::HeistReady => 0,
        };
        format_time(shown)
    }

    /// Primary ring for the current instant.
    ///
    /// During a setup lap the ring fills toward the threshold and the
    /// color walks the gradient; once the first overflow sub-timer exists
    /// the ring stays pinned at full dark-red until the lap ends. During a
    /// heist the ring is complete throughout, colored by total elapsed.
    /// Otherwise the ring is empty.
    pub fn ring_state(&self) -> RingState {
        self.ring_state_at(now_ms())
    }

    /// [`Self::ring_state`] against an explicit clock.
    pub fn ring_state_at(&self, now_ms: u64) -> RingState {
        match self.session.phase {
            Phase::Setup => {
                let elapsed = self.lap_elapsed_at(now_ms);
                if self.session.overflow_timers.is_empty() {
                    display::ring_state(elapsed)
                } else {
                    RingState {
                        fraction: 1.0,
                        color: display::ring_color(elapsed),
                    }
                }
            }
            Phase::Heist => RingState {
                fraction: 1.0,
                color: display::ring_color(self.total_elapsed_at(now_ms)),
            },
            _ => RingState {
                fraction: 0.0,
                color: display::ring_color(0),
            },
        }
    }

    /// Ring states of the overflow sub-timers, oldest first. Empty outside
    /// of `Setup`.
    pub fn overflow_rings(&self) -> Vec<OverflowRing> {
        self.overflow_rings_at(now_ms())
    }

    /// [`Self::overflow_rings`] against an explicit clock.
    pub fn overflow_rings_at(&self, now_ms: u64) -> Vec<OverflowRing> {
        if self.session.phase != Phase::Setup {
            return Vec::new();
        }
        let elapsed = self.lap_elapsed_at(now_ms);
        self.session
            .overflow_timers
            .iter()
            .map(|timer| {
                let local = elapsed.saturating_sub(timer.start_offset_ms);
                OverflowRing {
                    fraction: display::ring_fraction(local),
                    color: display::ring_color(local),
                    local_elapsed_ms: local,
                    local_elapsed_display: format_time(local),
                }
            })
            .collect()
    }

    /// Full state snapshot event for shells that poll.
    pub fn snapshot(&self) -> Event {
        self.snapshot_at(now_ms())
    }

    /// [`Self::snapshot`] against an explicit clock.
    pub fn snapshot_at(&self, now_ms: u64) -> Event {
        let ring = self.ring_state_at(now_ms);
        Event::StateSnapshot {
            phase: self.session.phase,
            status: self.session.phase.status_label().to_string(),
            display: self.display_string_at(now_ms),
            ring_fraction: ring.fraction,
            ring_color: ring.color.to_string(),
            setup_elapsed_total_ms: self.session.setup_elapsed_total_ms,
            pending_lap_count: self.session.pending_laps.len(),
            completed_run_count: self.session.completed_runs.len(),
            at: at(now_ms),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn resuming_same_attempt(&self) -> bool {
        let current = self.session.current_label.trim();
        if current.is_empty() {
            return false;
        }
        self.session
            .pending_laps
            .first()
            .map(|lap| {
                let last = lap.label.trim();
                !last.is_empty() && last == current
            })
            .unwrap_or(false)
    }

    fn lap_elapsed_at(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.session.lap_start_ms)
    }

    fn total_elapsed_at(&self, now_ms: u64) -> u64 {
        self.session.setup_elapsed_total_ms + now_ms.saturating_sub(self.session.heist_start_ms)
    }

    fn persist_session(&self) {
        let Some(store) = &self.store else {
            return;
        };
        match serde_json::to_string(&self.session) {
            Ok(json) => store.set(SESSION_KEY, &json),
            Err(err) => warn!("failed to serialize session record: {err}"),
        }
    }

    fn persist_label(&self) {
        if let Some(store) = &self.store {
            store.set(LABEL_KEY, &self.session.current_label);
        }
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PhaseTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseTimer")
            .field("session", &self.session)
            .field("ticking", &self.ticking)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

/// Sub-timers spawn on threshold crossings beyond the first: the first
/// crossing pins the primary ring, and the k-th sub-timer appears once the
/// lap passes (k+1) thresholds, tracking time past k of them.
fn expected_overflow_count(lap_elapsed_ms: u64) -> usize {
    (lap_elapsed_ms / OVERFLOW_THRESHOLD_MS).saturating_sub(1) as usize
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn at(now_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_else(Utc::now)
}

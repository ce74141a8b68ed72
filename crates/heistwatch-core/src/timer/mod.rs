mod display;
mod engine;
mod session;

pub use display::{
    format_time, ring_color, ring_fraction, OverflowRing, Rgb, RingState, OVERFLOW_THRESHOLD_MS,
};
pub use engine::{ButtonMask, PhaseTimer};
pub use session::{
    recompute_failed, recompute_ratings, HeistRun, HistoryStats, OverflowTimer, Phase, Rating,
    SetupLap, TimerSession,
};

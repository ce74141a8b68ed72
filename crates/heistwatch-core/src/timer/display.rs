//! Display-value derivation.
//!
//! Pure functions: the engine computes readout strings, ring fractions and
//! gradient colors here and hands them to whatever renderer the shell uses.
//! Nothing in this module touches presentation.

use serde::{Deserialize, Serialize};

/// Nominal setup-lap threshold: seven minutes.
pub const OVERFLOW_THRESHOLD_MS: u64 = 7 * 60 * 1000;

const GREEN: Rgb = Rgb(56, 184, 184);
const YELLOW: Rgb = Rgb(255, 184, 0);
const RED: Rgb = Rgb(255, 69, 0);
const DARK_RED: Rgb = Rgb(139, 0, 0);

/// An RGB color. Displays CSS-style as `rgb(r, g, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Fraction and color of the primary progress ring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RingState {
    pub fraction: f64,
    pub color: Rgb,
}

/// Fraction, color and readout of one overflow sub-timer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverflowRing {
    pub fraction: f64,
    pub color: Rgb,
    pub local_elapsed_ms: u64,
    pub local_elapsed_display: String,
}

/// Format milliseconds as `MM:SS` once a full minute has elapsed, otherwise
/// `SS.HH` with hundredths.
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else {
        let hundredths = (ms % 1000) / 10;
        format!("{seconds:02}.{hundredths:02}")
    }
}

/// Progress fraction for `elapsed_ms` of the active lap. Pins at 1.0 once
/// the threshold is reached; past that, overflow sub-timers take over.
pub fn ring_fraction(elapsed_ms: u64) -> f64 {
    (elapsed_ms as f64 / OVERFLOW_THRESHOLD_MS as f64).min(1.0)
}

/// Ring color for `elapsed_ms`: green fades to yellow over the first
/// minute, yellow to red until five minutes, red to dark red until seven,
/// constant dark red past that.
pub fn ring_color(elapsed_ms: u64) -> Rgb {
    match elapsed_ms {
        t if t < 60_000 => lerp(GREEN, YELLOW, t as f64 / 60_000.0),
        t if t < 300_000 => lerp(YELLOW, RED, (t - 60_000) as f64 / 240_000.0),
        t if t < 420_000 => lerp(RED, DARK_RED, (t - 300_000) as f64 / 120_000.0),
        _ => DARK_RED,
    }
}

/// Primary ring fraction and color for `elapsed_ms`.
pub fn ring_state(elapsed_ms: u64) -> RingState {
    RingState {
        fraction: ring_fraction(elapsed_ms),
        color: ring_color(elapsed_ms),
    }
}

fn lerp(from: Rgb, to: Rgb, t: f64) -> Rgb {
    Rgb(
        lerp_channel(from.0, to.0, t),
        lerp_channel(from.1, to.1, t),
        lerp_channel(from.2, to.2, t),
    )
}

fn lerp_channel(from: u8, to: u8, t: f64) -> u8 {
    (from as f64 + (to as f64 - from as f64) * t).floor() as u8
}

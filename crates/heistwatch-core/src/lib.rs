//! # Heistwatch Core Library
//!
//! Core business logic for Heistwatch, a two-phase activity timer: time a
//! sequence of "setup" laps, then the "heist" itself, keep history, and
//! derive everything a renderer needs -- formatted readouts, progress-ring
//! fractions, gradient colors and overflow sub-timers.
//!
//! ## Architecture
//!
//! - **Phase timer**: a wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` for progress updates
//! - **Storage**: SQLite-backed key-value persistence of the session
//!   record, plus TOML-based configuration
//! - **Display**: pure derivation of readouts, ring fractions and colors;
//!   rendering itself is a consumer concern
//!
//! ## Key Components
//!
//! - [`PhaseTimer`]: the state machine
//! - [`TimerSession`]: the owned session aggregate it mutates
//! - [`Database`]: persisted key-value state
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use storage::{Config, Database, MemoryStore, Store};
pub use timer::{
    ButtonMask, HeistRun, HistoryStats, Phase, PhaseTimer, Rating, SetupLap, TimerSession,
};

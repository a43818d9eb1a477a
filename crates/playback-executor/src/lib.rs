//! Playback command execution.
//!
//! Runs inside a rendering context. A request is applied to the first media
//! element the context's `MediaLocator` finds; seeks are bounded by
//! `[0, duration]` and rate changes by
//! `[MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE]`.

mod engine;
mod error;
mod simulated;
mod target;

pub use engine::{
    seek_backward_target, seek_forward_target, speed_down_target, speed_up_target,
    ExecutionEngine, DEFAULT_SEEK_AMOUNT, DEFAULT_SPEED_DELTA, MAX_PLAYBACK_RATE,
    MIN_PLAYBACK_RATE,
};
pub use error::{EngineResult, ExecutionError, MediaError};
pub use simulated::SimulatedVideo;
pub use target::{MediaLocator, MediaTarget};

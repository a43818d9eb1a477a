//! Command application.

use crate::{EngineResult, ExecutionError, MediaLocator, MediaTarget};
use playback_protocol_types::{CommandType, ExecutionResult, FrameRequest};
use tracing::{info, warn};

/// Lowest playback rate a speed command can reach.
pub const MIN_PLAYBACK_RATE: f64 = 0.1;

/// Highest playback rate a speed command can reach.
pub const MAX_PLAYBACK_RATE: f64 = 4.0;

/// Rate step used when a speed command carries no amount.
pub const DEFAULT_SPEED_DELTA: f64 = 0.1;

/// Seek step used when a seek command carries no amount.
pub const DEFAULT_SEEK_AMOUNT: f64 = 0.0;

/// Applies frame requests to the media element of one rendering context.
pub struct ExecutionEngine<L> {
    locator: L,
}

impl<L: MediaLocator> ExecutionEngine<L> {
    pub fn new(locator: L) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Apply `request` and report the outcome. Never panics on bad input.
    pub fn execute(&mut self, request: &FrameRequest) -> ExecutionResult {
        match self.apply(request) {
            Ok(()) => ExecutionResult::ok(),
            Err(e) => {
                warn!(command_type = %request.command_type, error = %e, "Command not applied");
                ExecutionResult::failed(e.to_string())
            }
        }
    }

    fn apply(&mut self, request: &FrameRequest) -> EngineResult<()> {
        let media = self
            .locator
            .find_media()
            .ok_or(ExecutionError::TargetNotFound)?;
        let command_type = request
            .parsed_type()
            .map_err(|e| ExecutionError::UnknownCommandType(e.0))?;

        apply_to(media, command_type, request.amount)
    }
}

fn apply_to(
    media: &mut dyn MediaTarget,
    command_type: CommandType,
    amount: Option<f64>,
) -> EngineResult<()> {
    match command_type {
        CommandType::Play => {
            media.play()?;
            info!("Playing");
        }
        CommandType::Pause => {
            media.pause()?;
            info!("Paused");
        }
        CommandType::SeekForward => {
            let amount = amount.unwrap_or(DEFAULT_SEEK_AMOUNT);
            let target = seek_forward_target(media.current_time(), amount, media.duration());
            media.set_current_time(target)?;
            info!(amount, position = target, "Seeked forward");
        }
        CommandType::SeekBackward => {
            let amount = amount.unwrap_or(DEFAULT_SEEK_AMOUNT);
            let target = seek_backward_target(media.current_time(), amount);
            media.set_current_time(target)?;
            info!(amount, position = target, "Seeked backward");
        }
        CommandType::SpeedUp => {
            let amount = amount.unwrap_or(DEFAULT_SPEED_DELTA);
            let rate = speed_up_target(media.playback_rate(), amount);
            media.set_playback_rate(rate)?;
            info!(rate, "Speed up");
        }
        CommandType::SpeedDown => {
            let amount = amount.unwrap_or(DEFAULT_SPEED_DELTA);
            let rate = speed_down_target(media.playback_rate(), amount);
            media.set_playback_rate(rate)?;
            info!(rate, "Speed down");
        }
    }
    Ok(())
}

/// Forward seeks stop at the end; an unknown length pins the position to 0.
pub fn seek_forward_target(position: f64, amount: f64, duration: Option<f64>) -> f64 {
    let end = duration.filter(|d| !d.is_nan()).unwrap_or(0.0);
    (position + amount).min(end)
}

pub fn seek_backward_target(position: f64, amount: f64) -> f64 {
    (position - amount).max(0.0)
}

pub fn speed_up_target(rate: f64, amount: f64) -> f64 {
    (rate + amount).min(MAX_PLAYBACK_RATE)
}

pub fn speed_down_target(rate: f64, amount: f64) -> f64 {
    (rate - amount).max(MIN_PLAYBACK_RATE)
}

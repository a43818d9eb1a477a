//! Simulated media element.

use crate::{MediaError, MediaTarget};

/// In-process stand-in for a video element. Starts paused at 0s and 1x.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedVideo {
    current_time: f64,
    duration: Option<f64>,
    playback_rate: f64,
    paused: bool,
    failure: Option<MediaError>,
}

impl SimulatedVideo {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            current_time: 0.0,
            duration,
            playback_rate: 1.0,
            paused: true,
            failure: None,
        }
    }

    pub fn with_position(mut self, seconds: f64) -> Self {
        self.current_time = seconds;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    /// Every mutating call fails with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(MediaError::new(message));
        self
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn check(&self) -> Result<(), MediaError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl MediaTarget for SimulatedVideo {
    fn play(&mut self) -> Result<(), MediaError> {
        self.check()?;
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.check()?;
        self.paused = true;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<(), MediaError> {
        self.check()?;
        self.current_time = seconds;
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<(), MediaError> {
        self.check()?;
        self.playback_rate = rate;
        Ok(())
    }
}

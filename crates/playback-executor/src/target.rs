//! Media target seams.

use crate::MediaError;

/// A controllable media element.
///
/// Times are in seconds. Setters may fail; the failure message is reported
/// back to the caller verbatim.
pub trait MediaTarget: Send {
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self) -> Result<(), MediaError>;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64) -> Result<(), MediaError>;

    /// Total length, or `None` while unknown (for example before metadata
    /// has loaded). A NaN duration is treated as unknown.
    fn duration(&self) -> Option<f64>;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&mut self, rate: f64) -> Result<(), MediaError>;
}

/// Finds the media element in one rendering context.
pub trait MediaLocator: Send {
    /// The first media element in the context, if any.
    fn find_media(&mut self) -> Option<&mut dyn MediaTarget>;
}

impl<T: MediaTarget> MediaLocator for Option<T> {
    fn find_media(&mut self) -> Option<&mut dyn MediaTarget> {
        self.as_mut().map(|target| target as &mut dyn MediaTarget)
    }
}

//! Delivery of playback requests into rendering contexts.
//!
//! The relay hands each command to a `FrameDispatcher`, which picks the first
//! context whose URL matches the target-site `MatchPattern` and fans the
//! request out to all of its frames through a `RenderingHost`. Only frames
//! holding a media element can act on it; the others answer with a failure
//! that is logged and otherwise ignored.

mod dispatcher;
mod error;
mod host;
mod memory;
mod pattern;

pub use dispatcher::{DispatchReport, FrameDispatcher, FrameOutcome};
pub use error::{DeliveryError, PatternError};
pub use host::{ContextId, FrameId, RenderingContext, RenderingHost};
pub use memory::InMemoryHost;
pub use pattern::MatchPattern;

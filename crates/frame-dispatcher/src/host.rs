//! Rendering host seam.

use crate::DeliveryError;
use async_trait::async_trait;
use playback_protocol_types::{ExecutionResult, FrameRequest};
use std::fmt;

/// Identifies a rendering context (a tab) within its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a frame within a rendering context. Frame 0 is the top frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

impl FrameId {
    pub const TOP: FrameId = FrameId(0);
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rendering context as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingContext {
    pub id: ContextId,
    pub url: String,
}

/// The environment that owns rendering contexts and their frames.
#[async_trait]
pub trait RenderingHost: Send + Sync {
    /// All open contexts, in host order.
    async fn query_contexts(&self) -> Result<Vec<RenderingContext>, DeliveryError>;

    /// Frames currently present in `context`.
    async fn list_frames(&self, context: ContextId) -> Result<Vec<FrameId>, DeliveryError>;

    /// Deliver `request` to one frame and wait for its reply.
    async fn send_to_frame(
        &self,
        context: ContextId,
        frame: FrameId,
        request: &FrameRequest,
    ) -> Result<ExecutionResult, DeliveryError>;
}

//! In-process rendering host.

use crate::{ContextId, DeliveryError, FrameId, RenderingContext, RenderingHost};
use async_trait::async_trait;
use playback_executor::{ExecutionEngine, SimulatedVideo};
use playback_protocol_types::{ExecutionResult, FrameRequest};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

enum HostedFrame {
    /// A frame running an execution engine, with or without a video
    Listening(ExecutionEngine<Option<SimulatedVideo>>),
    /// A frame with nothing listening for requests
    Silent,
}

struct HostedContext {
    id: ContextId,
    url: String,
    frames: Vec<HostedFrame>,
}

#[derive(Default)]
struct HostInner {
    contexts: Vec<HostedContext>,
    next_context_id: u64,
    delivered: Vec<(ContextId, FrameId, FrameRequest)>,
}

/// A rendering host whose contexts and frames live in memory.
///
/// Each listening frame runs its own `ExecutionEngine` over an optional
/// `SimulatedVideo`, so requests are executed for real.
#[derive(Default)]
pub struct InMemoryHost {
    inner: Mutex<HostInner>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a context at `url` with no frames.
    pub fn add_context(&self, url: impl Into<String>) -> ContextId {
        let mut inner = self.lock();
        let id = ContextId(inner.next_context_id);
        inner.next_context_id += 1;
        inner.contexts.push(HostedContext {
            id,
            url: url.into(),
            frames: Vec::new(),
        });
        id
    }

    /// Add a listening frame, holding `video` if present.
    pub fn add_frame(&self, context: ContextId, video: Option<SimulatedVideo>) -> Option<FrameId> {
        self.push_frame(context, HostedFrame::Listening(ExecutionEngine::new(video)))
    }

    /// Add a frame where nothing listens.
    pub fn add_silent_frame(&self, context: ContextId) -> Option<FrameId> {
        self.push_frame(context, HostedFrame::Silent)
    }

    fn push_frame(&self, context: ContextId, frame: HostedFrame) -> Option<FrameId> {
        let mut inner = self.lock();
        let hosted = inner.contexts.iter_mut().find(|c| c.id == context)?;
        hosted.frames.push(frame);
        Some(FrameId(hosted.frames.len() as u64 - 1))
    }

    /// Close a context. Later sends to it fail with `Disconnected`.
    pub fn close_context(&self, context: ContextId) -> bool {
        let mut inner = self.lock();
        let before = inner.contexts.len();
        inner.contexts.retain(|c| c.id != context);
        inner.contexts.len() != before
    }

    /// Current state of the video in a frame.
    pub fn video(&self, context: ContextId, frame: FrameId) -> Option<SimulatedVideo> {
        let inner = self.lock();
        let hosted = inner.contexts.iter().find(|c| c.id == context)?;
        match hosted.frames.get(frame.0 as usize)? {
            HostedFrame::Listening(engine) => engine.locator().clone(),
            HostedFrame::Silent => None,
        }
    }

    /// Every request a listening frame received, in arrival order.
    pub fn delivered(&self) -> Vec<(ContextId, FrameId, FrameRequest)> {
        self.lock().delivered.clone()
    }
}

#[async_trait]
impl RenderingHost for InMemoryHost {
    async fn query_contexts(&self) -> Result<Vec<RenderingContext>, DeliveryError> {
        Ok(self
            .lock()
            .contexts
            .iter()
            .map(|c| RenderingContext {
                id: c.id,
                url: c.url.clone(),
            })
            .collect())
    }

    async fn list_frames(&self, context: ContextId) -> Result<Vec<FrameId>, DeliveryError> {
        let inner = self.lock();
        let hosted = inner
            .contexts
            .iter()
            .find(|c| c.id == context)
            .ok_or(DeliveryError::Disconnected)?;
        Ok((0..hosted.frames.len() as u64).map(FrameId).collect())
    }

    async fn send_to_frame(
        &self,
        context: ContextId,
        frame: FrameId,
        request: &FrameRequest,
    ) -> Result<ExecutionResult, DeliveryError> {
        let mut inner = self.lock();
        let hosted = inner
            .contexts
            .iter_mut()
            .find(|c| c.id == context)
            .ok_or(DeliveryError::Disconnected)?;
        let result = match hosted.frames.get_mut(frame.0 as usize) {
            None => return Err(DeliveryError::Disconnected),
            Some(HostedFrame::Silent) => return Err(DeliveryError::NoListener),
            Some(HostedFrame::Listening(engine)) => engine.execute(request),
        };
        debug!(context = %context, frame = %frame, success = result.success, "Frame handled request");
        inner.delivered.push((context, frame, request.clone()));
        Ok(result)
    }
}

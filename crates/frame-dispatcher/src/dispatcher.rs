//! Fan-out of one request to the frames of the target context.

use crate::{ContextId, DeliveryError, FrameId, MatchPattern, RenderingHost};
use playback_protocol_types::{ExecutionResult, FrameRequest};
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Reply (or delivery failure) of a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub frame: FrameId,
    pub result: Result<ExecutionResult, DeliveryError>,
}

impl FrameOutcome {
    /// The frame answered and applied the request.
    pub fn executed(&self) -> bool {
        matches!(&self.result, Ok(result) if result.success)
    }
}

/// What `dispatch` managed to do.
#[derive(Debug)]
pub enum DispatchReport {
    /// No context matched the target site, or its frames could not be listed.
    Unreachable,
    /// Delivery to every frame of `context` has started.
    FannedOut {
        context: ContextId,
        frame_count: usize,
        /// Resolves once every frame has answered or failed.
        outcomes: JoinHandle<Vec<FrameOutcome>>,
    },
}

impl DispatchReport {
    /// Whether a target context was reached.
    pub fn reached(&self) -> bool {
        matches!(self, DispatchReport::FannedOut { .. })
    }
}

/// Routes requests to the first rendering context whose URL matches the
/// target-site pattern.
#[derive(Clone)]
pub struct FrameDispatcher {
    host: Arc<dyn RenderingHost>,
    pattern: MatchPattern,
}

impl FrameDispatcher {
    pub fn new(host: Arc<dyn RenderingHost>, pattern: MatchPattern) -> Self {
        Self { host, pattern }
    }

    /// Send `request` to every frame of the first matching context.
    ///
    /// Returns as soon as fan-out has started. Frames are served
    /// concurrently; a failing frame never affects its siblings. No retry is
    /// attempted when nothing matches.
    pub async fn dispatch(&self, request: FrameRequest) -> DispatchReport {
        let contexts = match self.host.query_contexts().await {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!(error = %e, "Failed to query rendering contexts");
                return DispatchReport::Unreachable;
            }
        };

        let Some(context) = contexts
            .into_iter()
            .find(|context| self.pattern.matches(&context.url))
        else {
            warn!(pattern = %self.pattern, "No rendering context matches target site");
            return DispatchReport::Unreachable;
        };

        let frames = match self.host.list_frames(context.id).await {
            Ok(frames) if !frames.is_empty() => frames,
            Ok(_) => {
                warn!(context = %context.id, "Target context has no frames");
                return DispatchReport::Unreachable;
            }
            Err(e) => {
                warn!(context = %context.id, error = %e, "Failed to list frames");
                return DispatchReport::Unreachable;
            }
        };

        let frame_count = frames.len();
        let request = Arc::new(request);
        let mut tasks = JoinSet::new();
        for frame in frames {
            let host = self.host.clone();
            let request = request.clone();
            let context_id = context.id;
            tasks.spawn(async move {
                let result = host.send_to_frame(context_id, frame, &request).await;
                FrameOutcome { frame, result }
            });
        }

        info!(
            context = %context.id,
            url = %context.url,
            frame_count,
            command_type = %request.command_type,
            "Dispatched to frames"
        );

        let outcomes = tokio::spawn(collect_outcomes(context.id, tasks));
        DispatchReport::FannedOut {
            context: context.id,
            frame_count,
            outcomes,
        }
    }
}

async fn collect_outcomes(context: ContextId, mut tasks: JoinSet<FrameOutcome>) -> Vec<FrameOutcome> {
    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(context = %context, error = %e, "Frame task failed");
                continue;
            }
        };

        match &outcome.result {
            Ok(result) if result.success => {
                info!(context = %context, frame = %outcome.frame, "Frame executed command");
            }
            Ok(result) => {
                debug!(
                    context = %context,
                    frame = %outcome.frame,
                    error = result.error.as_deref().unwrap_or(""),
                    "Frame did not execute command"
                );
            }
            Err(DeliveryError::NoListener) => {
                debug!(context = %context, frame = %outcome.frame, "No listener in frame");
            }
            Err(e) => {
                warn!(context = %context, frame = %outcome.frame, error = %e, "Frame delivery failed");
            }
        }
        outcomes.push(outcome);
    }
    outcomes
}

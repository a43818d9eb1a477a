//! Seams between the relay, the command log and the dispatcher.

use crate::RelayResult;
use async_trait::async_trait;
use command_store::{AckOutcome, CommandId, CommandStore, LiveSubscription};
use frame_dispatcher::{DispatchReport, FrameDispatcher};
use playback_protocol_types::FrameRequest;

/// Where commands come from and where acknowledgments go.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Open a live subscription to the latest unacknowledged command.
    async fn subscribe(&self) -> RelayResult<LiveSubscription>;

    async fn acknowledge(&self, id: &CommandId) -> RelayResult<AckOutcome>;
}

#[async_trait]
impl CommandSource for CommandStore {
    async fn subscribe(&self) -> RelayResult<LiveSubscription> {
        Ok(self.subscribe_latest_unacknowledged())
    }

    async fn acknowledge(&self, id: &CommandId) -> RelayResult<AckOutcome> {
        Ok(CommandStore::acknowledge(self, id).await?)
    }
}

/// Hands a request to the rendering side.
#[async_trait]
pub trait CommandForwarder: Send + Sync {
    async fn forward(&self, request: FrameRequest) -> DispatchReport;
}

#[async_trait]
impl CommandForwarder for FrameDispatcher {
    async fn forward(&self, request: FrameRequest) -> DispatchReport {
        self.dispatch(request).await
    }
}

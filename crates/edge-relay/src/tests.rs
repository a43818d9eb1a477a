use crate::*;
use async_trait::async_trait;
use command_store::{
    now_millis, AckOutcome, Command, CommandId, CommandStore, LatestUnacknowledged,
    LiveSubscription, NewCommand,
};
use edge_state_storage::RelayState;
use frame_dispatcher::{ContextId, DispatchReport, FrameDispatcher, FrameId, InMemoryHost, MatchPattern};
use playback_executor::SimulatedVideo;
use playback_protocol_types::{CommandType, FrameRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;

/// Source whose streams are fed by the test.
#[derive(Default)]
struct ScriptedSource {
    pending: Mutex<VecDeque<mpsc::Receiver<LatestUnacknowledged>>>,
    open: Mutex<Vec<mpsc::Sender<LatestUnacknowledged>>>,
    subscriptions: AtomicUsize,
    acks: Mutex<Vec<CommandId>>,
}

impl ScriptedSource {
    /// Stream handed out by the next `subscribe`.
    fn next_stream(&self) -> mpsc::Sender<LatestUnacknowledged> {
        let (tx, rx) = mpsc::channel(16);
        self.pending.lock().unwrap().push_back(rx);
        tx
    }

    fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    fn acks(&self) -> Vec<CommandId> {
        self.acks.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSource for ScriptedSource {
    async fn subscribe(&self) -> RelayResult<LiveSubscription> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let scripted = self.pending.lock().unwrap().pop_front();
        let rx = match scripted {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(16);
                self.open.lock().unwrap().push(tx);
                rx
            }
        };
        Ok(LiveSubscription::from_receiver(rx))
    }

    async fn acknowledge(&self, id: &CommandId) -> RelayResult<AckOutcome> {
        self.acks.lock().unwrap().push(id.clone());
        Ok(AckOutcome::Acknowledged)
    }
}

/// Forwarder that records each request with the persisted id at that moment.
struct RecordingForwarder {
    state: Arc<RelayState>,
    reachable: bool,
    forwarded: Mutex<Vec<(FrameRequest, Option<String>)>>,
}

impl RecordingForwarder {
    fn new(state: Arc<RelayState>, reachable: bool) -> Self {
        Self {
            state,
            reachable,
            forwarded: Mutex::new(Vec::new()),
        }
    }

    fn forwarded(&self) -> Vec<(FrameRequest, Option<String>)> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandForwarder for RecordingForwarder {
    async fn forward(&self, request: FrameRequest) -> DispatchReport {
        let persisted = self.state.last_delivered_command_id().unwrap();
        self.forwarded.lock().unwrap().push((request, persisted));
        if self.reachable {
            DispatchReport::FannedOut {
                context: ContextId(1),
                frame_count: 1,
                outcomes: tokio::spawn(async { Vec::new() }),
            }
        } else {
            DispatchReport::Unreachable
        }
    }
}

struct Harness {
    relay: EdgeRelay,
    source: Arc<ScriptedSource>,
    forwarder: Arc<RecordingForwarder>,
    state: Arc<RelayState>,
    events: broadcast::Receiver<RelayEvent>,
}

fn harness_with(config: RelayConfig, state: Arc<RelayState>, reachable: bool) -> Harness {
    let source = Arc::new(ScriptedSource::default());
    let forwarder = Arc::new(RecordingForwarder::new(state.clone(), reachable));
    let relay = EdgeRelay::new(config, source.clone(), forwarder.clone(), state.clone());
    let events = relay.subscribe_events();
    Harness {
        relay,
        source,
        forwarder,
        state,
        events,
    }
}

fn harness() -> Harness {
    harness_with(RelayConfig::default(), Arc::new(RelayState::in_memory()), true)
}

fn command(id: &str, created_at: i64) -> Command {
    Command {
        id: CommandId::from_string(id),
        command_type: CommandType::SeekForward,
        amount: Some(10.0),
        submitter_id: "user-1".to_string(),
        created_at,
        acknowledged: false,
        acknowledged_at: None,
    }
}

/// Skip events until one matches.
async fn wait_for(
    events: &mut broadcast::Receiver<RelayEvent>,
    wanted: impl Fn(&RelayEvent) -> bool,
) -> RelayEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("relay event channel closed");
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for relay event")
}

#[tokio::test]
async fn same_id_delivered_twice_is_forwarded_once() {
    let mut h = harness();
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    let c1 = command("c1", now_millis());
    stream.send(Some(c1.clone())).await.unwrap();
    stream.send(Some(c1.clone())).await.unwrap();

    let duplicate = wait_for(&mut h.events, |e| matches!(e, RelayEvent::Duplicate(_))).await;
    assert_eq!(duplicate, RelayEvent::Duplicate(c1.id.clone()));
    wait_for(&mut h.events, |e| matches!(e, RelayEvent::Acknowledged(_))).await;

    assert_eq!(h.forwarder.forwarded().len(), 1);
    assert_eq!(h.source.acks(), vec![c1.id]);
}

#[tokio::test]
async fn id_is_persisted_before_forwarding() {
    let mut h = harness();
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    stream.send(Some(command("c1", now_millis()))).await.unwrap();
    wait_for(&mut h.events, |e| matches!(e, RelayEvent::Acknowledged(_))).await;

    let forwarded = h.forwarder.forwarded();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].0, FrameRequest::new(CommandType::SeekForward, Some(10.0)));
    assert_eq!(forwarded[0].1.as_deref(), Some("c1"));
}

#[tokio::test]
async fn empty_value_is_ignored() {
    let mut h = harness();
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    stream.send(None).await.unwrap();
    stream.send(Some(command("c1", now_millis()))).await.unwrap();

    let first = wait_for(&mut h.events, |e| matches!(e, RelayEvent::Forwarded(_))).await;
    assert_eq!(first, RelayEvent::Forwarded(CommandId::from_string("c1")));
}

#[tokio::test]
async fn restarted_relay_does_not_reforward() {
    let state = Arc::new(RelayState::in_memory());
    let c1 = command("c1", now_millis());

    let mut first = harness_with(RelayConfig::default(), state.clone(), true);
    let stream = first.source.next_stream();
    first.relay.start().await.unwrap();
    stream.send(Some(c1.clone())).await.unwrap();
    wait_for(&mut first.events, |e| matches!(e, RelayEvent::Acknowledged(_))).await;
    first.relay.shutdown().await;

    let mut second = harness_with(RelayConfig::default(), state, true);
    let stream = second.source.next_stream();
    second.relay.start().await.unwrap();
    stream.send(Some(c1.clone())).await.unwrap();
    stream.send(Some(command("c2", now_millis()))).await.unwrap();

    wait_for(&mut second.events, |e| matches!(e, RelayEvent::Duplicate(_))).await;
    let forwarded = wait_for(&mut second.events, |e| matches!(e, RelayEvent::Forwarded(_))).await;
    assert_eq!(forwarded, RelayEvent::Forwarded(CommandId::from_string("c2")));
    assert_eq!(second.forwarder.forwarded().len(), 1);
}

#[tokio::test]
async fn file_backed_state_dedups_across_processes() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("relay-state.json");
    RelayState::open(&path)
        .set_last_delivered_command_id(Some("c1"))
        .unwrap();

    let mut h = harness_with(RelayConfig::default(), Arc::new(RelayState::open(&path)), true);
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();
    stream.send(Some(command("c1", now_millis()))).await.unwrap();

    wait_for(&mut h.events, |e| matches!(e, RelayEvent::Duplicate(_))).await;
    assert!(h.forwarder.forwarded().is_empty());
    assert!(RelayState::open(&path).is_connected().unwrap());
}

#[tokio::test]
async fn stale_command_is_acknowledged_without_forwarding() {
    let config = RelayConfig {
        stale_command_window_secs: Some(60),
        ..RelayConfig::default()
    };
    let mut h = harness_with(config, Arc::new(RelayState::in_memory()), true);
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    let old = command("old", now_millis() - 120_000);
    stream.send(Some(old.clone())).await.unwrap();

    let event = wait_for(&mut h.events, |e| matches!(e, RelayEvent::Stale(_))).await;
    assert_eq!(event, RelayEvent::Stale(old.id.clone()));
    assert!(h.forwarder.forwarded().is_empty());
    assert_eq!(h.source.acks(), vec![old.id]);
    assert_eq!(h.state.last_delivered_command_id().unwrap().as_deref(), Some("old"));
}

#[tokio::test]
async fn default_config_forwards_old_commands() {
    let mut h = harness();
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    stream.send(Some(command("old", 1))).await.unwrap();
    wait_for(&mut h.events, |e| matches!(e, RelayEvent::Acknowledged(_))).await;
    assert_eq!(h.forwarder.forwarded().len(), 1);
}

#[tokio::test]
async fn unreachable_target_leaves_command_unacknowledged() {
    let mut h = harness_with(RelayConfig::default(), Arc::new(RelayState::in_memory()), false);
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    stream.send(Some(command("c1", now_millis()))).await.unwrap();
    wait_for(&mut h.events, |e| matches!(e, RelayEvent::Unreachable(_))).await;

    assert_eq!(h.forwarder.forwarded().len(), 1);
    assert!(h.source.acks().is_empty());
}

#[tokio::test]
async fn start_replaces_existing_subscription() {
    let h = harness();
    let first = h.source.next_stream();
    h.relay.start().await.unwrap();
    assert_eq!(h.relay.status().await, RelayStatus::Subscribed);

    h.relay.start().await.unwrap();
    assert_eq!(h.source.subscriptions(), 2);
    assert!(first.is_closed());
    assert_eq!(h.relay.status().await, RelayStatus::Subscribed);
}

#[tokio::test]
async fn stream_end_goes_idle_and_clears_connected() {
    let mut h = harness();
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();
    assert!(h.state.is_connected().unwrap());

    drop(stream);
    wait_for(&mut h.events, |e| *e == RelayEvent::Idle).await;

    assert_eq!(h.relay.status().await, RelayStatus::Idle);
    assert!(!h.state.is_connected().unwrap());
}

#[tokio::test]
async fn shutdown_closes_subscription() {
    let h = harness();
    let stream = h.source.next_stream();
    h.relay.start().await.unwrap();

    h.relay.shutdown().await;
    assert!(stream.is_closed());
    assert_eq!(h.relay.status().await, RelayStatus::Idle);
    assert!(!h.state.is_connected().unwrap());
}

#[tokio::test(start_paused = true)]
async fn keep_alive_restarts_idle_relay() {
    let mut h = harness();
    drop(h.source.next_stream());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let keep_alive = activate(&h.relay, shutdown_rx).await;
    wait_for(&mut h.events, |e| *e == RelayEvent::Idle).await;
    assert_eq!(h.source.subscriptions(), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.source.subscriptions(), 2);
    assert_eq!(h.relay.status().await, RelayStatus::Subscribed);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.source.subscriptions(), 2);

    shutdown_tx.send(()).unwrap();
    keep_alive.await.unwrap();
}

#[tokio::test]
async fn end_to_end_against_store_and_host() {
    let store = CommandStore::open_in_memory().await.unwrap();
    let host = Arc::new(InMemoryHost::new());
    let tab = host.add_context("https://u.pcloud.link/publink/show?code=demo");
    host.add_frame(tab, None);
    let player = host
        .add_frame(tab, Some(SimulatedVideo::new(Some(600.0))))
        .unwrap();
    let dispatcher = FrameDispatcher::new(host.clone(), MatchPattern::parse("*://*.pcloud.link/*").unwrap());

    let relay = EdgeRelay::new(
        RelayConfig::default(),
        Arc::new(store.clone()),
        Arc::new(dispatcher),
        Arc::new(RelayState::in_memory()),
    );
    let mut events = relay.subscribe_events();
    relay.start().await.unwrap();

    let id = store
        .append(NewCommand {
            command_type: CommandType::Play,
            amount: None,
            submitter_id: "user-1".to_string(),
            created_at: now_millis(),
        })
        .await
        .unwrap();

    let event = wait_for(&mut events, |e| matches!(e, RelayEvent::Acknowledged(_))).await;
    assert_eq!(event, RelayEvent::Acknowledged(id.clone()));

    assert!(!host.video(tab, player).unwrap().is_paused());
    assert!(host.video(tab, FrameId::TOP).is_none());
    assert!(store.get_command(&id).await.unwrap().unwrap().acknowledged);
    assert!(store.latest_unacknowledged().await.unwrap().is_none());

    relay.shutdown().await;
}

/// Forwarder whose first request waits until the test releases it.
struct GatedForwarder {
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    calls: Mutex<Vec<Option<f64>>>,
}

#[async_trait]
impl CommandForwarder for GatedForwarder {
    async fn forward(&self, request: FrameRequest) -> DispatchReport {
        self.calls.lock().unwrap().push(request.amount);
        if let Some(gate) = self.gate.lock().await.take() {
            let _ = gate.await;
        }
        DispatchReport::FannedOut {
            context: ContextId(1),
            frame_count: 1,
            outcomes: tokio::spawn(async { Vec::new() }),
        }
    }
}

#[tokio::test]
async fn older_command_is_not_reforwarded_while_newer_one_lands() {
    let store = CommandStore::open_in_memory().await.unwrap();
    let (release, gate) = oneshot::channel();
    let forwarder = Arc::new(GatedForwarder {
        gate: tokio::sync::Mutex::new(Some(gate)),
        calls: Mutex::new(Vec::new()),
    });
    let relay = EdgeRelay::new(
        RelayConfig::default(),
        Arc::new(store.clone()),
        forwarder.clone(),
        Arc::new(RelayState::in_memory()),
    );
    let mut events = relay.subscribe_events();
    relay.start().await.unwrap();

    let seek = |amount: f64| NewCommand {
        command_type: CommandType::SeekForward,
        amount: Some(amount),
        submitter_id: "user-1".to_string(),
        created_at: now_millis(),
    };

    let c1 = store.append(seek(1.0)).await.unwrap();
    let event = wait_for(&mut events, |e| matches!(e, RelayEvent::Forwarded(_))).await;
    assert_eq!(event, RelayEvent::Forwarded(c1.clone()));

    let c2 = store.append(seek(2.0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*forwarder.calls.lock().unwrap(), vec![Some(1.0)]);

    release.send(()).unwrap();
    let event = wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Acknowledged(id) if *id == c2)
    })
    .await;
    assert_eq!(event, RelayEvent::Acknowledged(c2));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*forwarder.calls.lock().unwrap(), vec![Some(1.0), Some(2.0)]);
    assert!(store.get_command(&c1).await.unwrap().unwrap().acknowledged);
    assert!(store.latest_unacknowledged().await.unwrap().is_none());

    relay.shutdown().await;
}

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::agent::{
    AgentError, CaptureAgent, CaptureSettings, ChunkStream, ControlCommandType, ControlRequest,
};
use crate::frame_parser::{parse_frame, ParseError};
use crate::publisher::Publisher;
use crate::splitter::{FrameSplitter, RawFrame};
use crate::state::StateManager;
use crate::status::{MessageLog, MessageType, StatusMessage};
use crate::util::hex_preview;

/// Counters of one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub chunks: u64,
    pub frames: u64,
    pub dropped: u64,
}

/// How an ingestion run came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestEnd {
    Cancelled,
    StreamEnded,
    StreamFailed,
}

struct Running {
    token: CancellationToken,
    task: JoinHandle<IngestStats>,
}

/// Drives the capture agent and feeds its stream into the state manager.
pub struct CaptureSession {
    agent: Arc<dyn CaptureAgent>,
    state: Arc<StateManager>,
    events: Arc<Mutex<MessageLog>>,
    settings: Mutex<CaptureSettings>,
    root: CancellationToken,
    running: tokio::sync::Mutex<Option<Running>>,
}

impl CaptureSession {
    pub fn new(
        agent: Arc<dyn CaptureAgent>,
        state: Arc<StateManager>,
        settings: CaptureSettings,
        root: CancellationToken,
    ) -> Self {
        CaptureSession {
            agent,
            state,
            events: Arc::new(Mutex::new(MessageLog::default())),
            settings: Mutex::new(settings),
            root,
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn events(&self) -> &Arc<Mutex<MessageLog>> {
        &self.events
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings.lock().clone()
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    fn event(&self, message_type: MessageType, content: String) {
        self.events
            .lock()
            .add_message(StatusMessage::new(message_type, content));
    }

    async fn control(&self, command: ControlCommandType) -> Result<ControlRequest, AgentError> {
        let request = ControlRequest::new(command, &self.settings());
        match self.agent.send_control(request.clone()).await {
            Ok(response) => {
                self.event(
                    MessageType::Status,
                    format!("{command} accepted: {}", response.message),
                );
                Ok(request)
            }
            Err(err) => {
                self.event(MessageType::Error, format!("{command} failed: {err}"));
                Err(err)
            }
        }
    }

    /// Start capturing. A capture already running is stopped first and the inventory is
    /// cleared before the new stream is consumed.
    pub async fn start_capture(&self) -> Result<(), AgentError> {
        let request = self.control(ControlCommandType::StartCapture).await?;

        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            previous.token.cancel();
            match previous.task.await {
                Ok(stats) => debug!("Previous capture ingested {stats:?}"),
                Err(err) => warn!("Previous capture task failed: {err}"),
            }
        }
        self.state.clear();

        let stream = match self.agent.stream_packets(request).await {
            Ok(stream) => stream,
            Err(err) => {
                self.event(
                    MessageType::Error,
                    format!("Cannot subscribe to the capture stream: {err}"),
                );
                return Err(err);
            }
        };

        let token = self.root.child_token();
        let task = tokio::spawn(ingest(
            stream,
            self.state.clone(),
            self.events.clone(),
            token.clone(),
        ));
        *running = Some(Running { token, task });
        Ok(())
    }

    /// Stop capturing. The inventory is kept.
    pub async fn stop_capture(&self) -> Result<(), AgentError> {
        self.control(ControlCommandType::StopCapture).await?;
        self.cancel_running().await;
        Ok(())
    }

    /// Retune the capture radio. The running capture continues.
    pub async fn set_channel(&self, channel: u8) -> Result<(), AgentError> {
        let previous = std::mem::replace(&mut self.settings.lock().channel, channel);
        if let Err(err) = self.control(ControlCommandType::SetChannel).await {
            self.settings.lock().channel = previous;
            return Err(err);
        }
        Ok(())
    }

    pub async fn set_bandwidth(&self, bandwidth: &str) -> Result<(), AgentError> {
        let previous =
            std::mem::replace(&mut self.settings.lock().bandwidth, bandwidth.to_string());
        if let Err(err) = self.control(ControlCommandType::SetBandwidth).await {
            self.settings.lock().bandwidth = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Cancel the ingestion task without talking to the agent.
    pub async fn shutdown(&self) {
        self.cancel_running().await;
    }

    async fn cancel_running(&self) {
        if let Some(running) = self.running.lock().await.take() {
            running.token.cancel();
            match running.task.await {
                Ok(stats) => self.event(
                    MessageType::Info,
                    format!(
                        "Capture stopped after {} frames ({} dropped)",
                        stats.frames, stats.dropped
                    ),
                ),
                Err(err) => warn!("Capture task failed: {err}"),
            }
        }
    }

    /// Start the metrics, prune and snapshot tickers. They run until the root token is
    /// cancelled.
    pub fn spawn_tickers(
        &self,
        metrics_interval: Duration,
        prune_interval: Duration,
        stale_after: Duration,
        snapshot_interval: Duration,
        publisher: Publisher,
    ) -> Vec<JoinHandle<()>> {
        let metrics_state = self.state.clone();
        let prune_state = self.state.clone();

        vec![
            spawn_ticker(metrics_interval, self.root.clone(), move || {
                metrics_state.tick_metrics()
            }),
            spawn_ticker(prune_interval, self.root.clone(), move || {
                prune_state.prune(stale_after)
            }),
            tokio::spawn(publish_snapshots(
                self.state.clone(),
                publisher,
                snapshot_interval,
                self.root.clone(),
            )),
        ]
    }
}

fn spawn_ticker<F>(period: Duration, token: CancellationToken, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => tick(),
            }
        }
    })
}

async fn publish_snapshots(
    state: Arc<StateManager>,
    mut publisher: Publisher,
    period: Duration,
    token: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let snapshot = state.snapshot();
                if let Err(err) = publisher.publish(&snapshot).await {
                    warn!("Cannot publish snapshot: {err:#}");
                }
            }
        }
    }
    debug!("Published {} snapshots", publisher.published());
}

/// Parse one frame and fold it into the inventory.
pub fn ingest_frame(state: &StateManager, raw: &RawFrame) -> Result<(), ParseError> {
    match parse_frame(&raw.data, raw.link_type, raw.timestamp) {
        Ok(frame) => {
            state.process(&frame);
            Ok(())
        }
        Err(err) => {
            match &err {
                ParseError::DecodeError(_) => {
                    warn!("Dropped frame: {err} [{}]", hex_preview(&raw.data))
                }
                _ => debug!("Dropped frame: {err} [{}]", hex_preview(&raw.data)),
            }
            Err(err)
        }
    }
}

/// Consume the chunk stream until it ends or `token` is cancelled.
pub async fn ingest_stream(
    mut stream: ChunkStream,
    state: &StateManager,
    stats: &mut IngestStats,
    token: &CancellationToken,
) -> Result<IngestEnd, String> {
    let mut splitter = FrameSplitter::new();
    loop {
        let chunk = tokio::select! {
            _ = token.cancelled() => return Ok(IngestEnd::Cancelled),
            chunk = stream.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                stats.chunks += 1;
                let frames = splitter.push(&bytes).map_err(|err| err.to_string())?;
                for raw in &frames {
                    stats.frames += 1;
                    if ingest_frame(state, raw).is_err() {
                        stats.dropped += 1;
                    }
                }
            }
            Some(Err(err)) => {
                warn!("Capture stream failed: {err}");
                return Ok(IngestEnd::StreamFailed);
            }
            None => return Ok(IngestEnd::StreamEnded),
        }
    }
}

async fn ingest(
    stream: ChunkStream,
    state: Arc<StateManager>,
    events: Arc<Mutex<MessageLog>>,
    token: CancellationToken,
) -> IngestStats {
    let mut stats = IngestStats::default();
    let outcome = ingest_stream(stream, &state, &mut stats, &token).await;

    let message = match outcome {
        Ok(IngestEnd::Cancelled) => None,
        Ok(IngestEnd::StreamEnded) => Some("Capture stream ended unexpectedly".to_string()),
        Ok(IngestEnd::StreamFailed) => Some("Capture stream broke off".to_string()),
        Err(err) => Some(format!("Capture stream is corrupt: {err}")),
    };
    if let Some(message) = message {
        events
            .lock()
            .add_message(StatusMessage::new(MessageType::Error, message));
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_parser::LinkType;

    #[test]
    fn test_ingest_frame_drops_garbage() {
        let state = StateManager::default();
        let raw = RawFrame {
            timestamp: Duration::ZERO,
            data: vec![0xff; 5],
            link_type: LinkType::Ieee80211,
        };
        assert!(ingest_frame(&state, &raw).is_err());
        assert_eq!(state.counts(), (0, 0));
    }

    #[tokio::test]
    async fn test_ticker_stops_on_cancel() {
        let token = CancellationToken::new();
        let ticks = Arc::new(Mutex::new(0));
        let counter = ticks.clone();
        let handle = spawn_ticker(Duration::from_millis(5), token.clone(), move || {
            *counter.lock() += 1
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        handle.await.unwrap();
        assert!(*ticks.lock() > 0);
    }
}

use crate::{
    config::SessionConfig, executor::PipelineExecutor, response::Responder, telemetry::Metrics,
};
use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{Sink, SinkExt, Stream, StreamExt};
use sign_inference::{Frame, LandmarkProvider, PredictionResult};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tracing::instrument;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Streaming,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    TransportFault,
    Shutdown,
    WorkerLost,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::PeerClosed => "peer closed",
            CloseReason::TransportFault => "transport fault",
            CloseReason::Shutdown => "server shutting down",
            CloseReason::WorkerLost => "pipeline worker lost",
        }
    }

    fn close_code(&self) -> Option<u16> {
        match self {
            CloseReason::PeerClosed => None,
            CloseReason::Shutdown => Some(close_code::AWAY),
            CloseReason::TransportFault | CloseReason::WorkerLost => Some(close_code::ERROR),
        }
    }
}

/// One client connection: owns its landmark provider for the lifetime of the
/// stream and answers every received frame in order.
pub struct Session {
    id: u64,
    state: SessionState,
    provider: Option<Box<dyn LandmarkProvider>>,
    torn_down: bool,
    executor: PipelineExecutor,
    responder: Responder,
    config: SessionConfig,
    metrics: Arc<Metrics>,
}

impl Session {
    pub fn new(
        provider: Box<dyn LandmarkProvider>,
        executor: PipelineExecutor,
        responder: Responder,
        config: SessionConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        metrics.session_opened();
        tracing::info!(session = id, "Session created");

        Self {
            id,
            state: SessionState::Created,
            provider: Some(provider),
            torn_down: false,
            executor,
            responder,
            config,
            metrics,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[instrument(skip_all, fields(session = self.id))]
    pub async fn run<W, R>(
        mut self,
        mut sink: W,
        mut stream: R,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> CloseReason
    where
        W: Sink<Message, Error = axum::Error> + Unpin,
        R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        if self.config.greeting {
            let greeting = self.responder.greeting(&self.config.greeting_message);
            if let Err(e) = sink.send(greeting).await {
                tracing::warn!("Failed to send greeting: {}", e);
                return self.close(&mut sink, CloseReason::TransportFault).await;
            }
        }
        self.state = SessionState::Streaming;

        let frame_delay = Duration::from_millis(self.config.frame_delay_ms);

        loop {
            let message = tokio::select! {
                message = stream.next() => message,
                _ = shutdown_rx.recv() => {
                    return self.close(&mut sink, CloseReason::Shutdown).await;
                }
            };

            let frame = match message {
                None | Some(Ok(Message::Close(_))) => {
                    return self.close(&mut sink, CloseReason::PeerClosed).await;
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket receive error: {}", e);
                    return self.close(&mut sink, CloseReason::TransportFault).await;
                }
                Some(Ok(Message::Binary(data))) => Frame::Binary(data),
                Some(Ok(Message::Text(text))) => {
                    if text.as_str().trim() == self.config.keep_alive_token {
                        if let Err(e) = sink.send(self.responder.keep_alive()).await {
                            tracing::warn!("Failed to answer keep-alive: {}", e);
                            return self.close(&mut sink, CloseReason::TransportFault).await;
                        }
                        tokio::time::sleep(frame_delay).await;
                        continue;
                    }
                    Frame::Text(text.as_str().to_owned())
                }
                // protocol ping/pong is answered by the websocket layer
                Some(Ok(_)) => continue,
            };

            let Some(result) = self.process(frame).await else {
                return self.close(&mut sink, CloseReason::WorkerLost).await;
            };

            if let Err(e) = sink.send(self.responder.prediction(&result)).await {
                tracing::warn!("Failed to send prediction: {}", e);
                return self.close(&mut sink, CloseReason::TransportFault).await;
            }

            tokio::time::sleep(frame_delay).await;
        }
    }

    async fn process(&mut self, frame: Frame) -> Option<PredictionResult> {
        let provider = self.provider.take()?;
        let started = Instant::now();

        match self.executor.run(provider, frame).await {
            Ok((provider, result)) => {
                self.provider = Some(provider);
                let outcome = result.kind();
                self.metrics.record_frame(outcome);
                self.metrics
                    .record_pipeline_duration(started.elapsed().as_millis() as u64, outcome);
                tracing::debug!(outcome, "Frame processed");
                Some(result)
            }
            Err(e) => {
                tracing::error!("Frame pipeline failed: {}", e);
                None
            }
        }
    }

    async fn close<W>(&mut self, sink: &mut W, reason: CloseReason) -> CloseReason
    where
        W: Sink<Message, Error = axum::Error> + Unpin,
    {
        if self.state == SessionState::Closed {
            return reason;
        }
        self.state = SessionState::Closed;
        self.teardown();

        if let Some(code) = reason.close_code() {
            let frame = CloseFrame {
                code,
                reason: reason.as_str().into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                tracing::debug!("Ignoring close error on finished connection: {}", e);
            }
        }

        tracing::info!(reason = reason.as_str(), "Session closed");
        reason
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.state = SessionState::Closed;
        drop(self.provider.take());
        self.metrics.session_closed();
        tracing::debug!(session = self.id, "Landmark provider released");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

//! Worker task — owns the engine and serialises all access to it.
//!
//! [`run_worker`] drains a `tokio::sync::mpsc` request channel one command at
//! a time, so engine state needs no locking and a `Release` queued behind an
//! in-flight `Init` is always handled after the init resolves.
//!
//! # Command flow
//!
//! ```text
//! WorkerRequest::Init { config }
//!   └─▶ factory.create(EngineArgs)          [paused = !config.start]
//!         ├─ Ok  → ready = true  → WorkerResponse::Ready
//!         └─ Err → ready = false → WorkerResponse::InitError
//!
//! WorkerRequest::Process { frame }           only when ready && !paused
//!   └─▶ engine.process(&frame)
//!         ├─ keyword callback   → WorkerResponse::Keyword
//!         └─ inference callback → WorkerResponse::Inference
//!
//! WorkerRequest::Release
//!   └─▶ ready = false, engine dropped, task terminates
//! ```
//!
//! Engine callbacks run synchronously inside `process`, so events go out on
//! an unbounded channel — posting never blocks the audio path.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::voice::{EngineArgs, EngineCallbacks, EngineFactory, VoiceEngine};

use super::handle::WorkerHandle;
use super::protocol::{WorkerRequest, WorkerResponse};

/// Request channel depth: about two seconds of audio at 512-sample frames.
pub const REQUEST_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// WorkerError
// ---------------------------------------------------------------------------

/// Failures surfaced by [`WorkerFactory::create`].
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The engine could not be initialised; carries the engine's own
    /// description of the failure, already phrased for display.
    #[error("{0}")]
    Init(String),

    /// The worker task terminated before reporting readiness.
    #[error("worker terminated before reporting readiness")]
    Closed,
}

// ---------------------------------------------------------------------------
// run_worker
// ---------------------------------------------------------------------------

/// Run the worker until a `Release` arrives or every request sender is gone.
///
/// Spawn this as a tokio task; [`EngineWorkerFactory`] does exactly that.
pub async fn run_worker(
    factory: Arc<dyn EngineFactory>,
    mut requests: mpsc::Receiver<WorkerRequest>,
    events: mpsc::UnboundedSender<WorkerResponse>,
) {
    let mut worker = EngineWorker {
        factory,
        events,
        engine: None,
        paused: false,
        ready: false,
    };

    while let Some(request) = requests.recv().await {
        match request {
            WorkerRequest::Init { config } => worker.handle_init(config).await,
            WorkerRequest::Process { frame } => worker.handle_frame(&frame),
            WorkerRequest::Pause => {
                log::debug!("worker: paused");
                worker.paused = true;
            }
            WorkerRequest::Resume => {
                log::debug!("worker: resumed");
                worker.paused = false;
            }
            WorkerRequest::Reset => worker.handle_reset(),
            WorkerRequest::Info => worker.handle_info(),
            WorkerRequest::Release => break,
        }
    }

    worker.release();
    log::info!("worker: task terminating");
}

// ---------------------------------------------------------------------------
// EngineWorker
// ---------------------------------------------------------------------------

/// Per-task state: the engine handle and the two gating flags.
struct EngineWorker {
    factory: Arc<dyn EngineFactory>,
    events: mpsc::UnboundedSender<WorkerResponse>,
    engine: Option<Box<dyn VoiceEngine>>,
    paused: bool,
    ready: bool,
}

impl EngineWorker {
    async fn handle_init(&mut self, config: SessionConfig) {
        self.paused = !config.start;
        self.ready = false;
        // Re-init replaces (and thereby releases) any previous engine.
        self.engine = None;

        let callbacks = self.event_callbacks();
        match self.factory.create(EngineArgs { config, callbacks }).await {
            Ok(engine) => {
                log::info!(
                    "worker: engine initialised ({} samples per frame at {} Hz)",
                    engine.frame_length(),
                    engine.sample_rate()
                );
                self.engine = Some(engine);
                self.ready = true;
                self.emit(WorkerResponse::Ready);
            }
            Err(e) => {
                log::error!("worker: engine initialisation failed: {e}");
                self.emit(WorkerResponse::InitError {
                    error: e.to_string(),
                });
            }
        }
    }

    /// Callbacks handed to the engine: each detection becomes an event
    /// message.  Send failures mean the caller side is gone — nothing to do.
    fn event_callbacks(&self) -> EngineCallbacks {
        let keyword_events = self.events.clone();
        let inference_events = self.events.clone();
        EngineCallbacks::new(
            move |label: &str| {
                let _ = keyword_events.send(WorkerResponse::Keyword {
                    label: label.to_string(),
                });
            },
            move |inference| {
                let _ = inference_events.send(WorkerResponse::Inference { inference });
            },
        )
    }

    fn handle_frame(&mut self, frame: &[i16]) {
        if self.paused || !self.ready {
            log::trace!(
                "worker: frame dropped (paused {}, ready {})",
                self.paused,
                self.ready
            );
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if let Err(e) = engine.process(frame) {
            // Only init failures are surfaced as events; a bad frame must not
            // tear down the stream.
            log::warn!("worker: frame processing failed: {e}");
        }
    }

    fn handle_reset(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            log::debug!("worker: reset ignored, no engine");
            return;
        };
        if let Err(e) = engine.reset() {
            log::warn!("worker: reset failed: {e}");
        }
    }

    fn handle_info(&self) {
        let Some(engine) = self.engine.as_ref() else {
            log::debug!("worker: info ignored, no engine");
            return;
        };
        self.emit(WorkerResponse::Info {
            info: engine.context_info().to_string(),
        });
    }

    fn release(&mut self) {
        self.ready = false;
        if self.engine.take().is_some() {
            log::info!("worker: engine released");
        }
    }

    fn emit(&self, event: WorkerResponse) {
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// WorkerFactory
// ---------------------------------------------------------------------------

/// Asynchronous worker constructor, injected into the session so callers can
/// swap in test doubles or custom transports.
///
/// `create` resolves only after the worker reported the outcome of its
/// initial `Init` — a returned handle is always ready, and callers never see
/// the `Ready` event themselves.
#[async_trait]
pub trait WorkerFactory: Send + Sync {
    async fn create(&self, config: SessionConfig) -> Result<WorkerHandle, WorkerError>;
}

/// Production factory: spawns [`run_worker`] with an [`EngineFactory`] and
/// performs the init handshake.
pub struct EngineWorkerFactory {
    engines: Arc<dyn EngineFactory>,
}

impl EngineWorkerFactory {
    pub fn new(engines: Arc<dyn EngineFactory>) -> Self {
        Self { engines }
    }
}

#[async_trait]
impl WorkerFactory for EngineWorkerFactory {
    async fn create(&self, config: SessionConfig) -> Result<WorkerHandle, WorkerError> {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::clone(&self.engines), request_rx, event_tx));

        if request_tx
            .send(WorkerRequest::Init { config })
            .await
            .is_err()
        {
            return Err(WorkerError::Closed);
        }

        let mut handle = WorkerHandle::new(request_tx, event_rx);
        loop {
            match handle.next_event().await {
                Some(WorkerResponse::Ready) => return Ok(handle),
                Some(WorkerResponse::InitError { error }) => {
                    // Tear the orphan task down before reporting the failure.
                    handle.release();
                    return Err(WorkerError::Init(error));
                }
                Some(other) => {
                    log::debug!("worker: unexpected event before readiness: {other:?}");
                }
                None => return Err(WorkerError::Closed),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Caller-side handle to a running worker task.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::protocol::{WorkerRequest, WorkerResponse};

// ---------------------------------------------------------------------------
// FrameSink
// ---------------------------------------------------------------------------

/// Cheap cloneable sender that audio sources use to push frames at the
/// worker.
///
/// Frames share the worker's ordered request channel with control commands,
/// so a pause queued before a frame always takes effect before it.
#[derive(Clone)]
pub struct FrameSink {
    requests: mpsc::Sender<WorkerRequest>,
}

impl FrameSink {
    pub(crate) fn new(requests: mpsc::Sender<WorkerRequest>) -> Self {
        Self { requests }
    }

    /// Deliver one frame, dropping it when the channel is full or the worker
    /// is gone.  Audio callbacks must never block on a slow consumer.
    pub fn feed(&self, frame: Vec<i16>) {
        if let Err(e) = self.requests.try_send(WorkerRequest::Process { frame }) {
            log::trace!("worker: frame dropped ({e})");
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// Owning handle to a worker task: the request sender plus the event
/// receiver.
///
/// Dropping the handle sends a best-effort `Release` so an abandoned worker
/// never outlives its creator.
#[derive(Debug)]
pub struct WorkerHandle {
    requests: mpsc::Sender<WorkerRequest>,
    events: mpsc::UnboundedReceiver<WorkerResponse>,
    released: bool,
}

impl WorkerHandle {
    /// Wrap the two channel halves connected to a spawned worker task.
    pub fn new(
        requests: mpsc::Sender<WorkerRequest>,
        events: mpsc::UnboundedReceiver<WorkerResponse>,
    ) -> Self {
        Self {
            requests,
            events,
            released: false,
        }
    }

    /// Fire-and-forget a command at the worker.
    ///
    /// Delivery is ordered and at-most-once: a full channel or a terminated
    /// worker drops the command.
    pub fn command(&self, request: WorkerRequest) {
        if let Err(e) = self.requests.try_send(request) {
            log::debug!("worker: command dropped ({e})");
        }
    }

    /// A [`FrameSink`] feeding this worker.
    pub fn frame_sink(&self) -> FrameSink {
        FrameSink::new(self.requests.clone())
    }

    /// Non-blocking poll for the next worker event.
    pub fn try_event(&mut self) -> Option<WorkerResponse> {
        self.events.try_recv().ok()
    }

    /// Await the next worker event; `None` once the worker task has
    /// terminated and all buffered events are drained.
    pub async fn next_event(&mut self) -> Option<WorkerResponse> {
        self.events.recv().await
    }

    /// Send `Release`, terminating the worker task.  Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.requests.try_send(WorkerRequest::Release) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                // The channel is saturated with frames; hand the release to
                // the runtime so it still lands once the worker drains them.
                if let Ok(rt) = tokio::runtime::Handle::try_current() {
                    let requests = self.requests.clone();
                    rt.spawn(async move {
                        let _ = requests.send(request).await;
                    });
                }
            }
            Err(TrySendError::Closed(_)) => {
                // Worker already terminated.
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

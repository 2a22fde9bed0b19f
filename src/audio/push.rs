//! Push-based audio source for in-process producers.
//!
//! Instead of opening a capture device, [`PushSource`] hands out a cloneable
//! [`PushHandle`] the application feeds frames into — synthetic audio in the
//! demo binary, decoded files in tests, or an existing capture pipeline.
//! The recording flag gates delivery on the producer side, so a paused
//! source drops frames before they ever reach the worker channel.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::source::{AudioSource, AudioSourceFactory, SourceError};
use crate::worker::FrameSink;

/// State shared between the session-owned source and its producer handles.
struct Shared {
    sink: Option<FrameSink>,
    recording: bool,
}

// ---------------------------------------------------------------------------
// PushHandle
// ---------------------------------------------------------------------------

/// Producer side: push frames whenever audio is available.
#[derive(Clone)]
pub struct PushHandle {
    shared: Arc<Mutex<Shared>>,
}

impl PushHandle {
    /// Deliver one frame if the source is recording and still attached.
    ///
    /// Returns `true` when the frame was handed to the worker channel (a
    /// saturated channel may still drop it there).  A poisoned lock counts
    /// as a dropped frame.
    pub fn push(&self, frame: Vec<i16>) -> bool {
        let Ok(shared) = self.shared.lock() else {
            return false;
        };
        if !shared.recording {
            return false;
        }
        match &shared.sink {
            Some(sink) => {
                sink.feed(frame);
                true
            }
            None => false,
        }
    }

    /// Whether pushes are currently forwarded.
    pub fn is_recording(&self) -> bool {
        self.shared
            .lock()
            .map(|shared| shared.recording && shared.sink.is_some())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// PushSource
// ---------------------------------------------------------------------------

/// The session-owned half of a push source.
pub struct PushSource {
    shared: Arc<Mutex<Shared>>,
}

impl PushSource {
    /// A new producer handle for this source.
    pub fn handle(&self) -> PushHandle {
        PushHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl AudioSource for PushSource {
    fn start(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.recording = true;
        }
    }

    fn pause(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.recording = false;
        }
    }

    fn is_recording(&self) -> bool {
        self.shared
            .lock()
            .map(|shared| shared.recording)
            .unwrap_or(false)
    }

    fn release(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.recording = false;
            // Detaching the sink closes our half of the worker channel.
            shared.sink = None;
        }
    }
}

impl Drop for PushSource {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// PushSourceFactory
// ---------------------------------------------------------------------------

/// Builds [`PushSource`]s and keeps the producer handle of the most recent
/// one, since the session owns the source itself.
#[derive(Clone, Default)]
pub struct PushSourceFactory {
    latest: Arc<Mutex<Option<PushHandle>>>,
}

impl PushSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer handle of the most recently created source.
    pub fn handle(&self) -> Option<PushHandle> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }
}

#[async_trait]
impl AudioSourceFactory for PushSourceFactory {
    async fn create(
        &self,
        sink: FrameSink,
        start: bool,
    ) -> Result<Box<dyn AudioSource>, SourceError> {
        let source = PushSource {
            shared: Arc::new(Mutex::new(Shared {
                sink: Some(sink),
                recording: start,
            })),
        };
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(source.handle());
        }
        log::info!("audio: push source created (recording: {start})");
        Ok(Box::new(source))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::worker::WorkerRequest;

    fn sink_pair() -> (FrameSink, mpsc::Receiver<WorkerRequest>) {
        let (tx, rx) = mpsc::channel(8);
        (FrameSink::new(tx), rx)
    }

    fn expect_frame(rx: &mut mpsc::Receiver<WorkerRequest>, expected: &[i16]) {
        match rx.try_recv() {
            Ok(WorkerRequest::Process { frame }) => assert_eq!(frame, expected),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pushes_are_forwarded_only_while_recording() {
        let (sink, mut rx) = sink_pair();
        let factory = PushSourceFactory::new();
        let mut source = factory.create(sink, true).await.unwrap();
        let handle = factory.handle().expect("handle");

        assert!(handle.push(vec![1, 2, 3]));
        expect_frame(&mut rx, &[1, 2, 3]);

        source.pause();
        assert!(!handle.push(vec![4]));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        source.start();
        assert!(handle.push(vec![5]));
        expect_frame(&mut rx, &[5]);
    }

    #[tokio::test]
    async fn factory_honours_the_start_flag() {
        let (sink, mut rx) = sink_pair();
        let factory = PushSourceFactory::new();
        let source = factory.create(sink, false).await.unwrap();
        let handle = factory.handle().expect("handle");

        assert!(!source.is_recording());
        assert!(!handle.is_recording());
        assert!(!handle.push(vec![1]));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn release_detaches_the_sink_and_closes_the_channel() {
        let (sink, mut rx) = sink_pair();
        let factory = PushSourceFactory::new();
        let mut source = factory.create(sink, true).await.unwrap();
        let handle = factory.handle().expect("handle");

        source.release();
        assert!(!handle.push(vec![1]));
        assert!(!handle.is_recording());
        // The sink held the only sender, so the worker side sees a close.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[tokio::test]
    async fn dropping_the_source_detaches_its_handles() {
        let (sink, mut rx) = sink_pair();
        let factory = PushSourceFactory::new();
        let source = factory.create(sink, true).await.unwrap();
        let handle = factory.handle().expect("handle");

        drop(source);
        assert!(!handle.push(vec![1]));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }
}

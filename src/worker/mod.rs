//! Background worker: a spawned task that owns the voice engine and is
//! reachable only through tagged request/response messages.

pub mod adapter;
pub mod handle;
pub mod protocol;

pub use adapter::{
    run_worker, EngineWorkerFactory, WorkerError, WorkerFactory, REQUEST_CHANNEL_CAPACITY,
};
pub use handle::{FrameSink, WorkerHandle};
pub use protocol::{WorkerRequest, WorkerResponse};

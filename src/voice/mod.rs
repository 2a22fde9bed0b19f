//! Voice-engine abstraction: the object-safe [`VoiceEngine`] trait, its
//! asynchronous [`EngineFactory`] constructor seam, the [`Inference`] result
//! type, and an energy-heuristic [`StubEngine`] for development without real
//! models.

pub mod engine;
pub mod inference;
pub mod stub;

pub use engine::{EngineArgs, EngineCallbacks, EngineError, EngineFactory, VoiceEngine};
pub use inference::Inference;
pub use stub::{StubEngine, StubEngineFactory};

#[cfg(test)]
pub use engine::{MockCall, MockEngine, MockEngineFactory};

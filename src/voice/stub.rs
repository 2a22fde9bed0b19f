//! Energy-heuristic stand-in engine for development without real models.
//!
//! [`StubEngine`] simulates the wake-word → intent cycle with a sustained-RMS
//! detector: a burst of loud frames triggers the keyword callback, the next
//! burst is "inferred" into a canned result.  Model files referenced by the
//! configuration are never opened; only the keyword label, the sensitivities
//! and `require_endpoint` influence behaviour.

use async_trait::async_trait;

use crate::voice::engine::{EngineArgs, EngineCallbacks, EngineError, EngineFactory, VoiceEngine};
use crate::voice::inference::Inference;

// ---------------------------------------------------------------------------
// Detection parameters (frame-based, 32 ms per frame at 16 kHz / 512)
// ---------------------------------------------------------------------------

/// Consecutive loud frames required to call a burst "speech".
const MIN_BURST_FRAMES: u32 = 3;
/// Frames ignored after an inference concludes (~1 s).
const REFRACTORY_FRAMES: u32 = 31;
/// Quiet frames that end a command when an endpoint is required (~0.5 s).
const ENDPOINT_FRAMES: u32 = 16;
/// Frames without any speech before a capture gives up (~5 s).
const CAPTURE_TIMEOUT_FRAMES: u32 = 156;

/// RMS threshold for `sensitivity`: 3 000 at the 0.5 default, linear between
/// 4 500 (least sensitive) and 1 500 (most sensitive).
fn threshold_for(sensitivity: f32) -> f32 {
    1500.0 + 3000.0 * (1.0 - sensitivity)
}

fn rms_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

// ---------------------------------------------------------------------------
// StubEngine
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Stage {
    /// Waiting for a wake-word burst.
    Listening,
    /// Wake word fired; capturing the command until endpoint or timeout.
    Capturing,
}

/// Development engine backed by nothing but an RMS threshold.
pub struct StubEngine {
    label: String,
    callbacks: EngineCallbacks,
    info: String,
    threshold: f32,
    require_endpoint: bool,
    stage: Stage,
    high_frames: u32,
    refractory: u32,
    speech_frames: u32,
    silence_frames: u32,
    idle_frames: u32,
}

impl StubEngine {
    fn listen(&mut self, energy: f32) {
        if self.refractory > 0 {
            self.refractory -= 1;
            return;
        }
        if energy > self.threshold {
            self.high_frames += 1;
        } else {
            self.high_frames = 0;
        }
        if self.high_frames >= MIN_BURST_FRAMES {
            log::debug!("stub: wake word '{}' (rms {:.0})", self.label, energy);
            (self.callbacks.on_keyword)(&self.label);
            self.stage = Stage::Capturing;
            self.high_frames = 0;
            self.speech_frames = 0;
            self.silence_frames = 0;
            self.idle_frames = 0;
        }
    }

    fn capture(&mut self, energy: f32) {
        if energy > self.threshold {
            self.speech_frames += 1;
            self.silence_frames = 0;
        } else if self.speech_frames > 0 {
            self.silence_frames += 1;
        } else {
            self.idle_frames += 1;
        }

        let endpoint = if self.require_endpoint {
            ENDPOINT_FRAMES
        } else {
            1
        };

        if self.speech_frames >= MIN_BURST_FRAMES && self.silence_frames >= endpoint {
            let mut slots = std::collections::BTreeMap::new();
            slots.insert("frames".to_string(), self.speech_frames.to_string());
            self.finish(Inference::understood("speech", slots));
        } else if self.idle_frames >= CAPTURE_TIMEOUT_FRAMES
            || (self.speech_frames > 0
                && self.speech_frames < MIN_BURST_FRAMES
                && self.silence_frames >= endpoint)
        {
            self.finish(Inference::miss());
        }
    }

    fn finish(&mut self, inference: Inference) {
        log::debug!(
            "stub: inference finished (understood: {})",
            inference.is_understood
        );
        (self.callbacks.on_inference)(inference);
        self.stage = Stage::Listening;
        self.refractory = REFRACTORY_FRAMES;
        self.high_frames = 0;
    }
}

impl VoiceEngine for StubEngine {
    fn process(&mut self, frame: &[i16]) -> Result<(), EngineError> {
        let energy = rms_energy(frame);
        match self.stage {
            Stage::Listening => self.listen(energy),
            Stage::Capturing => self.capture(energy),
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.stage = Stage::Listening;
        self.high_frames = 0;
        self.refractory = 0;
        Ok(())
    }

    fn context_info(&self) -> &str {
        &self.info
    }
}

// ---------------------------------------------------------------------------
// StubEngineFactory
// ---------------------------------------------------------------------------

/// Builds [`StubEngine`]s from the keyword/context specs.
#[derive(Debug, Clone, Default)]
pub struct StubEngineFactory;

impl StubEngineFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EngineFactory for StubEngineFactory {
    async fn create(&self, args: EngineArgs) -> Result<Box<dyn VoiceEngine>, EngineError> {
        let EngineArgs { config, callbacks } = args;
        let keyword = config
            .keyword
            .as_ref()
            .ok_or_else(|| EngineError::Init("keyword spec missing".into()))?;
        let context = config
            .context
            .as_ref()
            .ok_or_else(|| EngineError::Init("context spec missing".into()))?;

        log::info!(
            "stub: creating engine for '{}' (sensitivity {:.2})",
            keyword.label,
            keyword.sensitivity
        );

        Ok(Box::new(StubEngine {
            label: keyword.label.clone(),
            callbacks,
            info: format!(
                "energy stub context\nsource: {}",
                context.model_path.display()
            ),
            threshold: threshold_for(keyword.sensitivity),
            require_endpoint: context.require_endpoint,
            stage: Stage::Listening,
            high_frames: 0,
            refractory: 0,
            speech_frames: 0,
            silence_frames: 0,
            idle_frames: 0,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::{ContextSpec, KeywordSpec, SessionConfig};
    use crate::FRAME_LENGTH;

    type Keywords = Arc<Mutex<Vec<String>>>;
    type Inferences = Arc<Mutex<Vec<Inference>>>;

    fn collector() -> (Keywords, Inferences, EngineCallbacks) {
        let keywords: Keywords = Arc::new(Mutex::new(Vec::new()));
        let inferences: Inferences = Arc::new(Mutex::new(Vec::new()));
        let callbacks = {
            let keywords = Arc::clone(&keywords);
            let inferences = Arc::clone(&inferences);
            EngineCallbacks::new(
                move |label: &str| keywords.lock().unwrap().push(label.to_string()),
                move |inference| inferences.lock().unwrap().push(inference),
            )
        };
        (keywords, inferences, callbacks)
    }

    fn stub(sensitivity: f32, require_endpoint: bool, callbacks: EngineCallbacks) -> StubEngine {
        StubEngine {
            label: "hey hark".to_string(),
            callbacks,
            info: "energy stub context".to_string(),
            threshold: threshold_for(sensitivity),
            require_endpoint,
            stage: Stage::Listening,
            high_frames: 0,
            refractory: 0,
            speech_frames: 0,
            silence_frames: 0,
            idle_frames: 0,
        }
    }

    /// A constant-amplitude frame has an RMS equal to that amplitude.
    fn frame(amplitude: i16) -> Vec<i16> {
        vec![amplitude; FRAME_LENGTH]
    }

    fn feed(engine: &mut StubEngine, amplitude: i16, count: u32) {
        let frame = frame(amplitude);
        for _ in 0..count {
            engine.process(&frame).unwrap();
        }
    }

    #[test]
    fn silence_produces_no_events() {
        let (keywords, inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 0, 50);

        assert!(keywords.lock().unwrap().is_empty());
        assert!(inferences.lock().unwrap().is_empty());
    }

    #[test]
    fn sustained_burst_fires_keyword_once() {
        let (keywords, _inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES);
        assert_eq!(*keywords.lock().unwrap(), vec!["hey hark".to_string()]);

        // Further loud frames belong to the command capture, not a new wake.
        feed(&mut engine, 8000, 5);
        assert_eq!(keywords.lock().unwrap().len(), 1);
    }

    #[test]
    fn burst_then_endpoint_silence_yields_understood_inference() {
        let (_keywords, inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES); // wake
        feed(&mut engine, 8000, 5); // command speech
        feed(&mut engine, 0, ENDPOINT_FRAMES); // endpoint

        let inferences = inferences.lock().unwrap();
        assert_eq!(inferences.len(), 1);
        assert!(inferences[0].is_understood);
        assert_eq!(inferences[0].intent.as_deref(), Some("speech"));
        assert_eq!(inferences[0].slots.get("frames").map(String::as_str), Some("5"));
    }

    #[test]
    fn short_blip_yields_miss() {
        let (_keywords, inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES); // wake
        feed(&mut engine, 8000, 1); // too short to count as speech
        feed(&mut engine, 0, ENDPOINT_FRAMES);

        let inferences = inferences.lock().unwrap();
        assert_eq!(inferences.len(), 1);
        assert!(!inferences[0].is_understood);
    }

    #[test]
    fn capture_timeout_without_speech_yields_miss() {
        let (_keywords, inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES); // wake
        feed(&mut engine, 0, CAPTURE_TIMEOUT_FRAMES);

        let inferences = inferences.lock().unwrap();
        assert_eq!(inferences.len(), 1);
        assert!(!inferences[0].is_understood);
    }

    #[test]
    fn endpoint_not_required_finishes_after_one_quiet_frame() {
        let (_keywords, inferences, callbacks) = collector();
        let mut engine = stub(0.5, false, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES); // wake
        feed(&mut engine, 8000, MIN_BURST_FRAMES); // command speech
        feed(&mut engine, 0, 1);

        let inferences = inferences.lock().unwrap();
        assert_eq!(inferences.len(), 1);
        assert!(inferences[0].is_understood);
    }

    #[test]
    fn reset_returns_to_wake_listening() {
        let (keywords, inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES); // wake
        feed(&mut engine, 8000, 2); // partial command
        engine.reset().unwrap();

        // No inference was fired for the discarded command, and the wake
        // detector is armed again immediately.
        feed(&mut engine, 8000, MIN_BURST_FRAMES);
        assert_eq!(keywords.lock().unwrap().len(), 2);
        assert!(inferences.lock().unwrap().is_empty());
    }

    #[test]
    fn refractory_blocks_immediate_retrigger() {
        let (keywords, _inferences, callbacks) = collector();
        let mut engine = stub(0.5, true, callbacks);

        feed(&mut engine, 8000, MIN_BURST_FRAMES); // wake
        feed(&mut engine, 8000, 5); // command
        feed(&mut engine, 0, ENDPOINT_FRAMES); // inference concludes
        assert_eq!(keywords.lock().unwrap().len(), 1);

        // Loud frames inside the refractory window are ignored...
        feed(&mut engine, 8000, MIN_BURST_FRAMES);
        assert_eq!(keywords.lock().unwrap().len(), 1);

        // ...but once it elapses the wake detector is live again.
        feed(&mut engine, 0, REFRACTORY_FRAMES - MIN_BURST_FRAMES);
        feed(&mut engine, 8000, MIN_BURST_FRAMES);
        assert_eq!(keywords.lock().unwrap().len(), 2);
    }

    #[test]
    fn sensitivity_scales_the_threshold() {
        let (keywords, _inferences, callbacks) = collector();
        let mut eager = stub(1.0, true, callbacks);
        feed(&mut eager, 2000, MIN_BURST_FRAMES);
        assert_eq!(keywords.lock().unwrap().len(), 1);

        let (keywords, _inferences, callbacks) = collector();
        let mut deaf = stub(0.0, true, callbacks);
        feed(&mut deaf, 2000, 20);
        assert!(keywords.lock().unwrap().is_empty());
    }

    // --- StubEngineFactory ---

    fn config() -> SessionConfig {
        SessionConfig {
            keyword: Some(KeywordSpec::new("hey hark", "/models/hey-hark.ppn")),
            context: Some(ContextSpec::new("/models/coffee.rhn")),
            start: true,
        }
    }

    #[tokio::test]
    async fn factory_requires_both_model_specs() {
        let factory = StubEngineFactory::new();

        let mut missing_keyword = config();
        missing_keyword.keyword = None;
        let result = factory
            .create(EngineArgs {
                config: missing_keyword,
                callbacks: EngineCallbacks::discard(),
            })
            .await;
        assert!(matches!(result, Err(EngineError::Init(_))));

        let mut missing_context = config();
        missing_context.context = None;
        let result = factory
            .create(EngineArgs {
                config: missing_context,
                callbacks: EngineCallbacks::discard(),
            })
            .await;
        assert!(matches!(result, Err(EngineError::Init(_))));
    }

    #[tokio::test]
    async fn factory_reports_context_source_in_info() {
        let factory = StubEngineFactory::new();
        let engine = factory
            .create(EngineArgs {
                config: config(),
                callbacks: EngineCallbacks::discard(),
            })
            .await
            .unwrap();

        assert!(engine.context_info().contains("/models/coffee.rhn"));
        assert_eq!(engine.frame_length(), FRAME_LENGTH);
    }
}

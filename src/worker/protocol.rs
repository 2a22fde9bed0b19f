//! Worker message protocol definitions.
//!
//! Requests flow caller → worker, responses worker → caller.  Everything is
//! serde-tagged under a `command` key; the response tags keep the historical
//! `pv-` / `ppn-` / `rhn-` prefixes because existing front-ends dispatch on
//! them verbatim.

use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::voice::Inference;

/// Commands accepted by the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum WorkerRequest {
    /// Construct the engine from `config`, then report [`WorkerResponse::Ready`]
    /// or [`WorkerResponse::InitError`].
    Init { config: SessionConfig },
    /// One frame of 16 kHz mono PCM for the engine.
    Process { frame: Vec<i16> },
    /// Stop forwarding frames to the engine (they are dropped, not queued).
    Pause,
    /// Start forwarding frames to the engine again.
    Resume,
    /// Return the engine to wake-word listening.
    Reset,
    /// Release the engine and terminate the worker task.
    Release,
    /// Ask for the loaded context's source description.
    Info,
}

/// Events emitted by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum WorkerResponse {
    /// Engine construction succeeded; frames will now be processed.
    #[serde(rename = "pv-ready")]
    Ready,
    /// Engine construction failed; the worker stays alive but unready.
    #[serde(rename = "pv-error-init")]
    InitError { error: String },
    /// The wake word was detected.
    #[serde(rename = "ppn-keyword")]
    Keyword { label: String },
    /// An intent-inference pass concluded.
    #[serde(rename = "rhn-inference")]
    Inference { inference: Inference },
    /// Context source description, in reply to [`WorkerRequest::Info`].
    #[serde(rename = "rhn-info")]
    Info { info: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextSpec, KeywordSpec};

    #[test]
    fn request_tags_are_kebab_case() {
        let config = SessionConfig {
            keyword: Some(KeywordSpec::new("hey hark", "k.ppn")),
            context: Some(ContextSpec::new("c.rhn")),
            start: false,
        };
        let json = serde_json::to_string(&WorkerRequest::Init { config }).unwrap();
        assert!(json.contains(r#""command":"init""#));
        assert!(json.contains(r#""start":false"#));

        let json = serde_json::to_string(&WorkerRequest::Process { frame: vec![1, 2] }).unwrap();
        assert!(json.contains(r#""command":"process""#));
        assert!(json.contains("[1,2]"));

        for (request, tag) in [
            (WorkerRequest::Pause, "pause"),
            (WorkerRequest::Resume, "resume"),
            (WorkerRequest::Reset, "reset"),
            (WorkerRequest::Release, "release"),
            (WorkerRequest::Info, "info"),
        ] {
            let json = serde_json::to_string(&request).unwrap();
            assert_eq!(json, format!(r#"{{"command":"{tag}"}}"#));
        }
    }

    #[test]
    fn response_tags_keep_engine_prefixes() {
        let json = serde_json::to_string(&WorkerResponse::Ready).unwrap();
        assert_eq!(json, r#"{"command":"pv-ready"}"#);

        let json = serde_json::to_string(&WorkerResponse::InitError {
            error: "model not found".into(),
        })
        .unwrap();
        assert!(json.contains(r#""command":"pv-error-init""#));
        assert!(json.contains("model not found"));

        let json = serde_json::to_string(&WorkerResponse::Keyword {
            label: "hey hark".into(),
        })
        .unwrap();
        assert!(json.contains(r#""command":"ppn-keyword""#));

        let json = serde_json::to_string(&WorkerResponse::Inference {
            inference: Inference::miss(),
        })
        .unwrap();
        assert!(json.contains(r#""command":"rhn-inference""#));
        assert!(json.contains(r#""isUnderstood":false"#));

        let json = serde_json::to_string(&WorkerResponse::Info {
            info: "context v1".into(),
        })
        .unwrap();
        assert!(json.contains(r#""command":"rhn-info""#));
    }

    #[test]
    fn requests_round_trip_through_json() {
        let request: WorkerRequest = serde_json::from_str(r#"{"command":"pause"}"#).unwrap();
        assert!(matches!(request, WorkerRequest::Pause));

        let request: WorkerRequest =
            serde_json::from_str(r#"{"command":"process","frame":[0,-3,7]}"#).unwrap();
        assert!(matches!(request, WorkerRequest::Process { frame } if frame == vec![0, -3, 7]));
    }
}

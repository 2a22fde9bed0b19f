//! Intent-inference result type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one intent-inference pass.
///
/// `is_understood == false` means speech was captured but did not match the
/// context grammar; `intent` and `slots` are empty in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inference {
    /// Whether the spoken command matched the context grammar.
    pub is_understood: bool,
    /// Matched intent name, `None` on a miss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Slot name → spoken value for the matched intent.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<String, String>,
}

impl Inference {
    /// An understood result carrying `intent` and its slots.
    pub fn understood(intent: impl Into<String>, slots: BTreeMap<String, String>) -> Self {
        Self {
            is_understood: true,
            intent: Some(intent.into()),
            slots,
        }
    }

    /// A not-understood result (speech did not match the grammar).
    pub fn miss() -> Self {
        Self {
            is_understood: false,
            intent: None,
            slots: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Inference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_understood {
            return write!(f, "Didn't understand the command");
        }
        writeln!(f, "{{")?;
        if let Some(intent) = &self.intent {
            writeln!(f, "  intent : '{intent}'")?;
        }
        writeln!(f, "  slots : {{")?;
        for (slot, value) in &self.slots {
            writeln!(f, "    {slot} : '{value}'")?;
        }
        writeln!(f, "  }}")?;
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_understood_lists_intent_and_slots() {
        let mut slots = BTreeMap::new();
        slots.insert("size".to_string(), "large".to_string());
        slots.insert("beverage".to_string(), "coffee".to_string());
        let inference = Inference::understood("orderBeverage", slots);

        let text = inference.to_string();
        assert!(text.contains("intent : 'orderBeverage'"));
        assert!(text.contains("beverage : 'coffee'"));
        assert!(text.contains("size : 'large'"));
    }

    #[test]
    fn display_miss_is_a_single_line() {
        assert_eq!(Inference::miss().to_string(), "Didn't understand the command");
    }

    /// The JSON shape uses camelCase keys and omits empty optional fields.
    #[test]
    fn serialises_with_camel_case_keys() {
        let json = serde_json::to_value(Inference::miss()).expect("serialise");
        assert_eq!(json, serde_json::json!({ "isUnderstood": false }));

        let mut slots = BTreeMap::new();
        slots.insert("size".to_string(), "small".to_string());
        let json =
            serde_json::to_value(Inference::understood("orderBeverage", slots)).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({
                "isUnderstood": true,
                "intent": "orderBeverage",
                "slots": { "size": "small" },
            })
        );
    }

    #[test]
    fn deserialises_with_missing_optional_fields() {
        let inference: Inference =
            serde_json::from_str(r#"{ "isUnderstood": false }"#).expect("parse");
        assert_eq!(inference, Inference::miss());
    }
}

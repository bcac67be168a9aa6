//! The built-in agent variants.
//!
//! | Id | Name | Memory consulted | Prompt |
//! |----|------|------------------|--------|
//! | `standard` | Standard Agent | all four stores | balanced general assistant |
//! | `standard_graph` | Graph-based Agent | all four stores | step-by-step reasoning |
//! | `clinical` | Asistente Clínico | short-term, semantic, episodic | Spanish clinical assessment |
//! | `template` | Template Agent | semantic, procedural | domain answers with references |

pub mod clinical;
pub mod standard;
pub mod standard_graph;
pub mod template;

pub use clinical::ClinicalAgent;
pub use standard::StandardAgent;
pub use standard_graph::StandardGraphAgent;
pub use template::TemplateAgent;

use serde_json::{Value, json};

/// Memory and data-source switches every agent accepts.
pub fn base_settings_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "short_term_memory": {
                "type": "boolean",
                "description": "Use short-term memory for recent conversation context",
                "default": true
            },
            "semantic_memory": {
                "type": "boolean",
                "description": "Use semantic memory for document knowledge",
                "default": true
            },
            "episodic_memory": {
                "type": "boolean",
                "description": "Use episodic memory for conversation history",
                "default": true
            },
            "procedural_memory": {
                "type": "boolean",
                "description": "Use procedural memory for action workflows",
                "default": true
            },
            "use_rag": {
                "type": "boolean",
                "description": "Search semantic documents for the question",
                "default": true
            }
        }
    })
}

/// The base schema with `properties` extended by an agent's own settings.
pub(crate) fn settings_schema_with(extra: Value) -> Value {
    let mut schema = base_settings_schema();
    if let (Some(base), Value::Object(extra)) = (
        schema.get_mut("properties").and_then(Value::as_object_mut),
        extra,
    ) {
        base.extend(extra);
    }
    schema
}

pub(crate) fn temperature_setting() -> Value {
    json!({
        "type": "number",
        "description": "Response temperature (0.0 to 1.0)",
        "default": 0.7,
        "minimum": 0.0,
        "maximum": 1.0
    })
}

pub(crate) fn max_context_length_setting() -> Value {
    json!({
        "type": "integer",
        "description": "Maximum number of tokens to include in context",
        "default": 2000,
        "minimum": 100,
        "maximum": 8000
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_keeps_base_properties() {
        let schema = settings_schema_with(json!({"max_references": {"type": "integer"}}));
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("use_rag"));
        assert!(props.contains_key("max_references"));
        assert_eq!(props.len(), 6);
    }
}

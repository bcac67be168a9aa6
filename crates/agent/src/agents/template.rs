//! A domain-answer agent that favours referenced documents and
//! procedures over conversation history.

use super::{max_context_length_setting, settings_schema_with, temperature_setting};
use crate::pipeline::AgentProfile;
use medchat_core::agent::ChatTurn;
use medchat_core::memory::MemoryType;
use serde_json::json;

const BASE_PROMPT: &str = "You are a domain-specific assistant specialized in providing accurate \
    and well-referenced responses. Your responses should be precise, well-cited, and include \
    appropriate domain context. Always prioritize authoritative sources and domain guidelines \
    when available.";

const CONTEXT_INTRO: &str = "You have access to the following domain-specific information that \
    may help answer the user's question. Use this information to provide a well-referenced \
    response:";

const RESPONSE_GUIDELINES: &str = "Response Guidelines:\n\
    1. Always provide accurate domain-specific information\n\
    2. Include relevant context\n\
    3. Note any limitations or uncertainties\n\
    4. Disclose if information is from non-authoritative sources\n\
    5. Include relevant domain guidelines when available\n\
    6. Note the level of authority for each claim\n\
    7. Use appropriate domain terminology\n\
    8. Maintain professional tone\n\
    9. Include relevant statistics when available\n\
    10. Structure the response clearly";

const DISCLAIMER: &str = "IMPORTANT: Your responses are for informational purposes only. \
    Always verify information with authoritative sources in the domain.";

const REFERENCE_STYLE: &str = "apa";
const MAX_REFERENCES: u32 = 3;
const PROCESSING_LEVEL: &str = "basic";

const MEMORY_TYPES: [MemoryType; 2] = [MemoryType::Semantic, MemoryType::Procedural];

pub struct TemplateAgent;

impl AgentProfile for TemplateAgent {
    fn id(&self) -> &'static str {
        "template"
    }

    fn name(&self) -> &'static str {
        "Template Agent"
    }

    fn description(&self) -> &'static str {
        "A starting point for specialised agents. It answers from documents and stored \
         procedures and cites its references."
    }

    fn settings_schema(&self) -> serde_json::Value {
        settings_schema_with(json!({
            "processing_level": {
                "type": "string",
                "description": "Level of detail for processing",
                "default": PROCESSING_LEVEL,
                "enum": ["basic", "advanced", "expert"]
            },
            "max_references": {
                "type": "integer",
                "description": "Maximum number of references to include",
                "default": MAX_REFERENCES,
                "minimum": 0,
                "maximum": 10
            },
            "reference_style": {
                "type": "string",
                "description": "Citation style for references",
                "default": REFERENCE_STYLE,
                "enum": ["apa", "mla", "chicago", "ieee"]
            },
            "max_context_length": max_context_length_setting(),
            "temperature": temperature_setting()
        }))
    }

    fn memory_types(&self) -> &'static [MemoryType] {
        &MEMORY_TYPES
    }

    fn system_prompt(&self, context: Option<&str>, _turn: &ChatTurn) -> String {
        let mut sections = vec![BASE_PROMPT.to_string()];
        if let Some(context) = context {
            sections.push(format!("{CONTEXT_INTRO}\n\n{context}"));
        }
        sections.push(format!(
            "Reference Guidelines:\n\
             - Use {REFERENCE_STYLE} reference style\n\
             - Include up to {MAX_REFERENCES} relevant references\n\
             - Prioritize {PROCESSING_LEVEL} level information\n\
             - Always cite domain guidelines when available\n\
             - Include relevant metadata in references"
        ));
        sections.push(RESPONSE_GUIDELINES.to_string());
        sections.push(DISCLAIMER.to_string());
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_reference_defaults() {
        let prompt = TemplateAgent.system_prompt(None, &ChatTurn::new("q"));
        assert!(prompt.contains("- Use apa reference style"));
        assert!(prompt.contains("- Include up to 3 relevant references"));
        assert!(!prompt.contains("domain-specific information that"));
    }

    #[test]
    fn consults_documents_and_procedures_only() {
        assert_eq!(
            TemplateAgent.memory_types(),
            &[MemoryType::Semantic, MemoryType::Procedural]
        );
    }
}

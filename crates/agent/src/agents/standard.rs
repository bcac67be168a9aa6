//! The standard agent: a balanced general assistant with every memory
//! store and document search available.

use super::{max_context_length_setting, settings_schema_with, temperature_setting};
use crate::pipeline::AgentProfile;
use medchat_core::agent::ChatTurn;
use serde_json::json;

const BASE_PROMPT: &str = "You are a helpful AI assistant that provides accurate and informative \
    responses. You have access to various sources of information including memory, databases, \
    and knowledge bases. Use this information to provide the most helpful and accurate responses \
    possible.";

const CONTEXT_INTRO: &str = "You have access to the following information that may help answer \
    the user's question. Use this information if relevant, but you don't have to use it all:";

const MEMORY_NOTE: &str = "You can use information from previous conversations stored in memory \
    to provide more contextually relevant responses.";

pub struct StandardAgent;

impl AgentProfile for StandardAgent {
    fn id(&self) -> &'static str {
        "standard"
    }

    fn name(&self) -> &'static str {
        "Standard Agent"
    }

    fn description(&self) -> &'static str {
        "A balanced agent that provides general conversation capabilities with access to \
         memory and document search, using a straightforward single-pass pipeline."
    }

    fn settings_schema(&self) -> serde_json::Value {
        settings_schema_with(json!({
            "use_memory": {
                "type": "boolean",
                "description": "Whether to use memory for context",
                "default": true
            },
            "max_context_length": max_context_length_setting(),
            "temperature": temperature_setting()
        }))
    }

    fn system_prompt(&self, context: Option<&str>, turn: &ChatTurn) -> String {
        let mut prompt = String::from(BASE_PROMPT);
        if let Some(context) = context {
            prompt.push_str("\n\n");
            prompt.push_str(CONTEXT_INTRO);
            prompt.push_str("\n\n");
            prompt.push_str(context);
        }
        if turn.use_memory {
            prompt.push_str("\n\n");
            prompt.push_str(MEMORY_NOTE);
        }
        prompt
    }
}

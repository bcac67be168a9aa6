//! The graph-style agent: same data sources as the standard agent, with a
//! prompt that asks for explicit task decomposition and cross-checking.

use super::{max_context_length_setting, settings_schema_with, temperature_setting};
use crate::pipeline::AgentProfile;
use medchat_core::agent::ChatTurn;
use serde_json::json;

const BASE_PROMPT: &str = "You are a sophisticated AI assistant that uses advanced reasoning and \
    task decomposition to provide accurate and informative responses. You have access to various \
    sources of information including memory, databases, and knowledge bases. You can break down \
    complex questions into simpler steps and use multiple sources of information to build \
    comprehensive answers.";

const CONTEXT_INTRO: &str = "You have access to the following information that may help answer \
    the user's question. Analyze this information carefully and use it to build a comprehensive \
    response:";

const MEMORY_NOTE: &str = "You can use information from previous conversations stored in memory \
    to provide more contextually relevant responses. When using memory, consider both recent \
    conversations and relevant historical information.";

const REASONING_GUIDE: &str = "You are part of a graph-based conversation system that can handle \
    complex reasoning and task decomposition. You can use this capability to:\n\
    1. Break down complex questions into simpler steps\n\
    2. Use multiple sources of information to build comprehensive answers\n\
    3. Validate information from different sources\n\
    4. Provide well-structured and detailed responses";

pub struct StandardGraphAgent;

impl AgentProfile for StandardGraphAgent {
    fn id(&self) -> &'static str {
        "standard_graph"
    }

    fn name(&self) -> &'static str {
        "Graph-based Agent"
    }

    fn description(&self) -> &'static str {
        "A reasoning-oriented agent with memory and document search. It decomposes complex \
         questions into steps and cross-checks its sources before answering."
    }

    fn settings_schema(&self) -> serde_json::Value {
        settings_schema_with(json!({
            "use_memory": {
                "type": "boolean",
                "description": "Whether to use memory for context",
                "default": true
            },
            "max_context_length": max_context_length_setting(),
            "temperature": temperature_setting(),
            "task_decomposition": {
                "type": "boolean",
                "description": "Enable task decomposition for complex queries",
                "default": true
            }
        }))
    }

    fn system_prompt(&self, context: Option<&str>, turn: &ChatTurn) -> String {
        let mut sections = vec![BASE_PROMPT.to_string()];
        if let Some(context) = context {
            sections.push(format!("{CONTEXT_INTRO}\n\n{context}"));
        }
        if turn.use_memory {
            sections.push(MEMORY_NOTE.to_string());
        }
        sections.push(REASONING_GUIDE.to_string());
        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_guide_is_always_last() {
        let prompt = StandardGraphAgent.system_prompt(Some("ctx"), &ChatTurn::new("q"));
        assert!(prompt.starts_with(BASE_PROMPT));
        assert!(prompt.contains("comprehensive response:\n\nctx"));
        assert!(prompt.ends_with("4. Provide well-structured and detailed responses"));
    }

    #[test]
    fn schema_lists_task_decomposition() {
        let schema = StandardGraphAgent.settings_schema();
        assert_eq!(schema["properties"]["task_decomposition"]["default"], true);
        assert_eq!(schema["properties"]["short_term_memory"]["type"], "boolean");
    }
}

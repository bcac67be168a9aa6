//! `medchat agents`: list the chat agents the gateway registers.

use medchat_config::AppConfig;
use medchat_gateway::AppState;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let state = AppState::from_config(config);
    let default_id = state.agents.default_agent_id();

    println!("🤖 Registered Agents");
    println!("====================");
    for info in state.agents.list_agents() {
        let marker = if info.id == default_id { " (default)" } else { "" };
        println!("  {}{marker}", info.id);
        println!("    {}: {}", info.name, info.description);
    }

    Ok(())
}

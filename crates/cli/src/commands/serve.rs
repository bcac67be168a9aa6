//! `medchat serve`: start the HTTP gateway.

use medchat_config::AppConfig;

pub async fn run(port: Option<u16>, host: Option<String>) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;

    if let Some(p) = port {
        config.gateway.port = p;
    }
    if let Some(h) = host {
        config.gateway.host = h;
    }

    println!("🩺 MedChat Gateway");
    println!("   Listening on http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Default provider: {}", config.default_provider);
    println!("   Press Ctrl+C to stop.\n");

    medchat_gateway::start(config).await?;
    Ok(())
}

//! MedChat CLI: the main entry point.
//!
//! Commands:
//! - `serve`        Start the HTTP gateway
//! - `status`       Show configuration and provider status
//! - `agents`       List the registered chat agents
//! - `context`      Fetch the unified memory context from a running gateway
//! - `completions`  Print shell completions

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod commands;

#[derive(Parser)]
#[command(
    name = "medchat",
    about = "MedChat: medical chatbot backend with multi-store memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Show configuration and provider status
    Status,

    /// List the registered chat agents
    Agents,

    /// Fetch the unified memory context for a query
    Context {
        /// Text to search memory with
        query: String,

        /// Restrict short-term and episodic memory to one conversation
        #[arg(short, long)]
        conversation_id: Option<String>,

        /// Comma-separated memory types (short_term,semantic,episodic,procedural)
        #[arg(short = 't', long)]
        types: Option<String>,

        /// Gateway base URL
        #[arg(long, env = "MEDCHAT_URL", default_value = "http://127.0.0.1:8000")]
        url: String,
    },

    /// Print shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Agents => commands::agents::run().await?,
        Commands::Context {
            query,
            conversation_id,
            types,
            url,
        } => commands::context::run(&url, &query, conversation_id, types).await?,
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn context_arguments_parse() {
        let cli = Cli::try_parse_from([
            "medchat",
            "context",
            "ozempic nausea",
            "-c",
            "conv-1",
            "-t",
            "semantic,procedural",
        ])
        .unwrap();
        match cli.command {
            Commands::Context {
                query,
                conversation_id,
                types,
                url,
            } => {
                assert_eq!(query, "ozempic nausea");
                assert_eq!(conversation_id.as_deref(), Some("conv-1"));
                assert_eq!(types.as_deref(), Some("semantic,procedural"));
                assert!(url.starts_with("http://"));
            }
            _ => panic!("expected context command"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["medchat", "serve", "--port", "9000", "--json-logs"]).unwrap();
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000), host: None }));
    }
}

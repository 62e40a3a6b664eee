//! Tandem - Multiplexed Assistant Runtime
//!
//! Main entry point for the CLI application.

use clap::Parser;
use tandem::{Config, Repl};
use tracing_subscriber::EnvFilter;

/// Tandem - Multiplexed Assistant Runtime
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent name
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// API key (falls back to OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model new agents are created with
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Path to a file holding the agent's instructions
    #[arg(long)]
    instructions: Option<std::path::PathBuf>,

    /// Forward appended messages to the service instead of dropping them
    #[arg(long)]
    forward_appends: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single message mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "tandem=debug" } else { "tandem=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(name) = args.name {
        config.agent.name = name;
    }

    if let Some(base_url) = args.base_url {
        config.service.base_url = base_url;
    }

    if let Some(model) = args.model {
        config.service.model = model;
    }

    if let Some(instructions) = args.instructions {
        config.agent.instructions_path = Some(instructions);
    }

    let api_key = match args.api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok()) {
        Some(key) => key,
        None => anyhow::bail!("No API key given. Pass --api-key or set OPENAI_API_KEY."),
    };

    let repl = Repl::new(config, api_key)?.with_forward_appends(args.forward_appends);

    // Single message mode
    if let Some(prompt) = args.prompt {
        repl.run_message(prompt).await?;
        return Ok(());
    }

    // Interactive REPL mode
    repl.run().await?;

    Ok(())
}

use anyhow::{bail, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use codelab::connector::api::{Container, ContainerConfig, Router};
use codelab::{Commands, QueryStatus};

#[derive(Parser)]
#[command(name = "codelab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer from a scripted offline source instead of the API
    #[arg(long, global = true)]
    mock: bool,

    /// Model name (overrides GROQ_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// API base URL (overrides GROQ_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Sampling temperature (overrides GROQ_TEMPERATURE)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Re-issue a failed query this many times
    #[arg(long, global = true, default_value = "0")]
    retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the answer.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let container = Container::new(ContainerConfig {
        mock: cli.mock,
        model: cli.model,
        base_url: cli.base_url,
        temperature: cli.temperature,
        retries: cli.retries,
    })?;

    let router = Router::new(&container);
    let state = router.route(cli.command).await?;
    debug!("Final state: {}", state.status());

    if state.status() == QueryStatus::Failed {
        bail!(
            "{}",
            state
                .error_message()
                .unwrap_or(codelab::domain::FALLBACK_ERROR_MESSAGE)
        );
    }

    Ok(())
}

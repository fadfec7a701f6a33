//! Orquesta CLI — recipe-driven deployment automation.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "orquesta",
    version,
    about = "Recipe-driven deployment automation — skip-aware plans, sequential execution, provenance run logs"
)]
struct Cli {
    #[command(subcommand)]
    command: orquesta::cli::Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = orquesta::cli::dispatch(cli.command).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ai_api_tester::cli;
use ai_api_tester::config::CliOverrides;

#[derive(Parser)]
#[command(name = "ai-api-tester", version)]
#[command(
    about = "Generate tests for your Node.js routes and controllers with an LLM",
    long_about = None
)]
struct Cli {
    /// API key (defaults to the AI_API_KEY environment variable)
    #[arg(short = 'k', long = "ai-key")]
    ai_key: Option<String>,

    /// Model to use (e.g., "gpt-5", "gpt-4o", "claude-sonnet-4-5")
    #[arg(short, long)]
    model: Option<String>,

    /// LLM provider: openai, openai-compatible, anthropic
    #[arg(long)]
    provider: Option<String>,

    /// API base URL (defaults to OPENAI_API_URL or the provider's public endpoint)
    #[arg(long)]
    base_url: Option<String>,

    /// Routes directory (auto-detected if not specified)
    #[arg(short, long)]
    routes_dir: Option<PathBuf>,

    /// Controllers directory (auto-detected if not specified)
    #[arg(short, long)]
    controllers_dir: Option<PathBuf>,

    /// Tests output directory (auto-detected if not specified)
    #[arg(short, long)]
    tests_dir: Option<PathBuf>,

    /// Test framework: jest or mocha (auto-detected if not specified)
    #[arg(short = 'f', long)]
    test_framework: Option<String>,

    /// Maximum source file size in bytes
    #[arg(short = 's', long)]
    max_file_size: Option<u64>,

    /// Path to config file (defaults to ./ai-api-tester.toml or ~/.config/ai-api-tester/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use a mock LLM client and show what would be generated without writing files
    #[arg(long)]
    dry_run: bool,

    /// Show detailed output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            api_key: self.ai_key.clone(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            base_url: self.base_url.clone(),
            routes_dir: self.routes_dir.clone(),
            controllers_dir: self.controllers_dir.clone(),
            tests_dir: self.tests_dir.clone(),
            test_framework: self.test_framework.clone(),
            max_file_size: self.max_file_size,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cli::generate::run(cli.overrides(), cli.config.clone(), cli.verbose).await?;
    Ok(())
}

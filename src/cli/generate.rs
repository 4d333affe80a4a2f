use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::config::{CliOverrides, Config, RunConfig};
use crate::detector::{self, DetectedProject};
use crate::llm::factory;
use crate::pipeline::generator::{RunSummary, TestGenerator};

/// Resolve configuration for the current directory and run one generation.
pub async fn run(
    overrides: CliOverrides,
    config_path: Option<PathBuf>,
    verbose: bool,
) -> Result<RunSummary> {
    let project_root = env::current_dir().context("Failed to read current directory")?;

    let detected = detector::detect_project(&project_root);
    let config = Config::load_with_path(config_path.as_deref())?;
    let run_config = RunConfig::resolve(&config, &overrides, &detected, &project_root)?;

    print_analysis(&detected, &run_config);
    if verbose {
        print_configuration(&run_config);
    }

    let client = factory::create_client(&run_config)?;
    if run_config.dry_run {
        info!("Dry run: using mock LLM client, no files will be written");
    } else {
        info!(
            "Using {} provider with model {}",
            run_config.provider, run_config.model
        );
    }

    let generator = TestGenerator::new(client, run_config);
    let summary = generator.run().await;
    summary.print();
    Ok(summary)
}

fn print_analysis(detected: &DetectedProject, config: &RunConfig) {
    println!("Project Analysis:");
    if detected.routes_dir.is_some() {
        println!("  ✓ Found routes in: {}", config.routes_dir.display());
    }
    if detected.controllers_dir.is_some() {
        println!("  ✓ Found controllers in: {}", config.controllers_dir.display());
    }
    if let Some(framework) = detected.test_framework {
        println!("  ✓ Detected test framework: {}", framework);
    }
    if detected.tests_dir.is_some() {
        println!("  ✓ Found test directory: {}", config.tests_dir.display());
    }
    println!();
}

fn print_configuration(config: &RunConfig) {
    println!("Final Configuration:");
    println!("  Routes: {}", config.routes_dir.display());
    println!("  Controllers: {}", config.controllers_dir.display());
    println!("  Tests Output: {}", config.tests_dir.display());
    println!("  Framework: {}", config.test_framework);
    println!("  Provider: {}", config.provider);
    println!("  Model: {}", config.model);
    println!("  Base URL: {}", config.base_url);
    println!("  Max File Size: {} bytes", config.max_file_size);
    println!("  Request Delay: {:?}", config.request_delay);
    println!("  Dry Run: {}", config.dry_run);
    println!();
}

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::collector::{Collector, SourceFile};
use super::writer::TestWriter;
use crate::config::RunConfig;
use crate::detector::TestFramework;
use crate::error::GenerationError;
use crate::llm::client::LlmClient;
use crate::llm::prompts;
use crate::llm::response::{parse_model_reply, GenerationResult};

/// Run phases, in order. A run never goes back to an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    Scanning,
    BuildingOverview,
    Generating,
    Writing,
    Summarizing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Scanning => "scanning",
            Phase::BuildingOverview => "building overview",
            Phase::Generating => "generating",
            Phase::Writing => "writing",
            Phase::Summarizing => "summarizing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything the model needs for one run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub files: Vec<SourceFile>,
    pub test_framework: TestFramework,
    pub project_structure: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_found: usize,
    /// Files the model answered for
    pub generated: usize,
    pub written: Vec<PathBuf>,
    /// Paths a dry run would have written
    pub planned: Vec<PathBuf>,
    pub failures: Vec<GenerationError>,
    pub dependencies: BTreeSet<String>,
}

impl RunSummary {
    pub fn render(&self) -> String {
        if self.files_found == 0 {
            return "No files found to test".to_string();
        }

        let mut out = String::from("Generation Summary:\n");
        let _ = writeln!(out, "Generated {} test files", self.generated);
        if !self.planned.is_empty() {
            let _ = writeln!(out, "\nDry run, nothing written. Would create:");
            for path in &self.planned {
                let _ = writeln!(out, "  - {}", path.display());
            }
        } else {
            let _ = writeln!(out, "Wrote {} files", self.written.len());
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "\nFailures ({}):", self.failures.len());
            for failure in &self.failures {
                let _ = writeln!(out, "  - {}", failure);
            }
        }

        if !self.dependencies.is_empty() {
            let _ = writeln!(out, "\nAdditional dependencies you may need to install:");
            for dep in &self.dependencies {
                let _ = writeln!(out, "  - {}", dep);
            }
        }
        out
    }

    pub fn print(&self) {
        println!("\n{}", self.render().trim_end());
    }
}

/// Drives a run: scan, overview, one model call per file, write, summarize.
///
/// Model calls are strictly sequential with a fixed pause after each one,
/// whether it succeeded or not. A failing file is recorded and skipped.
pub struct TestGenerator {
    client: Box<dyn LlmClient>,
    config: RunConfig,
}

impl TestGenerator {
    pub fn new(client: Box<dyn LlmClient>, config: RunConfig) -> Self {
        Self { client, config }
    }

    fn enter(&self, phase: Phase) {
        debug!("Phase: {}", phase);
    }

    pub async fn run(&self) -> RunSummary {
        self.enter(Phase::Idle);
        info!("Starting test generation");

        self.enter(Phase::Scanning);
        let collector = Collector::new(
            &self.config.routes_dir,
            &self.config.controllers_dir,
            self.config.max_file_size,
        )
        .with_project_root(&self.config.project_root);
        let collected = collector.collect();

        if collected.files.is_empty() {
            warn!("No files found to test");
            self.enter(Phase::Done);
            return RunSummary::default();
        }
        info!("Found {} files to test", collected.files.len());

        self.enter(Phase::BuildingOverview);
        let project_structure = collector.project_structure(&collected);

        self.enter(Phase::Generating);
        let request = GenerationRequest {
            files: collected.files,
            test_framework: self.config.test_framework,
            project_structure,
        };
        let (results, mut failures) = self.generate_tests(&request).await;

        self.enter(Phase::Writing);
        let writer = TestWriter::new(&self.config.tests_dir);
        let mut written = Vec::new();
        let mut planned = Vec::new();
        // Output path -> source that claimed it first
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();
        for result in &results {
            let path = writer.resolve_path(result);
            let source = result.source_relative_path.display().to_string();
            if let Some(first) = claimed.get(&path) {
                let failure = GenerationError::DuplicateOutput {
                    path,
                    first: first.clone(),
                    file: source,
                };
                warn!("{}", failure);
                failures.push(failure);
                continue;
            }
            claimed.insert(path.clone(), source);

            if self.config.dry_run {
                planned.push(path);
                continue;
            }
            match writer.write(result) {
                Ok(path) => written.push(path),
                Err(e) => {
                    error!("{}", e);
                    failures.push(e);
                }
            }
        }

        self.enter(Phase::Summarizing);
        let summary = RunSummary {
            files_found: request.files.len(),
            generated: results.len(),
            written,
            planned,
            failures,
            dependencies: results
                .iter()
                .flat_map(|r| r.dependencies.iter().cloned())
                .collect(),
        };

        self.enter(Phase::Done);
        info!(
            "Test generation completed: {} generated, {} written",
            summary.generated,
            summary.written.len()
        );
        summary
    }

    /// Ask the model for each file in turn.
    pub async fn generate_tests(
        &self,
        request: &GenerationRequest,
    ) -> (Vec<GenerationResult>, Vec<GenerationError>) {
        let mut results = Vec::new();
        let mut failures = Vec::new();

        for file in &request.files {
            let name = file.relative_path.display().to_string();
            info!("Generating tests for: {} ({})", name, file.role);

            let prompt = prompts::test_generation_prompt(
                file,
                request.test_framework,
                &request.project_structure,
                self.config.custom_instructions.as_deref(),
            );

            match self.client.complete(&prompt).await {
                Ok(reply) => results.push(parse_model_reply(&reply, file)),
                Err(e) => {
                    let failure = GenerationError::Transport {
                        file: name,
                        message: format!("{:#}", e),
                    };
                    error!("{}", failure);
                    failures.push(failure);
                }
            }

            sleep(self.config.request_delay).await;
        }

        (results, failures)
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::detector::{DetectedProject, TestFramework};
use crate::error::GenerationError;
use crate::util::SecretString;

pub const DEFAULT_MODEL: &str = "gpt-5";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50_000;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Contents of `ai-api-tester.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "openai-compatible" or "anthropic"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,

    /// Override max_tokens for requests. Provider default when unset:
    /// - openai: 8192
    /// - openai-compatible: 16384
    /// - anthropic: 8192
    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause after every model call, successful or not.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl LlmConfig {
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }
        match self.provider.as_str() {
            "openai-compatible" => 16384,
            _ => 8192,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "AI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_request_delay_ms() -> u64 {
    1000
}

/// Project paths from the config file. Anything set here beats
/// auto-detection but loses to a CLI flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub routes_dir: Option<PathBuf>,
    #[serde(default)]
    pub controllers_dir: Option<PathBuf>,
    #[serde(default)]
    pub tests_dir: Option<PathBuf>,
    #[serde(default)]
    pub test_framework: Option<String>,
    #[serde(default)]
    pub max_file_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Extra instructions appended to every prompt
    #[serde(default)]
    pub custom: Option<String>,
}

impl Config {
    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path.display());
            return Self::load_from_path(config_path);
        }

        let local = Path::new("ai-api-tester.toml");
        if local.exists() {
            debug!("Loading config from ./ai-api-tester.toml");
            return Self::load_from_path(local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("ai-api-tester").join("config.toml");
            if config_path.exists() {
                debug!("Loading config from {:?}", config_path);
                return Self::load_from_path(&config_path);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Values given explicitly on the command line. They win over everything.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub routes_dir: Option<PathBuf>,
    pub controllers_dir: Option<PathBuf>,
    pub tests_dir: Option<PathBuf>,
    pub test_framework: Option<String>,
    pub max_file_size: Option<u64>,
    pub dry_run: bool,
}

/// Fully resolved settings for one run. Built once, then only read.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub provider: String,
    pub model: String,
    pub api_key: SecretString,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub request_delay: Duration,
    pub project_root: PathBuf,
    pub routes_dir: PathBuf,
    pub controllers_dir: PathBuf,
    pub tests_dir: PathBuf,
    pub test_framework: TestFramework,
    pub max_file_size: u64,
    pub custom_instructions: Option<String>,
    pub dry_run: bool,
}

impl RunConfig {
    /// Merge flags, config file, detection and defaults, in that order.
    ///
    /// Fails with `MissingCredential` when a real run has no API key for a
    /// provider that needs one.
    pub fn resolve(
        config: &Config,
        cli: &CliOverrides,
        detected: &DetectedProject,
        project_root: &Path,
    ) -> Result<Self> {
        let provider = cli
            .provider
            .clone()
            .unwrap_or_else(|| config.llm.provider.clone());
        if !matches!(
            provider.as_str(),
            "openai" | "openai-compatible" | "anthropic"
        ) {
            return Err(GenerationError::UnknownProvider(provider).into());
        }

        let model = cli.model.clone().unwrap_or_else(|| config.llm.model.clone());

        let api_key = cli
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| env::var(&config.llm.api_key_env).ok())
            .unwrap_or_default();
        if api_key.is_empty() && !cli.dry_run && provider != "openai-compatible" {
            return Err(GenerationError::MissingCredential {
                env_var: config.llm.api_key_env.clone(),
            }
            .into());
        }

        let base_url = cli
            .base_url
            .clone()
            .or_else(|| config.llm.base_url.clone())
            .or_else(|| {
                if provider == "anthropic" {
                    None
                } else {
                    env::var("OPENAI_API_URL").ok().filter(|u| !u.is_empty())
                }
            })
            .unwrap_or_else(|| default_base_url(&provider).to_string());

        let test_framework = match cli
            .test_framework
            .as_deref()
            .or(config.project.test_framework.as_deref())
        {
            Some(name) => TestFramework::from_str(name)?,
            None => detected.test_framework.unwrap_or(TestFramework::Jest),
        };

        let pick = |flag: &Option<PathBuf>,
                    file: &Option<PathBuf>,
                    found: &Option<PathBuf>,
                    default: &str| {
            let relative = flag
                .clone()
                .or_else(|| file.clone())
                .or_else(|| found.clone())
                .unwrap_or_else(|| PathBuf::from(default));
            project_root.join(relative)
        };

        Ok(Self {
            max_tokens: config.llm.get_max_tokens(),
            timeout_secs: config.llm.timeout_secs,
            request_delay: Duration::from_millis(config.llm.request_delay_ms),
            routes_dir: pick(
                &cli.routes_dir,
                &config.project.routes_dir,
                &detected.routes_dir,
                "routes",
            ),
            controllers_dir: pick(
                &cli.controllers_dir,
                &config.project.controllers_dir,
                &detected.controllers_dir,
                "controllers",
            ),
            tests_dir: pick(
                &cli.tests_dir,
                &config.project.tests_dir,
                &detected.tests_dir,
                "tests",
            ),
            max_file_size: cli
                .max_file_size
                .filter(|size| *size > 0)
                .or(config.project.max_file_size)
                .unwrap_or(DEFAULT_MAX_FILE_SIZE),
            custom_instructions: config.prompts.custom.clone(),
            project_root: project_root.to_path_buf(),
            api_key: api_key.into(),
            provider,
            model,
            base_url,
            test_framework,
            dry_run: cli.dry_run,
        })
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "anthropic" => DEFAULT_ANTHROPIC_BASE_URL,
        _ => DEFAULT_OPENAI_BASE_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_key() -> CliOverrides {
        CliOverrides {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-5");
        assert_eq!(config.llm.api_key_env, "AI_API_KEY");
        assert_eq!(config.llm.request_delay_ms, 1000);
        assert!(config.project.routes_dir.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[llm]
model = "gpt-4o"

[project]
tests_dir = "spec"
test_framework = "mocha"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.project.tests_dir, Some(PathBuf::from("spec")));
        assert_eq!(config.project.test_framework.as_deref(), Some("mocha"));
    }

    #[test]
    fn test_max_tokens_provider_defaults() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.get_max_tokens(), 8192);
        llm.provider = "openai-compatible".to_string();
        assert_eq!(llm.get_max_tokens(), 16384);
        llm.max_tokens = Some(2000);
        assert_eq!(llm.get_max_tokens(), 2000);
    }

    #[test]
    fn test_load_explicit_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[prompts]\ncustom = \"use supertest\"\n").unwrap();
        let config = Config::load_with_path(Some(&path)).unwrap();
        assert_eq!(config.prompts.custom.as_deref(), Some("use supertest"));
    }

    #[test]
    fn test_load_explicit_path_missing_fails() {
        let result = Config::load_with_path(Some(Path::new("/nonexistent/ai-api-tester.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let root = Path::new("/project");
        let run = RunConfig::resolve(
            &Config::default(),
            &with_key(),
            &DetectedProject::default(),
            root,
        )
        .unwrap();
        assert_eq!(run.model, "gpt-5");
        assert_eq!(run.routes_dir, root.join("routes"));
        assert_eq!(run.controllers_dir, root.join("controllers"));
        assert_eq!(run.tests_dir, root.join("tests"));
        assert_eq!(run.test_framework, TestFramework::Jest);
        assert_eq!(run.max_file_size, 50_000);
        assert_eq!(run.request_delay, Duration::from_secs(1));
        assert_eq!(run.api_key.expose(), "test-key");
    }

    #[test]
    fn test_resolve_precedence_flag_over_file_over_detected() {
        let root = Path::new("/project");
        let mut config = Config::default();
        config.project.routes_dir = Some(PathBuf::from("file/routes"));
        config.project.controllers_dir = Some(PathBuf::from("file/controllers"));

        let detected = DetectedProject {
            test_framework: Some(TestFramework::Mocha),
            routes_dir: Some(PathBuf::from("src/routes")),
            controllers_dir: Some(PathBuf::from("src/controllers")),
            tests_dir: Some(PathBuf::from("__tests__")),
        };

        let mut cli = with_key();
        cli.routes_dir = Some(PathBuf::from("cli/routes"));

        let run = RunConfig::resolve(&config, &cli, &detected, root).unwrap();
        assert_eq!(run.routes_dir, root.join("cli/routes"));
        assert_eq!(run.controllers_dir, root.join("file/controllers"));
        assert_eq!(run.tests_dir, root.join("__tests__"));
        assert_eq!(run.test_framework, TestFramework::Mocha);
    }

    #[test]
    fn test_resolve_framework_flag_beats_detection() {
        let detected = DetectedProject {
            test_framework: Some(TestFramework::Mocha),
            ..Default::default()
        };
        let mut cli = with_key();
        cli.test_framework = Some("jest".to_string());
        let run =
            RunConfig::resolve(&Config::default(), &cli, &detected, Path::new("/p")).unwrap();
        assert_eq!(run.test_framework, TestFramework::Jest);
    }

    #[test]
    fn test_resolve_rejects_unknown_framework() {
        let mut cli = with_key();
        cli.test_framework = Some("vitest".to_string());
        let result = RunConfig::resolve(
            &Config::default(),
            &cli,
            &DetectedProject::default(),
            Path::new("/p"),
        );
        assert!(result.unwrap_err().to_string().contains("vitest"));
    }

    #[test]
    fn test_resolve_rejects_unknown_provider() {
        let mut cli = with_key();
        cli.provider = Some("cohere".to_string());
        let result = RunConfig::resolve(
            &Config::default(),
            &cli,
            &DetectedProject::default(),
            Path::new("/p"),
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown LLM provider"));
    }

    #[test]
    fn test_resolve_zero_max_file_size_uses_default() {
        let mut cli = with_key();
        cli.max_file_size = Some(0);
        let run = RunConfig::resolve(
            &Config::default(),
            &cli,
            &DetectedProject::default(),
            Path::new("/p"),
        )
        .unwrap();
        assert_eq!(run.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_resolve_missing_key_fails() {
        let mut config = Config::default();
        config.llm.api_key_env = "AI_API_TESTER_TEST_NONEXISTENT_KEY_1".to_string();
        let result = RunConfig::resolve(
            &config,
            &CliOverrides::default(),
            &DetectedProject::default(),
            Path::new("/p"),
        );
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenerationError>(),
            Some(GenerationError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_resolve_missing_key_allowed_for_dry_run() {
        let mut config = Config::default();
        config.llm.api_key_env = "AI_API_TESTER_TEST_NONEXISTENT_KEY_2".to_string();
        let cli = CliOverrides {
            dry_run: true,
            ..Default::default()
        };
        let run =
            RunConfig::resolve(&config, &cli, &DetectedProject::default(), Path::new("/p"))
                .unwrap();
        assert!(run.api_key.is_empty());
        assert!(run.dry_run);
    }

    #[test]
    fn test_resolve_missing_key_allowed_for_openai_compatible() {
        let mut config = Config::default();
        config.llm.provider = "openai-compatible".to_string();
        config.llm.api_key_env = "AI_API_TESTER_TEST_NONEXISTENT_KEY_3".to_string();
        config.llm.base_url = Some("http://localhost:11434/v1".to_string());
        let run = RunConfig::resolve(
            &config,
            &CliOverrides::default(),
            &DetectedProject::default(),
            Path::new("/p"),
        )
        .unwrap();
        assert_eq!(run.base_url, "http://localhost:11434/v1");
    }

    #[test]
    #[serial]
    fn test_resolve_key_from_env() {
        env::set_var("AI_API_TESTER_TEST_ENV_KEY", "from-env");
        let mut config = Config::default();
        config.llm.api_key_env = "AI_API_TESTER_TEST_ENV_KEY".to_string();
        let run = RunConfig::resolve(
            &config,
            &CliOverrides::default(),
            &DetectedProject::default(),
            Path::new("/p"),
        )
        .unwrap();
        assert_eq!(run.api_key.expose(), "from-env");
        env::remove_var("AI_API_TESTER_TEST_ENV_KEY");
    }

    #[test]
    #[serial]
    fn test_resolve_base_url_from_env() {
        env::set_var("OPENAI_API_URL", "https://gateway.example.com/v1");
        let run = RunConfig::resolve(
            &Config::default(),
            &with_key(),
            &DetectedProject::default(),
            Path::new("/p"),
        )
        .unwrap();
        assert_eq!(run.base_url, "https://gateway.example.com/v1");

        let mut cli = with_key();
        cli.base_url = Some("https://flag.example.com/v1".to_string());
        let run =
            RunConfig::resolve(&Config::default(), &cli, &DetectedProject::default(), Path::new("/p"))
                .unwrap();
        assert_eq!(run.base_url, "https://flag.example.com/v1");
        env::remove_var("OPENAI_API_URL");
    }

    #[test]
    #[serial]
    fn test_resolve_default_base_url() {
        env::remove_var("OPENAI_API_URL");
        let run = RunConfig::resolve(
            &Config::default(),
            &with_key(),
            &DetectedProject::default(),
            Path::new("/p"),
        )
        .unwrap();
        assert_eq!(run.base_url, DEFAULT_OPENAI_BASE_URL);
    }
}

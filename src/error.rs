use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds surfaced by the generation pipeline.
///
/// Only `MissingCredential` and the configuration variants stop a run. The
/// rest are caught where they happen, logged against the offending file and
/// skipped.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key is required: pass --ai-key or set the {env_var} environment variable")]
    MissingCredential { env_var: String },

    #[error("directory {0} does not exist")]
    DirectoryNotFound(PathBuf),

    #[error("file {path} is too large ({size} bytes, limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("could not read {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model request for {file} failed: {message}")]
    Transport { file: String, message: String },

    #[error("model reply for {file} is not a JSON object, using raw text")]
    MalformedReply { file: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} was already written for {first}, skipping the test for {file}")]
    DuplicateOutput {
        path: PathBuf,
        first: String,
        file: String,
    },

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown test framework: {0} (expected jest or mocha)")]
    UnknownFramework(String),
}

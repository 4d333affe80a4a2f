//! Recovering a test file from the model's free-text reply.
//!
//! The model is asked for a JSON object but replies are often wrapped in prose
//! or markdown fences. Parsing is best-effort: a reply that cannot be decoded
//! is kept whole as the test body. Nothing here returns an error.

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::GenerationError;
use crate::pipeline::collector::{Role, SourceFile};
use crate::util::sanitize_dep_name;

/// Extensions accepted after a `.test.` / `.spec.` suffix.
const TEST_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "mjs", "cjs"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub generated_test: String,
    /// Always ends in `.test.<ext>` or `.spec.<ext>`
    pub test_file_name: String,
    pub dependencies: BTreeSet<String>,
    pub role: Role,
    pub source_relative_path: PathBuf,
}

/// Fields recovered from a decoded reply. Each may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyFields {
    pub generated_test: Option<String>,
    pub test_file_name: Option<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    Parsed(ReplyFields),
    Fallback(String),
}

/// Decode a reply into its fields, or keep it as raw text.
pub fn parse_reply(raw: &str) -> ModelReply {
    match extract_json_object(raw) {
        Some(object) => ModelReply::Parsed(fields_from_object(&object)),
        None => ModelReply::Fallback(raw.to_string()),
    }
}

impl ModelReply {
    /// Fill defaults from the source file and collapse into a result.
    pub fn into_result(self, file: &SourceFile, raw: &str) -> GenerationResult {
        let default_name = || default_test_file_name(&file.relative_path);

        let (generated_test, test_file_name, dependencies) = match self {
            ModelReply::Parsed(fields) => {
                let name = match fields.test_file_name {
                    Some(name) if is_test_file_name(&name) => name,
                    Some(name) => {
                        warn!(
                            "Ignoring test file name {:?} for {}, not a test file",
                            name,
                            file.relative_path.display()
                        );
                        default_name()
                    }
                    None => default_name(),
                };
                (
                    fields
                        .generated_test
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| raw.to_string()),
                    name,
                    clean_dependencies(fields.dependencies),
                )
            }
            ModelReply::Fallback(text) => {
                warn!(
                    "{}",
                    GenerationError::MalformedReply {
                        file: file.relative_path.display().to_string()
                    }
                );
                (text, default_name(), BTreeSet::new())
            }
        };

        GenerationResult {
            generated_test,
            test_file_name,
            dependencies,
            role: file.role,
            source_relative_path: file.relative_path.clone(),
        }
    }
}

/// Parse a reply for `file`: `parse_reply` followed by default filling.
pub fn parse_model_reply(raw: &str, file: &SourceFile) -> GenerationResult {
    parse_reply(raw).into_result(file, raw)
}

/// Find the JSON object in a reply.
///
/// Takes the span from the first `{` to the last `}`. If that span is not
/// valid JSON on its own, decode the first value starting at each `{` inside
/// it, ignoring whatever follows, and keep the first object that carries a
/// `generatedTest` field. Objects embedded in test code are not replies.
fn extract_json_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let span = &raw[start..=end];

    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(span) {
        return Some(object);
    }

    span.match_indices('{').find_map(|(offset, _)| {
        let mut values = serde_json::Deserializer::from_str(&span[offset..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(object))) if object.contains_key("generatedTest") => Some(object),
            _ => None,
        }
    })
}

fn fields_from_object(object: &serde_json::Map<String, Value>) -> ReplyFields {
    let string_field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

    ReplyFields {
        generated_test: string_field("generatedTest"),
        test_file_name: string_field("testFileName").filter(|n| !n.trim().is_empty()),
        dependencies: object
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn clean_dependencies(deps: Vec<String>) -> BTreeSet<String> {
    deps.iter()
        .filter_map(|dep| match sanitize_dep_name(dep) {
            Ok(name) => Some(name.to_string()),
            Err(reason) => {
                warn!("Dropping suggested dependency: {}", reason);
                None
            }
        })
        .collect()
}

/// Whether the file name component of `name` ends in `.test.<ext>` or
/// `.spec.<ext>`.
pub fn is_test_file_name(name: &str) -> bool {
    let Some(base) = Path::new(name.trim()).file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some((stem, ext)) = base.rsplit_once('.') else {
        return false;
    };
    TEST_EXTENSIONS.contains(&ext)
        && (stem.ends_with(".test") || stem.ends_with(".spec"))
        && stem.len() > ".test".len()
}

/// `<stem>.test.<ext>`, keeping `ts`, `tsx` and `jsx` from the source and
/// using `js` for everything else.
pub fn default_test_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("generated");
    let ext = match source.extension().and_then(|e| e.to_str()) {
        Some(ext @ ("ts" | "tsx" | "jsx")) => ext,
        _ => "js",
    };
    format!("{}.test.{}", stem, ext)
}

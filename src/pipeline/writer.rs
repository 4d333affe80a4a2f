use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::GenerationError;
use crate::llm::response::{default_test_file_name, GenerationResult};

/// Writes generated tests under the tests root.
///
/// Layout: `<root>/<routes|controllers>/<source subdirectory>/<file name>`.
/// Only the file name component of the model's suggestion is used, so output
/// always mirrors the source tree and never leaves the root.
pub struct TestWriter {
    root: PathBuf,
}

impl TestWriter {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn resolve_path(&self, result: &GenerationResult) -> PathBuf {
        let file_name = Path::new(&result.test_file_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(default_test_file_name(&result.source_relative_path)));

        let mut path = self.root.join(result.role.dir_name());
        if let Some(parent) = result
            .source_relative_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            path.push(parent);
        }
        path.push(file_name);
        path
    }

    /// Create parent directories and (over)write the test file.
    pub fn write(&self, result: &GenerationResult) -> Result<PathBuf, GenerationError> {
        let path = self.resolve_path(result);
        let write_err = |source| GenerationError::Write {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&path, &result.generated_test).map_err(write_err)?;

        info!("Test file created: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::collector::Role;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn result(role: Role, source: &str, name: &str, body: &str) -> GenerationResult {
        GenerationResult {
            generated_test: body.to_string(),
            test_file_name: name.to_string(),
            dependencies: BTreeSet::new(),
            role,
            source_relative_path: PathBuf::from(source),
        }
    }

    #[test]
    fn test_resolve_mirrors_source_subdirectory() {
        let writer = TestWriter::new(Path::new("/out"));
        let r = result(Role::Route, "v1/admin/users.ts", "users.test.ts", "");
        assert_eq!(
            writer.resolve_path(&r),
            Path::new("/out/routes/v1/admin/users.test.ts")
        );
    }

    #[test]
    fn test_resolve_separates_roles() {
        let writer = TestWriter::new(Path::new("/out"));
        let route = result(Role::Route, "users.ts", "users.test.ts", "");
        let controller = result(Role::Controller, "users.ts", "users.test.ts", "");
        assert_ne!(writer.resolve_path(&route), writer.resolve_path(&controller));
    }

    #[test]
    fn test_resolve_ignores_directories_in_model_name() {
        let writer = TestWriter::new(Path::new("/out"));
        let r = result(Role::Controller, "users.ts", "../../etc/users.test.ts", "");
        assert_eq!(
            writer.resolve_path(&r),
            Path::new("/out/controllers/users.test.ts")
        );
    }

    #[test]
    fn test_write_creates_directories_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let writer = TestWriter::new(tmp.path());

        let first = result(Role::Route, "v2/orders.js", "orders.test.js", "old");
        let path = writer.write(&first).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");

        let second = result(Role::Route, "v2/orders.js", "orders.test.js", "new ✓");
        assert_eq!(writer.write(&second).unwrap(), path);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new ✓");
    }

    #[test]
    fn test_write_failure_is_write_error() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the role directory should be
        fs::write(tmp.path().join("routes"), "blocker").unwrap();
        let writer = TestWriter::new(tmp.path());

        let err = writer
            .write(&result(Role::Route, "a.ts", "a.test.ts", "x"))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Write { .. }));
    }
}

use ignore::WalkBuilder;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::GenerationError;

/// Extensions picked up by the scanner.
pub const SOURCE_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx"];

/// Which scan root a file came from. Never inferred from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Route,
    Controller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Route => "route",
            Role::Controller => "controller",
        }
    }

    /// Subdirectory of the tests root holding this role's output.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Role::Route => "routes",
            Role::Controller => "controllers",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub role: Role,
    /// Relative to the scan root the file was found under
    pub relative_path: PathBuf,
}

pub fn is_source_file(name: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Recursively list source files under `root`.
///
/// A missing root is not an error: it logs a warning and yields nothing.
pub fn scan_directory(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        warn!("{}", GenerationError::DirectoryNotFound(root.to_path_buf()));
        return Vec::new();
    }
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

    let walker = WalkBuilder::new(&root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error while scanning {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if entry.file_name().to_str().is_some_and(is_source_file) {
            files.push(entry.into_path());
        }
    }

    debug!("Found {} source files under {}", files.len(), root.display());
    files
}

/// Read a file as UTF-8, refusing anything larger than `max_bytes`.
pub fn load_file(path: &Path, max_bytes: u64) -> Result<String, GenerationError> {
    let unreadable = |source| GenerationError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let too_large = |size| GenerationError::FileTooLarge {
        path: path.to_path_buf(),
        size,
        limit: max_bytes,
    };

    let size = fs::metadata(path).map_err(unreadable)?.len();
    if size > max_bytes {
        return Err(too_large(size));
    }

    // The file may have grown since the metadata call
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|file| file.take(max_bytes.saturating_add(1)).read_to_end(&mut bytes))
        .map_err(unreadable)?;
    if bytes.len() as u64 > max_bytes {
        return Err(too_large(bytes.len() as u64));
    }
    String::from_utf8(bytes).map_err(|e| unreadable(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// `load_file` for the batch: failures are logged and become `None`, as does
/// an empty file.
pub fn read_source(path: &Path, max_bytes: u64) -> Option<String> {
    match load_file(path, max_bytes) {
        Ok(content) if content.is_empty() => {
            debug!("Skipping empty file {}", path.display());
            None
        }
        Ok(content) => Some(content),
        Err(e @ GenerationError::FileTooLarge { .. }) => {
            info!("{}, skipping", e);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Scan result for one run: the loaded batch plus every path the scanner saw,
/// which feeds the project overview.
#[derive(Debug, Default)]
pub struct CollectedFiles {
    pub files: Vec<SourceFile>,
    pub route_paths: Vec<PathBuf>,
    pub controller_paths: Vec<PathBuf>,
}

pub struct Collector {
    routes_dir: PathBuf,
    controllers_dir: PathBuf,
    project_root: PathBuf,
    max_file_size: u64,
}

impl Collector {
    pub fn new(routes_dir: &Path, controllers_dir: &Path, max_file_size: u64) -> Self {
        Self {
            routes_dir: routes_dir.to_path_buf(),
            controllers_dir: controllers_dir.to_path_buf(),
            project_root: PathBuf::from("."),
            max_file_size,
        }
    }

    /// Paths in the overview are shown relative to this directory.
    pub fn with_project_root(mut self, root: &Path) -> Self {
        self.project_root = root.to_path_buf();
        self
    }

    pub fn collect(&self) -> CollectedFiles {
        let route_paths = scan_directory(&self.routes_dir);
        let controller_paths = scan_directory(&self.controllers_dir);

        let mut files = Vec::new();
        files.extend(self.load_all(&route_paths, &self.routes_dir, Role::Route));
        files.extend(self.load_all(&controller_paths, &self.controllers_dir, Role::Controller));

        info!(
            "Collected {} files ({} route paths, {} controller paths scanned)",
            files.len(),
            route_paths.len(),
            controller_paths.len()
        );

        CollectedFiles {
            files,
            route_paths,
            controller_paths,
        }
    }

    fn load_all(&self, paths: &[PathBuf], root: &Path, role: Role) -> Vec<SourceFile> {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        paths
            .iter()
            .filter_map(|path| {
                let content = read_source(path, self.max_file_size)?;
                let relative_path = path
                    .strip_prefix(&root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));
                Some(SourceFile {
                    path: path.clone(),
                    content,
                    role,
                    relative_path,
                })
            })
            .collect()
    }

    /// Human-readable listing of the scanned routes and controllers.
    pub fn project_structure(&self, collected: &CollectedFiles) -> String {
        let root = std::path::absolute(&self.project_root)
            .unwrap_or_else(|_| self.project_root.clone());
        let display = |path: &PathBuf| {
            path.strip_prefix(&root)
                .unwrap_or(path.as_path())
                .display()
                .to_string()
        };

        let mut lines = vec!["ROUTES:".to_string()];
        lines.extend(collected.route_paths.iter().map(|p| format!("  - {}", display(p))));
        lines.push(String::new());
        lines.push("CONTROLLERS:".to_string());
        lines.extend(
            collected
                .controller_paths
                .iter()
                .map(|p| format!("  - {}", display(p))),
        );
        lines.join("\n")
    }
}

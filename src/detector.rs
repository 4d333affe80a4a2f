use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFramework {
    Jest,
    Mocha,
}

impl TestFramework {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestFramework::Jest => "jest",
            TestFramework::Mocha => "mocha",
        }
    }
}

impl fmt::Display for TestFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestFramework {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jest" => Ok(TestFramework::Jest),
            "mocha" => Ok(TestFramework::Mocha),
            _ => Err(GenerationError::UnknownFramework(s.to_string())),
        }
    }
}

/// Values sniffed from the project layout. Every field is optional; a
/// `None` means the heuristic found nothing and a default applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedProject {
    pub test_framework: Option<TestFramework>,
    pub routes_dir: Option<PathBuf>,
    pub controllers_dir: Option<PathBuf>,
    pub tests_dir: Option<PathBuf>,
}

// (routes, controllers), checked in order; the first pair with either side
// present wins.
const COMMON_STRUCTURES: &[(&str, &str)] = &[
    ("routes", "controllers"),
    ("src/routes", "src/controllers"),
    ("api/routes", "api/controllers"),
    ("src/api/routes", "src/api/controllers"),
    ("pages/api", "pages/api"),
    ("src", "src"),
];

const COMMON_TEST_DIRS: &[&str] = &["tests", "__tests__", "test", "src/__tests__", "src/tests"];

pub fn detect_project(root: &Path) -> DetectedProject {
    let mut detected = DetectedProject {
        test_framework: detect_test_framework(root),
        ..Default::default()
    };

    for (routes, controllers) in COMMON_STRUCTURES {
        let routes_exist = root.join(routes).exists();
        let controllers_exist = root.join(controllers).exists();
        if routes_exist || controllers_exist {
            if routes_exist {
                detected.routes_dir = Some(PathBuf::from(routes));
            }
            if controllers_exist {
                detected.controllers_dir = Some(PathBuf::from(controllers));
            }
            break;
        }
    }

    detected.tests_dir = COMMON_TEST_DIRS
        .iter()
        .find(|dir| root.join(dir).exists())
        .map(PathBuf::from);

    debug!("Detected project layout: {:?}", detected);
    detected
}

/// Look for jest or mocha in `package.json`. Jest wins when both are listed.
fn detect_test_framework(root: &Path) -> Option<TestFramework> {
    let manifest = root.join("package.json");
    let content = fs::read_to_string(&manifest).ok()?;
    let package: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Could not parse {}: {}", manifest.display(), e);
            return None;
        }
    };

    let declares = |name: &str| {
        ["devDependencies", "dependencies"]
            .iter()
            .any(|section| package.get(section).and_then(|deps| deps.get(name)).is_some())
    };

    if declares("jest") || declares("@types/jest") {
        Some(TestFramework::Jest)
    } else if declares("mocha") || declares("@types/mocha") {
        Some(TestFramework::Mocha)
    } else {
        None
    }
}

//! Shared helpers: secret masking and dependency name checks.

use std::fmt;

/// A string wrapper that masks its contents in Debug/Display output.
/// Keeps API keys out of logs and the verbose configuration dump.
#[derive(Clone, Default)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Access the raw secret value (for request headers).
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Check that a model-suggested npm package name is safe to print as an
/// install hint a user may paste into a shell.
///
/// Accepts plain and scoped names (`supertest`, `@types/jest`) with an
/// optional version after `@` (`jest@^29`, `jest@~29.7.0`). Rejects
/// whitespace, a leading `-`, and anything a shell would expand or
/// redirect (`>`, `<`, `*` among them).
pub fn sanitize_dep_name(dep: &str) -> Result<&str, String> {
    let dep = dep.trim();
    if dep.is_empty() {
        return Err("Empty dependency name".to_string());
    }
    if dep.starts_with('-') {
        return Err(format!(
            "Dependency name starts with '-' (possible flag injection): {}",
            dep
        ));
    }

    // A leading '@' is the scope marker, not the version separator
    let (name, version) = match dep.rfind('@').filter(|at| *at > 0) {
        Some(at) => (&dep[..at], Some(&dep[at + 1..])),
        None => (dep, None),
    };

    let invalid = |ch: char| format!("Invalid character '{}' in dependency name: {}", ch, dep);
    for ch in name.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '/' | '@' => {}
            _ => return Err(invalid(ch)),
        }
    }
    if let Some(version) = version {
        if version.is_empty() {
            return Err(format!("Empty version in dependency name: {}", dep));
        }
        for ch in version.chars() {
            match ch {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '.' | '~' | '^' | '=' => {}
                _ => return Err(invalid(ch)),
            }
        }
    }
    Ok(dep)
}

//! Field masks for partial updates

use serde::{Deserialize, Serialize};

/// Explicit list of attribute paths an update is allowed to change
///
/// Paths keep insertion order and are never duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMask {
    paths: Vec<String>,
}

impl FieldMask {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Add a path (ignored if already present)
    pub fn push(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Add `path` when `changed` holds
    pub fn push_if(&mut self, changed: bool, path: &str) {
        if changed {
            self.push(path);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl std::fmt::Display for FieldMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.paths.join(","))
    }
}

impl<S: Into<String>> FromIterator<S> for FieldMask {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut mask = FieldMask::new();
        for path in iter {
            mask.push(path);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_deduplicates() {
        let mut mask = FieldMask::new();
        mask.push("hosts_count");
        mask.push("roles");
        mask.push("hosts_count");
        assert_eq!(mask.len(), 2);
        assert_eq!(mask.to_string(), "hosts_count,roles");
    }
}

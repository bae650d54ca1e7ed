//! Protected application names
//!
//! Candidates are matched on their bare name: path-like ids (`/web`) lose the
//! leading separator, task ids (`web.a1b2`) lose the generated suffix after
//! the last dot. An id with neither is its own bare name.

use std::collections::HashSet;

/// Set of bare names that must never be targeted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    names: HashSet<String>,
}

impl Blacklist {
    /// Build from names; surrounding whitespace is trimmed and empty entries dropped
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Build from a comma-separated list such as `"turmoil,marathon-lb"`
    pub fn parse(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Protected names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether the identifier belongs to a protected application
    pub fn is_protected(&self, id: &str) -> bool {
        self.names.contains(bare_name(id))
    }

    /// Candidates whose bare name is not protected, in their original order
    pub fn filter(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|id| !self.is_protected(id))
            .cloned()
            .collect()
    }
}

/// The application name an identifier refers to
pub fn bare_name(id: &str) -> &str {
    if let Some(path) = id.strip_prefix('/') {
        return path;
    }
    match id.rfind('.') {
        Some(dot) => &id[..dot],
        None => id,
    }
}

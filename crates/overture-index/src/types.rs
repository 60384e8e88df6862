//! Repository topologies and member priorities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository topology.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Documents synthesized from locally stored packages.
    #[default]
    Hosted,
    /// Documents fetched from an upstream and rewritten.
    Proxy,
    /// Documents merged from member repositories.
    Group,
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hosted => write!(f, "hosted"),
            Self::Proxy => write!(f, "proxy"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Precedence of a group member. Higher priorities are merged first and so
/// win `(name, version)` collisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryPriority {
    /// Lowest priority (merged last).
    Low = 0,
    /// Normal priority (default).
    #[default]
    Normal = 50,
    /// High priority.
    High = 100,
    /// Canonical priority (takes precedence over all).
    Canonical = 200,
}

impl fmt::Display for RepositoryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
            Self::Canonical => write!(f, "canonical"),
        }
    }
}

/// A document tagged with the priority of the member it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeInput<T> {
    /// Member priority.
    pub priority: RepositoryPriority,
    /// Member document.
    pub document: T,
}

impl<T> MergeInput<T> {
    /// Tag a document with a priority.
    #[must_use]
    pub const fn new(priority: RepositoryPriority, document: T) -> Self {
        Self { priority, document }
    }
}

impl<T> From<T> for MergeInput<T> {
    fn from(document: T) -> Self {
        Self::new(RepositoryPriority::Normal, document)
    }
}

/// Order inputs for merging: highest priority first, declaration order among
/// equal priorities.
#[must_use]
pub fn rank<T>(mut inputs: Vec<MergeInput<T>>) -> Vec<T> {
    inputs.sort_by(|a, b| b.priority.cmp(&a.priority));
    inputs.into_iter().map(|input| input.document).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_type_display() {
        assert_eq!(RepositoryType::Hosted.to_string(), "hosted");
        assert_eq!(RepositoryType::Proxy.to_string(), "proxy");
        assert_eq!(RepositoryType::Group.to_string(), "group");
    }

    #[test]
    fn priority_ordering() {
        assert!(RepositoryPriority::Canonical > RepositoryPriority::High);
        assert!(RepositoryPriority::High > RepositoryPriority::Normal);
        assert!(RepositoryPriority::Normal > RepositoryPriority::Low);
        assert_eq!(RepositoryPriority::default(), RepositoryPriority::Normal);
    }

    #[test]
    fn rank_is_stable_within_priority() {
        let ranked = rank(vec![
            MergeInput::new(RepositoryPriority::Normal, "first-normal"),
            MergeInput::new(RepositoryPriority::Low, "low"),
            MergeInput::new(RepositoryPriority::Canonical, "canonical"),
            MergeInput::new(RepositoryPriority::Normal, "second-normal"),
        ]);
        assert_eq!(
            ranked,
            vec!["canonical", "first-normal", "second-normal", "low"]
        );
    }

    #[test]
    fn priority_serde() {
        let p: RepositoryPriority = sonic_rs::from_str(r#""canonical""#).unwrap();
        assert_eq!(p, RepositoryPriority::Canonical);
        assert_eq!(sonic_rs::to_string(&RepositoryType::Proxy).unwrap(), r#""proxy""#);
    }
}

//! Store change notifications and invalidation requests.

use chrono::{DateTime, Utc};
use overture_core::PackageName;
use overture_index::AssetKind;
use std::fmt;

/// Topic of asset creation events.
pub const ASSET_CREATED_TOPIC: &str = "asset.created";
/// Topic of asset update events.
pub const ASSET_UPDATED_TOPIC: &str = "asset.updated";
/// Topic of asset deletion events.
pub const ASSET_DELETED_TOPIC: &str = "asset.deleted";
/// Topic of invalidation requests.
pub const INVALIDATION_TOPIC: &str = "index.invalidate";

/// What happened to a stored asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Asset stored for the first time.
    Created,
    /// Asset saved again.
    Updated,
    /// Asset removed.
    Deleted,
}

/// Change notification for one stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEvent {
    /// Change kind.
    pub kind: ChangeKind,
    /// Repository the asset belongs to.
    pub repository: String,
    /// Whether the change originated on this node.
    pub local: bool,
    /// Kind of the changed asset.
    pub asset_kind: AssetKind,
    /// Package vendor.
    pub vendor: String,
    /// Package project.
    pub project: String,
    /// When the asset's blob last changed, if known.
    pub blob_updated: Option<DateTime<Utc>>,
}

impl AssetEvent {
    /// Local event for a zipball of `name`.
    #[must_use]
    pub fn zipball(kind: ChangeKind, repository: impl Into<String>, name: &PackageName) -> Self {
        Self {
            kind,
            repository: repository.into(),
            local: true,
            asset_kind: AssetKind::Zipball,
            vendor: name.vendor().to_string(),
            project: name.project().to_string(),
            blob_updated: None,
        }
    }

    /// Mark the event as received from another node.
    #[must_use]
    pub fn remote(mut self) -> Self {
        self.local = false;
        self
    }

    /// Set the blob update time.
    #[must_use]
    pub const fn with_blob_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.blob_updated = Some(updated);
        self
    }

    /// Bus topic of this event.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self.kind {
            ChangeKind::Created => ASSET_CREATED_TOPIC,
            ChangeKind::Updated => ASSET_UPDATED_TOPIC,
            ChangeKind::Deleted => ASSET_DELETED_TOPIC,
        }
    }
}

/// Request to rebuild the documents of one `(repository, vendor, project)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidationRequest {
    /// Repository name.
    pub repository: String,
    /// Package vendor.
    pub vendor: String,
    /// Package project.
    pub project: String,
}

impl InvalidationRequest {
    /// Create a request.
    #[must_use]
    pub fn new(repository: impl Into<String>, name: &PackageName) -> Self {
        Self {
            repository: repository.into(),
            vendor: name.vendor().to_string(),
            project: name.project().to_string(),
        }
    }

    /// Package coordinate.
    #[must_use]
    pub fn name(&self) -> PackageName {
        PackageName::new(&self.vendor, &self.project)
    }
}

impl From<&AssetEvent> for InvalidationRequest {
    fn from(event: &AssetEvent) -> Self {
        Self {
            repository: event.repository.clone(),
            vendor: event.vendor.clone(),
            project: event.project.clone(),
        }
    }
}

impl fmt::Display for InvalidationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.repository, self.vendor, self.project)
    }
}

/// Anything carried on the repository event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// Store change.
    Asset(AssetEvent),
    /// Rebuild request.
    Invalidation(InvalidationRequest),
}

impl RepositoryEvent {
    /// Bus topic of this event.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::Asset(event) => event.topic(),
            Self::Invalidation(_) => INVALIDATION_TOPIC,
        }
    }
}

impl From<AssetEvent> for RepositoryEvent {
    fn from(event: AssetEvent) -> Self {
        Self::Asset(event)
    }
}

impl From<InvalidationRequest> for RepositoryEvent {
    fn from(request: InvalidationRequest) -> Self {
        Self::Invalidation(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_follow_change_kind() {
        let name = PackageName::new("acme", "widgets");
        let created = AssetEvent::zipball(ChangeKind::Created, "php-hosted", &name);
        assert_eq!(created.topic(), "asset.created");
        let deleted = AssetEvent::zipball(ChangeKind::Deleted, "php-hosted", &name);
        assert_eq!(RepositoryEvent::from(deleted).topic(), "asset.deleted");
        assert_eq!(
            RepositoryEvent::from(InvalidationRequest::new("php-hosted", &name)).topic(),
            "index.invalidate"
        );
    }

    #[test]
    fn invalidation_from_event() {
        let name = PackageName::new("acme", "widgets");
        let event = AssetEvent::zipball(ChangeKind::Updated, "php-hosted", &name).remote();
        assert!(!event.local);
        let request = InvalidationRequest::from(&event);
        assert_eq!(request.name(), name);
        assert_eq!(request.to_string(), "php-hosted:acme/widgets");
    }
}

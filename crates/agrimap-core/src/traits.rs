//! Collaborator traits consumed by the analysis pipeline.
//!
//! The pipeline core depends only on these abstractions; concrete
//! implementations live in `agrimap-db` (PostgreSQL, filesystem) and in
//! test fixtures.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ZoneRecord;

/// Persistence collaborator for confirmed zone records.
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Persist one validated record, returning the assigned row id.
    async fn save(&self, record: &ZoneRecord) -> Result<Uuid>;
}

/// Storage collaborator for uploaded map images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store image bytes under a (sanitized) filename, returning the
    /// stored path.
    async fn save(&self, filename: &str, data: &[u8]) -> Result<String>;
}

/// Identity collaborator resolving the creator id stamped on records.
pub trait CreatorResolver: Send + Sync {
    fn creator_id(&self) -> Uuid;
}

/// Resolver that always answers with the fixed system id.
///
/// Used when no authenticated actor is available (background jobs, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCreator;

impl CreatorResolver for SystemCreator {
    fn creator_id(&self) -> Uuid {
        crate::defaults::SYSTEM_CREATOR_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_creator_is_fixed() {
        let a = SystemCreator.creator_id();
        let b = SystemCreator.creator_id();
        assert_eq!(a, b);
        assert_eq!(a, crate::defaults::SYSTEM_CREATOR_ID);
    }
}

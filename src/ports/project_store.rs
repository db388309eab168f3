use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::project::ProjectRecord;
use crate::error::Result;

/// A catalog entry: the last extracted record plus bookkeeping the
/// extractor never touches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredProject {
    pub record: ProjectRecord,
    pub posted_to_channel: bool,
    pub parsed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

pub trait ProjectStore: Send + Sync {
    /// Insert or replace a record. Replacing keeps `posted_to_channel`.
    fn upsert(&self, record: ProjectRecord) -> Result<UpsertOutcome>;

    /// Stored project with its generated description recomputed.
    fn get(&self, project_id: u64) -> Result<Option<StoredProject>>;

    /// All projects, ordered by id.
    fn list(&self) -> Result<Vec<StoredProject>>;

    /// Flag a project as announced; false when it is not stored.
    fn mark_posted(&self, project_id: u64) -> Result<bool>;

    /// Drop a project; false when it was not stored.
    fn remove(&self, project_id: u64) -> Result<bool>;
}

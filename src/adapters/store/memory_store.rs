use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use crate::domain::project::ProjectRecord;
use crate::error::{CatalogError, Result};
use crate::ports::project_store::{ProjectStore, StoredProject, UpsertOutcome};

/// Process-local catalog keyed by project id.
#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<BTreeMap<u64, StoredProject>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<u64, StoredProject>>> {
        self.projects.read().map_err(|_| CatalogError::Storage {
            reason: "project store lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<u64, StoredProject>>> {
        self.projects.write().map_err(|_| CatalogError::Storage {
            reason: "project store lock poisoned".into(),
        })
    }
}

/// Copy with the derived description rebuilt from the stored fields.
fn rendered(project: &StoredProject) -> StoredProject {
    StoredProject {
        record: project.record.clone().with_generated_description(),
        ..project.clone()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn upsert(&self, record: ProjectRecord) -> Result<UpsertOutcome> {
        let mut projects = self.write()?;
        let project_id = record.project_id;
        let parsed_at = Utc::now();
        let outcome = if let Some(existing) = projects.get_mut(&project_id) {
            existing.record = record;
            existing.parsed_at = parsed_at;
            UpsertOutcome::Updated
        } else {
            projects.insert(
                project_id,
                StoredProject {
                    record,
                    posted_to_channel: false,
                    parsed_at,
                },
            );
            UpsertOutcome::Created
        };
        debug!(project_id, ?outcome, "project stored");
        Ok(outcome)
    }

    fn get(&self, project_id: u64) -> Result<Option<StoredProject>> {
        Ok(self.read()?.get(&project_id).map(rendered))
    }

    fn list(&self) -> Result<Vec<StoredProject>> {
        Ok(self.read()?.values().map(rendered).collect())
    }

    fn mark_posted(&self, project_id: u64) -> Result<bool> {
        let mut projects = self.write()?;
        Ok(projects
            .get_mut(&project_id)
            .map(|project| project.posted_to_channel = true)
            .is_some())
    }

    fn remove(&self, project_id: u64) -> Result<bool> {
        Ok(self.write()?.remove(&project_id).is_some())
    }
}

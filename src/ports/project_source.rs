use async_trait::async_trait;

use crate::domain::project::ProjectRecord;
use crate::error::Result;

/// Where project records come from.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Fetch and extract one project.
    ///
    /// `Ok(None)` means the page was fetched but the eligibility gate
    /// rejected it.
    async fn fetch_project(
        &self,
        project_id: u64,
        skip_eligibility_check: bool,
    ) -> Result<Option<ProjectRecord>>;

    /// Forget any cached copy of the project's page.
    fn invalidate(&self, _project_id: u64) {}
}

//! Re-extract a list of projects into the store, politely spaced.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::scraper::rate_limiter::RateLimiter;
use crate::config::types::BatchConfig;
use crate::ports::project_source::ProjectSource;
use crate::ports::project_store::{ProjectStore, UpsertOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub delay: Duration,
    pub jitter: Duration,
    pub skip_eligibility_check: bool,
}

impl BatchOptions {
    pub fn from_config(config: &BatchConfig, skip_eligibility_check: bool) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            skip_eligibility_check,
        }
    }
}

/// Outcome counts of one batch; every requested id lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub created: usize,
    pub updated: usize,
    pub failed: Vec<u64>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.failed.len()
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Создано: {}, обновлено: {}, ошибок: {}",
            self.created,
            self.updated,
            self.failed.len()
        )?;
        if !self.failed.is_empty() {
            let ids: Vec<String> = self.failed.iter().map(u64::to_string).collect();
            write!(f, " ({})", ids.join(", "))?;
        }
        Ok(())
    }
}

/// Fetch, extract and upsert each id in order. Never aborts: fetch errors,
/// ineligible pages and storage errors all count as failures.
pub async fn reextract(
    source: &dyn ProjectSource,
    store: &dyn ProjectStore,
    project_ids: &[u64],
    options: &BatchOptions,
) -> BatchReport {
    let limiter = RateLimiter::from_interval(options.delay);
    let mut report = BatchReport::default();

    for &project_id in project_ids {
        limiter.wait_with(jitter(options.jitter)).await;

        match source
            .fetch_project(project_id, options.skip_eligibility_check)
            .await
        {
            Ok(Some(record)) => match store.upsert(record) {
                Ok(UpsertOutcome::Created) => report.created += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Err(e) => {
                    warn!(project_id, error = %e, "Failed to store project");
                    report.failed.push(project_id);
                }
            },
            Ok(None) => {
                info!(project_id, "Project not eligible, counted as failed");
                report.failed.push(project_id);
            }
            Err(e) => {
                warn!(project_id, error = %e, "Failed to fetch project");
                report.failed.push(project_id);
            }
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        failed = report.failed.len(),
        "Batch re-extraction finished"
    );
    report
}

fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

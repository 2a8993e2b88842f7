//! Batch analysis runs: dedup, overwrite, scheduling and commit.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::application::archive::SpecificationArchive;
use crate::application::scheduler::OperationScheduler;
use crate::domain::models::specification::{SpecificationsRequest, SpecificationsResponse};
use crate::domain::ports::OperationClient;

/// How a batch run ended.
///
/// `partial_completion` does not mean failure: artifacts whose results were
/// already stored are skipped and only flagged here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOutcome {
    /// Whether the archive gained at least one new record.
    pub changed: bool,
    /// Whether any artifact was skipped as already stored.
    pub partial_completion: bool,
    pub completed: usize,
    pub skipped: usize,
}

/// Drives specification inference for a batch of artifacts end to end:
/// admission against the archive (skip-or-overwrite), scheduling against
/// the remote service, and exactly-once commit of each terminal payload.
pub struct AnalysisRunner<C>
where
    C: OperationClient<Request = SpecificationsRequest>,
{
    scheduler: OperationScheduler<C>,
    archive: SpecificationArchive,
    max_in_flight: usize,
}

impl<C> AnalysisRunner<C>
where
    C: OperationClient<Request = SpecificationsRequest>,
{
    pub fn new(
        scheduler: OperationScheduler<C>,
        archive: SpecificationArchive,
        max_in_flight: usize,
    ) -> Self {
        Self {
            scheduler,
            archive,
            max_in_flight,
        }
    }

    /// Run inference for every request whose artifact is not already
    /// archived; with `overwrite`, stale records are deleted first and
    /// every request runs.
    #[instrument(skip(self, requests), fields(total = requests.len(), overwrite))]
    pub async fn run(
        &self,
        requests: Vec<SpecificationsRequest>,
        overwrite: bool,
    ) -> Result<RunOutcome> {
        let mut admitted = Vec::new();
        let mut skipped = 0usize;

        for request in requests {
            let artifact_id = request.artifact.id.clone();

            if overwrite {
                let removed = self
                    .archive
                    .remove(&artifact_id)
                    .await
                    .context("Failed to clear stale specifications for overwrite")?;
                if removed > 0 {
                    info!(artifact = %artifact_id, "Removed stale specifications before overwrite");
                }
            } else if self
                .archive
                .contains(&artifact_id)
                .await
                .context("Failed to check archive for existing specifications")?
            {
                info!(
                    artifact = %artifact_id,
                    "Archive already has specifications for artifact, skipping"
                );
                skipped += 1;
                continue;
            }

            admitted.push((artifact_id, request));
        }

        let completed = admitted.len();
        let archive = &self.archive;
        let changed = self
            .scheduler
            .run_to_completion(admitted, self.max_in_flight, move |request, handle| {
                let archive = archive.clone();
                async move {
                    let payload = handle
                        .response
                        .context("Terminal operation carried no response payload")?;
                    let response: SpecificationsResponse = serde_json::from_value(payload)
                        .context("Failed to decode specifications response")?;
                    archive.insert(&request, &response).await?;
                    Ok(())
                }
            })
            .await
            .context("Specification run did not complete")?;

        let outcome = RunOutcome {
            changed,
            partial_completion: skipped > 0,
            completed: if changed { completed } else { 0 },
            skipped,
        };

        info!(
            task = "GetSpecifications",
            changed = outcome.changed,
            partial_completion = outcome.partial_completion,
            completed = outcome.completed,
            skipped = outcome.skipped,
            "Finished"
        );

        Ok(outcome)
    }
}

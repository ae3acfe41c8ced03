use std::sync::Arc;

use folio_core::{err_not_found, err_unsupported_op};
use folio_core::remote::CancelOutcome;
use folio_core::result::PredefinedResult;
use folio_core::types;
use folio_persistence::job::{self, JobStatus};
use folio_persistence::job_batch::{self, JobBatchStatus};
use sea_orm::ActiveEnum;

use crate::handler::{now, JobTransitions};
use crate::process::registry::InterpreterProcessRegistry;

pub struct AbortHandler {
    transitions: JobTransitions,
    registry: Arc<InterpreterProcessRegistry>,
}

impl AbortHandler {
    pub fn new(transitions: JobTransitions, registry: Arc<InterpreterProcessRegistry>) -> Self {
        Self {
            transitions,
            registry,
        }
    }

    /// Records the intent to abort; the abort cycle does the rest.
    pub async fn abort(&self, batch_id: i64) -> types::Result<job_batch::Model> {
        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let batch = store.batches.get_for_update(uow.tx(), batch_id).await?;

        match batch.status {
            JobBatchStatus::Aborting => return Ok(batch),
            status if status.is_terminal() => {
                return Err(err_unsupported_op!(
                    "batch {} is already {} and cannot be aborted",
                    batch.id,
                    status.to_value()
                ))
            }
            _ => {}
        }

        let after = self
            .transitions
            .update_batch(
                &mut uow,
                &batch,
                job_batch::Model {
                    status: JobBatchStatus::Aborting,
                    ..batch.clone()
                },
            )
            .await?;

        store.commit(uow).await?;

        tracing::info!(batch_id = batch.id, note_id = %batch.note_id, "batch is aborting");

        Ok(after)
    }

    pub async fn abort_note(&self, note_id: &str) -> types::Result<job_batch::Model> {
        let store = self.transitions.store();
        let uow = store.begin().await?;
        let latest = store.batches.get_latest_by_note(uow.tx(), note_id).await?;
        drop(uow);

        match latest {
            Some(batch) => self.abort(batch.id).await,
            None => Err(err_not_found!(crate::job_batch::KIND, note_id)),
        }
    }

    pub async fn load_jobs(&self) -> types::Result<Vec<job::Model>> {
        let store = self.transitions.store();
        let uow = store.begin().await?;
        let jobs = store.jobs.load_next_cancelling(uow.tx()).await?;
        store.commit(uow).await?;

        Ok(jobs)
    }

    /// Sends cancel for every in-flight job of an aborting batch, then settles batches
    /// that have nothing left in flight.
    pub async fn pass(&self) -> types::Result<()> {
        for job in self.load_jobs().await? {
            if let Err(e) = self.handle(&job).await {
                tracing::error!(job_id = job.id, "failed to cancel job: {}", e);
            }
        }

        self.finish_idle_batches().await
    }

    pub async fn handle(&self, job: &job::Model) -> types::Result<()> {
        let outcome = self.cancel(job).await;

        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let current = store.jobs.get_for_update(uow.tx(), job.id).await?;

        if current.status != job.status || current.interpreter_job_uuid != job.interpreter_job_uuid {
            tracing::debug!(job_id = job.id, "job changed while cancelling, skipping");
            return Ok(());
        }

        match outcome {
            CancelOutcome::Accept => {
                if current.status == JobStatus::Running {
                    self.transitions
                        .update_job(
                            &mut uow,
                            &current,
                            job::Model {
                                status: JobStatus::Aborting,
                                ..current.clone()
                            },
                        )
                        .await?;
                }
            }
            CancelOutcome::NotFound | CancelOutcome::Error => {
                self.transitions
                    .set_abort_result(&mut uow, &current, &PredefinedResult::Aborted.result())
                    .await?;
            }
        }

        store.commit(uow).await
    }

    async fn cancel(&self, job: &job::Model) -> CancelOutcome {
        let Some(job_uuid) = job.interpreter_job_uuid.as_deref() else {
            return CancelOutcome::NotFound;
        };

        let process = match self.registry.get(&job.shebang) {
            Some(process)
                if process.is_ready()
                    && process.uuid.is_some()
                    && process.uuid == job.interpreter_process_uuid =>
            {
                process
            }
            _ => {
                tracing::debug!(job_id = job.id, shebang = %job.shebang, "no live process owns the job");
                return CancelOutcome::NotFound;
            }
        };

        let outcome = match process.get_connection().await {
            Ok(connection) => connection.cancel(job_uuid).await,
            Err(e) => Err(e),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!(job_id = job.id, shebang = %job.shebang, "cancel failed: {}", e);
            CancelOutcome::Error
        })
    }

    /// Aborting batches without in-flight jobs have nothing to wait for.
    pub async fn finish_idle_batches(&self) -> types::Result<()> {
        let store = self.transitions.store();
        let uow = store.begin().await?;
        let batches = store
            .batches
            .load_by_status(uow.tx(), vec![JobBatchStatus::Aborting])
            .await?;
        drop(uow);

        for batch in batches {
            let mut uow = store.begin().await?;
            let batch = store.batches.get_for_update(uow.tx(), batch.id).await?;

            if batch.status != JobBatchStatus::Aborting {
                continue;
            }

            let jobs = store.jobs.load_by_batch(uow.tx(), batch.id).await?;
            if jobs.iter().any(|job| job.status.is_in_flight()) {
                continue;
            }

            self.transitions.cancel_pending_jobs(&mut uow, batch.id).await?;

            self.transitions
                .update_batch(
                    &mut uow,
                    &batch,
                    job_batch::Model {
                        status: JobBatchStatus::Aborted,
                        ended_at: Some(now()),
                        ..batch.clone()
                    },
                )
                .await?;

            store.commit(uow).await?;

            tracing::info!(batch_id = batch.id, "batch aborted");
        }

        Ok(())
    }
}

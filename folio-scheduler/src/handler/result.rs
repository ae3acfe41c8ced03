use std::time::Duration;

use folio_core::result::{Code, InterpreterResult, PredefinedResult};
use folio_core::types;
use folio_persistence::job;

use crate::event::ChangeEvent;
use crate::handler::JobTransitions;

const LOOKUP_STEP: Duration = Duration::from_millis(100);

/// Applies interpreter callbacks to job state.
pub struct ResultHandler {
    transitions: JobTransitions,
    lookup_timeout: Duration,
}

impl ResultHandler {
    pub fn new(transitions: JobTransitions, lookup_timeout: Duration) -> Self {
        Self {
            transitions,
            lookup_timeout,
        }
    }

    /// Returns false when no in-flight job carries the uuid, e.g. a duplicate or late callback.
    /// `None` stands for a payload that could not be parsed.
    pub async fn handle(
        &self,
        interpreter_job_uuid: &str,
        result: Option<InterpreterResult>,
    ) -> types::Result<bool> {
        // the callback can arrive before the accepting push has committed
        if self.lookup(interpreter_job_uuid).await?.is_none() {
            tracing::debug!(interpreter_job_uuid, "result for unknown job, ignoring");
            return Ok(false);
        }

        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let Some(job) = store
            .jobs
            .get_by_interpreter_job_uuid(uow.tx(), interpreter_job_uuid)
            .await?
        else {
            return Ok(false);
        };

        if !job.status.is_in_flight() {
            return Ok(false);
        }

        let batch = store.batches.get_for_update(uow.tx(), job.batch_id).await?;
        let result = result.unwrap_or_else(|| PredefinedResult::ResultUnparsable.result());

        if batch.status.is_aborting() {
            self.transitions
                .set_abort_result(&mut uow, &job, &result)
                .await?;
        } else {
            match result.code {
                Code::Success => {
                    self.transitions
                        .set_success_result(&mut uow, &job, &result)
                        .await?
                }
                Code::Error => {
                    self.transitions
                        .set_error_result(&mut uow, &job, &result)
                        .await?
                }
                Code::Aborted => {
                    self.transitions
                        .set_abort_result(&mut uow, &job, &result)
                        .await?
                }
            }
        }

        store.commit(uow).await?;

        Ok(true)
    }

    /// Publishes streaming output for the job. Returns false for unknown uuids.
    pub async fn handle_temp_output(
        &self,
        interpreter_job_uuid: &str,
        text: String,
    ) -> types::Result<bool> {
        let Some(job) = self.lookup(interpreter_job_uuid).await? else {
            return Ok(false);
        };

        self.transitions.store().publish(ChangeEvent::JobTempOutput {
            note_id: job.note_id,
            paragraph_id: job.paragraph_id,
            job_id: job.id,
            text,
        });

        Ok(true)
    }

    async fn lookup(&self, interpreter_job_uuid: &str) -> types::Result<Option<job::Model>> {
        let store = self.transitions.store();
        let mut waited = Duration::ZERO;

        loop {
            let uow = store.begin().await?;
            let job = store
                .jobs
                .get_by_interpreter_job_uuid(uow.tx(), interpreter_job_uuid)
                .await?;
            store.commit(uow).await?;

            if job.is_some() || waited >= self.lookup_timeout {
                return Ok(job);
            }

            tokio::time::sleep(LOOKUP_STEP).await;
            waited += LOOKUP_STEP;
        }
    }
}

//! State transitions shared by the scheduler cycles and the result reconciler.
//!
//! Every mutation runs inside a [`UnitOfWork`]; the caller commits.

use chrono::{NaiveDateTime, Utc};
use folio_core::result::{InterpreterResult, Message, PredefinedResult};
use folio_core::types;
use folio_persistence::job::{self, JobStatus};
use folio_persistence::job_batch::{self, JobBatchStatus};
use sea_orm::ActiveEnum;

use crate::event::ChangeEvent;
use crate::metric;
use crate::store::{Store, UnitOfWork};

pub mod abort;
pub mod dead;
pub mod execution;
pub mod pending;
pub mod result;
pub mod schedule;

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Clone)]
pub struct JobTransitions {
    store: Store,
}

impl JobTransitions {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) async fn update_job(
        &self,
        uow: &mut UnitOfWork,
        before: &job::Model,
        after: job::Model,
    ) -> types::Result<job::Model> {
        let after = self.store.jobs.update(uow.tx(), &after).await?;

        uow.record(ChangeEvent::Job {
            before: Some(before.clone()),
            after: after.clone(),
        });

        Ok(after)
    }

    pub(crate) async fn update_batch(
        &self,
        uow: &mut UnitOfWork,
        before: &job_batch::Model,
        after: job_batch::Model,
    ) -> types::Result<job_batch::Model> {
        let after = self.store.batches.update(uow.tx(), &after).await?;

        uow.record(ChangeEvent::JobBatch {
            before: Some(before.clone()),
            after: after.clone(),
        });

        Ok(after)
    }

    pub async fn set_running_state(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        interpreter_process_uuid: String,
        interpreter_job_uuid: String,
    ) -> types::Result<job::Model> {
        let now = now();

        let after = self
            .update_job(
                uow,
                job,
                job::Model {
                    status: JobStatus::Running,
                    interpreter_process_uuid: Some(interpreter_process_uuid),
                    interpreter_job_uuid: Some(interpreter_job_uuid),
                    started_at: Some(now),
                    ended_at: None,
                    ..job.clone()
                },
            )
            .await?;

        let batch = self
            .store
            .batches
            .get_for_update(uow.tx(), job.batch_id)
            .await?;

        if batch.status == JobBatchStatus::Pending {
            self.update_batch(
                uow,
                &batch,
                job_batch::Model {
                    status: JobBatchStatus::Running,
                    started_at: batch.started_at.or(Some(now)),
                    ..batch.clone()
                },
            )
            .await?;
        }

        tracing::info!(
            job_id = job.id,
            batch_id = job.batch_id,
            shebang = %job.shebang,
            interpreter_job_uuid = after.interpreter_job_uuid.as_deref().unwrap_or_default(),
            "job is running"
        );

        Ok(after)
    }

    pub async fn set_success_result(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        result: &InterpreterResult,
    ) -> types::Result<()> {
        self.persist_messages(uow, job, &result.messages).await?;

        let job = self.finish_job(uow, job, JobStatus::Done).await?;

        let batch = self
            .store
            .batches
            .get_for_update(uow.tx(), job.batch_id)
            .await?;

        let jobs = self.store.jobs.load_by_batch(uow.tx(), job.batch_id).await?;

        if !batch.status.is_terminal() && jobs.iter().all(|j| j.status == JobStatus::Done) {
            self.update_batch(
                uow,
                &batch,
                job_batch::Model {
                    status: JobBatchStatus::Done,
                    ended_at: Some(now()),
                    ..batch.clone()
                },
            )
            .await?;

            tracing::info!(batch_id = batch.id, "batch is done");
        }

        Ok(())
    }

    pub async fn set_error_result(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        result: &InterpreterResult,
    ) -> types::Result<()> {
        self.set_failed_result(
            uow,
            job,
            JobStatus::Error,
            JobBatchStatus::Error,
            result,
            PredefinedResult::ResultUnparsable,
        )
        .await
    }

    pub async fn set_abort_result(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        result: &InterpreterResult,
    ) -> types::Result<()> {
        self.set_failed_result(
            uow,
            job,
            JobStatus::Aborted,
            JobBatchStatus::Aborted,
            result,
            PredefinedResult::Aborted,
        )
        .await
    }

    async fn set_failed_result(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        job_status: JobStatus,
        batch_status: JobBatchStatus,
        result: &InterpreterResult,
        fallback: PredefinedResult,
    ) -> types::Result<()> {
        if result.messages.is_empty() {
            self.persist_messages(uow, job, &fallback.result().messages)
                .await?;
        } else {
            self.persist_messages(uow, job, &result.messages).await?;
        }

        let job = self.finish_job(uow, job, job_status).await?;

        let batch = self
            .store
            .batches
            .get_for_update(uow.tx(), job.batch_id)
            .await?;

        self.cancel_pending_jobs(uow, batch.id).await?;

        if !batch.status.is_terminal() {
            self.update_batch(
                uow,
                &batch,
                job_batch::Model {
                    status: batch_status,
                    ended_at: Some(now()),
                    ..batch.clone()
                },
            )
            .await?;
        }

        tracing::info!(
            job_id = job.id,
            batch_id = batch.id,
            "batch finished with {}",
            batch_status.to_value()
        );

        Ok(())
    }

    /// Forces every pending job of the batch to `Canceled`.
    pub(crate) async fn cancel_pending_jobs(
        &self,
        uow: &mut UnitOfWork,
        batch_id: i64,
    ) -> types::Result<usize> {
        let now = now();
        let mut canceled = 0;

        for sibling in self.store.jobs.load_by_batch(uow.tx(), batch_id).await? {
            if sibling.status != JobStatus::Pending {
                continue;
            }

            self.update_job(
                uow,
                &sibling,
                job::Model {
                    status: JobStatus::Canceled,
                    interpreter_process_uuid: None,
                    interpreter_job_uuid: None,
                    started_at: Some(now),
                    ended_at: Some(now),
                    ..sibling.clone()
                },
            )
            .await?;

            metric::job_terminal_count_metric()
                .with_label_values(&[&JobStatus::Canceled.to_value()])
                .inc();

            canceled += 1;
        }

        Ok(canceled)
    }

    async fn finish_job(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        status: JobStatus,
    ) -> types::Result<job::Model> {
        let now = now();

        let after = self
            .update_job(
                uow,
                job,
                job::Model {
                    status,
                    interpreter_process_uuid: None,
                    interpreter_job_uuid: None,
                    started_at: job.started_at.or(Some(now)),
                    ended_at: Some(now),
                    ..job.clone()
                },
            )
            .await?;

        metric::job_terminal_count_metric()
            .with_label_values(&[&status.to_value()])
            .inc();

        tracing::info!(
            job_id = job.id,
            batch_id = job.batch_id,
            shebang = %job.shebang,
            "job finished with {}",
            status.to_value()
        );

        Ok(after)
    }

    /// Puts an in-flight job back in the queue with its correlation ids cleared.
    pub(crate) async fn requeue(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
    ) -> types::Result<job::Model> {
        let after = self
            .update_job(
                uow,
                job,
                job::Model {
                    status: JobStatus::Pending,
                    interpreter_process_uuid: None,
                    interpreter_job_uuid: None,
                    ended_at: None,
                    ..job.clone()
                },
            )
            .await?;

        tracing::info!(job_id = job.id, batch_id = job.batch_id, shebang = %job.shebang, "job requeued");

        Ok(after)
    }

    async fn persist_messages(
        &self,
        uow: &mut UnitOfWork,
        job: &job::Model,
        messages: &[Message],
    ) -> types::Result<()> {
        for message in messages {
            let result = self
                .store
                .results
                .persist(uow.tx(), job.id, message)
                .await?;

            uow.record(ChangeEvent::JobResult {
                note_id: job.note_id.clone(),
                paragraph_id: job.paragraph_id.clone(),
                result,
            });
        }

        Ok(())
    }
}

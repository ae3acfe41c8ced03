use folio_core::errors::Error;
use folio_core::err_unsupported_op;
use folio_core::types;
use folio_persistence::job_batch::{self, JobBatchStatus};

use crate::event::ChangeEvent;
use crate::handler::JobTransitions;
use crate::job::NewJob;

/// A single paragraph of a note run request.
#[derive(Clone, Debug)]
pub struct ParagraphRun {
    pub paragraph_id: String,
    pub shebang: String,
    pub payload: String,
}

#[derive(Clone, Debug)]
pub struct NoteRun {
    pub note_id: String,
    pub paragraphs: Vec<ParagraphRun>,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

pub struct ExecutionHandler {
    transitions: JobTransitions,
}

impl ExecutionHandler {
    pub fn new(transitions: JobTransitions) -> Self {
        Self { transitions }
    }

    /// Persists the batch with its jobs and payloads atomically and hands it to the scheduler.
    pub async fn run(&self, run: NoteRun) -> types::Result<job_batch::Model> {
        if run.paragraphs.is_empty() {
            return Err(err_unsupported_op!(
                "note '{}' has no paragraphs to run",
                run.note_id
            ));
        }

        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        if let Some(latest) = store
            .batches
            .get_latest_by_note(uow.tx(), &run.note_id)
            .await?
        {
            if !latest.status.is_terminal() && latest.status != JobBatchStatus::HandleError {
                return Err(Error::EntityConflict {
                    kind: crate::job_batch::KIND.to_string(),
                    name: latest.id.to_string(),
                    reason: format!("note '{}' is already running", run.note_id),
                });
            }
        }

        let batch = store.batches.persist(uow.tx(), &run.note_id).await?;

        let roles = if run.roles.is_empty() {
            None
        } else {
            Some(run.roles.join(","))
        };

        for (index, paragraph) in run.paragraphs.into_iter().enumerate() {
            let job = store
                .jobs
                .persist(
                    uow.tx(),
                    NewJob {
                        batch_id: batch.id,
                        note_id: run.note_id.clone(),
                        paragraph_id: paragraph.paragraph_id,
                        index_number: index as i32,
                        shebang: paragraph.shebang,
                        username: run.username.clone(),
                        roles: roles.clone(),
                    },
                )
                .await?;

            store
                .payloads
                .persist(uow.tx(), job.id, paragraph.payload)
                .await?;

            uow.record(ChangeEvent::Job {
                before: None,
                after: job,
            });
        }

        let pending = store
            .batches
            .update(
                uow.tx(),
                &job_batch::Model {
                    status: JobBatchStatus::Pending,
                    ..batch.clone()
                },
            )
            .await?;

        uow.record(ChangeEvent::JobBatch {
            before: None,
            after: pending.clone(),
        });

        store.commit(uow).await?;

        tracing::info!(batch_id = pending.id, note_id = %pending.note_id, "batch submitted");

        Ok(pending)
    }
}

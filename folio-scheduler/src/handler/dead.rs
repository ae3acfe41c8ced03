use folio_core::types;

use crate::handler::JobTransitions;
use crate::process::registry::InterpreterProcessRegistry;

pub struct DeadInterpreterHandler {
    transitions: JobTransitions,
}

impl DeadInterpreterHandler {
    pub fn new(transitions: JobTransitions) -> Self {
        Self { transitions }
    }

    /// Requeues every job bound to the dead process. Returns the number of jobs requeued.
    pub async fn handle(&self, interpreter_process_uuid: &str) -> types::Result<usize> {
        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let jobs = store
            .jobs
            .load_by_interpreter_process_uuid(uow.tx(), interpreter_process_uuid)
            .await?;

        let mut requeued = 0;
        for job in jobs.iter().filter(|job| job.status.is_in_flight()) {
            self.transitions.requeue(&mut uow, job).await?;
            requeued += 1;
        }

        store.commit(uow).await?;

        if requeued > 0 {
            tracing::warn!(
                interpreter_process_uuid,
                "requeued {} jobs of dead interpreter process",
                requeued
            );
        }

        Ok(requeued)
    }

    /// Requeues in-flight jobs bound to a process the registry no longer knows.
    pub async fn requeue_orphans(&self, registry: &InterpreterProcessRegistry) -> types::Result<usize> {
        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let jobs = store.jobs.load_in_flight(uow.tx()).await?;

        // read after the jobs so an accept committed before the load is matched
        let known = registry.known_process_uuids();

        let mut requeued = 0;
        for job in &jobs {
            let orphaned = match job.interpreter_process_uuid.as_deref() {
                Some(uuid) => !known.contains(uuid),
                None => true,
            };

            if orphaned {
                tracing::warn!(
                    job_id = job.id,
                    interpreter_process_uuid = job.interpreter_process_uuid.as_deref().unwrap_or_default(),
                    "job is bound to an unknown interpreter process"
                );

                self.transitions.requeue(&mut uow, job).await?;
                requeued += 1;
            }
        }

        store.commit(uow).await?;

        Ok(requeued)
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use folio_core::constants::Constants;
use folio_core::option::{InterpreterOption, InterpreterOptionRepository};
use folio_core::remote::{PushOutcome, PushRequest};
use folio_core::result::{Code, InterpreterResult, Message, PredefinedResult};
use folio_core::types::{self, Properties};
use folio_persistence::job::{self, JobStatus};
use sea_orm::ActiveEnum;

use crate::handler::JobTransitions;
use crate::metric;
use crate::process::registry::InterpreterProcessRegistry;
use crate::process::{InterpreterProcess, ProcessStatus};

#[derive(Clone, Debug)]
pub struct PendingSettings {
    pub death_threshold: u32,
    pub decline_retry_limit: u32,
}

/// Work visible to one pending pass.
pub struct PendingJobs {
    pub jobs: Vec<job::Model>,
    pub active_shebangs: HashSet<String>,
}

/// What a single dispatch attempt did to the job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Running,
    Failed,
    Skipped,
}

pub struct PendingHandler {
    transitions: JobTransitions,
    registry: Arc<InterpreterProcessRegistry>,
    options: Arc<dyn InterpreterOptionRepository>,
    settings: PendingSettings,
}

impl PendingHandler {
    pub fn new(
        transitions: JobTransitions,
        registry: Arc<InterpreterProcessRegistry>,
        options: Arc<dyn InterpreterOptionRepository>,
        settings: PendingSettings,
    ) -> Self {
        Self {
            transitions,
            registry,
            options,
            settings,
        }
    }

    pub async fn load_jobs(&self) -> types::Result<PendingJobs> {
        let store = self.transitions.store();
        let uow = store.begin().await?;

        let jobs = store.jobs.load_next_pending(uow.tx()).await?;
        let active_shebangs = store.jobs.load_active_shebangs(uow.tx()).await?;

        store.commit(uow).await?;

        Ok(PendingJobs {
            jobs,
            active_shebangs,
        })
    }

    /// Runs one pass: at most one attempt per batch and per shebang.
    /// Returns the ids of the jobs that were moved to `Running`.
    pub async fn pass(&self) -> types::Result<Vec<i64>> {
        let PendingJobs {
            jobs,
            active_shebangs,
        } = self.load_jobs().await?;

        let mut busy_batches = HashSet::new();
        let mut busy_shebangs = HashSet::new();
        let mut dispatched = Vec::new();

        for job in jobs {
            if !busy_batches.insert(job.batch_id) {
                continue;
            }

            if !busy_shebangs.insert(job.shebang.clone()) {
                tracing::debug!(job_id = job.id, shebang = %job.shebang, "shebang busy in this pass");
                continue;
            }

            match self.handle(&job, &active_shebangs).await {
                Ok(Dispatch::Running) => dispatched.push(job.id),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(job_id = job.id, shebang = %job.shebang, "failed to dispatch job: {}", e)
                }
            }
        }

        Ok(dispatched)
    }

    pub async fn handle(
        &self,
        job: &job::Model,
        active_shebangs: &HashSet<String>,
    ) -> types::Result<Dispatch> {
        let Some(option) = self.options.get_option(&job.shebang).await? else {
            return self
                .fail(job, PredefinedResult::InterpreterNotFound.result())
                .await;
        };

        if !option.enabled {
            return self
                .fail(job, PredefinedResult::InterpreterDisabled.result())
                .await;
        }

        let roles = job_roles(job);
        if !option.is_owner(job.username.as_deref(), &roles) {
            return self.deny(job, &option).await;
        }

        let deaths = self.registry.death_count(&job.shebang);
        if deaths > self.settings.death_threshold {
            tracing::warn!(
                shebang = %job.shebang,
                "interpreter died {} times in a row, disabling it",
                deaths
            );

            self.options.set_enabled(&job.shebang, false).await?;
            self.registry.reset_death_counter(&job.shebang);

            return Ok(Dispatch::Skipped);
        }

        if !option.concurrent && active_shebangs.contains(&job.shebang) {
            return Ok(Dispatch::Skipped);
        }

        let process = self.registry.get_remote(&option).await;

        match process.status {
            ProcessStatus::Ready => {}
            ProcessStatus::NotFound => {
                self.registry
                    .remove_if_status(&job.shebang, ProcessStatus::NotFound);

                return self
                    .fail(job, PredefinedResult::ProcessNotFound.result())
                    .await;
            }
            ProcessStatus::Starting | ProcessStatus::Dead => {
                tracing::debug!(
                    job_id = job.id,
                    shebang = %job.shebang,
                    "interpreter process is {}",
                    process.status
                );

                return Ok(Dispatch::Skipped);
            }
        }

        self.registry.reset_death_counter(&job.shebang);

        self.push(job, &option, &process).await
    }

    async fn push(
        &self,
        job: &job::Model,
        option: &InterpreterOption,
        process: &InterpreterProcess,
    ) -> types::Result<Dispatch> {
        let store = self.transitions.store();

        let uow = store.begin().await?;
        let payload = store.payloads.get_by_job(uow.tx(), job.id).await?;
        store.commit(uow).await?;

        let request = PushRequest {
            payload: payload.payload,
            note_context: note_context(job),
            user_context: user_context(job),
            configuration: option.properties.clone(),
        };

        let outcome = match process.get_connection().await {
            Ok(connection) => connection.push(request).await,
            Err(e) => Err(e),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(job_id = job.id, shebang = %job.shebang, "push failed: {}", e);
                return Ok(Dispatch::Skipped);
            }
        };

        metric::job_dispatch_count_metric()
            .with_label_values(&[&job.shebang, outcome.label()])
            .inc();

        match outcome {
            PushOutcome::Accept {
                interpreter_process_uuid,
                interpreter_job_uuid,
            } => {
                // dead-process reconciliation matches jobs by the registered uuid
                let process_uuid = match process.uuid.clone() {
                    Some(uuid) => {
                        if !interpreter_process_uuid.is_empty() && interpreter_process_uuid != uuid {
                            tracing::warn!(
                                job_id = job.id,
                                "interpreter reported process uuid {}, registered as {}",
                                interpreter_process_uuid,
                                uuid
                            );
                        }
                        uuid
                    }
                    None => interpreter_process_uuid,
                };

                self.accept(job, process, process_uuid, interpreter_job_uuid)
                    .await
            }
            PushOutcome::Decline => self.decline(job).await,
            PushOutcome::Error => {
                tracing::warn!(job_id = job.id, shebang = %job.shebang, "interpreter returned error on push");
                Ok(Dispatch::Skipped)
            }
        }
    }

    async fn accept(
        &self,
        job: &job::Model,
        process: &InterpreterProcess,
        process_uuid: String,
        job_uuid: String,
    ) -> types::Result<Dispatch> {
        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let current = store.jobs.get_for_update(uow.tx(), job.id).await?;

        if current.status != JobStatus::Pending {
            drop(uow);

            tracing::warn!(
                job_id = job.id,
                "job became {} while being pushed, cancelling remote copy",
                current.status.to_value()
            );

            self.cancel_remote_copy(job, process, &job_uuid).await;
            return Ok(Dispatch::Skipped);
        }

        // the handle may have been reaped while the push was in flight
        if !self.is_registered(process) {
            drop(uow);

            tracing::warn!(
                job_id = job.id,
                shebang = %job.shebang,
                "interpreter process went away while the job was pushed, keeping it pending"
            );

            self.cancel_remote_copy(job, process, &job_uuid).await;
            return Ok(Dispatch::Skipped);
        }

        self.transitions
            .set_running_state(&mut uow, &current, process_uuid, job_uuid)
            .await?;

        store.commit(uow).await?;

        Ok(Dispatch::Running)
    }

    fn is_registered(&self, process: &InterpreterProcess) -> bool {
        match self.registry.get(&process.shebang) {
            Some(current) => current.is_ready() && current.uuid.is_some() && current.uuid == process.uuid,
            None => false,
        }
    }

    async fn cancel_remote_copy(&self, job: &job::Model, process: &InterpreterProcess, job_uuid: &str) {
        if let Ok(connection) = process.get_connection().await {
            if let Err(e) = connection.cancel(job_uuid).await {
                tracing::warn!(job_id = job.id, "failed to cancel remote copy: {}", e);
            }
        }
    }

    async fn decline(&self, job: &job::Model) -> types::Result<Dispatch> {
        tracing::debug!(job_id = job.id, shebang = %job.shebang, "interpreter declined job");

        let limit = self.settings.decline_retry_limit;
        if limit == 0 {
            return Ok(Dispatch::Skipped);
        }

        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let current = store.jobs.get_for_update(uow.tx(), job.id).await?;
        if current.status != JobStatus::Pending {
            return Ok(Dispatch::Skipped);
        }

        let declines = current.decline_count + 1;

        if declines as u32 > limit {
            let result = InterpreterResult::new(
                Code::Error,
                vec![Message::text(format!(
                    "Interpreter declined the job {} times",
                    declines
                ))],
            );

            self.transitions
                .set_error_result(&mut uow, &current, &result)
                .await?;
            store.commit(uow).await?;

            return Ok(Dispatch::Failed);
        }

        self.transitions
            .update_job(
                &mut uow,
                &current,
                job::Model {
                    decline_count: declines,
                    ..current.clone()
                },
            )
            .await?;
        store.commit(uow).await?;

        Ok(Dispatch::Skipped)
    }

    async fn deny(&self, job: &job::Model, option: &InterpreterOption) -> types::Result<Dispatch> {
        let message = format!(
            "User [{}] does not have access to [{}] interpreter.",
            job.username.as_deref().unwrap_or_default(),
            option.interpreter_name
        );

        tracing::warn!(job_id = job.id, shebang = %job.shebang, "{}", message);

        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let current = store.jobs.get_for_update(uow.tx(), job.id).await?;
        if current.status != JobStatus::Pending {
            return Ok(Dispatch::Skipped);
        }

        let result = InterpreterResult::new(Code::Aborted, vec![Message::text(message)]);

        self.transitions
            .set_abort_result(&mut uow, &current, &result)
            .await?;
        store.commit(uow).await?;

        Ok(Dispatch::Failed)
    }

    async fn fail(&self, job: &job::Model, result: InterpreterResult) -> types::Result<Dispatch> {
        let store = self.transitions.store();
        let mut uow = store.begin().await?;

        let current = store.jobs.get_for_update(uow.tx(), job.id).await?;
        if current.status != JobStatus::Pending {
            return Ok(Dispatch::Skipped);
        }

        self.transitions
            .set_error_result(&mut uow, &current, &result)
            .await?;
        store.commit(uow).await?;

        Ok(Dispatch::Failed)
    }
}

fn note_context(job: &job::Model) -> Properties {
    Properties::from([
        (Constants::NoteId.to_string(), job.note_id.clone()),
        (Constants::ParagraphId.to_string(), job.paragraph_id.clone()),
        (Constants::EnvNoteId.to_string(), job.note_id.clone()),
        (Constants::EnvParagraphId.to_string(), job.paragraph_id.clone()),
        (Constants::EnvBatchId.to_string(), job.batch_id.to_string()),
    ])
}

fn job_roles(job: &job::Model) -> Vec<&str> {
    job.roles
        .as_deref()
        .map(|roles| roles.split(',').filter(|role| !role.is_empty()).collect())
        .unwrap_or_default()
}

fn user_context(job: &job::Model) -> Properties {
    Properties::from([
        (
            Constants::EnvUserName.to_string(),
            job.username.clone().unwrap_or_default(),
        ),
        (
            Constants::EnvUserRoles.to_string(),
            job.roles.clone().unwrap_or_default(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job() -> job::Model {
        let now = Utc::now().naive_utc();

        job::Model {
            id: 7,
            batch_id: 3,
            note_id: "note-1".to_string(),
            paragraph_id: "paragraph-2".to_string(),
            index_number: 0,
            shebang: "%python".to_string(),
            status: JobStatus::Pending,
            username: Some("alice".to_string()),
            roles: Some("admin,dev".to_string()),
            interpreter_process_uuid: None,
            interpreter_job_uuid: None,
            decline_count: 0,
            created_at: now,
            started_at: None,
            ended_at: None,
        }
    }

    #[test]
    fn test_note_context_carries_plain_and_env_keys() {
        let context = note_context(&job());

        assert_eq!(context.get("noteId").map(String::as_str), Some("note-1"));
        assert_eq!(
            context.get("Z_ENV_PARAGRAPH_ID").map(String::as_str),
            Some("paragraph-2")
        );
        assert_eq!(context.get("Z_ENV_BATCH_ID").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_job_roles_skip_empty_entries() {
        let mut job = job();
        assert_eq!(job_roles(&job), vec!["admin", "dev"]);

        job.roles = Some(String::new());
        assert!(job_roles(&job).is_empty());
    }

    #[test]
    fn test_user_context() {
        let context = user_context(&job());

        assert_eq!(
            context.get("Z_ENV_USER_NAME").map(String::as_str),
            Some("alice")
        );
        assert_eq!(
            context.get("Z_ENV_USER_ROLES").map(String::as_str),
            Some("admin,dev")
        );
    }
}

use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use folio_core::errors::Error;
use folio_core::{err_unsupported_op, types};
use folio_persistence::{job_batch, schedule};

use crate::handler::execution::{ExecutionHandler, NoteRun, ParagraphRun};
use crate::schedule::NewSchedule;
use crate::store::Store;

/// Where a scheduled run gets the paragraphs of its note.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Paragraphs in run order, `None` when the note is gone.
    async fn paragraphs(&self, note_id: &str) -> types::Result<Option<Vec<ParagraphRun>>>;
}

/// Replays the paragraphs of the note's latest batch.
pub struct LatestRunNoteSource {
    store: Store,
}

impl LatestRunNoteSource {
    pub fn new(store: Store) -> Arc<dyn NoteSource> {
        Arc::new(Self { store })
    }
}

#[async_trait]
impl NoteSource for LatestRunNoteSource {
    async fn paragraphs(&self, note_id: &str) -> types::Result<Option<Vec<ParagraphRun>>> {
        let uow = self.store.begin().await?;

        let Some(batch) = self
            .store
            .batches
            .get_latest_by_note(uow.tx(), note_id)
            .await?
        else {
            return Ok(None);
        };

        let mut paragraphs = Vec::new();

        for job in self.store.jobs.load_by_batch(uow.tx(), batch.id).await? {
            let payload = self.store.payloads.get_by_job(uow.tx(), job.id).await?;

            paragraphs.push(ParagraphRun {
                paragraph_id: job.paragraph_id,
                shebang: job.shebang,
                payload: payload.payload,
            });
        }

        self.store.commit(uow).await?;

        Ok(Some(paragraphs))
    }
}

/// Next fire time strictly after `after`. Expressions have a leading seconds field.
pub fn next_execution(expression: &str, after: DateTime<Utc>) -> types::Result<NaiveDateTime> {
    let schedule = cron::Schedule::from_str(expression).map_err(|e| Error::Configuration {
        message: format!("invalid cron expression '{}'", expression),
        source: anyhow!("{}", e),
    })?;

    schedule
        .after(&after)
        .next()
        .map(|next| next.naive_utc())
        .ok_or_else(|| err_unsupported_op!("cron expression '{}' never fires again", expression))
}

pub struct ScheduleHandler {
    store: Store,
    execution: Arc<ExecutionHandler>,
    notes: Arc<dyn NoteSource>,
}

impl ScheduleHandler {
    pub fn new(store: Store, execution: Arc<ExecutionHandler>, notes: Arc<dyn NoteSource>) -> Self {
        Self {
            store,
            execution,
            notes,
        }
    }

    /// Creates or replaces the schedule of a note.
    pub async fn schedule(
        &self,
        note_id: &str,
        expression: &str,
        username: Option<String>,
        roles: Vec<String>,
    ) -> types::Result<schedule::Model> {
        let next = next_execution(expression, Utc::now())?;
        let roles = if roles.is_empty() {
            None
        } else {
            Some(roles.join(","))
        };

        let uow = self.store.begin().await?;

        let saved = match self.store.schedules.get_by_note(uow.tx(), note_id).await? {
            Some(existing) => {
                self.store
                    .schedules
                    .update(
                        uow.tx(),
                        &schedule::Model {
                            enabled: true,
                            expression: expression.to_string(),
                            username,
                            roles,
                            next_execution: next,
                            ..existing
                        },
                    )
                    .await?
            }
            None => {
                self.store
                    .schedules
                    .persist(
                        uow.tx(),
                        NewSchedule {
                            note_id: note_id.to_string(),
                            expression: expression.to_string(),
                            username,
                            roles,
                            next_execution: next,
                        },
                    )
                    .await?
            }
        };

        self.store.commit(uow).await?;

        tracing::info!(note_id, next_execution = %saved.next_execution, "note scheduled");

        Ok(saved)
    }

    pub async fn unschedule(&self, note_id: &str) -> types::Result<bool> {
        let uow = self.store.begin().await?;
        let deleted = self.store.schedules.delete_by_note(uow.tx(), note_id).await?;
        self.store.commit(uow).await?;

        Ok(deleted)
    }

    pub async fn load_jobs(&self) -> types::Result<Vec<schedule::Model>> {
        let uow = self.store.begin().await?;
        let schedules = self
            .store
            .schedules
            .load_ready(uow.tx(), Utc::now().naive_utc())
            .await?;
        self.store.commit(uow).await?;

        Ok(schedules)
    }

    /// Submits a batch for every due schedule. Returns the submitted batches.
    pub async fn pass(&self) -> types::Result<Vec<job_batch::Model>> {
        let mut submitted = Vec::new();

        for schedule in self.load_jobs().await? {
            match self.handle(&schedule).await {
                Ok(Some(batch)) => submitted.push(batch),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(note_id = %schedule.note_id, "scheduled run failed: {}", e)
                }
            }
        }

        Ok(submitted)
    }

    pub async fn handle(&self, schedule: &schedule::Model) -> types::Result<Option<job_batch::Model>> {
        let now = Utc::now();

        let next = match next_execution(&schedule.expression, now) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(note_id = %schedule.note_id, "disabling schedule: {}", e);
                self.disable(schedule).await?;
                return Ok(None);
            }
        };

        let Some(paragraphs) = self.notes.paragraphs(&schedule.note_id).await? else {
            tracing::warn!(note_id = %schedule.note_id, "scheduled note no longer exists, disabling schedule");
            self.disable(schedule).await?;
            return Ok(None);
        };

        let batch = if paragraphs.is_empty() {
            tracing::warn!(note_id = %schedule.note_id, "scheduled note has no paragraphs");
            None
        } else {
            let run = NoteRun {
                note_id: schedule.note_id.clone(),
                paragraphs,
                username: schedule.username.clone(),
                roles: split_roles(schedule.roles.as_deref()),
            };

            match self.execution.run(run).await {
                Ok(batch) => Some(batch),
                Err(Error::EntityConflict { .. }) => {
                    // fires again once the running batch settles
                    tracing::info!(note_id = %schedule.note_id, "note is already running, skipping scheduled run");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        };

        self.advance(schedule, next).await?;

        Ok(batch)
    }

    async fn advance(&self, schedule: &schedule::Model, next: NaiveDateTime) -> types::Result<()> {
        let uow = self.store.begin().await?;

        self.store
            .schedules
            .update(
                uow.tx(),
                &schedule::Model {
                    last_execution: Some(schedule.next_execution),
                    next_execution: next,
                    ..schedule.clone()
                },
            )
            .await?;

        self.store.commit(uow).await?;

        tracing::info!(note_id = %schedule.note_id, next_execution = %next, "scheduled run submitted");

        Ok(())
    }

    async fn disable(&self, schedule: &schedule::Model) -> types::Result<()> {
        let uow = self.store.begin().await?;

        self.store
            .schedules
            .update(
                uow.tx(),
                &schedule::Model {
                    enabled: false,
                    ..schedule.clone()
                },
            )
            .await?;

        self.store.commit(uow).await?;

        Ok(())
    }
}

fn split_roles(roles: Option<&str>) -> Vec<String> {
    roles
        .map(|roles| {
            roles
                .split(',')
                .filter(|role| !role.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_execution_is_after_the_given_time() {
        let after = Utc.with_ymd_and_hms(2024, 4, 16, 8, 15, 30).unwrap();

        let next = next_execution("0 0 * * * *", after).unwrap();

        assert_eq!(
            next,
            Utc.with_ymd_and_hms(2024, 4, 16, 9, 0, 0).unwrap().naive_utc()
        );
    }

    #[test]
    fn test_invalid_expression_is_a_configuration_error() {
        let err = next_execution("every tuesday", Utc::now()).err().unwrap();

        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_split_roles() {
        assert_eq!(split_roles(Some("admin,dev")), vec!["admin", "dev"]);
        assert!(split_roles(Some("")).is_empty());
        assert!(split_roles(None).is_empty());
    }
}

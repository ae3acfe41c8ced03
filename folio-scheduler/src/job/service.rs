use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use folio_core::{err_not_found, types};
use folio_persistence::job::{ActiveModel, Column, Entity, JobStatus, Model};
use folio_persistence::job_batch::{
    Column as JobBatchColumn, Entity as JobBatchEntity, JobBatchStatus,
};
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;

use crate::job::repository::Repository;
use crate::job::NewJob;

pub struct Service;

impl Service {
    pub fn new() -> Arc<Box<dyn Repository>> {
        Arc::new(Box::new(Self))
    }

    async fn load_by_batches_tx(
        &self,
        tx: &DatabaseTransaction,
        batch_statuses: Vec<JobBatchStatus>,
    ) -> types::Result<Vec<Model>> {
        let batch_ids: Vec<i64> = JobBatchEntity::find()
            .filter(JobBatchColumn::Status.is_in(batch_statuses))
            .order_by_asc(JobBatchColumn::Id)
            .all(tx)
            .await?
            .into_iter()
            .map(|batch| batch.id)
            .collect();

        if batch_ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(Entity::find()
            .filter(Column::BatchId.is_in(batch_ids))
            .order_by_asc(Column::BatchId)
            .order_by_asc(Column::IndexNumber)
            .all(tx)
            .await?)
    }
}

#[async_trait]
impl Repository for Service {
    async fn persist(&self, tx: &DatabaseTransaction, job: NewJob) -> types::Result<Model> {
        let obj = ActiveModel {
            batch_id: Set(job.batch_id),
            note_id: Set(job.note_id),
            paragraph_id: Set(job.paragraph_id),
            index_number: Set(job.index_number),
            shebang: Set(job.shebang),
            status: Set(JobStatus::Pending),
            username: Set(job.username),
            roles: Set(job.roles),
            interpreter_process_uuid: Set(None),
            interpreter_job_uuid: Set(None),
            decline_count: Set(0),
            created_at: Set(Utc::now().naive_utc()),
            started_at: Set(None),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(tx)
        .await?;

        Ok(obj)
    }

    async fn update(&self, tx: &DatabaseTransaction, job: &Model) -> types::Result<Model> {
        let obj = ActiveModel {
            id: Set(job.id),
            status: Set(job.status),
            interpreter_process_uuid: Set(job.interpreter_process_uuid.clone()),
            interpreter_job_uuid: Set(job.interpreter_job_uuid.clone()),
            decline_count: Set(job.decline_count),
            started_at: Set(job.started_at),
            ended_at: Set(job.ended_at),
            ..Default::default()
        }
        .update(tx)
        .await?;

        Ok(obj)
    }

    async fn get(&self, tx: &DatabaseTransaction, id: i64) -> types::Result<Option<Model>> {
        Ok(Entity::find_by_id(id).one(tx).await?)
    }

    async fn get_for_update(&self, tx: &DatabaseTransaction, id: i64) -> types::Result<Model> {
        Entity::find_by_id(id)
            .lock(LockType::Update)
            .one(tx)
            .await?
            .ok_or_else(|| err_not_found!(crate::job::KIND, id))
    }

    async fn get_by_interpreter_job_uuid(
        &self,
        tx: &DatabaseTransaction,
        interpreter_job_uuid: &str,
    ) -> types::Result<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::InterpreterJobUuid.eq(interpreter_job_uuid))
            .lock(LockType::Update)
            .one(tx)
            .await?)
    }

    async fn load_by_batch(
        &self,
        tx: &DatabaseTransaction,
        batch_id: i64,
    ) -> types::Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .order_by_asc(Column::IndexNumber)
            .all(tx)
            .await?)
    }

    async fn load_next_pending(&self, tx: &DatabaseTransaction) -> types::Result<Vec<Model>> {
        let jobs = self
            .load_by_batches_tx(tx, vec![JobBatchStatus::Pending, JobBatchStatus::Running])
            .await?;

        let blocked_batches: HashSet<i64> = jobs
            .iter()
            .filter(|job| job.status.is_in_flight() || job.status == JobStatus::Error)
            .map(|job| job.batch_id)
            .collect();

        Ok(jobs
            .into_iter()
            .filter(|job| job.status == JobStatus::Pending)
            .filter(|job| !blocked_batches.contains(&job.batch_id))
            .collect())
    }

    async fn load_next_cancelling(&self, tx: &DatabaseTransaction) -> types::Result<Vec<Model>> {
        Ok(self
            .load_by_batches_tx(tx, vec![JobBatchStatus::Aborting])
            .await?
            .into_iter()
            .filter(|job| job.status.is_in_flight())
            .collect())
    }

    async fn load_by_interpreter_process_uuid(
        &self,
        tx: &DatabaseTransaction,
        interpreter_process_uuid: &str,
    ) -> types::Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::InterpreterProcessUuid.eq(interpreter_process_uuid))
            .order_by_asc(Column::BatchId)
            .order_by_asc(Column::IndexNumber)
            .lock(LockType::Update)
            .all(tx)
            .await?)
    }

    async fn load_in_flight(&self, tx: &DatabaseTransaction) -> types::Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::Status.is_in([JobStatus::Running, JobStatus::Aborting]))
            .order_by_asc(Column::BatchId)
            .order_by_asc(Column::IndexNumber)
            .lock(LockType::Update)
            .all(tx)
            .await?)
    }

    async fn load_active_shebangs(
        &self,
        tx: &DatabaseTransaction,
    ) -> types::Result<HashSet<String>> {
        Ok(Entity::find()
            .filter(Column::Status.is_in([JobStatus::Running, JobStatus::Aborting]))
            .all(tx)
            .await?
            .into_iter()
            .map(|job| job.shebang)
            .collect())
    }

    async fn restore_state(&self, tx: &DatabaseTransaction) -> types::Result<u64> {
        let updation_model = ActiveModel {
            status: Set(JobStatus::Pending),
            interpreter_process_uuid: Set(None),
            interpreter_job_uuid: Set(None),
            ..Default::default()
        };

        let result = Entity::update_many()
            .filter(Column::Status.is_in([JobStatus::Running, JobStatus::Aborting]))
            .set(updation_model)
            .exec(tx)
            .await?;

        Ok(result.rows_affected)
    }
}

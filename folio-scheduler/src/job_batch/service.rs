use async_trait::async_trait;
use chrono::Utc;
use folio_core::{err_not_found, types};
use folio_persistence::job_batch::{ActiveModel, Column, Entity, JobBatchStatus, Model};
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;

use crate::job_batch::repository::Repository;

pub struct Service;

impl Service {
    pub fn new() -> Arc<Box<dyn Repository>> {
        Arc::new(Box::new(Self))
    }
}

#[async_trait]
impl Repository for Service {
    async fn persist(&self, tx: &DatabaseTransaction, note_id: &str) -> types::Result<Model> {
        let obj = ActiveModel {
            note_id: Set(note_id.to_string()),
            status: Set(JobBatchStatus::Saving),
            created_at: Set(Utc::now().naive_utc()),
            started_at: Set(None),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(tx)
        .await?;

        Ok(obj)
    }

    async fn update(&self, tx: &DatabaseTransaction, batch: &Model) -> types::Result<Model> {
        let obj = ActiveModel {
            id: Set(batch.id),
            status: Set(batch.status),
            started_at: Set(batch.started_at),
            ended_at: Set(batch.ended_at),
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
            .ok_or_else(|| err_not_found!(crate::job_batch::KIND, id))
    }

    async fn get_latest_by_note(
        &self,
        tx: &DatabaseTransaction,
        note_id: &str,
    ) -> types::Result<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::NoteId.eq(note_id))
            .order_by_desc(Column::Id)
            .one(tx)
            .await?)
    }

    async fn load_by_status(
        &self,
        tx: &DatabaseTransaction,
        statuses: Vec<JobBatchStatus>,
    ) -> types::Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::Status.is_in(statuses))
            .order_by_asc(Column::Id)
            .all(tx)
            .await?)
    }
}

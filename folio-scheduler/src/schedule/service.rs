use async_trait::async_trait;
use chrono::NaiveDateTime;
use folio_core::types;
use folio_persistence::schedule::{ActiveModel, Column, Entity, Model};
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;

use crate::schedule::repository::Repository;
use crate::schedule::NewSchedule;

pub struct Service;

impl Service {
    pub fn new() -> Arc<Box<dyn Repository>> {
        Arc::new(Box::new(Self))
    }
}

#[async_trait]
impl Repository for Service {
    async fn persist(
        &self,
        tx: &DatabaseTransaction,
        schedule: NewSchedule,
    ) -> types::Result<Model> {
        let obj = ActiveModel {
            note_id: Set(schedule.note_id),
            enabled: Set(true),
            expression: Set(schedule.expression),
            username: Set(schedule.username),
            roles: Set(schedule.roles),
            last_execution: Set(None),
            next_execution: Set(schedule.next_execution),
            ..Default::default()
        }
        .insert(tx)
        .await?;

        Ok(obj)
    }

    async fn update(&self, tx: &DatabaseTransaction, schedule: &Model) -> types::Result<Model> {
        let obj = ActiveModel {
            id: Set(schedule.id),
            enabled: Set(schedule.enabled),
            expression: Set(schedule.expression.clone()),
            username: Set(schedule.username.clone()),
            roles: Set(schedule.roles.clone()),
            last_execution: Set(schedule.last_execution),
            next_execution: Set(schedule.next_execution),
            ..Default::default()
        }
        .update(tx)
        .await?;

        Ok(obj)
    }

    async fn get_by_note(
        &self,
        tx: &DatabaseTransaction,
        note_id: &str,
    ) -> types::Result<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::NoteId.eq(note_id))
            .lock(LockType::Update)
            .one(tx)
            .await?)
    }

    async fn load_ready(
        &self,
        tx: &DatabaseTransaction,
        now: NaiveDateTime,
    ) -> types::Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::Enabled.eq(true))
            .filter(Column::NextExecution.lte(now))
            .order_by_asc(Column::NextExecution)
            .order_by_asc(Column::Id)
            .lock(LockType::Update)
            .all(tx)
            .await?)
    }

    async fn delete_by_note(&self, tx: &DatabaseTransaction, note_id: &str) -> types::Result<bool> {
        let result = Entity::delete_many()
            .filter(Column::NoteId.eq(note_id))
            .exec(tx)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

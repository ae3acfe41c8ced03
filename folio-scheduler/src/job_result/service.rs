use async_trait::async_trait;
use chrono::Utc;
use folio_core::result::Message;
use folio_core::types;
use folio_persistence::job_result::{ActiveModel, Column, Entity, Model};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;

use crate::job_result::repository::Repository;

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
        job_id: i64,
        message: &Message,
    ) -> types::Result<Model> {
        let obj = ActiveModel {
            job_id: Set(job_id),
            created_at: Set(Utc::now().naive_utc()),
            result_type: Set(message.message_type.to_string()),
            result: Set(message.data.clone()),
            ..Default::default()
        }
        .insert(tx)
        .await?;

        Ok(obj)
    }

    async fn load_by_job(
        &self,
        tx: &DatabaseTransaction,
        job_id: i64,
    ) -> types::Result<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::JobId.eq(job_id))
            .order_by_asc(Column::Id)
            .all(tx)
            .await?)
    }
}

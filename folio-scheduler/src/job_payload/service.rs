use async_trait::async_trait;
use folio_core::{err_not_found, types};
use folio_persistence::job_payload::{ActiveModel, Column, Entity, Model};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use std::sync::Arc;

use crate::job_payload::repository::Repository;

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
        payload: String,
    ) -> types::Result<Model> {
        let obj = ActiveModel {
            job_id: Set(job_id),
            payload: Set(payload),
            ..Default::default()
        }
        .insert(tx)
        .await?;

        Ok(obj)
    }

    async fn get_by_job(&self, tx: &DatabaseTransaction, job_id: i64) -> types::Result<Model> {
        Entity::find()
            .filter(Column::JobId.eq(job_id))
            .one(tx)
            .await?
            .ok_or_else(|| err_not_found!(crate::job_payload::KIND, job_id))
    }
}

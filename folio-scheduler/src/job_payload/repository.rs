use async_trait::async_trait;
use folio_core::types;
use folio_persistence::job_payload::Model;
use sea_orm::DatabaseTransaction;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn persist(
        &self,
        tx: &DatabaseTransaction,
        job_id: i64,
        payload: String,
    ) -> types::Result<Model>;

    async fn get_by_job(&self, tx: &DatabaseTransaction, job_id: i64) -> types::Result<Model>;
}

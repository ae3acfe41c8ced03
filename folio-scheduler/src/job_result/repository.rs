use async_trait::async_trait;
use folio_core::result::Message;
use folio_core::types;
use folio_persistence::job_result::Model;
use sea_orm::DatabaseTransaction;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Appends one output message. Rows are never updated afterwards.
    async fn persist(
        &self,
        tx: &DatabaseTransaction,
        job_id: i64,
        message: &Message,
    ) -> types::Result<Model>;

    async fn load_by_job(&self, tx: &DatabaseTransaction, job_id: i64) -> types::Result<Vec<Model>>;
}

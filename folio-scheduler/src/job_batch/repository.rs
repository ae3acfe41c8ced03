use async_trait::async_trait;
use folio_core::types;
use folio_persistence::job_batch::{JobBatchStatus, Model};
use sea_orm::DatabaseTransaction;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Creates a batch in `Saving`, it becomes visible to the scheduler once moved to `Pending`.
    async fn persist(&self, tx: &DatabaseTransaction, note_id: &str) -> types::Result<Model>;

    async fn update(&self, tx: &DatabaseTransaction, batch: &Model) -> types::Result<Model>;

    async fn get(&self, tx: &DatabaseTransaction, id: i64) -> types::Result<Option<Model>>;

    /// Reads and row-locks the batch. Fails with `EntityNotFound` when absent.
    async fn get_for_update(&self, tx: &DatabaseTransaction, id: i64) -> types::Result<Model>;

    async fn get_latest_by_note(
        &self,
        tx: &DatabaseTransaction,
        note_id: &str,
    ) -> types::Result<Option<Model>>;

    async fn load_by_status(
        &self,
        tx: &DatabaseTransaction,
        statuses: Vec<JobBatchStatus>,
    ) -> types::Result<Vec<Model>>;
}

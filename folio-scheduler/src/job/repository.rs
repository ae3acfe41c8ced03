use std::collections::HashSet;

use async_trait::async_trait;
use folio_core::types;
use folio_persistence::job::Model;
use sea_orm::DatabaseTransaction;

use crate::job::NewJob;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn persist(&self, tx: &DatabaseTransaction, job: NewJob) -> types::Result<Model>;

    async fn update(&self, tx: &DatabaseTransaction, job: &Model) -> types::Result<Model>;

    async fn get(&self, tx: &DatabaseTransaction, id: i64) -> types::Result<Option<Model>>;

    /// Reads and row-locks the job. Fails with `EntityNotFound` when absent.
    async fn get_for_update(&self, tx: &DatabaseTransaction, id: i64) -> types::Result<Model>;

    async fn get_by_interpreter_job_uuid(
        &self,
        tx: &DatabaseTransaction,
        interpreter_job_uuid: &str,
    ) -> types::Result<Option<Model>>;

    /// Jobs of a batch in index order.
    async fn load_by_batch(&self, tx: &DatabaseTransaction, batch_id: i64)
        -> types::Result<Vec<Model>>;

    /// Pending jobs ready for dispatch, ordered by batch then index. A batch only contributes
    /// jobs while it is `Pending`/`Running` and none of its jobs is in flight or failed.
    async fn load_next_pending(&self, tx: &DatabaseTransaction) -> types::Result<Vec<Model>>;

    /// In-flight jobs whose batch has been asked to abort. Cancel is re-sent until they settle.
    async fn load_next_cancelling(&self, tx: &DatabaseTransaction) -> types::Result<Vec<Model>>;

    async fn load_by_interpreter_process_uuid(
        &self,
        tx: &DatabaseTransaction,
        interpreter_process_uuid: &str,
    ) -> types::Result<Vec<Model>>;

    /// Row-locks every `Running`/`Aborting` job.
    async fn load_in_flight(&self, tx: &DatabaseTransaction) -> types::Result<Vec<Model>>;

    /// Shebangs that currently have a job bound to a process.
    async fn load_active_shebangs(&self, tx: &DatabaseTransaction)
        -> types::Result<HashSet<String>>;

    /// Moves every in-flight job back to `Pending`. Returns the number of jobs reset.
    async fn restore_state(&self, tx: &DatabaseTransaction) -> types::Result<u64>;
}

use async_trait::async_trait;
use chrono::NaiveDateTime;
use folio_core::types;
use folio_persistence::schedule::Model;
use sea_orm::DatabaseTransaction;

use crate::schedule::NewSchedule;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn persist(&self, tx: &DatabaseTransaction, schedule: NewSchedule)
        -> types::Result<Model>;

    async fn update(&self, tx: &DatabaseTransaction, schedule: &Model) -> types::Result<Model>;

    async fn get_by_note(
        &self,
        tx: &DatabaseTransaction,
        note_id: &str,
    ) -> types::Result<Option<Model>>;

    /// Enabled schedules due at `now`, row-locked, earliest first.
    async fn load_ready(
        &self,
        tx: &DatabaseTransaction,
        now: NaiveDateTime,
    ) -> types::Result<Vec<Model>>;

    async fn delete_by_note(&self, tx: &DatabaseTransaction, note_id: &str) -> types::Result<bool>;
}

use sea_orm::entity::prelude::*;

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum JobBatchStatus {
    #[sea_orm(string_value = "SAVING")]
    Saving,
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "RUNNING")]
    Running,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "HANDLE_ERROR")]
    HandleError,
    #[sea_orm(string_value = "ERROR")]
    Error,
    #[sea_orm(string_value = "ABORTING")]
    Aborting,
    #[sea_orm(string_value = "ABORTED")]
    Aborted,
}

impl JobBatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Aborted)
    }

    pub fn is_aborting(&self) -> bool {
        matches!(self, Self::Aborting | Self::Aborted)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "folio_job_batch")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub note_id: String,
    pub status: JobBatchStatus,
    pub created_at: chrono::NaiveDateTime,
    pub started_at: Option<chrono::NaiveDateTime>,
    pub ended_at: Option<chrono::NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::job::Entity")]
    Job,
}

impl Related<crate::job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

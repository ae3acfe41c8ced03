use sea_orm::entity::prelude::*;

use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum JobStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "RUNNING")]
    Running,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "ERROR")]
    Error,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
    #[sea_orm(string_value = "ABORTING")]
    Aborting,
    #[sea_orm(string_value = "ABORTED")]
    Aborted,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done | Self::Error | Self::Canceled | Self::Aborted
        )
    }

    /// Statuses during which the job is bound to an interpreter process.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Running | Self::Aborting)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "folio_job")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub batch_id: i64,
    pub note_id: String,
    pub paragraph_id: String,
    pub index_number: i32,
    pub shebang: String,
    pub status: JobStatus,
    pub username: Option<String>,
    pub roles: Option<String>,
    pub interpreter_process_uuid: Option<String>,
    pub interpreter_job_uuid: Option<String>,
    pub decline_count: i32,
    pub created_at: chrono::NaiveDateTime,
    pub started_at: Option<chrono::NaiveDateTime>,
    pub ended_at: Option<chrono::NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::job_batch::Entity",
        from = "Column::BatchId",
        to = "crate::job_batch::Column::Id"
    )]
    JobBatch,

    #[sea_orm(has_one = "crate::job_payload::Entity")]
    JobPayload,

    #[sea_orm(has_many = "crate::job_result::Entity")]
    JobResult,
}

impl Related<crate::job_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobBatch.def()
    }
}

impl Related<crate::job_payload::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobPayload.def()
    }
}

impl Related<crate::job_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

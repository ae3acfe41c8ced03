use sea_orm::entity::prelude::*;

use serde::{Deserialize, Serialize};

/// A cron rule that re-runs a note.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "folio_schedule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub note_id: String,
    pub enabled: bool,
    pub expression: String,
    pub username: Option<String>,
    /// Comma separated, forwarded to the jobs of every scheduled run.
    pub roles: Option<String>,
    pub last_execution: Option<chrono::NaiveDateTime>,
    pub next_execution: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

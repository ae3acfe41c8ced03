use sea_orm::entity::prelude::*;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "folio_interpreter_option")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub shebang: String,
    pub interpreter_name: String,
    pub enabled: bool,
    pub class_name: String,
    pub class_path: String,
    /// JSON object of string properties.
    #[sea_orm(column_type = "Text")]
    pub properties: String,
    pub concurrent: bool,
    /// JSON array of user and role names.
    #[sea_orm(column_type = "Text")]
    pub owners: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

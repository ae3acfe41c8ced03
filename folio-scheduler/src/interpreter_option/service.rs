use async_trait::async_trait;
use chrono::Utc;
use folio_core::errors::ToUnknownErrorResult;
use folio_core::option::{InterpreterOption, InterpreterOptionRepository};
use folio_core::{err_not_found, types};
use folio_persistence::interpreter_option::{ActiveModel, Entity, Model};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use sea_orm::sea_query::LockType;
use sea_orm::QuerySelect;
use std::sync::Arc;

pub struct Service {
    connection: DatabaseConnection,
}

impl Service {
    pub fn new(connection: DatabaseConnection) -> Arc<dyn InterpreterOptionRepository> {
        Arc::new(Self { connection })
    }

    fn to_option(model: Model) -> types::Result<InterpreterOption> {
        let properties = serde_json::from_str(&model.properties).to_unknown_err_result()?;
        let owners = serde_json::from_str(&model.owners).to_unknown_err_result()?;

        Ok(InterpreterOption {
            shebang: model.shebang,
            interpreter_name: model.interpreter_name,
            enabled: model.enabled,
            class_name: model.class_name,
            class_path: model.class_path,
            properties,
            concurrent: model.concurrent,
            owners,
        })
    }
}

#[async_trait]
impl InterpreterOptionRepository for Service {
    async fn get_option(&self, shebang: &str) -> types::Result<Option<InterpreterOption>> {
        Entity::find_by_id(shebang.to_string())
            .one(&self.connection)
            .await?
            .map(Self::to_option)
            .transpose()
    }

    async fn set_enabled(&self, shebang: &str, enabled: bool) -> types::Result<()> {
        let tx = self.connection.begin().await?;

        let option = Entity::find_by_id(shebang.to_string())
            .lock(LockType::Update)
            .one(&tx)
            .await?;

        if option.is_none() {
            return Err(err_not_found!(crate::interpreter_option::KIND, shebang));
        }

        ActiveModel {
            shebang: Set(shebang.to_string()),
            enabled: Set(enabled),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .update(&tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn save(&self, option: InterpreterOption) -> types::Result<InterpreterOption> {
        let properties = serde_json::to_string(&option.properties).to_unknown_err_result()?;
        let owners = serde_json::to_string(&option.owners).to_unknown_err_result()?;
        let now = Utc::now().naive_utc();

        let tx = self.connection.begin().await?;

        let existing = Entity::find_by_id(option.shebang.clone())
            .lock(LockType::Update)
            .one(&tx)
            .await?;

        let mut model = ActiveModel {
            shebang: Set(option.shebang.clone()),
            interpreter_name: Set(option.interpreter_name.clone()),
            enabled: Set(option.enabled),
            class_name: Set(option.class_name.clone()),
            class_path: Set(option.class_path.clone()),
            properties: Set(properties),
            concurrent: Set(option.concurrent),
            owners: Set(owners),
            updated_at: Set(now),
            ..Default::default()
        };

        let saved = match existing {
            Some(_) => model.update(&tx).await?,
            None => {
                model.created_at = Set(now);
                model.insert(&tx).await?
            }
        };

        tx.commit().await?;

        Self::to_option(saved)
    }
}

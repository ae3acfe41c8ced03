use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FolioInterpreterOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioInterpreterOption::Shebang)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::InterpreterName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::Enabled)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::ClassName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::ClassPath)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::Properties)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::Concurrent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::Owners)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioInterpreterOption::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioInterpreterOption::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum FolioInterpreterOption {
    Table,
    Shebang,
    InterpreterName,
    Enabled,
    ClassName,
    ClassPath,
    Properties,
    Concurrent,
    Owners,
    CreatedAt,
    UpdatedAt,
}

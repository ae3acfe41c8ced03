use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FolioSchedule::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioSchedule::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FolioSchedule::NoteId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(FolioSchedule::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(FolioSchedule::Expression).string().not_null())
                    .col(ColumnDef::new(FolioSchedule::Username).string())
                    .col(ColumnDef::new(FolioSchedule::Roles).string())
                    .col(ColumnDef::new(FolioSchedule::LastExecution).date_time())
                    .col(
                        ColumnDef::new(FolioSchedule::NextExecution)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_folio_schedule_next_execution")
                    .table(FolioSchedule::Table)
                    .col(FolioSchedule::NextExecution)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioSchedule::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum FolioSchedule {
    Table,
    Id,
    NoteId,
    Enabled,
    Expression,
    Username,
    Roles,
    LastExecution,
    NextExecution,
}

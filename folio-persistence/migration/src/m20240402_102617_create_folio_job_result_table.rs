use crate::m20240402_101812_create_folio_job_table::FolioJob;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FolioJobResult::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioJobResult::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FolioJobResult::JobId).big_integer().not_null())
                    .col(
                        ColumnDef::new(FolioJobResult::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FolioJobResult::ResultType).string().not_null())
                    .col(ColumnDef::new(FolioJobResult::Result).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folio_job_result_x_folio_job")
                            .from(FolioJobResult::Table, FolioJobResult::JobId)
                            .to(FolioJob::Table, FolioJob::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_folio_job_result_job_id")
                    .table(FolioJobResult::Table)
                    .col(FolioJobResult::JobId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioJobResult::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum FolioJobResult {
    Table,
    Id,
    JobId,
    CreatedAt,
    ResultType,
    Result,
}

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
                    .table(FolioJobPayload::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioJobPayload::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FolioJobPayload::JobId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(FolioJobPayload::Payload).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folio_job_payload_x_folio_job")
                            .from(FolioJobPayload::Table, FolioJobPayload::JobId)
                            .to(FolioJob::Table, FolioJob::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioJobPayload::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum FolioJobPayload {
    Table,
    Id,
    JobId,
    Payload,
}

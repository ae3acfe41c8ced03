use crate::m20240402_101500_create_folio_job_batch_table::FolioJobBatch;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FolioJob::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioJob::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FolioJob::BatchId).big_integer().not_null())
                    .col(ColumnDef::new(FolioJob::NoteId).string().not_null())
                    .col(ColumnDef::new(FolioJob::ParagraphId).string().not_null())
                    .col(ColumnDef::new(FolioJob::IndexNumber).integer().not_null())
                    .col(ColumnDef::new(FolioJob::Shebang).string().not_null())
                    .col(ColumnDef::new(FolioJob::Status).string_len(16).not_null())
                    .col(ColumnDef::new(FolioJob::Username).string())
                    .col(ColumnDef::new(FolioJob::Roles).string())
                    .col(ColumnDef::new(FolioJob::InterpreterProcessUuid).string())
                    .col(ColumnDef::new(FolioJob::InterpreterJobUuid).string())
                    .col(
                        ColumnDef::new(FolioJob::DeclineCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(FolioJob::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(FolioJob::StartedAt).date_time())
                    .col(ColumnDef::new(FolioJob::EndedAt).date_time())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folio_job_x_folio_job_batch")
                            .from(FolioJob::Table, FolioJob::BatchId)
                            .to(FolioJobBatch::Table, FolioJobBatch::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_folio_job_status")
                    .table(FolioJob::Table)
                    .col(FolioJob::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_folio_job_interpreter_job_uuid")
                    .table(FolioJob::Table)
                    .col(FolioJob::InterpreterJobUuid)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_folio_job_interpreter_process_uuid")
                    .table(FolioJob::Table)
                    .col(FolioJob::InterpreterProcessUuid)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioJob::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
pub enum FolioJob {
    Table,
    Id,
    BatchId,
    NoteId,
    ParagraphId,
    IndexNumber,
    Shebang,
    Status,
    Username,
    Roles,
    InterpreterProcessUuid,
    InterpreterJobUuid,
    DeclineCount,
    CreatedAt,
    StartedAt,
    EndedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FolioJobBatch::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolioJobBatch::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FolioJobBatch::NoteId).string().not_null())
                    .col(
                        ColumnDef::new(FolioJobBatch::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolioJobBatch::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FolioJobBatch::StartedAt).date_time())
                    .col(ColumnDef::new(FolioJobBatch::EndedAt).date_time())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_folio_job_batch_note_id")
                    .table(FolioJobBatch::Table)
                    .col(FolioJobBatch::NoteId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FolioJobBatch::Table).to_owned())
            .await
    }
}

/// Learn more at https://docs.rs/sea-query#iden
#[derive(Iden)]
pub enum FolioJobBatch {
    Table,
    Id,
    NoteId,
    Status,
    CreatedAt,
    StartedAt,
    EndedAt,
}

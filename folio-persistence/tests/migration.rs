use folio_core::config::persistence::Persistence;
use folio_persistence::{job_batch, job_batch::JobBatchStatus, schedule};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

async fn connection() -> anyhow::Result<sea_orm::DatabaseConnection> {
    let connection = folio_persistence::database_connection(&Persistence {
        database_connection_string: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    })
    .await?;

    folio_persistence::apply_migrations(&connection).await?;

    Ok(connection)
}

#[tokio::test]
async fn migrations_create_job_tables() -> anyhow::Result<()> {
    let connection = connection().await?;

    let batch = job_batch::ActiveModel {
        note_id: Set("2HZ4MFDAX".to_string()),
        status: Set(JobBatchStatus::Saving),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&connection)
    .await?;

    let found = job_batch::Entity::find_by_id(batch.id)
        .one(&connection)
        .await?
        .expect("batch was inserted");

    assert_eq!(found.status, JobBatchStatus::Saving);
    assert!(found.started_at.is_none());

    Ok(())
}

#[tokio::test]
async fn schedule_note_id_is_unique() -> anyhow::Result<()> {
    let connection = connection().await?;

    let rule = |note_id: &str| schedule::ActiveModel {
        note_id: Set(note_id.to_string()),
        enabled: Set(true),
        expression: Set("0 0 * * * *".to_string()),
        next_execution: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    let saved = rule("2HZ4MFDAX").insert(&connection).await?;
    assert!(saved.last_execution.is_none());

    assert!(rule("2HZ4MFDAX").insert(&connection).await.is_err());
    rule("2J8WQKXNM").insert(&connection).await?;

    Ok(())
}

#[tokio::test]
async fn migrations_are_idempotent() -> anyhow::Result<()> {
    let connection = connection().await?;

    folio_persistence::apply_migrations(&connection).await?;

    Ok(())
}

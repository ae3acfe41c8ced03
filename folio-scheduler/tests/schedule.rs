
use chrono::{Duration, Utc};
use folio_core::errors::Error;
use folio_persistence::job_batch::JobBatchStatus;
use folio_persistence::schedule;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use setup::*;

async fn make_due(h: &Harness, id: i64) -> schedule::Model {
    schedule::ActiveModel {
        id: Set(id),
        next_execution: Set(Utc::now().naive_utc() - Duration::minutes(1)),
        ..Default::default()
    }
    .update(&h.connection)
    .await
    .unwrap()
}

async fn schedule_row(h: &Harness, id: i64) -> schedule::Model {
    schedule::Entity::find_by_id(id)
        .one(&h.connection)
        .await
        .unwrap()
        .unwrap()
}

async fn finished_run(h: &Harness, note_id: &str) -> anyhow::Result<i64> {
    let batch = h
        .scheduler
        .run(note_run(
            note_id,
            vec![paragraph("p1", "%python"), paragraph("p2", "%md")],
        ))
        .await?;

    h.scheduler.abort(batch.id).await?;
    h.scheduler.abort_pass().await?;
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Aborted);

    Ok(batch.id)
}

#[tokio::test]
async fn test_due_schedule_replays_latest_run() -> anyhow::Result<()> {
    let h = harness().await;
    let previous = finished_run(&h, "note-1").await?;

    let created = h
        .scheduler
        .schedule_note(
            "note-1",
            "0 0 * * * *",
            Some("bob".to_string()),
            vec!["analyst".to_string()],
        )
        .await?;
    assert!(created.enabled);
    assert!(created.next_execution > Utc::now().naive_utc());

    // not due yet
    assert!(h.scheduler.schedule_pass().await?.is_empty());

    let due = make_due(&h, created.id).await;
    let submitted = h.scheduler.schedule_pass().await?;

    assert_eq!(submitted.len(), 1);
    assert_ne!(submitted[0].id, previous);
    assert_eq!(submitted[0].status, JobBatchStatus::Pending);

    let jobs = h.jobs(submitted[0].id).await;
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].paragraph_id, "p1");
    assert_eq!(jobs[1].shebang, "%md");
    assert_eq!(jobs[0].username.as_deref(), Some("bob"));
    assert_eq!(jobs[0].roles.as_deref(), Some("analyst"));

    let advanced = schedule_row(&h, created.id).await;
    assert_eq!(advanced.last_execution, Some(due.next_execution));
    assert!(advanced.next_execution > Utc::now().naive_utc());

    Ok(())
}

#[tokio::test]
async fn test_schedule_waits_for_running_note() -> anyhow::Result<()> {
    let h = harness().await;
    let running = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    let created = h
        .scheduler
        .schedule_note("note-1", "0 */5 * * * *", None, vec![])
        .await?;
    let due = make_due(&h, created.id).await;

    assert!(h.scheduler.schedule_pass().await?.is_empty());
    assert_eq!(h.batch_count().await, 1);
    assert_eq!(schedule_row(&h, created.id).await.next_execution, due.next_execution);

    h.scheduler.abort(running.id).await?;
    h.scheduler.abort_pass().await?;

    assert_eq!(h.scheduler.schedule_pass().await?.len(), 1);
    assert_eq!(h.batch_count().await, 2);

    Ok(())
}

#[tokio::test]
async fn test_schedule_for_unknown_note_is_disabled() -> anyhow::Result<()> {
    let h = harness().await;

    let created = h
        .scheduler
        .schedule_note("note-404", "0 0 * * * *", None, vec![])
        .await?;
    make_due(&h, created.id).await;

    assert!(h.scheduler.schedule_pass().await?.is_empty());
    assert!(!schedule_row(&h, created.id).await.enabled);
    assert_eq!(h.batch_count().await, 0);

    // disabled schedules are never picked up again
    assert!(h.scheduler.schedule_pass().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rescheduling_replaces_the_rule() -> anyhow::Result<()> {
    let h = harness().await;

    let first = h
        .scheduler
        .schedule_note("note-1", "0 0 * * * *", None, vec![])
        .await?;
    let second = h
        .scheduler
        .schedule_note("note-1", "0 30 * * * *", Some("carol".to_string()), vec![])
        .await?;

    assert_eq!(first.id, second.id);
    assert_eq!(second.expression, "0 30 * * * *");
    assert_eq!(second.username.as_deref(), Some("carol"));

    assert!(h.scheduler.unschedule_note("note-1").await?);
    assert!(!h.scheduler.unschedule_note("note-1").await?);

    Ok(())
}

#[tokio::test]
async fn test_invalid_cron_expression_is_rejected() -> anyhow::Result<()> {
    let h = harness().await;

    let err = h
        .scheduler
        .schedule_note("note-1", "every tuesday", None, vec![])
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::Configuration { .. }));

    Ok(())
}

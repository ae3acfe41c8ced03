
use folio_core::errors::Error;
use folio_core::remote::{CancelOutcome, PingOutcome, PushOutcome};
use folio_core::result::{Code, InterpreterResult, Message};
use folio_persistence::job::JobStatus;
use folio_persistence::job_batch::JobBatchStatus;
use folio_scheduler::event::ChangeEvent;
use folio_scheduler::process::ProcessStatus;
use sea_orm::ConnectionTrait;
use setup::*;
use std::sync::Arc;
use tokio::sync::Notify;

fn success(text: &str) -> Option<InterpreterResult> {
    Some(InterpreterResult::new(Code::Success, vec![Message::text(text)]))
}

#[tokio::test]
async fn test_note_runs_paragraphs_in_order() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![paragraph("p1", "%python"), paragraph("p2", "%python")],
        ))
        .await?;
    assert_eq!(batch.status, JobBatchStatus::Pending);

    // first pass only launches the process
    assert!(h.scheduler.pending_pass().await?.is_empty());
    assert_eq!(h.launcher.launch_count("%python"), 1);

    let interpreter = h.ready("%python", 7001).await;
    let jobs = h.jobs(batch.id).await;

    assert_eq!(h.scheduler.pending_pass().await?, vec![jobs[0].id]);

    let first = h.job(jobs[0].id).await;
    assert_eq!(first.status, JobStatus::Running);
    assert_eq!(
        first.interpreter_process_uuid.as_deref(),
        Some("process-%python-7001")
    );
    assert!(first.started_at.is_some());
    assert_eq!(h.job(jobs[1].id).await.status, JobStatus::Pending);

    let running = h.batch(batch.id).await;
    assert_eq!(running.status, JobBatchStatus::Running);
    assert!(running.started_at.is_some());

    let push = interpreter.last_push().unwrap();
    assert_eq!(push.payload, "print('p1')");
    assert_eq!(push.note_context.get("noteId").unwrap(), "note-1");
    assert_eq!(push.note_context.get("paragraphId").unwrap(), "p1");
    assert_eq!(push.user_context.get("Z_ENV_USER_NAME").unwrap(), "alice");
    assert_eq!(push.user_context.get("Z_ENV_USER_ROLES").unwrap(), "admin,dev");
    assert_eq!(push.configuration.get("maxResult").unwrap(), "1000");

    // the second paragraph waits for the first
    assert!(h.scheduler.pending_pass().await?.is_empty());

    let uuid = first.interpreter_job_uuid.clone().unwrap();
    assert!(h.scheduler.result_handler().handle(&uuid, success("1")).await?);

    let first = h.job(jobs[0].id).await;
    assert_eq!(first.status, JobStatus::Done);
    assert!(first.interpreter_job_uuid.is_none());
    assert!(first.interpreter_process_uuid.is_none());
    assert_eq!(h.results(first.id).await[0].result, "1");
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Running);

    assert_eq!(h.scheduler.pending_pass().await?, vec![jobs[1].id]);

    let uuid = h.job(jobs[1].id).await.interpreter_job_uuid.unwrap();
    h.scheduler.result_handler().handle(&uuid, success("2")).await?;

    let done = h.batch(batch.id).await;
    assert_eq!(done.status, JobBatchStatus::Done);
    assert!(done.started_at.unwrap() <= done.ended_at.unwrap());

    Ok(())
}

#[tokio::test]
async fn test_one_push_per_shebang_per_pass() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    let interpreter = h.ready("%python", 7002).await;

    let a = h
        .scheduler
        .run(note_run("note-a", vec![paragraph("a1", "%python")]))
        .await?;
    let b = h
        .scheduler
        .run(note_run("note-b", vec![paragraph("b1", "%python")]))
        .await?;

    assert_eq!(h.scheduler.pending_pass().await?.len(), 1);
    assert_eq!(interpreter.push_count(), 1);
    assert_eq!(h.jobs(a.id).await[0].status, JobStatus::Running);
    assert_eq!(h.jobs(b.id).await[0].status, JobStatus::Pending);

    // non-concurrent interpreter stays exclusive across passes
    assert!(h.scheduler.pending_pass().await?.is_empty());
    assert_eq!(interpreter.push_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_interpreter_takes_next_job_on_next_pass() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(folio_core::option::InterpreterOption {
        concurrent: true,
        ..option("%sh")
    })
    .await;
    let interpreter = h.ready("%sh", 7003).await;

    for note in ["note-a", "note-b"] {
        h.scheduler
            .run(note_run(note, vec![paragraph("p", "%sh")]))
            .await?;
    }

    assert_eq!(h.scheduler.pending_pass().await?.len(), 1);
    assert_eq!(h.scheduler.pending_pass().await?.len(), 1);
    assert_eq!(interpreter.push_count(), 2);

    Ok(())
}

#[tokio::test]
async fn test_missing_interpreter_fails_batch_and_cancels_siblings() -> anyhow::Result<()> {
    let h = harness().await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![paragraph("p1", "%unknown"), paragraph("p2", "%unknown")],
        ))
        .await?;

    assert!(h.scheduler.pending_pass().await?.is_empty());

    let jobs = h.jobs(batch.id).await;
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert_eq!(
        h.results(jobs[0].id).await[0].result,
        "Interpreter not found or not configured"
    );
    assert_eq!(jobs[1].status, JobStatus::Canceled);
    assert!(jobs[1].started_at.is_some());
    assert!(jobs[1].ended_at.is_some());

    let batch = h.batch(batch.id).await;
    assert_eq!(batch.status, JobBatchStatus::Error);
    assert!(batch.ended_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_disabled_interpreter() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(folio_core::option::InterpreterOption {
        enabled: false,
        ..option("%python")
    })
    .await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(h.results(job.id).await[0].result, "Interpreter disabled");
    assert_eq!(h.launcher.launch_count("%python"), 0);

    Ok(())
}

#[tokio::test]
async fn test_crash_loop_disables_interpreter() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    // every launch exits before registering
    for _ in 0..51 {
        assert!(h.scheduler.pending_pass().await?.is_empty());

        h.launcher.exited.lock().insert("%python".to_string());
        assert_eq!(h.scheduler.dead_pass().await?, 1);
    }

    let registry = h.scheduler.registry();
    assert_eq!(registry.death_count("%python"), 51);
    assert_eq!(h.launcher.launch_count("%python"), 51);

    h.scheduler.pending_pass().await?;

    assert!(!h.options.get_option("%python").await?.unwrap().enabled);
    assert_eq!(registry.death_count("%python"), 0);
    assert_eq!(h.jobs(batch.id).await[0].status, JobStatus::Pending);

    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(h.results(job.id).await[0].result, "Interpreter disabled");
    assert_eq!(h.launcher.launch_count("%python"), 51);

    Ok(())
}

#[tokio::test]
async fn test_error_cancels_pending_siblings_only() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7015).await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![
                paragraph("p1", "%python"),
                paragraph("p2", "%python"),
                paragraph("p3", "%python"),
                paragraph("p4", "%python"),
            ],
        ))
        .await?;
    let jobs = h.jobs(batch.id).await;
    let results = h.scheduler.result_handler();

    assert_eq!(h.scheduler.pending_pass().await?, vec![jobs[0].id]);
    let uuid = h.job(jobs[0].id).await.interpreter_job_uuid.unwrap();
    results.handle(&uuid, success("first")).await?;

    assert_eq!(h.scheduler.pending_pass().await?, vec![jobs[1].id]);
    let uuid = h.job(jobs[1].id).await.interpreter_job_uuid.unwrap();
    let failure = InterpreterResult::new(Code::Error, vec![Message::text("boom")]);
    results.handle(&uuid, Some(failure)).await?;

    let jobs = h.jobs(batch.id).await;
    assert_eq!(jobs[0].status, JobStatus::Done);
    assert_eq!(h.results(jobs[0].id).await[0].result, "first");
    assert_eq!(jobs[1].status, JobStatus::Error);
    assert_eq!(h.results(jobs[1].id).await[0].result, "boom");
    assert_eq!(jobs[2].status, JobStatus::Canceled);
    assert_eq!(jobs[3].status, JobStatus::Canceled);
    assert!(h.results(jobs[2].id).await.is_empty());
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Error);

    Ok(())
}

#[tokio::test]
async fn test_death_threshold_is_exclusive() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7004).await;

    let registry = h.scheduler.registry();
    for _ in 0..50 {
        registry.record_death("%python");
    }

    h.scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    assert_eq!(h.scheduler.pending_pass().await?.len(), 1);
    assert!(h.options.get_option("%python").await?.unwrap().enabled);
    assert_eq!(registry.death_count("%python"), 0);

    Ok(())
}

#[tokio::test]
async fn test_unlaunchable_interpreter() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    *h.launcher.fail.lock() = true;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(
        h.results(job.id).await[0].result,
        "Wrong configuration of interpreter."
    );
    assert!(h.scheduler.registry().get("%python").is_none());

    Ok(())
}

#[tokio::test]
async fn test_dead_interpreter_requeues_in_order() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7005).await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![paragraph("p1", "%python"), paragraph("p2", "%python")],
        ))
        .await?;
    let jobs = h.jobs(batch.id).await;

    h.scheduler.pending_pass().await?;
    let stale_uuid = h.job(jobs[0].id).await.interpreter_job_uuid.unwrap();

    h.launcher.exited.lock().insert("%python".to_string());
    assert_eq!(h.scheduler.dead_pass().await?, 1);

    let requeued = h.job(jobs[0].id).await;
    assert_eq!(requeued.status, JobStatus::Pending);
    assert!(requeued.interpreter_job_uuid.is_none());
    assert!(requeued.interpreter_process_uuid.is_none());
    assert!(h.scheduler.registry().get("%python").is_none());
    assert_eq!(h.launcher.kills.lock().as_slice(), ["%python".to_string()]);
    assert_eq!(h.scheduler.registry().death_count("%python"), 1);

    // relaunch, then the first paragraph goes again before the second
    assert!(h.scheduler.pending_pass().await?.is_empty());
    assert_eq!(h.launcher.launch_count("%python"), 2);
    assert!(h.register("%python", 7006));

    assert_eq!(h.scheduler.pending_pass().await?, vec![jobs[0].id]);
    assert_eq!(h.scheduler.registry().death_count("%python"), 0);
    assert_eq!(
        h.job(jobs[0].id).await.interpreter_process_uuid.as_deref(),
        Some("process-%python-7006")
    );

    // a late callback from the dead process is ignored
    assert!(!h
        .scheduler
        .result_handler()
        .handle(&stale_uuid, success("late"))
        .await?);
    assert_eq!(h.job(jobs[0].id).await.status, JobStatus::Running);
    assert!(h.results(jobs[0].id).await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_process_reaped_during_push_keeps_job_pending() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    let interpreter = h.ready("%python", 7016).await;

    let gate = Arc::new(Notify::new());
    *interpreter.push_gate.lock() = Some(gate.clone());

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    let scheduler = h.scheduler.clone();
    let pass = tokio::spawn(async move { scheduler.pending_pass().await });

    interpreter.push_started.notified().await;

    *interpreter.ping_outcome.lock() = Some(PingOutcome::KillMe);
    assert_eq!(h.scheduler.health_pass().await, vec!["%python".to_string()]);
    assert_eq!(h.scheduler.dead_pass().await?, 1);
    assert!(h.scheduler.registry().get("%python").is_none());

    gate.notify_one();
    assert!(pass.await??.is_empty());

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.interpreter_process_uuid.is_none());
    assert!(job.interpreter_job_uuid.is_none());
    assert_eq!(interpreter.cancels.lock().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_dead_pass_requeues_jobs_of_unknown_processes() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7017).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;
    assert_eq!(h.jobs(batch.id).await[0].status, JobStatus::Running);

    // a live handle keeps its jobs
    assert_eq!(h.scheduler.dead_pass().await?, 0);
    assert_eq!(h.jobs(batch.id).await[0].status, JobStatus::Running);

    h.scheduler
        .registry()
        .remove_if_status("%python", ProcessStatus::Ready);

    assert_eq!(h.scheduler.dead_pass().await?, 0);

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.interpreter_process_uuid.is_none());
    assert_eq!(h.scheduler.registry().death_count("%python"), 0);

    Ok(())
}

#[tokio::test]
async fn test_failed_requeue_does_not_count_a_death() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7018).await;

    for table in ["folio_job_result", "folio_job_payload", "folio_job"] {
        h.connection
            .execute_unprepared(&format!("DROP TABLE {}", table))
            .await?;
    }

    h.launcher.exited.lock().insert("%python".to_string());

    for _ in 0..2 {
        assert!(h.scheduler.dead_pass().await.is_err());
    }

    let registry = h.scheduler.registry();
    assert_eq!(registry.death_count("%python"), 0);
    assert_eq!(
        registry.get("%python").map(|process| process.status),
        Some(ProcessStatus::Dead)
    );
    assert!(h.launcher.kills.lock().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_non_owner_job_is_aborted() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(folio_core::option::InterpreterOption {
        owners: vec!["bob".to_string(), "analyst".to_string()],
        ..option("%jdbc")
    })
    .await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![paragraph("p1", "%jdbc"), paragraph("p2", "%jdbc")],
        ))
        .await?;
    assert!(h.scheduler.pending_pass().await?.is_empty());

    let jobs = h.jobs(batch.id).await;
    assert_eq!(jobs[0].status, JobStatus::Aborted);
    assert_eq!(
        h.results(jobs[0].id).await[0].result,
        "User [alice] does not have access to [jdbc] interpreter."
    );
    assert_eq!(jobs[1].status, JobStatus::Canceled);
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Aborted);
    assert_eq!(h.launcher.launch_count("%jdbc"), 0);

    Ok(())
}

#[tokio::test]
async fn test_owner_role_grants_access() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(folio_core::option::InterpreterOption {
        owners: vec!["dev".to_string()],
        ..option("%jdbc")
    })
    .await;
    h.ready("%jdbc", 7019).await;

    h.scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%jdbc")]))
        .await?;

    assert_eq!(h.scheduler.pending_pass().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_result_is_ignored() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7007).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    let uuid = job.interpreter_job_uuid.clone().unwrap();
    let results = h.scheduler.result_handler();

    assert!(results.handle(&uuid, success("once")).await?);
    assert!(!results.handle(&uuid, success("twice")).await?);

    assert_eq!(h.results(job.id).await.len(), 1);
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Done);

    Ok(())
}

#[tokio::test]
async fn test_abort_takes_precedence_over_success() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7008).await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![paragraph("p1", "%python"), paragraph("p2", "%python")],
        ))
        .await?;
    h.scheduler.pending_pass().await?;

    let jobs = h.jobs(batch.id).await;
    let uuid = h.job(jobs[0].id).await.interpreter_job_uuid.unwrap();

    assert_eq!(
        h.scheduler.abort(batch.id).await?.status,
        JobBatchStatus::Aborting
    );

    h.scheduler
        .result_handler()
        .handle(&uuid, success("finished anyway"))
        .await?;

    let jobs = h.jobs(batch.id).await;
    assert_eq!(jobs[0].status, JobStatus::Aborted);
    assert_eq!(jobs[1].status, JobStatus::Canceled);
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Aborted);

    Ok(())
}

#[tokio::test]
async fn test_cancel_is_resent_until_the_job_is_gone() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    let interpreter = h.ready("%python", 7009).await;

    let batch = h
        .scheduler
        .run(note_run(
            "note-1",
            vec![paragraph("p1", "%python"), paragraph("p2", "%python")],
        ))
        .await?;
    h.scheduler.pending_pass().await?;
    let jobs = h.jobs(batch.id).await;
    let uuid = h.job(jobs[0].id).await.interpreter_job_uuid.unwrap();

    h.scheduler.abort_note("note-1").await?;

    h.scheduler.abort_pass().await?;
    assert_eq!(h.job(jobs[0].id).await.status, JobStatus::Aborting);
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Aborting);

    h.scheduler.abort_pass().await?;
    assert_eq!(interpreter.cancels.lock().as_slice(), [uuid.clone(), uuid]);

    *interpreter.cancel_outcome.lock() = Some(CancelOutcome::NotFound);
    h.scheduler.abort_pass().await?;

    let first = h.job(jobs[0].id).await;
    assert_eq!(first.status, JobStatus::Aborted);
    assert!(first.interpreter_job_uuid.is_none());
    assert_eq!(h.results(first.id).await[0].result, "Aborted");
    assert_eq!(h.job(jobs[1].id).await.status, JobStatus::Canceled);
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Aborted);

    Ok(())
}

#[tokio::test]
async fn test_abort_before_dispatch() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    let interpreter = h.ready("%python", 7010).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    h.scheduler.abort(batch.id).await?;
    // idempotent
    h.scheduler.abort(batch.id).await?;

    assert!(h.scheduler.pending_pass().await?.is_empty());
    h.scheduler.abort_pass().await?;

    assert_eq!(h.jobs(batch.id).await[0].status, JobStatus::Canceled);
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Aborted);
    assert_eq!(interpreter.push_count(), 0);

    let err = h.scheduler.abort(batch.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidOperation { .. }));

    Ok(())
}

#[tokio::test]
async fn test_run_validation() -> anyhow::Result<()> {
    let h = harness().await;

    let err = h
        .scheduler
        .run(note_run("note-1", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation { .. }));

    h.scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    let err = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EntityConflict { .. }));

    Ok(())
}

#[tokio::test]
async fn test_push_failures_leave_job_pending() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    let interpreter = h.ready("%python", 7011).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    interpreter.queue_push(Err(Error::transport(
        "push",
        anyhow::anyhow!("connection reset"),
    )));
    interpreter.queue_push(Ok(PushOutcome::Error));
    interpreter.queue_push(Ok(PushOutcome::Decline));

    for _ in 0..3 {
        assert!(h.scheduler.pending_pass().await?.is_empty());

        let job = &h.jobs(batch.id).await[0];
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.interpreter_job_uuid.is_none());
    }

    assert_eq!(h.scheduler.pending_pass().await?.len(), 1);
    assert_eq!(interpreter.push_count(), 4);

    Ok(())
}

#[tokio::test]
async fn test_decline_limit() -> anyhow::Result<()> {
    let mut config = test_config();
    config.scheduler.decline_retry_limit = 2;

    let h = harness_with(config).await;
    h.add_option(option("%python")).await;
    let interpreter = h.ready("%python", 7012).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;

    for _ in 0..3 {
        interpreter.queue_push(Ok(PushOutcome::Decline));
    }

    h.scheduler.pending_pass().await?;
    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.decline_count, 2);

    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(
        h.results(job.id).await[0].result,
        "Interpreter declined the job 3 times"
    );

    Ok(())
}

#[tokio::test]
async fn test_unparsable_result_fails_job() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7013).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;

    let job = &h.jobs(batch.id).await[0];
    let uuid = job.interpreter_job_uuid.clone().unwrap();

    assert!(h.scheduler.result_handler().handle(&uuid, None).await?);

    assert_eq!(h.job(job.id).await.status, JobStatus::Error);
    assert_eq!(
        h.results(job.id).await[0].result,
        "Unknown error while interpret request"
    );
    assert_eq!(h.batch(batch.id).await.status, JobBatchStatus::Error);

    Ok(())
}

#[tokio::test]
async fn test_single_job_batch_terminal_states() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7014).await;

    let cases = [
        (Code::Success, JobStatus::Done, JobBatchStatus::Done),
        (Code::Error, JobStatus::Error, JobBatchStatus::Error),
        (Code::Aborted, JobStatus::Aborted, JobBatchStatus::Aborted),
    ];

    for (i, (code, job_status, batch_status)) in cases.into_iter().enumerate() {
        let batch = h
            .scheduler
            .run(note_run(&format!("note-{}", i), vec![paragraph("p1", "%python")]))
            .await?;
        h.scheduler.pending_pass().await?;

        let job = &h.jobs(batch.id).await[0];
        let uuid = job.interpreter_job_uuid.clone().unwrap();
        let result = InterpreterResult::new(code, vec![Message::text("out")]);

        assert!(h.scheduler.result_handler().handle(&uuid, Some(result)).await?);

        assert_eq!(h.job(job.id).await.status, job_status);

        let batch = h.batch(batch.id).await;
        assert_eq!(batch.status, batch_status);
        assert!(batch.started_at.unwrap() <= batch.ended_at.unwrap());
    }

    Ok(())
}

#[tokio::test]
async fn test_restore_state_requeues_in_flight_jobs() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.ready("%python", 7014).await;

    let batch = h
        .scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;

    let mut events = h.events.subscribe();
    assert_eq!(h.scheduler.restore_state().await?, 1);

    let job = &h.jobs(batch.id).await[0];
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.interpreter_process_uuid.is_none());
    assert!(job.interpreter_job_uuid.is_none());

    match events.try_recv()? {
        ChangeEvent::Job { before, after } => {
            assert_eq!(before.map(|b| b.status), Some(JobStatus::Running));
            assert_eq!(after.id, job.id);
            assert_eq!(after.status, JobStatus::Pending);
            assert!(after.interpreter_job_uuid.is_none());
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(events.try_recv().is_err());

    assert_eq!(h.scheduler.restore_state().await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_health_check_recycles_processes() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;
    h.add_option(option("%sh")).await;

    let python = h.ready("%python", 7015).await;
    h.ready("%sh", 7016).await;

    assert!(h.scheduler.health_pass().await.is_empty());

    *python.ping_outcome.lock() = Some(PingOutcome::KillMe);
    h.options.set_enabled("%sh", false).await?;

    let mut marked = h.scheduler.health_pass().await;
    marked.sort();
    assert_eq!(marked, vec!["%python".to_string(), "%sh".to_string()]);

    let registry = h.scheduler.registry();
    assert_eq!(registry.get("%python").unwrap().status, ProcessStatus::Dead);

    assert_eq!(h.scheduler.dead_pass().await?, 2);
    assert!(registry.processes().is_empty());
    assert!(python.shutdowns.load(std::sync::atomic::Ordering::SeqCst) >= 1);

    Ok(())
}

#[tokio::test]
async fn test_unresponsive_process_is_marked_dead() -> anyhow::Result<()> {
    let h = harness().await;
    h.add_option(option("%python")).await;

    let python = h.ready("%python", 7017).await;
    *python.ping_outcome.lock() = None;

    assert_eq!(h.scheduler.health_pass().await, vec!["%python".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_registration_timeout() -> anyhow::Result<()> {
    let mut config = test_config();
    config.interpreter.registration_timeout_seconds = 0;

    let h = harness_with(config).await;
    h.add_option(option("%python")).await;

    h.scheduler
        .run(note_run("note-1", vec![paragraph("p1", "%python")]))
        .await?;
    h.scheduler.pending_pass().await?;

    let registry = h.scheduler.registry();
    assert_eq!(registry.get("%python").unwrap().status, ProcessStatus::Starting);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    assert_eq!(h.scheduler.health_pass().await, vec!["%python".to_string()]);
    assert!(!h.register("%python", 7018));

    Ok(())
}

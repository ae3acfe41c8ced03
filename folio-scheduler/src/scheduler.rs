use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use folio_core::config::Config;
use folio_core::errors::ToUnknownErrorResult;
use folio_core::option::InterpreterOptionRepository;
use folio_core::types;
use folio_persistence::{job_batch, schedule};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::constant::Cycle;
use crate::event::EventSink;
use crate::handler::abort::AbortHandler;
use crate::handler::dead::DeadInterpreterHandler;
use crate::handler::execution::{ExecutionHandler, NoteRun};
use crate::handler::pending::{PendingHandler, PendingSettings};
use crate::handler::result::ResultHandler;
use crate::handler::schedule::{LatestRunNoteSource, NoteSource, ScheduleHandler};
use crate::handler::JobTransitions;
use crate::metric;
use crate::process::client::ClientFactory;
use crate::process::launcher::Launcher;
use crate::process::registry::{InterpreterProcessRegistry, RegistrySettings};
use crate::process::ProcessStatus;
use crate::store::Store;

/// Collaborators the scheduler does not own.
pub struct SchedulerDeps {
    pub options: Arc<dyn InterpreterOptionRepository>,
    pub launcher: Arc<dyn Launcher>,
    pub client_factory: Arc<dyn ClientFactory>,
    pub events: Arc<dyn EventSink>,

    /// Paragraph source for scheduled runs. Defaults to replaying the note's latest batch.
    pub notes: Option<Arc<dyn NoteSource>>,
}

#[derive(Clone, Debug)]
struct Intervals {
    pending: Duration,
    abort: Duration,
    dead_interpreter: Duration,
    health_check: Duration,
    schedule: Duration,
}

impl Intervals {
    fn tick(&self) -> Duration {
        self.pending
            .min(self.abort)
            .min(self.dead_interpreter)
            .min(self.health_check)
            .min(self.schedule)
    }
}

#[derive(Clone)]
struct SchedulerState {
    store: Store,
    registry: Arc<InterpreterProcessRegistry>,
    options: Arc<dyn InterpreterOptionRepository>,
    execution: Arc<ExecutionHandler>,
    pending: Arc<PendingHandler>,
    abort: Arc<AbortHandler>,
    dead: Arc<DeadInterpreterHandler>,
    result: Arc<ResultHandler>,
    schedule: Arc<ScheduleHandler>,
    intervals: Intervals,
}

impl SchedulerState {
    async fn dead_pass(&self) -> types::Result<usize> {
        self.registry.mark_exited();

        let mut reaped = 0;

        for process in self.registry.dead_processes() {
            if let Some(uuid) = process.uuid.as_deref() {
                if let Err(e) = self.dead.handle(uuid).await {
                    // keep the handle so the jobs are requeued on the next pass
                    tracing::error!(shebang = %process.shebang, "failed to requeue jobs: {}", e);
                    continue;
                }
            }

            self.registry.force_kill(&process).await;
            self.registry
                .remove_if_status(&process.shebang, ProcessStatus::Dead);

            let deaths = self.registry.record_death(&process.shebang);

            tracing::warn!(
                shebang = %process.shebang,
                "reaped dead interpreter process, {} consecutive deaths",
                deaths
            );

            reaped += 1;
        }

        let orphans = self.dead.requeue_orphans(&self.registry).await?;
        if orphans > 0 {
            tracing::warn!("requeued {} jobs of unknown interpreter processes", orphans);
        }

        Ok(reaped)
    }

    async fn health_pass(&self) -> Vec<String> {
        self.registry.check_health(self.options.as_ref()).await
    }
}

async fn timed<F, T>(cycle: Cycle, task: F) -> types::Result<T>
where
    F: Future<Output = types::Result<T>>,
{
    let timer = metric::cycle_duration_metric()
        .with_label_values(&[&cycle.to_string()])
        .start_timer();

    let result = task.await;
    timer.observe_duration();

    if let Err(e) = &result {
        tracing::error!("{} cycle failed: {}", cycle, e);
    }

    result
}

/// Skips the cycle when it is not due yet or its previous run is still going.
macro_rules! wait_for_eventslice {
    ($v: expr, $interval: expr) => {
        if let Some(started) = $v.last_started {
            if started.elapsed() < $interval {
                return Ok(());
            }
        }

        if let Some(join_handle) = $v.task.as_ref() {
            if !join_handle.is_finished() {
                return Ok(());
            }
        }

        if let Some(join_handle) = $v.task.take() {
            // the task has already logged its own error
            let _ = join_handle.await.to_unknown_err_result()?;
        }

        $v.last_started = Some(Instant::now());
    };
}

#[derive(Default)]
struct CycleSlot {
    task: Option<JoinHandle<types::Result<()>>>,
    last_started: Option<Instant>,
}

#[derive(Default)]
struct EventLoopSlice {
    pending: CycleSlot,
    abort: CycleSlot,
    dead_interpreter: CycleSlot,
    health_check: CycleSlot,
    schedule: CycleSlot,
}

impl EventLoopSlice {
    async fn run(&mut self, state: &SchedulerState) -> types::Result<()> {
        let pending_result = self.pending(state).await;
        let abort_result = self.abort(state).await;
        let dead_interpreter_result = self.dead_interpreter(state).await;
        let health_check_result = self.health_check(state).await;
        let schedule_result = self.schedule(state).await;

        pending_result?;
        abort_result?;
        dead_interpreter_result?;
        health_check_result?;
        schedule_result?;

        Ok(())
    }

    async fn pending(&mut self, state: &SchedulerState) -> types::Result<()> {
        wait_for_eventslice!(self.pending, state.intervals.pending);

        let handler = state.pending.clone();
        let task = async move {
            timed(Cycle::Pending, handler.pass()).await?;
            Ok(())
        };

        self.pending.task = Some(tokio::task::spawn(task));

        Ok(())
    }

    async fn abort(&mut self, state: &SchedulerState) -> types::Result<()> {
        wait_for_eventslice!(self.abort, state.intervals.abort);

        let handler = state.abort.clone();
        let task = async move { timed(Cycle::Abort, handler.pass()).await };

        self.abort.task = Some(tokio::task::spawn(task));

        Ok(())
    }

    async fn dead_interpreter(&mut self, state: &SchedulerState) -> types::Result<()> {
        wait_for_eventslice!(self.dead_interpreter, state.intervals.dead_interpreter);

        let state = state.clone();
        let task = async move {
            timed(Cycle::DeadInterpreter, state.dead_pass()).await?;
            Ok(())
        };

        self.dead_interpreter.task = Some(tokio::task::spawn(task));

        Ok(())
    }

    async fn health_check(&mut self, state: &SchedulerState) -> types::Result<()> {
        wait_for_eventslice!(self.health_check, state.intervals.health_check);

        let state = state.clone();
        let task = async move {
            let marked = timed(Cycle::HealthCheck, async { Ok(state.health_pass().await) }).await?;

            if !marked.is_empty() {
                tracing::warn!("health check marked {:?} dead", marked);
            }

            Ok(())
        };

        self.health_check.task = Some(tokio::task::spawn(task));

        Ok(())
    }

    async fn schedule(&mut self, state: &SchedulerState) -> types::Result<()> {
        wait_for_eventslice!(self.schedule, state.intervals.schedule);

        let handler = state.schedule.clone();
        let task = async move {
            timed(Cycle::Schedule, handler.pass()).await?;
            Ok(())
        };

        self.schedule.task = Some(tokio::task::spawn(task));

        Ok(())
    }

    async fn drain(&mut self) {
        for slot in [
            &mut self.pending,
            &mut self.abort,
            &mut self.dead_interpreter,
            &mut self.health_check,
            &mut self.schedule,
        ] {
            if let Some(join_handle) = slot.task.take() {
                let _ = join_handle.await;
            }
        }
    }
}

/// Drives the polling cycles and exposes the operations that create or
/// abort work.
#[derive(Clone)]
pub struct Scheduler {
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(config: &Config, connection: DatabaseConnection, deps: SchedulerDeps) -> Self {
        let SchedulerDeps {
            options,
            launcher,
            client_factory,
            events,
            notes,
        } = deps;

        let store = Store::new(connection, events);
        let transitions = JobTransitions::new(store.clone());

        let registry = Arc::new(InterpreterProcessRegistry::new(
            RegistrySettings::from(config),
            launcher,
            client_factory,
        ));

        let pending = PendingHandler::new(
            transitions.clone(),
            registry.clone(),
            options.clone(),
            PendingSettings {
                death_threshold: config.scheduler.death_threshold,
                decline_retry_limit: config.scheduler.decline_retry_limit,
            },
        );

        let intervals = Intervals {
            pending: config.scheduler.pending_poll_interval(),
            abort: config.scheduler.abort_poll_interval(),
            dead_interpreter: config.scheduler.dead_interpreter_poll_interval(),
            health_check: config.scheduler.health_check_interval(),
            schedule: config.scheduler.schedule_poll_interval(),
        };

        let execution = Arc::new(ExecutionHandler::new(transitions.clone()));
        let notes = notes.unwrap_or_else(|| LatestRunNoteSource::new(store.clone()));

        let state = SchedulerState {
            schedule: Arc::new(ScheduleHandler::new(store.clone(), execution.clone(), notes)),
            store,
            execution,
            pending: Arc::new(pending),
            abort: Arc::new(AbortHandler::new(transitions.clone(), registry.clone())),
            dead: Arc::new(DeadInterpreterHandler::new(transitions.clone())),
            result: Arc::new(ResultHandler::new(
                transitions,
                config.scheduler.result_lookup_timeout(),
            )),
            registry,
            options,
            intervals,
        };

        Self { state }
    }

    pub fn store(&self) -> &Store {
        &self.state.store
    }

    pub fn registry(&self) -> Arc<InterpreterProcessRegistry> {
        self.state.registry.clone()
    }

    pub fn result_handler(&self) -> Arc<ResultHandler> {
        self.state.result.clone()
    }

    pub async fn run(&self, run: NoteRun) -> types::Result<job_batch::Model> {
        self.state.execution.run(run).await
    }

    pub async fn abort(&self, batch_id: i64) -> types::Result<job_batch::Model> {
        self.state.abort.abort(batch_id).await
    }

    pub async fn abort_note(&self, note_id: &str) -> types::Result<job_batch::Model> {
        self.state.abort.abort_note(note_id).await
    }

    /// Creates or replaces the cron schedule of a note.
    pub async fn schedule_note(
        &self,
        note_id: &str,
        expression: &str,
        username: Option<String>,
        roles: Vec<String>,
    ) -> types::Result<schedule::Model> {
        self.state
            .schedule
            .schedule(note_id, expression, username, roles)
            .await
    }

    pub async fn unschedule_note(&self, note_id: &str) -> types::Result<bool> {
        self.state.schedule.unschedule(note_id).await
    }

    /// Must run before the cycles start.
    pub async fn restore_state(&self) -> types::Result<u64> {
        self.state.store.restore_state().await
    }

    pub async fn pending_pass(&self) -> types::Result<Vec<i64>> {
        self.state.pending.pass().await
    }

    pub async fn abort_pass(&self) -> types::Result<()> {
        self.state.abort.pass().await
    }

    pub async fn dead_pass(&self) -> types::Result<usize> {
        self.state.dead_pass().await
    }

    pub async fn health_pass(&self) -> Vec<String> {
        self.state.health_pass().await
    }

    pub async fn schedule_pass(&self) -> types::Result<Vec<job_batch::Model>> {
        self.state.schedule.pass().await
    }

    /// Spawns the cycle loop. It stops once `token` is cancelled and in-flight passes finish.
    pub fn start(&self, token: CancellationToken) -> JoinHandle<()> {
        let state = self.state.clone();

        tokio::task::spawn(async move {
            let mut event_loop_slice = EventLoopSlice::default();
            let tick = state.intervals.tick();

            tracing::info!(?tick, "scheduler started");

            loop {
                if let Err(e) = event_loop_slice.run(&state).await {
                    tracing::error!("scheduler cycle panicked: {}", e);
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(tick) => {}
                }
            }

            event_loop_slice.drain().await;

            tracing::info!("scheduler stopped");
        })
    }

    /// Force-kills every interpreter process the registry knows about.
    pub async fn shutdown(&self) {
        for process in self.state.registry.processes() {
            tracing::info!(shebang = %process.shebang, "stopping interpreter process");

            self.state.registry.force_kill(&process).await;
            self.state
                .registry
                .remove_if_status(&process.shebang, process.status);
        }
    }
}

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

lazy_static! {
    static ref JOB_DISPATCH_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new("job_dispatch_count", "Job Dispatch Count").namespace("folio_scheduler"),
        &["shebang", "outcome"]
    )
    .expect("failed to initialize metric: JOB_DISPATCH_COUNT");
    static ref JOB_TERMINAL_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new("job_terminal_count", "Job Terminal Count").namespace("folio_scheduler"),
        &["status"]
    )
    .expect("failed to initialize metric: JOB_TERMINAL_COUNT");
    static ref INTERPRETER_DEATH_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new("interpreter_death_count", "Interpreter Death Count")
            .namespace("folio_scheduler"),
        &["shebang"]
    )
    .expect("failed to initialize metric: INTERPRETER_DEATH_COUNT");
    static ref CYCLE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("cycle_duration", "Scheduler Cycle Duration")
            .namespace("folio_scheduler"),
        &["cycle"]
    )
    .expect("failed to initialize metric: CYCLE_DURATION");
}

pub fn job_dispatch_count_metric() -> &'static IntCounterVec {
    &JOB_DISPATCH_COUNT
}

pub fn job_terminal_count_metric() -> &'static IntCounterVec {
    &JOB_TERMINAL_COUNT
}

pub fn interpreter_death_count_metric() -> &'static IntCounterVec {
    &INTERPRETER_DEATH_COUNT
}

pub fn cycle_duration_metric() -> &'static HistogramVec {
    &CYCLE_DURATION
}

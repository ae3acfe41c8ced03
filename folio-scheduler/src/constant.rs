#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Cycle {
    #[strum(serialize = "pending")]
    Pending,

    #[strum(serialize = "abort")]
    Abort,

    #[strum(serialize = "dead_interpreter")]
    DeadInterpreter,

    #[strum(serialize = "health_check")]
    HealthCheck,

    #[strum(serialize = "schedule")]
    Schedule,
}

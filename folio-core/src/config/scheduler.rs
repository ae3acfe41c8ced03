use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Scheduler {
    pub pending_poll_interval_millis: u64,
    pub abort_poll_interval_millis: u64,
    pub dead_interpreter_poll_interval_millis: u64,
    pub health_check_interval_millis: u64,
    pub schedule_poll_interval_millis: u64,

    /// Consecutive deaths tolerated before a shebang is auto-disabled.
    pub death_threshold: u32,

    /// 0 means a declined job is retried forever.
    pub decline_retry_limit: u32,

    /// How long a result callback waits for its job to become visible.
    pub result_lookup_timeout_millis: u64,
}

impl Scheduler {
    pub fn pending_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pending_poll_interval_millis)
    }

    pub fn abort_poll_interval(&self) -> Duration {
        Duration::from_millis(self.abort_poll_interval_millis)
    }

    pub fn dead_interpreter_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dead_interpreter_poll_interval_millis)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_millis)
    }

    pub fn schedule_poll_interval(&self) -> Duration {
        Duration::from_millis(self.schedule_poll_interval_millis)
    }

    pub fn result_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.result_lookup_timeout_millis)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            pending_poll_interval_millis: 200,
            abort_poll_interval_millis: 1000,
            dead_interpreter_poll_interval_millis: 1000,
            health_check_interval_millis: 5000,
            schedule_poll_interval_millis: 1000,
            death_threshold: 50,
            decline_retry_limit: 0,
            result_lookup_timeout_millis: 2000,
        }
    }
}

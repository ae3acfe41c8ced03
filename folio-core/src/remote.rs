//! Values exchanged with remote interpreter processes.

use crate::types::Properties;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PushRequest {
    pub payload: String,
    pub note_context: Properties,
    pub user_context: Properties,
    pub configuration: Properties,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Accept {
        interpreter_process_uuid: String,
        interpreter_job_uuid: String,
    },
    Decline,
    Error,
}

impl PushOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept",
            Self::Decline => "decline",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Accept,
    NotFound,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PingOutcome {
    Ok,
    KillMe,
}

/// Sent by a freshly started interpreter process once its server is listening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterInfo {
    pub host: String,
    pub port: u16,
    pub shebang: String,
    pub process_uuid: String,
}

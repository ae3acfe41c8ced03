use std::time::Instant;

use anyhow::anyhow;
use folio_core::errors::Error;
use folio_core::types;

use self::pool::{ConnectionPool, PooledConnection};

pub mod client;
pub mod launcher;
pub mod pool;
pub mod registry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum ProcessStatus {
    #[strum(serialize = "STARTING")]
    Starting,

    #[strum(serialize = "READY")]
    Ready,

    #[strum(serialize = "DEAD")]
    Dead,

    /// Configuration is missing or invalid, nothing was started.
    #[strum(serialize = "NOT_FOUND")]
    NotFound,
}

/// Snapshot of one interpreter process as tracked by the registry.
#[derive(Clone, Debug)]
pub struct InterpreterProcess {
    pub shebang: String,
    pub status: ProcessStatus,
    pub uuid: Option<String>,
    pub started_at: Instant,
    pool: Option<ConnectionPool>,
}

impl InterpreterProcess {
    pub(crate) fn new(shebang: String, status: ProcessStatus) -> Self {
        Self {
            shebang,
            status,
            uuid: None,
            started_at: Instant::now(),
            pool: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ProcessStatus::Ready
    }

    pub fn endpoint(&self) -> Option<(String, u16)> {
        self.pool
            .as_ref()
            .map(|pool| (pool.host().to_string(), pool.port()))
    }

    pub async fn get_connection(&self) -> types::Result<PooledConnection> {
        match &self.pool {
            Some(pool) => pool.get_connection().await,
            None => Err(Error::transport(
                format!("interpreter process for '{}' is not connected", self.shebang),
                anyhow!("process status is {}", self.status),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // persistence errors
    #[error("{kind} '{name}' was not found")]
    EntityNotFound { kind: String, name: String },

    #[error("conflict on {kind} '{name}', {reason}")]
    EntityConflict {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("database operation failed: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    #[error("invalid operation, {message}")]
    InvalidOperation { message: String },

    // interpreter process errors
    #[error("rpc transport failure, {message}")]
    Transport {
        message: String,

        #[source]
        source: anyhow::Error,
    },

    #[error("failed to launch interpreter process for '{shebang}', {message}")]
    Launch {
        shebang: String,
        message: String,

        #[source]
        source: anyhow::Error,
    },

    #[error("invalid configuration, {message}")]
    Configuration {
        message: String,

        #[source]
        source: anyhow::Error,
    },

    // unknown errors
    #[error("encountered unknown error, source: {source}")]
    Unknown {
        #[source]
        source: anyhow::Error,
    },

    #[error("encountered unknown error, {message}")]
    UnknownWithMsgOnly { message: String },
}

impl Error {
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Transport {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub trait ToUnknownErrorResult<T> {
    fn to_unknown_err_result(self) -> Result<T, Error>;
}

impl<T, E> ToUnknownErrorResult<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn to_unknown_err_result(self) -> Result<T, Error> {
        self.map_err(|e| Error::Unknown {
            source: anyhow::anyhow!("{}", e),
        })
    }
}

#[macro_export]
macro_rules! err_unsupported_op {
    ($($arg:tt)*) => {
        $crate::errors::Error::InvalidOperation {
            message: format!($($arg)*),
        }
    };
}

#[macro_export]
macro_rules! err_not_found {
    ($kind: expr, $name: expr) => {
        $crate::errors::Error::EntityNotFound {
            kind: $kind.to_string(),
            name: $name.to_string(),
        }
    };
}

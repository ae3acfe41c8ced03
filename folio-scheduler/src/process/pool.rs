use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use folio_core::errors::Error;
use folio_core::types;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::process::client::{ClientFactory, InterpreterClient};

/// Bounded set of connections to one interpreter process. A connection is held for one call
/// and goes back to the pool when the [`PooledConnection`] is dropped.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    factory: Arc<dyn ClientFactory>,
    host: String,
    port: u16,
    idle: Mutex<Vec<Arc<dyn InterpreterClient>>>,
    permits: Arc<Semaphore>,
    checkout_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        host: String,
        port: u16,
        size: usize,
        checkout_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                factory,
                host,
                port,
                idle: Mutex::new(Vec::new()),
                permits: Arc::new(Semaphore::new(size.max(1))),
                checkout_timeout,
            }),
        }
    }

    pub async fn get_connection(&self) -> types::Result<PooledConnection> {
        let permit = tokio::time::timeout(
            self.inner.checkout_timeout,
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| {
            Error::transport(
                format!(
                    "no connection to {}:{} available within {:?}",
                    self.inner.host, self.inner.port, self.inner.checkout_timeout
                ),
                anyhow!("connection pool exhausted"),
            )
        })?
        .map_err(|e| Error::transport("connection pool closed", e))?;

        let idle = self.inner.idle.lock().pop();

        let client = match idle {
            Some(client) => client,
            None => self.inner.factory.connect(&self.inner.host, self.inner.port)?,
        };

        Ok(PooledConnection {
            client,
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    pub fn host(&self) -> &str {
        &self.inner.host
    }

    pub fn port(&self) -> u16 {
        self.inner.port
    }

    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("host", &self.inner.host)
            .field("port", &self.inner.port)
            .field("available", &self.available())
            .finish()
    }
}

pub struct PooledConnection {
    client: Arc<dyn InterpreterClient>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = dyn InterpreterClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.idle.lock().push(self.client.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::remote::{CancelOutcome, PingOutcome, PushOutcome, PushRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopClient;

    #[async_trait]
    impl InterpreterClient for NoopClient {
        async fn push(&self, _request: PushRequest) -> types::Result<PushOutcome> {
            Ok(PushOutcome::Decline)
        }

        async fn cancel(&self, _uuid: &str) -> types::Result<CancelOutcome> {
            Ok(CancelOutcome::NotFound)
        }

        async fn ping(&self) -> types::Result<PingOutcome> {
            Ok(PingOutcome::Ok)
        }

        async fn shutdown(&self) -> types::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl ClientFactory for CountingFactory {
        fn connect(&self, _host: &str, _port: u16) -> types::Result<Arc<dyn InterpreterClient>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NoopClient))
        }
    }

    #[tokio::test]
    async fn released_connections_are_reused() {
        let factory = Arc::new(CountingFactory::default());
        let pool = ConnectionPool::new(
            factory.clone(),
            "127.0.0.1".to_string(),
            9000,
            2,
            Duration::from_millis(50),
        );

        {
            let conn = pool.get_connection().await.unwrap();
            conn.ping().await.unwrap();
        }

        let _conn = pool.get_connection().await.unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn exhausted_pool_fails_after_checkout_timeout() {
        let pool = ConnectionPool::new(
            Arc::new(CountingFactory::default()),
            "127.0.0.1".to_string(),
            9000,
            1,
            Duration::from_millis(20),
        );

        let _held = pool.get_connection().await.unwrap();
        let err = pool.get_connection().await.err().unwrap();

        assert!(err.is_transport());
    }
}

use std::sync::Arc;

use folio_core::types;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::event::{ChangeEvent, EventSink};
use crate::{job, job_batch, job_payload, job_result, schedule};

/// Durable job state. Every read-then-write goes through a [`UnitOfWork`].
#[derive(Clone)]
pub struct Store {
    connection: DatabaseConnection,
    pub batches: job_batch::Repository,
    pub jobs: job::Repository,
    pub payloads: job_payload::Repository,
    pub results: job_result::Repository,
    pub schedules: schedule::Repository,
    events: Arc<dyn EventSink>,
}

impl Store {
    pub fn new(connection: DatabaseConnection, events: Arc<dyn EventSink>) -> Self {
        Self {
            connection,
            batches: job_batch::service::Service::new(),
            jobs: job::service::Service::new(),
            payloads: job_payload::service::Service::new(),
            results: job_result::service::Service::new(),
            schedules: schedule::service::Service::new(),
            events,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub async fn begin(&self) -> types::Result<UnitOfWork> {
        Ok(UnitOfWork {
            tx: self.connection.begin().await?,
            events: Vec::new(),
        })
    }

    /// Commits and then publishes the events recorded by the unit of work.
    pub async fn commit(&self, uow: UnitOfWork) -> types::Result<()> {
        let UnitOfWork { tx, events } = uow;

        tx.commit().await?;

        for event in events {
            self.events.publish(event);
        }

        Ok(())
    }

    pub fn publish(&self, event: ChangeEvent) {
        self.events.publish(event);
    }

    /// Resets jobs left in flight by a previous server run.
    pub async fn restore_state(&self) -> types::Result<u64> {
        let mut uow = self.begin().await?;

        let in_flight = self.jobs.load_in_flight(uow.tx()).await?;
        let restored = self.jobs.restore_state(uow.tx()).await?;

        for before in in_flight {
            if let Some(after) = self.jobs.get(uow.tx(), before.id).await? {
                uow.record(ChangeEvent::Job {
                    before: Some(before),
                    after,
                });
            }
        }

        self.commit(uow).await?;

        if restored > 0 {
            tracing::info!("restored {} in-flight jobs to pending", restored);
        }

        Ok(restored)
    }
}

/// A transaction plus the change events to publish once it commits. Dropping it rolls back.
pub struct UnitOfWork {
    tx: DatabaseTransaction,
    events: Vec<ChangeEvent>,
}

impl UnitOfWork {
    pub fn tx(&self) -> &DatabaseTransaction {
        &self.tx
    }

    pub fn record(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }
}

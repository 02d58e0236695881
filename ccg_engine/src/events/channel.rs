//! Fire-and-forget delivery of ledger events to hook callbacks.
//!
//! A [`HookWorker`] owns a bounded queue and one async callback. [`HookSender`]s feed the queue without ever waiting
//! on it: when the queue is full the event is dropped with a warning, so the request that produced it is never slowed
//! down by a slow subscriber. Callbacks see only the event, never the ledger.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinSet,
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct HookWorker<E: Send + 'static> {
    name: &'static str,
    queue: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    callback: Handler<E>,
}

impl<E: Send + 'static> HookWorker<E> {
    pub fn new(name: &'static str, capacity: usize, callback: Handler<E>) -> Self {
        let (sender, queue) = mpsc::channel(capacity.max(1));
        Self { name, queue, sender, callback }
    }

    pub fn sender(&self) -> HookSender<E> {
        HookSender { name: self.name, sender: self.sender.clone() }
    }

    /// Runs callbacks concurrently until every [`HookSender`] is gone, then waits for the ones still in flight.
    pub async fn run(self) {
        let Self { name, mut queue, sender, callback } = self;
        // Only the senders handed out may keep the queue open
        drop(sender);
        debug!("📬️ {name} hook worker started");
        let mut in_flight = JoinSet::new();
        while let Some(event) = queue.recv().await {
            let callback = Arc::clone(&callback);
            in_flight.spawn(async move { callback(event).await });
            while let Some(done) = in_flight.try_join_next() {
                report(name, done);
            }
        }
        trace!("📬️ {name} queue closed with {} callbacks in flight", in_flight.len());
        while let Some(done) = in_flight.join_next().await {
            report(name, done);
        }
        debug!("📬️ {name} hook worker stopped");
    }
}

fn report(name: &str, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!("📬️ A {name} hook did not complete. {e}");
    }
}

pub struct HookSender<E> {
    name: &'static str,
    sender: mpsc::Sender<E>,
}

impl<E> Clone for HookSender<E> {
    fn clone(&self) -> Self {
        Self { name: self.name, sender: self.sender.clone() }
    }
}

impl<E> HookSender<E> {
    /// Queues the event without waiting. Returns false if it was dropped.
    pub fn publish(&self, event: E) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("📬️ The {} hook queue is full. An event was dropped.", self.name);
                false
            },
            Err(TrySendError::Closed(_)) => {
                debug!("📬️ The {} hook worker has stopped. An event was dropped.", self.name);
                false
            },
        }
    }
}

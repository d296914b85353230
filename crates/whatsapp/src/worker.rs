use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use comanda_core::ConversationKey;

use crate::events::InboundEvent;

/// Deliveries accepted but not yet handled, across all counterparties.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("inbound worker is no longer accepting deliveries")]
    Closed,
    #[error("inbound worker backlog is full")]
    Saturated,
}

/// Processes one inbound event end to end. Errors are logged by the worker
/// and never reach the webhook caller.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn handle(&self, event: &InboundEvent) -> Result<(), Self::Error>;
}

struct Batch {
    batch_id: Uuid,
    events: Vec<InboundEvent>,
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("batch_id", &self.batch_id)
            .field("events", &self.events.len())
            .finish()
    }
}

/// Background execution context for webhook deliveries.
///
/// Every counterparty gets a lane: its events are handled one at a time in
/// arrival order, across deliveries. Lanes for different counterparties run
/// concurrently and are dropped once idle. Intake is bounded; when the
/// backlog is full `submit` fails fast instead of queueing more.
///
/// Dropping every `InboundWorker` handle stops intake, and the dispatcher
/// task finishes once queued events are done.
#[derive(Clone, Debug)]
pub struct InboundWorker {
    tx: mpsc::Sender<Batch>,
}

impl InboundWorker {
    pub fn spawn<H>(handler: Arc<H>) -> (Self, JoinHandle<()>)
    where
        H: InboundHandler + 'static,
    {
        Self::spawn_with_capacity(handler, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity<H>(handler: Arc<H>, capacity: usize) -> (Self, JoinHandle<()>)
    where
        H: InboundHandler + 'static,
    {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let dispatcher = tokio::spawn(run_dispatcher(handler, rx, capacity));
        (Self { tx }, dispatcher)
    }

    /// Queues a batch and returns immediately with its id.
    pub fn submit(&self, events: Vec<InboundEvent>) -> Result<Uuid, WorkerError> {
        let batch_id = Uuid::new_v4();
        let count = events.len();
        self.tx.try_send(Batch { batch_id, events }).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => WorkerError::Saturated,
            mpsc::error::TrySendError::Closed(_) => WorkerError::Closed,
        })?;
        debug!(
            event_name = "ingress.webhook.dispatched",
            correlation_id = %batch_id,
            events = count,
            "delivery queued for processing"
        );
        Ok(batch_id)
    }
}

struct Job {
    batch_id: Uuid,
    event: InboundEvent,
}

enum LaneSignal {
    Finished { key: ConversationKey, generation: u64 },
    Stopped { key: ConversationKey, generation: u64 },
}

struct Lane {
    tx: mpsc::UnboundedSender<Job>,
    generation: u64,
    pending: usize,
}

/// Sends `Stopped` when the lane task ends, including by panic.
struct LaneGuard {
    key: ConversationKey,
    generation: u64,
    signals: mpsc::UnboundedSender<LaneSignal>,
}

impl Drop for LaneGuard {
    fn drop(&mut self) {
        let _ = self
            .signals
            .send(LaneSignal::Stopped { key: self.key.clone(), generation: self.generation });
    }
}

struct Dispatcher<H> {
    handler: Arc<H>,
    lanes: HashMap<ConversationKey, Lane>,
    tasks: JoinSet<()>,
    signals: mpsc::UnboundedSender<LaneSignal>,
    next_generation: u64,
    pending: usize,
}

impl<H> Dispatcher<H>
where
    H: InboundHandler + 'static,
{
    fn route(&mut self, batch: Batch) {
        for event in batch.events {
            self.enqueue(Job { batch_id: batch.batch_id, event });
        }
    }

    fn enqueue(&mut self, job: Job) {
        let key = job.event.key();
        let job = match self.lanes.get_mut(&key) {
            Some(lane) => match lane.tx.send(job) {
                Ok(()) => {
                    lane.pending += 1;
                    self.pending += 1;
                    return;
                }
                Err(mpsc::error::SendError(job)) => {
                    self.pending = self.pending.saturating_sub(lane.pending);
                    job
                }
            },
            None => job,
        };

        let mut lane = self.open_lane(key.clone());
        match lane.tx.send(job) {
            Ok(()) => {
                lane.pending = 1;
                self.pending += 1;
            }
            Err(mpsc::error::SendError(job)) => warn!(
                event_name = "worker.lane_unavailable",
                correlation_id = %job.event.message_id,
                batch_id = %job.batch_id,
                counterparty_id = %job.event.counterparty_id,
                "new lane stopped before accepting its first message"
            ),
        }
        self.lanes.insert(key, lane);
    }

    fn open_lane(&mut self, key: ConversationKey) -> Lane {
        let (tx, rx) = mpsc::unbounded_channel();
        self.next_generation += 1;
        let generation = self.next_generation;
        let guard = LaneGuard { key, generation, signals: self.signals.clone() };
        self.tasks.spawn(run_lane(self.handler.clone(), rx, guard));
        Lane { tx, generation, pending: 0 }
    }

    fn on_signal(&mut self, signal: LaneSignal) {
        match signal {
            LaneSignal::Finished { key, generation } => {
                let idle = match self.lanes.get_mut(&key) {
                    Some(lane) if lane.generation == generation => {
                        lane.pending = lane.pending.saturating_sub(1);
                        self.pending = self.pending.saturating_sub(1);
                        lane.pending == 0
                    }
                    _ => false,
                };
                if idle {
                    self.lanes.remove(&key);
                }
            }
            LaneSignal::Stopped { key, generation } => {
                let current = self.lanes.get(&key).is_some_and(|lane| lane.generation == generation);
                if current {
                    if let Some(lane) = self.lanes.remove(&key) {
                        self.pending = self.pending.saturating_sub(lane.pending);
                    }
                }
            }
        }
    }
}

async fn run_dispatcher<H>(handler: Arc<H>, mut rx: mpsc::Receiver<Batch>, capacity: usize)
where
    H: InboundHandler + 'static,
{
    let (signals, mut signal_rx) = mpsc::unbounded_channel();
    let mut dispatcher = Dispatcher {
        handler,
        lanes: HashMap::new(),
        tasks: JoinSet::new(),
        signals,
        next_generation: 0,
        pending: 0,
    };

    loop {
        tokio::select! {
            batch = rx.recv(), if dispatcher.pending < capacity => match batch {
                Some(batch) => dispatcher.route(batch),
                None => break,
            },
            Some(signal) = signal_rx.recv() => dispatcher.on_signal(signal),
            Some(joined) = dispatcher.tasks.join_next(), if !dispatcher.tasks.is_empty() => {
                log_join(joined);
            }
        }
    }

    if dispatcher.pending > 0 {
        info!(
            event_name = "worker.draining",
            correlation_id = "shutdown",
            lanes = dispatcher.lanes.len(),
            events = dispatcher.pending,
            "waiting for queued deliveries"
        );
    }
    // Closing the lane senders lets each lane finish its queue and exit.
    dispatcher.lanes.clear();
    while let Some(joined) = dispatcher.tasks.join_next().await {
        log_join(joined);
    }
    info!(event_name = "worker.stopped", correlation_id = "shutdown", "inbound worker stopped");
}

async fn run_lane<H: InboundHandler>(
    handler: Arc<H>,
    mut rx: mpsc::UnboundedReceiver<Job>,
    guard: LaneGuard,
) {
    while let Some(job) = rx.recv().await {
        process(handler.as_ref(), &job).await;
        let _ = guard
            .signals
            .send(LaneSignal::Finished { key: guard.key.clone(), generation: guard.generation });
    }
}

async fn process<H: InboundHandler>(handler: &H, job: &Job) {
    let event = &job.event;
    if let Err(error) = handler.handle(event).await {
        error!(
            event_name = "worker.dispatch_failed",
            correlation_id = %event.message_id,
            batch_id = %job.batch_id,
            endpoint_id = %event.endpoint_id,
            counterparty_id = %event.counterparty_id,
            error = %error,
            "inbound message processing failed; continuing with next message"
        );
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(join_error) = joined {
        warn!(
            event_name = "worker.lane_aborted",
            error = %join_error,
            "counterparty lane ended abnormally"
        );
    }
}

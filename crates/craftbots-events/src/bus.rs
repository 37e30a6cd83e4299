//! The broadcast bus: validation at publish, FIFO dispatch on one worker
//! thread, per-subscriber fault isolation.
//!
//! # Architecture
//!
//! [`MessageBus`] is a cheap [`Clone`] handle over shared state. Publishing
//! validates the message, stamps an id, captures the current subscriber list
//! and pushes both onto a `flume` queue. A single worker thread pops envelopes
//! in order and invokes every captured callback. A callback that returns an
//! error or panics is logged and skipped; the rest still receive the message.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use craftbots_types::{Message, MessageId, SubscriptionId};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{BusError, DeliveryError};

/// Default upper bound on a single blocking receive in the worker.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A subscriber callback.
pub type Callback = Arc<dyn Fn(&Message) -> Result<(), DeliveryError> + Send + Sync>;

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    name: String,
    callback: Callback,
}

struct Envelope {
    message: Message,
    subscribers: Arc<Vec<Subscriber>>,
}

/// Delivery counters since the bus started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Messages that passed validation and were enqueued.
    pub accepted: u64,
    /// Messages rejected at publish.
    pub rejected: u64,
    /// Successful callback invocations.
    pub delivered: u64,
    /// Callback invocations that returned an error or panicked.
    pub failed: u64,
}

struct Shared {
    subscribers: RwLock<Arc<Vec<Subscriber>>>,
    sender: Mutex<Option<flume::Sender<Envelope>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Mutex<usize>,
    drained: Condvar,
    accepted: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    stopping: AtomicBool,
    poll_interval: Duration,
}

/// Handle to the asynchronous broadcast bus.
#[derive(Clone)]
pub struct MessageBus {
    shared: Arc<Shared>,
}

impl core::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MessageBus")
            .field("subscribers", &self.subscriber_count())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl MessageBus {
    /// Start a bus with its dispatch worker.
    ///
    /// `poll_interval` bounds how long the worker blocks on an empty queue
    /// before rechecking the stop flag.
    pub fn start(poll_interval: Duration) -> Result<Self, BusError> {
        let (tx, rx) = flume::unbounded::<Envelope>();
        let shared = Arc::new(Shared {
            subscribers: RwLock::new(Arc::new(Vec::new())),
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(None),
            pending: Mutex::new(0),
            drained: Condvar::new(),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            stopping: AtomicBool::new(false),
            poll_interval,
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("message-bus".to_owned())
            .spawn(move || run_worker(&worker_shared, &rx))?;
        *shared.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        info!(poll_ms = poll_interval.as_millis(), "message bus started");
        Ok(Self { shared })
    }

    /// Register a callback. It receives every message published from now on.
    pub fn subscribe<F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Message) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let name = name.into();
        let mut guard = self
            .shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<Subscriber> = guard.as_ref().clone();
        next.push(Subscriber {
            id,
            name: name.clone(),
            callback: Arc::new(callback),
        });
        *guard = Arc::new(next);
        debug!(subscriber = %name, subscription = %id, "subscriber added");
        id
    }

    /// Remove a callback. Messages already queued still reach it.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self
            .shared
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        let next: Vec<Subscriber> = guard.iter().filter(|s| s.id != id).cloned().collect();
        let removed = next.len() != before;
        *guard = Arc::new(next);
        removed
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Validate and enqueue a message. Returns immediately.
    ///
    /// A message without an id gets one here. Every subscriber registered at
    /// this instant will receive it, in subscription order.
    pub fn publish(&self, mut message: Message) -> Result<MessageId, BusError> {
        if let Err(err) = message.validate() {
            self.shared.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(kind = %message.kind, source = %message.source, error = %err, "rejected malformed message");
            return Err(err.into());
        }

        let id = *message.id.get_or_insert_with(MessageId::new);
        let subscribers = Arc::clone(
            &self
                .shared
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let sender = self
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(BusError::Closed)?;

        self.shared.begin();
        debug!(
            id = %id,
            kind = %message.kind,
            source = %message.source,
            target = %message.target,
            "message published"
        );
        if sender
            .send(Envelope {
                message,
                subscribers,
            })
            .is_err()
        {
            self.shared.finish();
            return Err(BusError::Closed);
        }
        self.shared.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    /// Validate a raw wire record (all seven keys present), decode it and
    /// publish it.
    pub fn publish_value(&self, value: Value) -> Result<MessageId, BusError> {
        match Message::from_value(value) {
            Ok(message) => self.publish(message),
            Err(err) => {
                self.shared.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "rejected malformed wire message");
                Err(err.into())
            }
        }
    }

    /// Block until every accepted message has been dispatched, or until
    /// `timeout` elapses. Returns `true` when the queue drained.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let guard = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .shared
            .drained
            .wait_timeout_while(guard, timeout, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> BusStats {
        BusStats {
            accepted: self.shared.accepted.load(Ordering::Relaxed),
            rejected: self.shared.rejected.load(Ordering::Relaxed),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.stopping.load(Ordering::Acquire)
    }

    /// Stop accepting messages, dispatch what is already queued, then join
    /// the worker. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping the last sender lets the worker drain and exit.
        self.shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handle = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                debug!("shutdown requested from a subscriber; worker will exit on its own");
                return;
            }
            if handle.join().is_err() {
                error!("message bus worker panicked");
            }
        }
        let stats = self.stats();
        info!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            delivered = stats.delivered,
            failed = stats.failed,
            "message bus stopped"
        );
    }
}

impl Shared {
    fn begin(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = pending.saturating_add(1);
    }

    fn finish(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    fn dispatch(&self, envelope: &Envelope) {
        let message = &envelope.message;
        let started = Instant::now();
        for subscriber in envelope.subscribers.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(message)));
            match outcome {
                Ok(Ok(())) => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(err)) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        subscriber = %subscriber.name,
                        kind = %message.kind,
                        error = %err,
                        "subscriber failed to handle message"
                    );
                }
                Err(panic) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        subscriber = %subscriber.name,
                        kind = %message.kind,
                        panic = %panic_text(panic.as_ref()),
                        "subscriber panicked while handling message"
                    );
                }
            }
        }
        debug!(
            kind = %message.kind,
            subscribers = envelope.subscribers.len(),
            elapsed_us = started.elapsed().as_micros(),
            "message dispatched"
        );
    }
}

fn run_worker(shared: &Shared, rx: &flume::Receiver<Envelope>) {
    loop {
        match rx.recv_timeout(shared.poll_interval) {
            Ok(envelope) => {
                shared.dispatch(&envelope);
                shared.finish();
            }
            Err(flume::RecvTimeoutError::Timeout) => {}
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("message bus worker exiting");
}

/// Best-effort text of a caught panic payload.
pub fn panic_text(payload: &(dyn core::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn publish_assigns_id() {
        let bus = MessageBus::start(Duration::from_millis(10)).unwrap();
        let msg = Message::new("test.v1", "a", "b", json!({}));
        let id = bus.publish(msg).unwrap();
        assert!(bus.wait_idle(Duration::from_secs(2)));
        assert_ne!(id.to_string(), "");
        assert_eq!(bus.stats().accepted, 1);
        bus.shutdown();
    }

    #[test]
    fn publish_after_shutdown_is_closed() {
        let bus = MessageBus::start(Duration::from_millis(10)).unwrap();
        bus.shutdown();
        assert!(bus.is_closed());
        let err = bus
            .publish(Message::new("test.v1", "a", "b", json!({})))
            .unwrap_err();
        assert!(matches!(err, BusError::Closed));
    }

    #[test]
    fn unsubscribe_removes_callback() {
        let bus = MessageBus::start(Duration::from_millis(10)).unwrap();
        let id = bus.subscribe("x", |_| Ok(()));
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
        bus.shutdown();
    }

    #[test]
    fn panic_text_reads_str_and_string() {
        let a: Box<dyn core::any::Any + Send> = Box::new("boom");
        let b: Box<dyn core::any::Any + Send> = Box::new(String::from("bang"));
        let c: Box<dyn core::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_text(a.as_ref()), "boom");
        assert_eq!(panic_text(b.as_ref()), "bang");
        assert_eq!(panic_text(c.as_ref()), "non-string panic payload");
    }
}

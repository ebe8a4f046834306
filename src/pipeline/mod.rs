//! Asynchronous log delivery.
//!
//! [`AsyncPipeline`] decouples log producers from sink I/O: admitted records
//! land in a concurrent ring buffer and a single background task drains them
//! in admission order, on a flush interval and once more at shutdown. When the
//! ring saturates, the configured [`BackpressureMode`] decides between failing
//! fast and bounded blocking; under sustained load the ring can double its
//! capacity up to a fixed ceiling without disturbing in-flight records.

mod ring;

use crate::config::PipelineConfig;
use crate::sink::Sink;
use crate::{Result, RingLogError};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rand::Rng;
use ring::{PushOutcome, Ring};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Producer behavior when the ring is saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackpressureMode {
    /// Fail fast: the write returns [`RingLogError::BufferFull`] immediately.
    Drop,
    /// Retry with jittered exponential backoff before giving up.
    Block,
}

/// Records flushed per consumer wake.
const MAX_FLUSH_BATCH: u64 = 100;
/// Block-mode retry ceiling.
const BLOCK_MAX_RETRIES: u32 = 100;
/// Block-mode wall-clock ceiling.
const BLOCK_TIMEOUT: Duration = Duration::from_secs(5);
/// Initial Block-mode backoff.
const BLOCK_BACKOFF_START: Duration = Duration::from_micros(1);
/// Block-mode backoff cap.
const BLOCK_BACKOFF_CAP: Duration = Duration::from_millis(10);

type ErrorCallback = dyn Fn(&RingLogError) + Send + Sync;

struct ErrorHook(Box<ErrorCallback>);

impl Default for ErrorHook {
    fn default() -> Self {
        Self(Box::new(|err| {
            use std::io::Write as _;
            let _ = writeln!(std::io::stderr(), "ringlog: delivery error: {}", err);
        }))
    }
}

struct Shared {
    ring: Ring,
    sink: Mutex<Box<dyn Sink>>,
    mode: AtomicU8,
    dynamic_resize: bool,
    resize_threshold: u64,
    dropped: AtomicU64,
    closed: AtomicBool,
    resize_pending: AtomicBool,
    error_hook: ArcSwap<ErrorHook>,
}

impl Shared {
    fn mode(&self) -> BackpressureMode {
        match self.mode.load(Ordering::Relaxed) {
            0 => BackpressureMode::Drop,
            _ => BackpressureMode::Block,
        }
    }

    fn report(&self, err: &RingLogError) {
        (self.error_hook.load().0)(err);
    }

    /// Drain one batch into the sink. Delivery stops at the first failing
    /// record, which stays buffered for the next attempt. Returns the number
    /// delivered and the failure, if any.
    fn flush_batch(&self, limit: Option<u64>) -> (u64, Option<RingLogError>) {
        // idle wakes touch no locks
        if self.ring.pending() == 0 {
            return (0, None);
        }
        let mut sink = self.sink.lock();
        let mut failure: Option<RingLogError> = None;
        let delivered = self.ring.drain(limit, |record| match sink.write(record) {
            Ok(written) if written == record.len() => true,
            Ok(written) => {
                failure = Some(RingLogError::ShortWrite {
                    written,
                    expected: record.len(),
                });
                false
            }
            Err(err) => {
                failure = Some(err);
                false
            }
        });
        if delivered > 0 {
            if let Err(err) = sink.flush() {
                failure.get_or_insert(err);
            }
        }
        drop(sink);

        if let Some(err) = &failure {
            warn!(error = %err, delivered, "sink write failed; undelivered records retained");
            self.report(err);
        }
        (delivered, failure)
    }
}

/// Handle to an asynchronous delivery pipeline.
///
/// Cheap to clone; all clones share the same ring, sink, and consumer task.
#[derive(Clone)]
pub struct AsyncPipeline {
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
    consumer: Arc<Mutex<Option<JoinHandle<Result<()>>>>>,
    drained_tx: Arc<watch::Sender<bool>>,
}

impl AsyncPipeline {
    /// Build a pipeline draining into `sink` and spawn its consumer task.
    ///
    /// Must be called from within a Tokio runtime. The consumer wakes every
    /// `flush_interval_ms` and once more when [`close`](Self::close) is
    /// called.
    pub fn new(config: PipelineConfig, sink: Box<dyn Sink>) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(Shared {
            ring: Ring::new(config.capacity, ring::default_shard_count()),
            sink: Mutex::new(sink),
            mode: AtomicU8::new(config.backpressure as u8),
            dynamic_resize: config.dynamic_resize,
            resize_threshold: u64::from(config.resize_threshold),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            resize_pending: AtomicBool::new(false),
            error_hook: ArcSwap::from_pointee(ErrorHook::default()),
        });
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let (drained_tx, _) = watch::channel(false);
        let consumer = tokio::spawn(run_consumer(
            Arc::clone(&shared),
            shutdown_rx,
            Duration::from_millis(config.flush_interval_ms),
        ));
        Ok(Self {
            shared,
            shutdown_tx,
            consumer: Arc::new(Mutex::new(Some(consumer))),
            drained_tx: Arc::new(drained_tx),
        })
    }

    /// Enqueue one rendered record.
    ///
    /// Returns [`RingLogError::BufferFull`] when the ring is saturated and the
    /// record was dropped (immediately in [`BackpressureMode::Drop`], after
    /// bounded retries in [`BackpressureMode::Block`]), and
    /// [`RingLogError::Closed`] after [`close`](Self::close).
    pub async fn write(&self, record: &[u8]) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RingLogError::Closed);
        }
        match self.shared.ring.try_push(record) {
            PushOutcome::Stored { utilization } => {
                self.maybe_trigger_resize(utilization);
                Ok(())
            }
            PushOutcome::Full => match self.shared.mode() {
                BackpressureMode::Drop => {
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    Err(RingLogError::BufferFull)
                }
                BackpressureMode::Block => self.write_with_retry(record).await,
            },
        }
    }

    /// Bounded blocking admission: retry with exponential backoff plus jitter,
    /// capped by both a retry count and a wall clock. Never blocks forever.
    async fn write_with_retry(&self, record: &[u8]) -> Result<()> {
        let start = Instant::now();
        let mut backoff = BLOCK_BACKOFF_START;
        let mut retries = 0u32;
        loop {
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(RingLogError::Closed);
            }
            match self.shared.ring.try_push(record) {
                PushOutcome::Stored { utilization } => {
                    self.maybe_trigger_resize(utilization);
                    return Ok(());
                }
                PushOutcome::Full => {
                    retries += 1;
                    if retries > BLOCK_MAX_RETRIES || start.elapsed() > BLOCK_TIMEOUT {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                        return Err(RingLogError::BufferFull);
                    }
                    let jitter = Duration::from_nanos(rand::thread_rng().gen_range(0..1_000));
                    sleep(backoff + jitter).await;
                    backoff = (backoff * 2).min(BLOCK_BACKOFF_CAP);
                }
            }
        }
    }

    fn maybe_trigger_resize(&self, utilization: u64) {
        if !self.shared.dynamic_resize || utilization <= self.shared.resize_threshold {
            return;
        }
        // collapse concurrent triggers into one background attempt
        if self
            .shared
            .resize_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            if let Some(new_capacity) = shared.ring.maybe_resize(shared.resize_threshold) {
                debug!(new_capacity, "ring buffer grown");
            }
            shared.resize_pending.store(false, Ordering::Release);
        });
    }

    /// Utilization percentage (0-100) recorded by the most recent admission.
    pub fn utilization(&self) -> u64 {
        self.shared.ring.utilization()
    }

    /// Records rejected at admission since construction.
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Current ring capacity, in records.
    pub fn capacity(&self) -> u64 {
        self.shared.ring.capacity()
    }

    /// Records admitted but not yet delivered.
    pub fn pending(&self) -> u64 {
        self.shared.ring.pending()
    }

    /// Switch the saturation policy for subsequent writes. Takes effect
    /// without restarting the pipeline.
    pub fn set_backpressure_mode(&self, mode: BackpressureMode) {
        self.shared.mode.store(mode as u8, Ordering::Relaxed);
    }

    /// Replace the out-of-band handler invoked for delivery errors (sink
    /// failures and short writes observed by the consumer).
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&RingLogError) + Send + Sync + 'static,
    {
        self.shared
            .error_hook
            .store(Arc::new(ErrorHook(Box::new(handler))));
    }

    /// Stop accepting writes, drain everything already admitted, and stop the
    /// consumer. Idempotent: later calls (and calls on clones) wait for that
    /// first drain to finish, then return `Ok`; only the call that stopped
    /// the consumer surfaces the drain's error.
    pub async fn close(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::Release);
        let handle = self.consumer.lock().take();
        let Some(handle) = handle else {
            // another close owns the consumer; wait until its drain is done
            let mut drained = self.drained_tx.subscribe();
            let _ = drained.wait_for(|done| *done).await;
            return Ok(());
        };
        let _ = self.shutdown_tx.send(());
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => Err(RingLogError::Pipeline(format!(
                "consumer task failed: {}",
                err
            ))),
        };
        self.drained_tx.send_replace(true);
        result
    }
}

/// Consumer loop: periodic bounded flushes until shutdown, then a full drain.
///
/// The final drain loops until the ring is empty so a backlog larger than one
/// batch still gets delivered; it only gives up when the sink fails with no
/// progress at all.
async fn run_consumer(
    shared: Arc<Shared>,
    mut shutdown_rx: broadcast::Receiver<()>,
    flush_interval: Duration,
) -> Result<()> {
    // first wake after one full interval, like a ticker
    let start = tokio::time::Instant::now() + flush_interval;
    let mut ticker = tokio::time::interval_at(start, flush_interval);
    debug!(
        interval_ms = flush_interval.as_millis() as u64,
        "delivery consumer started"
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                shared.flush_batch(Some(MAX_FLUSH_BATCH));
            }
            _ = shutdown_rx.recv() => {
                debug!("shutdown received; draining remaining records");
                loop {
                    if shared.ring.pending() == 0 {
                        debug!("delivery consumer stopped");
                        return Ok(());
                    }
                    let (delivered, failure) = shared.flush_batch(None);
                    if let Some(err) = failure {
                        if delivered == 0 {
                            return Err(err);
                        }
                    }
                    if delivered == 0 {
                        // a producer still holds a reserved slot; let it finish
                        tokio::task::yield_now().await;
                    }
                }
            }
        }
    }
}

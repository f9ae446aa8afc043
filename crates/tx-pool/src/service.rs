//! # Submission Pool Service
//!
//! Wires the domain (record store, nonce allocator, scheduling rules) to the
//! outbound ports (submission adapter, clock) and the event bus.
//!
//! ## Locking
//!
//! One mutex guards the store, the allocator, the in-flight set and the
//! config. Events are collected under the lock and published after it is
//! released. The adapter runs on its own task with no lock held; its result
//! is applied as a single locked update.
//!
//! ## Scheduler Loop
//!
//! ```text
//! start() ──→ interval tick ──→ tick() ──→ has_work? ──yes──→ next tick
//!                 ↑                            │
//!                 └────── stop() / watch ──────┤ no
//!                                              ↓
//!                                   retire (enqueue restarts)
//! ```

use crate::domain::{
    is_admissible, is_boost_due, is_retry_due, NonceAllocator, NonceSettlement, NonceState,
    PoolConfig, PoolError, PoolStats, RecordStore, SubmissionError, TickReport,
};
use crate::ports::{SubmissionAdapter, SubmissionPoolApi, SystemTimeSource, TimeSource};
use parking_lot::Mutex;
use shared_bus::{
    EventFilter, EventListener, EventPublisher, EventStream, InMemoryEventBus, ListenerError,
    ListenerHandle, PoolEvent, PoolEventKind, Subscription, SubscriptionError,
};
use shared_types::{
    Address, ChainId, Hash, Priority, RecordId, SubmissionRecord, SubmissionRequest,
    SubmissionStatus,
};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mutable pool state. Only touched under `PoolInner::state`.
struct PoolState {
    config: PoolConfig,
    store: RecordStore,
    nonces: NonceAllocator,
    in_flight: HashSet<RecordId>,
}

impl PoolState {
    fn has_work(&self) -> bool {
        self.store.has_schedulable_work(self.config.enable_retry) || !self.in_flight.is_empty()
    }
}

struct SchedulerHandle {
    generation: u64,
    stop: watch::Sender<bool>,
}

struct PoolInner {
    state: Mutex<PoolState>,
    scheduler: Mutex<Option<SchedulerHandle>>,
    next_generation: Mutex<u64>,
    adapter: Arc<dyn SubmissionAdapter>,
    clock: Arc<dyn TimeSource>,
    bus: Arc<InMemoryEventBus>,
}

/// Handle to a submission pool.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct SubmissionPool {
    inner: Arc<PoolInner>,
}

impl SubmissionPool {
    /// Creates a pool on the system clock with its own event bus.
    pub fn new(config: PoolConfig, adapter: Arc<dyn SubmissionAdapter>) -> Result<Self, PoolError> {
        Self::with_dependencies(
            config,
            adapter,
            Arc::new(SystemTimeSource),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    /// Creates a pool with an explicit clock and event bus.
    pub fn with_dependencies(
        config: PoolConfig,
        adapter: Arc<dyn SubmissionAdapter>,
        clock: Arc<dyn TimeSource>,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState {
                    config,
                    store: RecordStore::new(),
                    nonces: NonceAllocator::new(),
                    in_flight: HashSet::new(),
                }),
                scheduler: Mutex::new(None),
                next_generation: Mutex::new(0),
                adapter,
                clock,
                bus,
            }),
        })
    }

    fn now(&self) -> u64 {
        self.inner.clock.now()
    }

    fn publish(&self, event: PoolEvent) {
        self.inner.bus.publish(event);
    }

    fn publish_all(&self, events: Vec<PoolEvent>) {
        for event in events {
            self.inner.bus.publish(event);
        }
    }

    // =========================================================================
    // ADMISSION & MUTATION
    // =========================================================================

    /// Admits a request as a QUEUED record.
    ///
    /// Allocates a nonce when nonce management is on and the request has
    /// none. Starts the scheduler if it is idle and `auto_start` is set.
    pub fn enqueue(&self, request: SubmissionRequest) -> Result<RecordId, PoolError> {
        let now = self.now();
        let (event, auto_start) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;

            let capacity = state.config.max_queue_size;
            if state.store.len() >= capacity {
                warn!(
                    chain_id = request.chain_id,
                    capacity = capacity,
                    "Submission queue full, request rejected"
                );
                return Err(PoolError::QueueFull { capacity });
            }

            let nonce = if state.config.enable_nonce_management && request.nonce.is_none() {
                Some(state.nonces.next_nonce(request.chain_id, &request.from))
            } else {
                None
            };

            let record = SubmissionRecord::from_request(
                Uuid::new_v4(),
                request,
                nonce,
                state.config.max_retries,
                now,
            );
            debug!(
                record_id = %record.id,
                chain_id = record.chain_id,
                nonce = ?record.nonce,
                priority = %record.priority,
                "Submission queued"
            );

            let event = PoolEvent::new(PoolEventKind::Added, record.clone(), now);
            state.store.insert(record);
            (event, state.config.auto_start)
        };

        let id = event.record.id;
        self.publish(event);
        if auto_start {
            self.ensure_running();
        }
        Ok(id)
    }

    /// Cancels a QUEUED or PENDING record.
    ///
    /// A cancelled PENDING record keeps its in-flight slot until the adapter
    /// answers.
    pub fn cancel(&self, id: &RecordId) -> bool {
        let now = self.now();
        let event = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.store.get_mut(id) else {
                return false;
            };
            if record.mark_cancelled().is_err() {
                return false;
            }
            debug!(record_id = %id, "Submission cancelled");
            PoolEvent::new(PoolEventKind::Cancelled, record.clone(), now)
        };
        self.publish(event);
        true
    }

    /// Deletes a QUEUED, FAILED or CANCELLED record.
    ///
    /// `Ok(false)` for unknown ids and for CONFIRMED/EXPIRED records.
    pub fn remove(&self, id: &RecordId) -> Result<bool, PoolError> {
        let now = self.now();
        let event = {
            let mut state = self.inner.state.lock();
            let Some(status) = state.store.status(id) else {
                return Ok(false);
            };
            if status.is_in_flight() {
                return Err(PoolError::InvalidState {
                    id: *id,
                    status,
                    operation: "remove",
                });
            }
            if !status.is_removable() {
                return Ok(false);
            }
            let Some(record) = state.store.remove(id) else {
                return Ok(false);
            };
            debug!(record_id = %id, status = %status, "Submission removed");
            PoolEvent::new(PoolEventKind::Removed, record, now)
        };
        self.publish(event);
        Ok(true)
    }

    /// Changes the priority of a QUEUED record.
    pub fn set_priority(&self, id: &RecordId, priority: Priority) -> bool {
        let now = self.now();
        let event = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.store.get_mut(id) else {
                return false;
            };
            if record.status != SubmissionStatus::Queued {
                return false;
            }
            record.priority = priority;
            debug!(record_id = %id, priority = %priority, "Priority updated");
            PoolEvent::new(PoolEventKind::PriorityUpdated, record.clone(), now)
        };
        self.publish(event);
        true
    }

    /// Marks a SUBMITTED record CONFIRMED. Called by the confirmation watcher.
    pub fn confirm(&self, id: &RecordId) -> Result<bool, PoolError> {
        let now = self.now();
        let event = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let Some(record) = state.store.get_mut(id) else {
                return Ok(false);
            };
            record
                .mark_confirmed(now)
                .map_err(|e| PoolError::InvalidState {
                    id: *id,
                    status: e.from,
                    operation: "confirm",
                })?;
            let event = PoolEvent::new(PoolEventKind::Confirmed, record.clone(), now);

            if state.config.enable_nonce_management
                && state.config.nonce_settlement == NonceSettlement::OnConfirmation
            {
                if let Some(nonce) = event.record.nonce {
                    state
                        .nonces
                        .settle(event.record.chain_id, &event.record.from, nonce);
                }
            }
            info!(
                record_id = %id,
                confirmation_ms = ?event.record.confirmation_time(),
                "Submission confirmed"
            );
            event
        };
        self.publish(event);
        Ok(true)
    }

    /// Marks a SUBMITTED record FAILED because the network dropped it.
    ///
    /// The retry policy applies from here as for any adapter failure.
    pub fn reject(&self, id: &RecordId, reason: &str) -> Result<bool, PoolError> {
        let now = self.now();
        let event = {
            let mut state = self.inner.state.lock();
            let Some(record) = state.store.get_mut(id) else {
                return Ok(false);
            };
            if record.status != SubmissionStatus::Submitted {
                return Err(PoolError::InvalidState {
                    id: *id,
                    status: record.status,
                    operation: "reject",
                });
            }
            record
                .mark_failed(reason, now)
                .map_err(|e| PoolError::InvalidState {
                    id: *id,
                    status: e.from,
                    operation: "reject",
                })?;
            warn!(record_id = %id, reason = reason, "Submission dropped by network");
            PoolEvent::new(PoolEventKind::Failed, record.clone(), now)
        };
        self.publish(event);
        let auto_start = self.inner.state.lock().config.auto_start;
        if auto_start {
            self.ensure_running();
        }
        Ok(true)
    }

    /// Deletes every CONFIRMED, FAILED, CANCELLED and EXPIRED record.
    pub fn clear_completed(&self) -> usize {
        let mut state = self.inner.state.lock();
        let ids = state.store.completed_ids();
        for id in &ids {
            state.store.remove(id);
        }
        debug!(removed = ids.len(), "Cleared completed submissions");
        ids.len()
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn get(&self, id: &RecordId) -> Option<SubmissionRecord> {
        self.inner.state.lock().store.get(id).cloned()
    }

    /// Records with `status`, priority descending then oldest first.
    pub fn list_by_status(&self, status: SubmissionStatus) -> Vec<SubmissionRecord> {
        self.inner.state.lock().store.list_by_status(status)
    }

    /// Records from one signer, newest first.
    pub fn list_by_address(&self, from: &Address) -> Vec<SubmissionRecord> {
        self.inner.state.lock().store.list_by_address(from)
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.state.lock().store.stats()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().store.is_empty()
    }

    /// Records dispatched and still awaiting an adapter answer.
    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    pub fn config(&self) -> PoolConfig {
        self.inner.state.lock().config.clone()
    }

    // =========================================================================
    // NONCES
    // =========================================================================

    pub fn nonce_state(&self, chain_id: ChainId, address: &Address) -> Option<NonceState> {
        self.inner.state.lock().nonces.state(chain_id, address)
    }

    pub fn nonce_gaps(&self, chain_id: ChainId, address: &Address) -> Vec<u64> {
        self.inner.state.lock().nonces.gaps(chain_id, address)
    }

    /// Aligns a signer's tracker with the next nonce observed on chain.
    pub fn sync_nonce(&self, chain_id: ChainId, address: &Address, on_chain_next: u64) {
        let mut state = self.inner.state.lock();
        state.nonces.sync(chain_id, address, on_chain_next);
        debug!(chain_id = chain_id, next_nonce = on_chain_next, "Nonce tracker synced");
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Replaces the whole configuration.
    ///
    /// Takes effect at the next tick. A changed tick interval restarts a
    /// running scheduler.
    pub fn update_config(&self, config: PoolConfig) -> Result<(), PoolError> {
        config.validate()?;
        let interval_changed = {
            let mut state = self.inner.state.lock();
            let changed = state.config.tick_interval_ms != config.tick_interval_ms;
            state.config = config;
            changed
        };
        info!("Pool configuration updated");

        if interval_changed && self.stop() {
            self.start();
        }
        Ok(())
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Registers a callback for every pool event.
    ///
    /// Dropping the handle (or calling `unsubscribe`) detaches it.
    pub fn subscribe<F>(&self, listener: F) -> Result<ListenerHandle, SubscriptionError>
    where
        F: Fn(&PoolEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.inner.bus.register_listener(EventFilter::all(), listener)
    }

    /// Registers a listener for events matching `filter`.
    pub fn subscribe_filtered(
        &self,
        filter: EventFilter,
        listener: Arc<dyn EventListener>,
    ) -> Result<ListenerHandle, SubscriptionError> {
        self.inner.bus.register(filter, listener)
    }

    /// Pull subscription over matching events.
    pub fn subscription(&self, filter: EventFilter) -> Subscription {
        self.inner.bus.subscribe(filter)
    }

    /// `Stream` of matching events.
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.inner.bus.event_stream(filter)
    }

    pub fn event_bus(&self) -> &Arc<InMemoryEventBus> {
        &self.inner.bus
    }

    // =========================================================================
    // SCHEDULER
    // =========================================================================

    /// Starts the scheduler loop. Returns `false` if it was already running
    /// or no Tokio runtime is available.
    pub fn start(&self) -> bool {
        let mut scheduler = self.inner.scheduler.lock();
        if scheduler.is_some() {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No Tokio runtime available, scheduler not started");
            return false;
        };

        let generation = {
            let mut next = self.inner.next_generation.lock();
            *next += 1;
            *next
        };
        let period = Duration::from_millis(self.inner.state.lock().config.tick_interval_ms);
        let (stop_tx, stop_rx) = watch::channel(false);

        runtime.spawn(run_scheduler(
            Arc::downgrade(&self.inner),
            generation,
            period,
            stop_rx,
        ));
        *scheduler = Some(SchedulerHandle {
            generation,
            stop: stop_tx,
        });

        info!(
            generation = generation,
            tick_ms = period.as_millis() as u64,
            "Scheduler started"
        );
        true
    }

    /// Stops the scheduler loop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let Some(handle) = self.inner.scheduler.lock().take() else {
            return false;
        };
        let _ = handle.stop.send(true);
        info!(generation = handle.generation, "Scheduler stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.inner.scheduler.lock().is_some()
    }

    fn ensure_running(&self) {
        if !self.is_running() {
            self.start();
        }
    }

    /// Clears the slot of a loop that found nothing left to do.
    ///
    /// Runs under the scheduler lock so a concurrent `enqueue` either sees
    /// the slot cleared and starts a new loop, or lands before the work
    /// check and keeps this one alive.
    fn retire_scheduler(&self, generation: u64) -> bool {
        let mut scheduler = self.inner.scheduler.lock();
        match scheduler.as_ref() {
            Some(handle) if handle.generation == generation => {}
            // Superseded by stop()/start().
            _ => return true,
        }
        if self.inner.state.lock().has_work() {
            return false;
        }
        *scheduler = None;
        info!(generation = generation, "Scheduler idle, stopping");
        true
    }

    /// Stops the scheduler, drops every record, nonce tracker and listener.
    pub fn shutdown(&self) {
        self.stop();
        {
            let mut state = self.inner.state.lock();
            state.store.clear();
            state.nonces.clear();
            state.in_flight.clear();
        }
        self.inner.bus.clear_listeners();
        info!("Submission pool shut down");
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Runs one scheduler pass: expire, promote, dispatch, retry.
    ///
    /// Adapter calls for dispatched records are spawned on the current
    /// runtime and complete after this returns.
    pub async fn tick(&self) -> TickReport {
        let now = self.now();
        let mut report = TickReport::default();
        let mut events = Vec::new();
        let mut dispatches = Vec::new();

        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let config = state.config.clone();

            // 1. Expire
            let timed_out: Vec<RecordId> = state
                .store
                .records()
                .filter(|record| record.is_timed_out(now, config.transaction_timeout_ms))
                .map(|record| record.id)
                .collect();
            for id in timed_out {
                let Some(record) = state.store.get_mut(&id) else {
                    continue;
                };
                if record.mark_expired().is_ok() {
                    state.in_flight.remove(&id);
                    warn!(
                        record_id = %id,
                        age_ms = record.age(now),
                        "Submission expired"
                    );
                    events.push(PoolEvent::new(PoolEventKind::Expired, record.clone(), now));
                    report.expired.push(id);
                }
            }

            // 2. Promote
            if config.enable_priority_boost {
                for id in state.store.ids_by_status(SubmissionStatus::Queued) {
                    let Some(record) = state.store.get_mut(&id) else {
                        continue;
                    };
                    if is_boost_due(record, now, &config) {
                        record.priority = record.priority.boosted();
                        debug!(record_id = %id, priority = %record.priority, "Priority boosted");
                        events.push(PoolEvent::new(
                            PoolEventKind::PriorityBoosted,
                            record.clone(),
                            now,
                        ));
                        report.boosted.push(id);
                    }
                }
            }

            // 3. Dispatch
            let available = config
                .max_concurrent_transactions
                .saturating_sub(state.in_flight.len());
            if available > 0 {
                // Only the top `available` candidates are considered; an
                // inadmissible one forfeits its slot for this tick.
                let candidates: Vec<RecordId> = state
                    .store
                    .ids_by_status(SubmissionStatus::Queued)
                    .into_iter()
                    .take(available)
                    .collect();
                for id in candidates {
                    let admissible = match state.store.get(&id) {
                        Some(record) => {
                            is_admissible(record, &state.store, &mut state.nonces, &config)
                        }
                        None => false,
                    };
                    if !admissible {
                        continue;
                    }
                    let Some(record) = state.store.get_mut(&id) else {
                        continue;
                    };
                    if record.mark_pending(now).is_err() {
                        continue;
                    }
                    state.in_flight.insert(id);
                    debug!(
                        record_id = %id,
                        nonce = ?record.nonce,
                        attempt = record.retry_count,
                        "Dispatching submission"
                    );
                    events.push(PoolEvent::new(
                        PoolEventKind::Processing,
                        record.clone(),
                        now,
                    ));
                    dispatches.push(record.clone());
                    report.dispatched.push(id);
                }
            }

            // 4. Retry
            if config.enable_retry {
                for id in state.store.ids_by_status(SubmissionStatus::Failed) {
                    let Some(record) = state.store.get_mut(&id) else {
                        continue;
                    };
                    if is_retry_due(record, now, &config) && record.requeue_for_retry(now).is_ok() {
                        debug!(record_id = %id, attempt = record.retry_count, "Retrying submission");
                        events.push(PoolEvent::new(PoolEventKind::Retried, record.clone(), now));
                        report.retried.push(id);
                    }
                }
            }

            report.has_work = state.has_work();
        }

        self.publish_all(events);
        for record in dispatches {
            self.spawn_submission(record);
        }
        report
    }

    fn spawn_submission(&self, record: SubmissionRecord) {
        let pool = self.clone();
        tokio::spawn(async move {
            let adapter = Arc::clone(&pool.inner.adapter);
            let attempt = record.clone();
            // Inner task so a panicking adapter still releases the slot.
            let outcome = match tokio::spawn(async move { adapter.submit(&attempt).await }).await {
                Ok(result) => result,
                Err(e) => Err(SubmissionError::Other(format!("adapter task failed: {}", e))),
            };
            pool.complete_submission(&record.id, outcome);
        });
    }

    /// Applies an adapter answer in one locked update.
    fn complete_submission(&self, id: &RecordId, outcome: Result<Hash, SubmissionError>) {
        let now = self.now();
        let event = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.in_flight.remove(id);

            let Some(record) = state.store.get_mut(id) else {
                debug!(record_id = %id, "Adapter answered for a record no longer in the pool");
                return;
            };
            let was_pending = record.status == SubmissionStatus::Pending;

            match outcome {
                Ok(hash) => {
                    let (chain_id, from, nonce) = (record.chain_id, record.from, record.nonce);
                    let event = if was_pending && record.mark_submitted(hash).is_ok() {
                        debug!(record_id = %id, "Submission accepted");
                        Some(PoolEvent::new(PoolEventKind::Submitted, record.clone(), now))
                    } else {
                        debug!(
                            record_id = %id,
                            status = %record.status,
                            "Late adapter success, only releasing slot"
                        );
                        None
                    };

                    // The network consumed the nonce even if the record was
                    // cancelled or expired meanwhile; no confirm will follow.
                    let settle = state.config.enable_nonce_management
                        && (state.config.nonce_settlement == NonceSettlement::OnSubmission
                            || event.is_none());
                    if let Some(nonce) = nonce.filter(|_| settle) {
                        state.nonces.settle(chain_id, &from, nonce);
                    }
                    event
                }
                Err(error) => {
                    if was_pending && record.mark_failed(error.to_string(), now).is_ok() {
                        warn!(
                            record_id = %id,
                            attempt = record.retry_count,
                            retries_left = record.max_retries.saturating_sub(record.retry_count),
                            error = %error,
                            "Submission failed"
                        );
                        Some(PoolEvent::new(PoolEventKind::Failed, record.clone(), now))
                    } else {
                        debug!(record_id = %id, status = %record.status, "Late adapter failure ignored");
                        None
                    }
                }
            }
        };

        if let Some(event) = event {
            self.publish(event);
        }
    }
}

/// Periodic scheduler task. Exits on stop, when idle, or when the pool is
/// dropped.
async fn run_scheduler(
    pool: Weak<PoolInner>,
    generation: u64,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(inner) = pool.upgrade() else {
                    break;
                };
                let pool = SubmissionPool { inner };
                let report = pool.tick().await;
                if !report.is_idle() {
                    debug!(
                        expired = report.expired.len(),
                        boosted = report.boosted.len(),
                        dispatched = report.dispatched.len(),
                        retried = report.retried.len(),
                        "Scheduler tick"
                    );
                }
                if !report.has_work && pool.retire_scheduler(generation) {
                    break;
                }
            }
            _ = stop.changed() => {
                break;
            }
        }
    }
}

impl SubmissionPoolApi for SubmissionPool {
    fn enqueue(&self, request: SubmissionRequest) -> Result<RecordId, PoolError> {
        SubmissionPool::enqueue(self, request)
    }

    fn cancel(&self, id: &RecordId) -> bool {
        SubmissionPool::cancel(self, id)
    }

    fn remove(&self, id: &RecordId) -> Result<bool, PoolError> {
        SubmissionPool::remove(self, id)
    }

    fn set_priority(&self, id: &RecordId, priority: Priority) -> bool {
        SubmissionPool::set_priority(self, id, priority)
    }

    fn confirm(&self, id: &RecordId) -> Result<bool, PoolError> {
        SubmissionPool::confirm(self, id)
    }

    fn reject(&self, id: &RecordId, reason: &str) -> Result<bool, PoolError> {
        SubmissionPool::reject(self, id, reason)
    }

    fn get(&self, id: &RecordId) -> Option<SubmissionRecord> {
        SubmissionPool::get(self, id)
    }

    fn list_by_status(&self, status: SubmissionStatus) -> Vec<SubmissionRecord> {
        SubmissionPool::list_by_status(self, status)
    }

    fn list_by_address(&self, from: &Address) -> Vec<SubmissionRecord> {
        SubmissionPool::list_by_address(self, from)
    }

    fn stats(&self) -> PoolStats {
        SubmissionPool::stats(self)
    }

    fn clear_completed(&self) -> usize {
        SubmissionPool::clear_completed(self)
    }
}

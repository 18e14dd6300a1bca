//! Aggregation reactor.
//!
//! Turns live queries into observable values. Each [`SharedQuery`] runs at most
//! one driver task no matter how many [`Observer`]s are attached, keeps the
//! latest emission for late observers, and outlives its last observer by a
//! grace window before the driver is torn down.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
    task::JoinHandle,
};

use crate::{
    ChangeFeed, LedgerChange, LedgerError, LedgerStore, LiveQuery, MoneyCents, Record,
    RecordKind, RecordsQuery, TotalQuery,
};

/// What an observer sees: the latest value, or the error that ended the stream.
pub type Emission<T> = Result<T, Arc<LedgerError>>;

#[derive(Clone, Debug)]
pub struct ReactorConfig {
    /// How long a query keeps running after its last observer detached.
    pub grace_window: Duration,
    /// Capacity of the store's change feed.
    pub change_buffer: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(5),
            change_buffer: 64,
        }
    }
}

/// The three observable streams of the ledger.
#[derive(Clone)]
pub struct AggregationReactor {
    records: SharedQuery<RecordsQuery>,
    income_total: SharedQuery<TotalQuery>,
    expense_total: SharedQuery<TotalQuery>,
}

impl AggregationReactor {
    pub fn new(store: &LedgerStore, config: &ReactorConfig) -> Self {
        let changes = store.changes();
        Self {
            records: SharedQuery::new(
                RecordsQuery::new(store.clone()),
                changes.clone(),
                Vec::new(),
                config.grace_window,
            ),
            income_total: SharedQuery::new(
                TotalQuery::new(store.clone(), RecordKind::Income),
                changes.clone(),
                MoneyCents::ZERO,
                config.grace_window,
            ),
            expense_total: SharedQuery::new(
                TotalQuery::new(store.clone(), RecordKind::Expense),
                changes.clone(),
                MoneyCents::ZERO,
                config.grace_window,
            ),
        }
    }

    /// Every record, newest first. Seeded with an empty list.
    pub fn records(&self) -> Observer<Vec<Record>> {
        self.records.observe()
    }

    /// Sum of income amounts. Seeded with zero.
    pub fn income_total(&self) -> Observer<MoneyCents> {
        self.income_total.observe()
    }

    /// Sum of expense amounts. Seeded with zero.
    pub fn expense_total(&self) -> Observer<MoneyCents> {
        self.expense_total.observe()
    }

    pub fn records_query(&self) -> &SharedQuery<RecordsQuery> {
        &self.records
    }

    pub fn total_query(&self, kind: RecordKind) -> &SharedQuery<TotalQuery> {
        match kind {
            RecordKind::Income => &self.income_total,
            RecordKind::Expense => &self.expense_total,
        }
    }
}

/// A multicast, replay-latest subscription to one [`LiveQuery`].
pub struct SharedQuery<Q: LiveQuery> {
    inner: Arc<Shared<Q>>,
}

impl<Q: LiveQuery> Clone for SharedQuery<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q: LiveQuery> SharedQuery<Q> {
    pub fn new(query: Q, changes: ChangeFeed, seed: Q::Output, grace_window: Duration) -> Self {
        Self {
            inner: Arc::new(Shared {
                query: Arc::new(query),
                changes,
                seed,
                grace_window,
                state: Mutex::new(ShareState {
                    observers: 0,
                    generation: 0,
                    running: None,
                    teardown: None,
                }),
            }),
        }
    }

    /// Attaches a new observer.
    ///
    /// The observer immediately holds the latest emission, or the seed if the
    /// query is (re)starting. Starting the query spawns its driver, so this
    /// must be called from within a Tokio runtime.
    pub fn observe(&self) -> Observer<Q::Output> {
        let values = {
            let mut state = self.inner.lock_state();
            state.observers += 1;
            state.generation += 1;
            if let Some(timer) = state.teardown.take() {
                timer.abort();
            }
            let running = state.running.get_or_insert_with(|| self.inner.start());
            running.values.subscribe()
        };

        let shared: Arc<dyn Detach> = self.inner.clone();
        Observer {
            values,
            _attachment: Attachment(Some(shared)),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock_state().observers
    }

    /// Whether the driver is alive (observers attached or inside the grace
    /// window).
    pub fn is_running(&self) -> bool {
        self.inner.lock_state().running.is_some()
    }
}

struct Shared<Q: LiveQuery> {
    query: Arc<Q>,
    changes: ChangeFeed,
    seed: Q::Output,
    grace_window: Duration,
    state: Mutex<ShareState<Q::Output>>,
}

struct ShareState<T> {
    observers: usize,
    /// Bumped on every attach; a teardown timer armed under an older
    /// generation must not stop the query.
    generation: u64,
    running: Option<Running<T>>,
    teardown: Option<JoinHandle<()>>,
}

struct Running<T> {
    values: watch::Sender<Emission<T>>,
    driver: JoinHandle<()>,
}

impl<T> Drop for Running<T> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl<Q: LiveQuery> Shared<Q> {
    fn lock_state(&self) -> MutexGuard<'_, ShareState<Q::Output>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self) -> Running<Q::Output> {
        let (values, _) = watch::channel(Ok(self.seed.clone()));
        // Subscribe before the first evaluation so no change slips between the
        // two.
        let changes = self.changes.subscribe();
        let driver = tokio::spawn(drive(Arc::clone(&self.query), changes, values.clone()));
        tracing::debug!(query = self.query.label(), "live query started");
        Running { values, driver }
    }

    fn teardown(&self, generation: u64) {
        let stopped = {
            let mut state = self.lock_state();
            if state.observers > 0 || state.generation != generation {
                return;
            }
            state.teardown = None;
            state.running.take()
        };
        if stopped.is_some() {
            tracing::debug!(query = self.query.label(), "live query torn down");
        }
    }
}

trait Detach: Send + Sync {
    fn detach(self: Arc<Self>);
}

impl<Q: LiveQuery> Detach for Shared<Q> {
    fn detach(self: Arc<Self>) {
        let stopped = {
            let mut state = self.lock_state();
            state.observers = state.observers.saturating_sub(1);
            if state.observers > 0 || state.running.is_none() {
                return;
            }

            match Handle::try_current() {
                Ok(handle) if !self.grace_window.is_zero() => {
                    let generation = state.generation;
                    let grace_window = self.grace_window;
                    let shared: Weak<Self> = Arc::downgrade(&self);
                    state.teardown = Some(handle.spawn(async move {
                        tokio::time::sleep(grace_window).await;
                        if let Some(shared) = shared.upgrade() {
                            shared.teardown(generation);
                        }
                    }));
                    None
                }
                // No runtime to host a timer, or no grace at all: stop now.
                _ => state.running.take(),
            }
        };
        if stopped.is_some() {
            tracing::debug!(query = self.query.label(), "live query torn down");
        }
    }
}

/// Re-evaluates `query` once up front and then after every change that
/// affects it. A failed evaluation is published and ends the driver.
async fn drive<Q: LiveQuery>(
    query: Arc<Q>,
    mut changes: broadcast::Receiver<LedgerChange>,
    values: watch::Sender<Emission<Q::Output>>,
) {
    loop {
        match query.evaluate().await {
            Ok(value) => {
                values.send_replace(Ok(value));
            }
            Err(err) => {
                tracing::warn!(query = query.label(), error = %err, "live query failed");
                values.send_replace(Err(Arc::new(err)));
                return;
            }
        }

        loop {
            match changes.recv().await {
                Ok(change) if query.is_affected_by(&change) => break,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(query = query.label(), skipped, "change feed lagged");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

struct Attachment(Option<Arc<dyn Detach>>);

impl Drop for Attachment {
    fn drop(&mut self) {
        if let Some(shared) = self.0.take() {
            shared.detach();
        }
    }
}

/// One attached consumer of a [`SharedQuery`]. Dropping it detaches.
pub struct Observer<T> {
    values: watch::Receiver<Emission<T>>,
    _attachment: Attachment,
}

impl<T: Clone> Observer<T> {
    /// The most recent emission, without waiting.
    pub fn latest(&self) -> Emission<T> {
        self.values.borrow().clone()
    }

    /// Whether the stream ended with an error.
    pub fn is_terminated(&self) -> bool {
        self.values.borrow().is_err()
    }

    /// Waits for the next emission this observer has not seen yet. On a
    /// terminated stream, returns the terminal error right away.
    pub async fn changed(&mut self) -> Emission<T> {
        if let Err(err) = &*self.values.borrow() {
            return Err(Arc::clone(err));
        }
        if self.values.changed().await.is_err() {
            return Err(Arc::new(LedgerError::StreamClosed));
        }
        self.values.borrow_and_update().clone()
    }

    /// Waits until the current value satisfies `predicate`, or the stream
    /// fails. Returns immediately if the latest value already matches.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Emission<T> {
        let result = self
            .values
            .wait_for(|emission| match emission {
                Ok(value) => predicate(value),
                Err(_) => true,
            })
            .await;
        match result {
            Ok(emission) => emission.clone(),
            Err(_) => Err(Arc::new(LedgerError::StreamClosed)),
        }
    }
}

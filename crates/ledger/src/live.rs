//! Live queries: a query plus the set of changes that make its last result
//! stale.

use std::future::Future;

use crate::{LedgerChange, LedgerStore, MoneyCents, Record, RecordKind, ResultLedger};

/// A query the reactor keeps re-evaluating while someone is observing it.
pub trait LiveQuery: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Evaluates the query against the current state of the store.
    fn evaluate(&self) -> impl Future<Output = ResultLedger<Self::Output>> + Send;

    /// Whether `change` can alter the result of [`evaluate`](Self::evaluate).
    fn is_affected_by(&self, change: &LedgerChange) -> bool;

    /// Short name used in logs.
    fn label(&self) -> &'static str;
}

/// Every record, newest first.
#[derive(Clone, Debug)]
pub struct RecordsQuery {
    store: LedgerStore,
}

impl RecordsQuery {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

impl LiveQuery for RecordsQuery {
    type Output = Vec<Record>;

    fn evaluate(&self) -> impl Future<Output = ResultLedger<Vec<Record>>> + Send {
        self.store.list_all()
    }

    fn is_affected_by(&self, _change: &LedgerChange) -> bool {
        true
    }

    fn label(&self) -> &'static str {
        "records"
    }
}

/// Sum of the amounts of one kind of record.
#[derive(Clone, Debug)]
pub struct TotalQuery {
    store: LedgerStore,
    kind: RecordKind,
}

impl TotalQuery {
    pub fn new(store: LedgerStore, kind: RecordKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }
}

impl LiveQuery for TotalQuery {
    type Output = MoneyCents;

    fn evaluate(&self) -> impl Future<Output = ResultLedger<MoneyCents>> + Send {
        self.store.sum_where(self.kind)
    }

    fn is_affected_by(&self, change: &LedgerChange) -> bool {
        change.kind() == self.kind
    }

    fn label(&self) -> &'static str {
        match self.kind {
            RecordKind::Income => "income_total",
            RecordKind::Expense => "expense_total",
        }
    }
}

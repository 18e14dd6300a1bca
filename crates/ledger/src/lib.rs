//! Personal finance ledger: a single `transactions` table, three live views
//! over it (records, income total, expense total) and one write path.
//!
//! ```text
//! LedgerFacade ─▶ LedgerStore ─LedgerChange─▶ AggregationReactor
//!                                              ├─ records
//!                                              ├─ income_total
//!                                              └─ expense_total
//! ```

use sea_orm::DatabaseConnection;

pub use error::LedgerError;
pub use facade::{AddRecord, Added, LedgerFacade, ValidationWarning};
pub use live::{LiveQuery, RecordsQuery, TotalQuery};
pub use money::MoneyCents;
pub use reactor::{AggregationReactor, Emission, Observer, ReactorConfig, SharedQuery};
pub use records::{NewRecord, Record, RecordId, RecordKind};
pub use store::{ChangeFeed, LedgerChange, LedgerStore};
pub use summary::{Breakdown, Slice, Summary};

mod error;
mod facade;
mod live;
mod money;
mod reactor;
pub mod records;
mod store;
mod summary;

pub type ResultLedger<T> = Result<T, LedgerError>;

/// Store, write path and live views wired to one database handle.
#[derive(Clone)]
pub struct Ledger {
    store: LedgerStore,
    facade: LedgerFacade,
    reactor: AggregationReactor,
}

impl Ledger {
    /// Return a builder for `Ledger`.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    /// Reads and the change feed. Writes go through [`Ledger::facade`].
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn facade(&self) -> &LedgerFacade {
        &self.facade
    }

    pub fn reactor(&self) -> &AggregationReactor {
        &self.reactor
    }
}

/// The builder for `Ledger`
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
    config: ReactorConfig,
}

impl LedgerBuilder {
    /// Pass the required database. It must already be migrated.
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    pub fn config(mut self, config: ReactorConfig) -> LedgerBuilder {
        self.config = config;
        self
    }

    /// Construct `Ledger`
    pub fn build(self) -> Ledger {
        let store = LedgerStore::new(self.database, ChangeFeed::new(self.config.change_buffer));
        let facade = LedgerFacade::new(store.clone());
        let reactor = AggregationReactor::new(&store, &self.config);
        Ledger {
            store,
            facade,
            reactor,
        }
    }
}

//! SQLite-backed ledger store.
//!
//! Every successful write publishes one [`LedgerChange`] on the store's
//! [`ChangeFeed`]. Live queries re-evaluate from those events; the store itself
//! keeps no cache.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use tokio::sync::broadcast;

use crate::{
    LedgerError, MoneyCents, NewRecord, Record, RecordId, RecordKind, ResultLedger, records,
};

/// A committed mutation of the `transactions` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerChange {
    Inserted { id: RecordId, kind: RecordKind },
    Removed { id: RecordId, kind: RecordKind },
}

impl LedgerChange {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Inserted { kind, .. } | Self::Removed { kind, .. } => *kind,
        }
    }
}

/// Publisher side of the store's change notifications.
///
/// Subscribers that fall behind by more than the buffer see a lag instead of
/// the missed events; since every event only means "re-evaluate", a lagged
/// subscriber simply re-evaluates once.
#[derive(Clone, Debug)]
pub struct ChangeFeed {
    sender: broadcast::Sender<LedgerChange>,
}

impl ChangeFeed {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.sender.subscribe()
    }

    /// Publishes `change` to every current subscriber. Having none is fine.
    pub fn publish(&self, change: LedgerChange) {
        let _ = self.sender.send(change);
    }
}

/// Handle to the ledger table. Cheap to clone; clones share the connection and
/// the change feed.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    database: DatabaseConnection,
    changes: ChangeFeed,
}

impl LedgerStore {
    pub fn new(database: DatabaseConnection, changes: ChangeFeed) -> Self {
        Self { database, changes }
    }

    pub fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// Inserts `record` and returns the id the store assigned to it.
    ///
    /// No validation happens here; writes go through the facade.
    pub(crate) async fn insert(&self, record: &NewRecord) -> ResultLedger<RecordId> {
        let model = records::ActiveModel::from(record)
            .insert(&self.database)
            .await
            .map_err(LedgerError::StoreWrite)?;

        tracing::debug!(id = model.id, kind = record.kind.as_str(), "record inserted");
        self.changes.publish(LedgerChange::Inserted {
            id: model.id,
            kind: record.kind,
        });
        Ok(model.id)
    }

    /// Removes the record with `id`.
    ///
    /// Returns `false` (and publishes nothing) when no such record exists.
    pub(crate) async fn remove(&self, id: RecordId) -> ResultLedger<bool> {
        let db_tx = self
            .database
            .begin()
            .await
            .map_err(LedgerError::StoreWrite)?;

        let Some(model) = records::Entity::find_by_id(id)
            .one(&db_tx)
            .await
            .map_err(LedgerError::StoreWrite)?
        else {
            db_tx.commit().await.map_err(LedgerError::StoreWrite)?;
            tracing::debug!(id, "remove skipped, record not found");
            return Ok(false);
        };
        let kind = RecordKind::try_from(model.kind.as_str())?;

        records::Entity::delete_by_id(id)
            .exec(&db_tx)
            .await
            .map_err(LedgerError::StoreWrite)?;
        db_tx.commit().await.map_err(LedgerError::StoreWrite)?;

        tracing::debug!(id, kind = kind.as_str(), "record removed");
        self.changes.publish(LedgerChange::Removed { id, kind });
        Ok(true)
    }

    /// All records, newest first. Equal timestamps fall back to id, highest
    /// first.
    pub async fn list_all(&self) -> ResultLedger<Vec<Record>> {
        records::Entity::find()
            .order_by_desc(records::Column::CreatedAt)
            .order_by_desc(records::Column::Id)
            .all(&self.database)
            .await
            .map_err(LedgerError::StoreRead)?
            .into_iter()
            .map(Record::try_from)
            .collect()
    }

    /// Sum of the amounts of every record of `kind`; zero when there are none.
    ///
    /// Folded with saturating addition: SQLite's `SUM` aborts the query on
    /// integer overflow.
    pub async fn sum_where(&self, kind: RecordKind) -> ResultLedger<MoneyCents> {
        let amounts: Vec<i64> = records::Entity::find()
            .select_only()
            .column(records::Column::AmountMinor)
            .filter(records::Column::Kind.eq(kind.as_str()))
            .into_tuple::<i64>()
            .all(&self.database)
            .await
            .map_err(LedgerError::StoreRead)?;

        Ok(amounts.into_iter().map(MoneyCents::new).sum())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use migration::MigratorTrait;
    use sea_orm::Database;

    use super::*;

    async fn store() -> LedgerStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        LedgerStore::new(db, ChangeFeed::new(8))
    }

    fn income(description: &str, cents: i64) -> NewRecord {
        NewRecord {
            description: description.to_string(),
            amount: MoneyCents::new(cents),
            kind: RecordKind::Income,
            category: String::new(),
            created_at: Utc::now(),
            note: None,
        }
    }

    #[tokio::test]
    async fn sum_saturates_instead_of_failing() {
        let store = store().await;
        store.insert(&income("a", i64::MAX - 10)).await.unwrap();
        store.insert(&income("b", 100)).await.unwrap();

        assert_eq!(
            store.sum_where(RecordKind::Income).await.unwrap(),
            MoneyCents::new(i64::MAX)
        );
        assert_eq!(
            store.sum_where(RecordKind::Expense).await.unwrap(),
            MoneyCents::ZERO
        );
    }

    #[tokio::test]
    async fn removing_a_missing_id_publishes_nothing() {
        let store = store().await;
        let mut feed = store.changes().subscribe();

        assert!(!store.remove(42).await.unwrap());
        assert!(feed.try_recv().is_err());

        let id = store.insert(&income("a", 1)).await.unwrap();
        assert!(store.remove(id).await.unwrap());
        assert_eq!(
            feed.try_recv().unwrap(),
            LedgerChange::Inserted {
                id,
                kind: RecordKind::Income
            }
        );
        assert_eq!(
            feed.try_recv().unwrap(),
            LedgerChange::Removed {
                id,
                kind: RecordKind::Income
            }
        );
    }
}

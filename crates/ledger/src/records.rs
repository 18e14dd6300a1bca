//! Ledger record primitives.
//!
//! A `Record` is one income or expense entry. Records are created and removed,
//! never edited in place.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, MoneyCents, ResultLedger};

/// Store-assigned record id. Monotonic and never reused.
pub type RecordId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Income,
    Expense,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for RecordKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(LedgerError::InvalidKind(format!(
                "invalid record kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub description: String,
    /// Non-negative magnitude, the direction is given by `kind`.
    pub amount: MoneyCents,
    pub kind: RecordKind,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl Record {
    /// Contribution of this record to a net balance.
    pub fn signed_amount(&self) -> MoneyCents {
        match self.kind {
            RecordKind::Income => self.amount,
            RecordKind::Expense => -self.amount,
        }
    }
}

/// A record that has not been stored yet and therefore has no id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRecord {
    pub description: String,
    pub amount: MoneyCents,
    pub kind: RecordKind,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub description: String,
    pub amount_minor: i64,
    pub kind: String,
    pub category: String,
    pub created_at: DateTimeUtc,
    pub note: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&NewRecord> for ActiveModel {
    fn from(record: &NewRecord) -> Self {
        Self {
            id: ActiveValue::NotSet,
            description: ActiveValue::Set(record.description.clone()),
            amount_minor: ActiveValue::Set(record.amount.cents()),
            kind: ActiveValue::Set(record.kind.as_str().to_string()),
            category: ActiveValue::Set(record.category.clone()),
            created_at: ActiveValue::Set(record.created_at),
            note: ActiveValue::Set(record.note.clone()),
        }
    }
}

impl TryFrom<Model> for Record {
    type Error = LedgerError;

    fn try_from(model: Model) -> ResultLedger<Self> {
        Ok(Self {
            id: model.id,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            kind: RecordKind::try_from(model.kind.as_str())?,
            category: model.category,
            created_at: model.created_at,
            note: model.note,
        })
    }
}

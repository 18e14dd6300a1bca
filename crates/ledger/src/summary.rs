//! Derived views over the ledger. Nothing here is stored.

use serde::Serialize;

use crate::{MoneyCents, Record, RecordKind};

/// Income and expense totals taken from one consistent snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub income: MoneyCents,
    pub expense: MoneyCents,
}

impl Summary {
    pub fn new(income: MoneyCents, expense: MoneyCents) -> Self {
        Self { income, expense }
    }

    /// Builds the summary from a single record-list emission, so the totals
    /// and the list can never disagree.
    pub fn from_records(records: &[Record]) -> Self {
        records.iter().fold(Self::default(), |mut acc, record| {
            match record.kind {
                RecordKind::Income => acc.income += record.amount,
                RecordKind::Expense => acc.expense += record.amount,
            }
            acc
        })
    }

    pub fn net_balance(&self) -> MoneyCents {
        self.income - self.expense
    }

    /// Income/expense split for a pie chart. `None` when there is nothing to
    /// draw.
    pub fn breakdown(&self) -> Option<Breakdown> {
        let total = self.income.checked_add(self.expense)?;
        if total.cents() <= 0 {
            return None;
        }
        let share = |part: MoneyCents| part.cents() as f64 * 100.0 / total.cents() as f64;
        Some(Breakdown {
            income: Slice {
                kind: RecordKind::Income,
                amount: self.income,
                percent: share(self.income),
            },
            expense: Slice {
                kind: RecordKind::Expense,
                amount: self.expense,
                percent: share(self.expense),
            },
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Breakdown {
    pub income: Slice,
    pub expense: Slice,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Slice {
    pub kind: RecordKind,
    pub amount: MoneyCents,
    pub percent: f64,
}

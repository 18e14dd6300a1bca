//! Errors the ledger can return.
//!
//! - [`StoreWrite`] an insert or remove could not be made durable.
//! - [`StoreRead`] a live query could not be evaluated. Surfaced as the
//!   terminal value of the affected stream only.
//! - [`InvalidRecord`] the caller handed over a record the ledger refuses.
//!
//!  [`StoreWrite`]: LedgerError::StoreWrite
//!  [`StoreRead`]: LedgerError::StoreRead
//!  [`InvalidRecord`]: LedgerError::InvalidRecord
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("store write failed: {0}")]
    StoreWrite(#[source] DbErr),
    #[error("store read failed: {0}")]
    StoreRead(#[source] DbErr),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid kind: {0}")]
    InvalidKind(String),
    #[error("live stream closed")]
    StreamClosed,
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::StoreWrite(a), Self::StoreWrite(b)) => a.to_string() == b.to_string(),
            (Self::StoreRead(a), Self::StoreRead(b)) => a.to_string() == b.to_string(),
            (Self::InvalidRecord(a), Self::InvalidRecord(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::StreamClosed, Self::StreamClosed) => true,
            _ => false,
        }
    }
}

//! Errors raised by the state store.
//!
//! Each redb failure keeps its own typed source so callers can tell a
//! missing table from a storage fault. Stored values that no longer decode
//! surface as `Codec`.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open state database: {0}")]
    Open(#[from] redb::DatabaseError),

    #[error("cannot begin state transaction: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("cannot commit state transaction: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("state table unavailable: {0}")]
    Table(#[from] redb::TableError),

    #[error("state storage failure: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("stored value does not match its schema: {0}")]
    Codec(#[from] serde_json::Error),
}

//! Nested transaction coordination.
//!
//! [`TransactionCoordinator`] runs a unit of work inside a database
//! transaction. If the [`Context`] handed to it already carries a transaction
//! the work joins it; otherwise a new one is begun, propagated to the work
//! through a derived context, and committed or rolled back exactly once when
//! the work finishes, returns an error, or panics.

pub mod adapter;
pub mod core;
pub mod error;

pub use crate::core::domain::context::{Context, TransactionState, TxHandle};
pub use crate::core::domain::isolation::IsolationLevel;
pub use crate::core::domain::transaction::{ToSql, TransactionError, TransactionWrapper};
pub use crate::core::domain::transaction_manager::{
    ErrorKind, TransactionManager, TransactionManagerError, TransactionProvider,
};
pub use crate::core::domain::transaction_operation::{
    BoxedTransactionOperation, TransactionOperationError,
};
pub use crate::core::use_case::transaction_coordinator::TransactionCoordinator;

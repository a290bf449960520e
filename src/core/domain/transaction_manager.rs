use async_trait::async_trait;
use thiserror::Error;

use crate::core::domain::context::Context;
use crate::core::domain::isolation::IsolationLevel;
use crate::core::domain::transaction::{TransactionError, TransactionWrapper};
use crate::core::domain::transaction_operation::{
    BoxedTransactionOperation, TransactionOperationError,
};

/// Source of new transactions, usually backed by a connection pool.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn begin_transaction(
        &self,
        ctx: &Context,
        isolation_level: IsolationLevel,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError>;

    async fn close(&self) -> Result<(), TransactionError>;
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Runs `operation` inside a transaction.
    ///
    /// When `ctx` already carries a transaction the operation joins it and
    /// `isolation_level` is ignored: the enclosing transaction's level applies.
    ///
    /// Nesting is decided by the presence of a handle in `ctx`, not by its
    /// state. A context that outlives its transaction still counts as nested,
    /// so work run with it joins the resolved transaction and its statements
    /// fail with [`TransactionError::AlreadyResolved`].
    async fn run(
        &self,
        ctx: &Context,
        isolation_level: IsolationLevel,
        operation: Box<dyn BoxedTransactionOperation>,
    ) -> Result<(), TransactionManagerError>;

    async fn read_committed(
        &self,
        ctx: &Context,
        operation: Box<dyn BoxedTransactionOperation>,
    ) -> Result<(), TransactionManagerError> {
        self.run(ctx, IsolationLevel::ReadCommitted, operation).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BeginFailed,
    WorkFailed,
    PanicRecovered,
    RollbackFailed,
    CommitFailed,
    Operation,
}

#[derive(Debug, Error)]
pub enum TransactionManagerError {
    #[error("can't begin transaction: {0}")]
    BeginFailed(#[source] TransactionError),

    #[error("failed executing code inside transaction: {0}")]
    WorkFailed(#[source] TransactionOperationError),

    #[error("panic recovered: {0}")]
    PanicRecovered(String),

    #[error("rollback error: {rollback}; original error: {original}")]
    RollbackFailed {
        rollback: TransactionError,
        #[source]
        original: Box<TransactionManagerError>,
    },

    #[error("commit error: {0}")]
    CommitFailed(#[source] TransactionError),

    /// Error returned by a unit of work that joined an enclosing transaction.
    #[error(transparent)]
    Operation(TransactionOperationError),
}

impl TransactionManagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionManagerError::BeginFailed(_) => ErrorKind::BeginFailed,
            TransactionManagerError::WorkFailed(_) => ErrorKind::WorkFailed,
            TransactionManagerError::PanicRecovered(_) => ErrorKind::PanicRecovered,
            TransactionManagerError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
            TransactionManagerError::CommitFailed(_) => ErrorKind::CommitFailed,
            TransactionManagerError::Operation(_) => ErrorKind::Operation,
        }
    }
}

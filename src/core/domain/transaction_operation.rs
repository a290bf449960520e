use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::core::domain::command::CommandError;
use crate::core::domain::context::Context;
use crate::core::domain::transaction::TransactionError;
use crate::core::domain::transaction_manager::TransactionManagerError;

#[derive(Debug, Error)]
pub enum TransactionOperationError {
    #[error(transparent)]
    TransactionError(#[from] TransactionError),

    #[error(transparent)]
    CommandError(#[from] CommandError),

    /// A nested `run` failed inside this unit of work.
    #[error(transparent)]
    Coordinator(Box<TransactionManagerError>),

    #[error("{0}")]
    Other(String),
}

impl From<TransactionManagerError> for TransactionOperationError {
    fn from(error: TransactionManagerError) -> Self {
        TransactionOperationError::Coordinator(Box::new(error))
    }
}

/// A unit of work executed by a [`TransactionManager`].
///
/// The context handed to `execute` carries the active transaction.
///
/// [`TransactionManager`]: crate::core::domain::transaction_manager::TransactionManager
#[async_trait]
pub trait BoxedTransactionOperation: Send + Sync {
    async fn execute(&self, ctx: Context) -> Result<(), TransactionOperationError>;
}

#[async_trait]
impl<F> BoxedTransactionOperation for F
where
    F: Fn(Context) -> BoxFuture<'static, Result<(), TransactionOperationError>> + Send + Sync,
{
    async fn execute(&self, ctx: Context) -> Result<(), TransactionOperationError> {
        (self)(ctx).await
    }
}

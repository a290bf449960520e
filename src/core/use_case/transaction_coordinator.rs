use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::core::domain::context::{Context, TransactionState, TxHandle};
use crate::core::domain::isolation::IsolationLevel;
use crate::core::domain::transaction::TransactionError;
use crate::core::domain::transaction_manager::{
    TransactionManager, TransactionManagerError, TransactionProvider,
};
use crate::core::domain::transaction_operation::{
    BoxedTransactionOperation, TransactionOperationError,
};

/// Runs units of work in a transaction, opening one only when the context
/// does not already carry one.
pub struct TransactionCoordinator {
    provider: Arc<dyn TransactionProvider>,
}

impl TransactionCoordinator {
    pub fn new(provider: Arc<dyn TransactionProvider>) -> Self {
        Self { provider }
    }

    async fn resolve(
        &self,
        ctx: &Context,
        handle: &TxHandle,
        outcome: Result<(), TransactionManagerError>,
    ) -> Result<(), TransactionManagerError> {
        let tx_id = handle.id();
        let Some(transaction) = handle.take().await else {
            let resolved = TransactionError::AlreadyResolved(tx_id);
            return Err(match outcome {
                Err(original) => TransactionManagerError::RollbackFailed {
                    rollback: resolved,
                    original: Box::new(original),
                },
                Ok(()) => TransactionManagerError::CommitFailed(resolved),
            });
        };

        match outcome {
            Err(original) => {
                tracing::warn!(tx_id, error = %original, "rolling back transaction");
                let rollback = transaction.rollback(ctx).await;
                handle.set_state(TransactionState::RolledBack).await;
                match rollback {
                    Ok(()) => Err(original),
                    Err(rollback) => {
                        tracing::error!(tx_id, error = %rollback, "rollback failed");
                        Err(TransactionManagerError::RollbackFailed {
                            rollback,
                            original: Box::new(original),
                        })
                    }
                }
            }
            Ok(()) => match transaction.commit(ctx).await {
                Ok(()) => {
                    handle.set_state(TransactionState::Committed).await;
                    tracing::debug!(tx_id, "transaction committed");
                    Ok(())
                }
                Err(commit) => {
                    // the driver discards the transaction when commit fails
                    handle.set_state(TransactionState::RolledBack).await;
                    tracing::error!(tx_id, error = %commit, "commit failed");
                    Err(TransactionManagerError::CommitFailed(commit))
                }
            },
        }
    }
}

#[async_trait]
impl TransactionManager for TransactionCoordinator {
    async fn run(
        &self,
        ctx: &Context,
        isolation_level: IsolationLevel,
        operation: Box<dyn BoxedTransactionOperation>,
    ) -> Result<(), TransactionManagerError> {
        if let Some(existing) = ctx.transaction() {
            tracing::debug!(
                tx_id = existing.id(),
                isolation = %existing.isolation_level(),
                requested = %isolation_level,
                "joining enclosing transaction"
            );
            return operation.execute(ctx.clone()).await.map_err(|e| match e {
                TransactionOperationError::Coordinator(inner) => *inner,
                other => TransactionManagerError::Operation(other),
            });
        }

        let transaction = self
            .provider
            .begin_transaction(ctx, isolation_level)
            .await
            .map_err(TransactionManagerError::BeginFailed)?;
        let handle = TxHandle::new(transaction, isolation_level);
        let ctx = ctx.with_transaction(handle.clone());
        tracing::debug!(tx_id = handle.id(), isolation = %isolation_level, "transaction started");

        let outcome = match AssertUnwindSafe(operation.execute(ctx.clone()))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransactionManagerError::WorkFailed(e)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(tx_id = handle.id(), panic = %message, "unit of work panicked");
                Err(TransactionManagerError::PanicRecovered(message))
            }
        };

        self.resolve(&ctx, &handle, outcome).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

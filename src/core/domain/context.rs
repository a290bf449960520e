//! Request-scoped values threaded explicitly through a call chain.
//!
//! A [`Context`] is an immutable value: deriving a child never changes the
//! parent, and nothing here is stored in process-wide state, so two call
//! chains only share a transaction if one hands its context to the other.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::core::domain::isolation::IsolationLevel;
use crate::core::domain::transaction::{ToSql, TransactionError, TransactionWrapper};

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

#[derive(Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    transaction: Option<TxHandle>,
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that expires at `deadline`, or at the parent's
    /// deadline if that one is earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            transaction: self.transaction.clone(),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn with_transaction(&self, transaction: TxHandle) -> Self {
        Self {
            deadline: self.deadline,
            transaction: Some(transaction),
        }
    }

    pub fn transaction(&self) -> Option<&TxHandle> {
        self.transaction.as_ref()
    }

    /// Drives `fut` to completion, failing with `DeadlineExceeded` once the
    /// context deadline passes.
    pub async fn run_until_deadline<F, T>(
        &self,
        stage: &'static str,
        fut: F,
    ) -> Result<T, TransactionError>
    where
        F: Future<Output = Result<T, TransactionError>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| TransactionError::DeadlineExceeded(stage))?,
            None => fut.await,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline)
            .field("transaction", &self.transaction)
            .finish()
    }
}

struct Slot {
    state: TransactionState,
    transaction: Option<Box<dyn TransactionWrapper>>,
}

struct TxInner {
    id: u64,
    isolation_level: IsolationLevel,
    slot: Mutex<Slot>,
}

/// Shared handle to one live transaction.
///
/// Clones refer to the same transaction. Statements are serialised through an
/// async mutex, so the underlying connection is never driven from two tasks
/// at once.
#[derive(Clone)]
pub struct TxHandle {
    inner: Arc<TxInner>,
}

impl TxHandle {
    pub fn new(transaction: Box<dyn TransactionWrapper>, isolation_level: IsolationLevel) -> Self {
        Self {
            inner: Arc::new(TxInner {
                id: NEXT_TX_ID.fetch_add(1, Ordering::Relaxed),
                isolation_level,
                slot: Mutex::new(Slot {
                    state: TransactionState::Active,
                    transaction: Some(transaction),
                }),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.inner.isolation_level
    }

    pub async fn state(&self) -> TransactionState {
        self.inner.slot.lock().await.state
    }

    pub async fn execute(
        &self,
        ctx: &Context,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<(), TransactionError> {
        let mut slot = self.inner.slot.lock().await;
        match slot.transaction.as_mut() {
            Some(transaction) => transaction.execute(ctx, query, params).await,
            None => Err(TransactionError::AlreadyResolved(self.inner.id)),
        }
    }

    /// Removes the transaction for resolution. Returns `None` once taken.
    pub(crate) async fn take(&self) -> Option<Box<dyn TransactionWrapper>> {
        self.inner.slot.lock().await.transaction.take()
    }

    pub(crate) async fn set_state(&self, state: TransactionState) {
        self.inner.slot.lock().await.state = state;
    }
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxHandle")
            .field("id", &self.inner.id)
            .field("isolation_level", &self.inner.isolation_level)
            .finish()
    }
}

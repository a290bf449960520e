#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;

use tx_manager::{
    BoxedTransactionOperation, Context, IsolationLevel, ToSql, TransactionError,
    TransactionOperationError, TransactionProvider, TransactionWrapper,
};

#[derive(Default)]
pub struct Calls {
    pub begins: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub levels: Mutex<Vec<IsolationLevel>>,
    pub statements: Mutex<Vec<String>>,
}

impl Calls {
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn levels(&self) -> Vec<IsolationLevel> {
        self.levels.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

pub struct FakeTransaction {
    calls: Arc<Calls>,
    fail_commit: bool,
    fail_rollback: bool,
    latency: Option<Duration>,
}

impl FakeTransaction {
    pub fn new(calls: Arc<Calls>) -> Self {
        Self {
            calls,
            fail_commit: false,
            fail_rollback: false,
            latency: None,
        }
    }

    /// Simulates a round trip to the database, bounded by the context deadline.
    async fn round_trip(&self, ctx: &Context, stage: &'static str) -> Result<(), TransactionError> {
        match self.latency {
            Some(latency) => {
                ctx.run_until_deadline(stage, async move {
                    tokio::time::sleep(latency).await;
                    Ok::<_, TransactionError>(())
                })
                .await
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TransactionWrapper for FakeTransaction {
    async fn execute(
        &mut self,
        _ctx: &Context,
        query: &str,
        _params: Vec<Box<dyn ToSql>>,
    ) -> Result<(), TransactionError> {
        self.calls.statements.lock().unwrap().push(query.to_string());
        Ok(())
    }

    async fn rollback(self: Box<Self>, ctx: &Context) -> Result<(), TransactionError> {
        self.calls.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.round_trip(ctx, "rollback").await?;
        if self.fail_rollback {
            return Err(TransactionError::RollbackError("connection lost".to_string()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>, ctx: &Context) -> Result<(), TransactionError> {
        self.calls.commits.fetch_add(1, Ordering::SeqCst);
        self.round_trip(ctx, "commit").await?;
        if self.fail_commit {
            return Err(TransactionError::CommitError("serialization failure".to_string()));
        }
        Ok(())
    }
}

/// Provider test double that counts begin/commit/rollback calls.
#[derive(Default)]
pub struct FakeProvider {
    pub calls: Arc<Calls>,
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
    latency: Option<Duration>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl TransactionProvider for FakeProvider {
    async fn begin_transaction(
        &self,
        _ctx: &Context,
        isolation_level: IsolationLevel,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError> {
        self.calls.begins.fetch_add(1, Ordering::SeqCst);
        self.calls.levels.lock().unwrap().push(isolation_level);
        if self.fail_begin {
            return Err(TransactionError::ConnectionError("pool exhausted".to_string()));
        }
        Ok(Box::new(FakeTransaction {
            calls: self.calls.clone(),
            fail_commit: self.fail_commit,
            fail_rollback: self.fail_rollback,
            latency: self.latency,
        }))
    }

    async fn close(&self) -> Result<(), TransactionError> {
        Ok(())
    }
}

pub fn work<F, Fut>(f: F) -> Box<dyn BoxedTransactionOperation>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TransactionOperationError>> + Send + 'static,
{
    Box::new(move |ctx: Context| f(ctx).boxed())
}

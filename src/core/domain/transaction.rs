use async_trait::async_trait;
use thiserror::Error;

use crate::core::domain::context::Context;

/// A live database transaction.
///
/// `commit` and `rollback` consume the wrapper, so a given instance can be
/// resolved at most once.
#[async_trait]
pub trait TransactionWrapper: Send + Sync {
    async fn execute(
        &mut self,
        ctx: &Context,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<(), TransactionError>;
    async fn rollback(self: Box<Self>, ctx: &Context) -> Result<(), TransactionError>;
    async fn commit(self: Box<Self>, ctx: &Context) -> Result<(), TransactionError>;
}

pub trait ToSql: Send + Sync + std::fmt::Debug {
    fn as_i32(&self) -> Option<i32> {
        None
    }
    fn as_i64(&self) -> Option<i64> {
        None
    }
    fn as_bool(&self) -> Option<bool> {
        None
    }
    fn as_string(&self) -> Option<String> {
        None
    }
}

impl ToSql for i32 {
    fn as_i32(&self) -> Option<i32> {
        Some(*self)
    }
}

impl ToSql for i64 {
    fn as_i64(&self) -> Option<i64> {
        Some(*self)
    }
}

impl ToSql for bool {
    fn as_bool(&self) -> Option<bool> {
        Some(*self)
    }
}

impl ToSql for String {
    fn as_string(&self) -> Option<String> {
        Some(self.clone())
    }
}

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Failed to execute query: {0}")]
    ExecutionError(String),
    #[error("Failed to commit transaction: {0}")]
    CommitError(String),
    #[error("Failed to rollback transaction: {0}")]
    RollbackError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Parameter binding error: {0}")]
    BindError(String),
    #[error("Context deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),
    #[error("Transaction {0} has already been resolved")]
    AlreadyResolved(u64),
}

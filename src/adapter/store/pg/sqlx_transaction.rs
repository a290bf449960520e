use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};

use crate::core::domain::context::Context;
use crate::core::domain::transaction::{ToSql, TransactionError, TransactionWrapper};

pub struct SqlxTransaction<'t> {
    transaction: Transaction<'t, Postgres>,
}

impl<'a> SqlxTransaction<'a> {
    pub fn new(transaction: Transaction<'a, Postgres>) -> Self {
        Self { transaction }
    }
}

/// Builds a query with `params` bound in order.
pub(crate) fn bind_params<'q>(
    query: &'q str,
    params: Vec<Box<dyn ToSql>>,
) -> Result<Query<'q, Postgres, PgArguments>, TransactionError> {
    let mut sqlx_query = sqlx::query(query);

    for param in params {
        if let Some(value) = param.as_i32() {
            sqlx_query = sqlx_query.bind(value);
        } else if let Some(value) = param.as_i64() {
            sqlx_query = sqlx_query.bind(value);
        } else if let Some(value) = param.as_bool() {
            sqlx_query = sqlx_query.bind(value);
        } else if let Some(value) = param.as_string() {
            sqlx_query = sqlx_query.bind(value);
        } else {
            return Err(TransactionError::BindError(format!(
                "Unsupported parameter type: {:?}",
                param
            )));
        }
    }

    Ok(sqlx_query)
}

#[async_trait]
impl<'t> TransactionWrapper for SqlxTransaction<'t> {
    async fn execute(
        &mut self,
        ctx: &Context,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<(), TransactionError> {
        let sqlx_query = bind_params(query, params)?;
        let transaction = &mut self.transaction;

        ctx.run_until_deadline("execute", async move {
            sqlx_query
                .execute(&mut **transaction)
                .await
                .map_err(|e| {
                    TransactionError::ExecutionError(format!(
                        "Failed to execute query: {:?}, error: {:?}",
                        query, e
                    ))
                })
        })
        .await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>, ctx: &Context) -> Result<(), TransactionError> {
        let transaction = self.transaction;
        ctx.run_until_deadline("rollback", async move {
            transaction
                .rollback()
                .await
                .map_err(|e| TransactionError::RollbackError(e.to_string()))
        })
        .await
    }

    async fn commit(self: Box<Self>, ctx: &Context) -> Result<(), TransactionError> {
        let transaction = self.transaction;
        ctx.run_until_deadline("commit", async move {
            transaction.commit().await.map_err(|e| {
                TransactionError::CommitError(format!("Failed to commit transaction: {:?}", e))
            })
        })
        .await
    }
}

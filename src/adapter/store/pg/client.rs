use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::adapter::config::AppConfig;
use crate::adapter::store::pg::sqlx_transaction::{bind_params, SqlxTransaction};
use crate::core::domain::context::Context;
use crate::core::domain::isolation::IsolationLevel;
use crate::core::domain::transaction::{ToSql, TransactionError, TransactionWrapper};
use crate::core::domain::transaction_manager::TransactionProvider;

/// Pooled Postgres client.
///
/// Statements issued through [`PgClient::execute`] go to the transaction
/// carried by the context when there is one, and to the pool otherwise.
#[derive(Clone)]
pub struct PgClient {
    pool: PgPool,
}

impl PgClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &AppConfig) -> Result<Self, TransactionError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections())
            .connect(config.db_url())
            .await
            .map_err(|e| {
                TransactionError::ConnectionError(format!("failed to connect to the db: {}", e))
            })?;
        Ok(Self::new(pool))
    }

    pub async fn execute(
        &self,
        ctx: &Context,
        query: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<(), TransactionError> {
        if let Some(transaction) = ctx.transaction() {
            return transaction.execute(ctx, query, params).await;
        }

        let sqlx_query = bind_params(query, params)?;
        ctx.run_until_deadline("execute", async {
            sqlx_query.execute(&self.pool).await.map_err(|e| {
                TransactionError::ExecutionError(format!(
                    "Failed to execute query: {:?}, error: {:?}",
                    query, e
                ))
            })
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionProvider for PgClient {
    async fn begin_transaction(
        &self,
        ctx: &Context,
        isolation_level: IsolationLevel,
    ) -> Result<Box<dyn TransactionWrapper>, TransactionError> {
        let set_isolation = isolation_level.set_transaction_sql();
        let transaction = ctx
            .run_until_deadline("begin", async {
                let mut transaction = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| TransactionError::ConnectionError(e.to_string()))?;
                sqlx::query(&set_isolation)
                    .execute(&mut *transaction)
                    .await
                    .map_err(|e| {
                        TransactionError::ExecutionError(format!(
                            "Failed to set isolation level {}: {:?}",
                            isolation_level, e
                        ))
                    })?;
                Ok::<_, TransactionError>(transaction)
            })
            .await?;

        Ok(Box::new(SqlxTransaction::new(transaction)))
    }

    async fn close(&self) -> Result<(), TransactionError> {
        if !self.pool.is_closed() {
            tracing::info!("closing database pool");
            self.pool.close().await;
        }
        Ok(())
    }
}

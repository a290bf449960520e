use async_trait::async_trait;
use std::sync::Arc;

use crate::adapter::store::pg::client::PgClient;
use crate::core::domain::command::CommandError;
use crate::core::domain::context::Context;
use crate::core::domain::entity::user::{User, UserCommand};
use crate::core::domain::transaction::ToSql;

pub struct PgUserRepository {
    client: Arc<PgClient>,
}

impl PgUserRepository {
    pub fn new(client: Arc<PgClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserCommand for PgUserRepository {
    async fn insert(&self, ctx: &Context, user: User) -> Result<(), CommandError> {
        let query = "INSERT INTO users (id, name, email) VALUES ($1, $2, $3)";
        let id = user.id;
        let params: Vec<Box<dyn ToSql>> = vec![
            Box::new(user.id) as Box<dyn ToSql>,
            Box::new(user.name) as Box<dyn ToSql>,
            Box::new(user.email) as Box<dyn ToSql>,
        ];
        self.client
            .execute(ctx, query, params)
            .await
            .map_err(|e| CommandError::from_transaction_error("User", id, e))
    }
}

pub mod user;

use async_trait::async_trait;

use crate::core::domain::command::CommandError;
use crate::core::domain::context::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
}

/// Write side of the user store. Statements run on the transaction carried by
/// `ctx` when there is one.
#[async_trait]
pub trait UserCommand: Send + Sync {
    async fn insert(&self, ctx: &Context, user: User) -> Result<(), CommandError>;
}

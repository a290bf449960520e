use async_trait::async_trait;
use thiserror::Error;

use crate::core::domain::command::CommandError;
use crate::core::domain::context::Context;
use crate::core::domain::entity::user::user::{
    CreateUserValidationError, UnvalidatedCreateUserInput,
};
use crate::core::domain::transaction_manager::TransactionManagerError;

#[async_trait]
pub trait CreateUserInputBoundary: Send + Sync {
    /// Creates one user, joining the transaction in `ctx` if there is one.
    async fn execute(
        &self,
        ctx: &Context,
        input: UnvalidatedCreateUserInput,
    ) -> Result<i32, CreateUserError>;

    /// Creates all users in a single transaction; either every insert is
    /// committed or none is.
    async fn execute_batch(
        &self,
        ctx: &Context,
        inputs: Vec<UnvalidatedCreateUserInput>,
    ) -> Result<Vec<i32>, CreateUserError>;
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error(transparent)]
    ValidationError(#[from] CreateUserValidationError),

    #[error(transparent)]
    CommandError(#[from] CommandError),

    #[error(transparent)]
    TransactionError(#[from] TransactionManagerError),
}

use thiserror::Error;

use crate::core::domain::entity::user::User;

#[derive(Debug, Error)]
pub enum CreateUserValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

#[derive(Debug)]
pub struct UnvalidatedCreateUserInput {
    pub id: i32,
    pub name: String,
    pub email: String,
}

impl TryFrom<UnvalidatedCreateUserInput> for User {
    type Error = CreateUserValidationError;

    fn try_from(value: UnvalidatedCreateUserInput) -> Result<Self, Self::Error> {
        if value.name.trim().is_empty() {
            return Err(CreateUserValidationError::EmptyName);
        }
        if !value.email.contains('@') {
            return Err(CreateUserValidationError::InvalidEmail(value.email));
        }
        Ok(User {
            id: value.id,
            name: value.name,
            email: value.email,
        })
    }
}

pub mod client;
pub mod command;
pub mod sqlx_transaction;

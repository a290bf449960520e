pub mod command;
pub mod context;
pub mod entity;
pub mod isolation;
pub mod transaction;
pub mod transaction_manager;
pub mod transaction_operation;

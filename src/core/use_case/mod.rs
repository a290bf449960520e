pub mod create_user;
pub mod transaction_coordinator;

pub mod config;
pub mod init;
pub mod store;

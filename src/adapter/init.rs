use std::sync::Arc;
use thiserror::Error;

use crate::adapter::config::AppConfig;
use crate::adapter::store::pg::client::PgClient;
use crate::adapter::store::pg::command::user::PgUserRepository;
use crate::core::domain::entity::user::UserCommand;
use crate::core::domain::transaction::TransactionError;
use crate::core::domain::transaction_manager::{TransactionManager, TransactionProvider};
use crate::core::port::create_user::CreateUserInputBoundary;
use crate::core::use_case::create_user::CreateUserUseCase;
use crate::core::use_case::transaction_coordinator::TransactionCoordinator;

pub struct AppState {
    pub client: Arc<PgClient>,
    pub transaction_manager: Arc<dyn TransactionManager>,
    pub create_user_repository: Arc<dyn UserCommand>,
    pub user_create_use_case: Arc<dyn CreateUserInputBoundary>,
}

impl AppState {
    pub async fn shutdown(&self) -> Result<(), TransactionError> {
        self.client.close().await
    }
}

pub struct AppInitializer;

impl AppInitializer {
    pub async fn initialize(config: AppConfig) -> Result<Arc<AppState>, AppInitializerError> {
        let client = Arc::new(
            PgClient::connect(&config)
                .await
                .map_err(|e| AppInitializerError::DatabaseInitError(e.to_string()))?,
        );
        tracing::info!(max_connections = config.max_connections(), "database pool ready");

        let transaction_manager = Arc::new(TransactionCoordinator::new(client.clone()));
        let create_user_repository = Arc::new(PgUserRepository::new(client.clone()));
        let user_create_use_case = Arc::new(CreateUserUseCase::new(
            create_user_repository.clone(),
            transaction_manager.clone(),
        ));

        Ok(Arc::new(AppState {
            client,
            transaction_manager,
            create_user_repository,
            user_create_use_case,
        }))
    }
}

#[derive(Debug, Error)]
pub enum AppInitializerError {
    #[error("Failed to initialize database: {0}")]
    DatabaseInitError(String),
}

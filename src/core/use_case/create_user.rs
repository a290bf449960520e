use async_trait::async_trait;
use std::sync::Arc;

use crate::core::domain::context::Context;
use crate::core::domain::entity::user::user::UnvalidatedCreateUserInput;
use crate::core::domain::entity::user::{User, UserCommand};
use crate::core::domain::transaction_manager::TransactionManager;
use crate::core::domain::transaction_operation::{
    BoxedTransactionOperation, TransactionOperationError,
};

use crate::core::port::create_user::{CreateUserError, CreateUserInputBoundary};

pub struct InsertUserOperation {
    user: User,
    user_repository: Arc<dyn UserCommand>,
}

impl InsertUserOperation {
    pub fn new(user: User, user_repository: Arc<dyn UserCommand>) -> Self {
        Self {
            user,
            user_repository,
        }
    }
}

#[async_trait]
impl BoxedTransactionOperation for InsertUserOperation {
    async fn execute(&self, ctx: Context) -> Result<(), TransactionOperationError> {
        self.user_repository
            .insert(&ctx, self.user.clone())
            .await
            .map_err(TransactionOperationError::CommandError)
    }
}

/// Inserts each user through its own `run` call; all of them join the
/// transaction opened for the batch.
pub struct InsertUsersOperation {
    users: Vec<User>,
    user_repository: Arc<dyn UserCommand>,
    transaction_manager: Arc<dyn TransactionManager>,
}

#[async_trait]
impl BoxedTransactionOperation for InsertUsersOperation {
    async fn execute(&self, ctx: Context) -> Result<(), TransactionOperationError> {
        for user in &self.users {
            let operation = Box::new(InsertUserOperation::new(
                user.clone(),
                self.user_repository.clone(),
            ));
            self.transaction_manager
                .read_committed(&ctx, operation)
                .await?;
        }
        Ok(())
    }
}

pub struct CreateUserUseCase {
    repository: Arc<dyn UserCommand>,
    transaction_manager: Arc<dyn TransactionManager>,
}

impl CreateUserUseCase {
    pub fn new(
        repository: Arc<dyn UserCommand>,
        transaction_manager: Arc<dyn TransactionManager>,
    ) -> Self {
        Self {
            repository,
            transaction_manager,
        }
    }
}

#[async_trait]
impl CreateUserInputBoundary for CreateUserUseCase {
    async fn execute(
        &self,
        ctx: &Context,
        input: UnvalidatedCreateUserInput,
    ) -> Result<i32, CreateUserError> {
        let user = User::try_from(input)?;
        let id = user.id;
        let operation = Box::new(InsertUserOperation::new(user, self.repository.clone()));
        self.transaction_manager.read_committed(ctx, operation).await?;

        Ok(id)
    }

    async fn execute_batch(
        &self,
        ctx: &Context,
        inputs: Vec<UnvalidatedCreateUserInput>,
    ) -> Result<Vec<i32>, CreateUserError> {
        let users = inputs
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let ids = users.iter().map(|user| user.id).collect();
        let operation = Box::new(InsertUsersOperation {
            users,
            user_repository: self.repository.clone(),
            transaction_manager: self.transaction_manager.clone(),
        });
        self.transaction_manager.read_committed(ctx, operation).await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::command::CommandError;
    use crate::core::domain::isolation::IsolationLevel;
    use crate::core::domain::transaction::{ToSql, TransactionError, TransactionWrapper};
    use crate::core::domain::transaction_manager::{TransactionManagerError, TransactionProvider};
    use crate::core::use_case::transaction_coordinator::TransactionCoordinator;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counters {
        begins: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    struct CountingTransaction {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl TransactionWrapper for CountingTransaction {
        async fn execute(
            &mut self,
            _ctx: &Context,
            _query: &str,
            _params: Vec<Box<dyn ToSql>>,
        ) -> Result<(), TransactionError> {
            Ok(())
        }

        async fn rollback(self: Box<Self>, _ctx: &Context) -> Result<(), TransactionError> {
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn commit(self: Box<Self>, _ctx: &Context) -> Result<(), TransactionError> {
            self.counters.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingProvider {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl TransactionProvider for CountingProvider {
        async fn begin_transaction(
            &self,
            _ctx: &Context,
            _isolation_level: IsolationLevel,
        ) -> Result<Box<dyn TransactionWrapper>, TransactionError> {
            self.counters.begins.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingTransaction {
                counters: self.counters.clone(),
            }))
        }

        async fn close(&self) -> Result<(), TransactionError> {
            Ok(())
        }
    }

    /// Records which transaction each insert ran in; rejects duplicate ids.
    #[derive(Default)]
    struct InMemoryUsers {
        inserted: Mutex<Vec<(i32, Option<u64>)>>,
    }

    #[async_trait]
    impl UserCommand for InMemoryUsers {
        async fn insert(&self, ctx: &Context, user: User) -> Result<(), CommandError> {
            let mut inserted = self.inserted.lock().unwrap();
            if inserted.iter().any(|(id, _)| *id == user.id) {
                return Err(CommandError::already_exists("User", user.id));
            }
            inserted.push((user.id, ctx.transaction().map(|tx| tx.id())));
            Ok(())
        }
    }

    fn input(id: i32) -> UnvalidatedCreateUserInput {
        UnvalidatedCreateUserInput {
            id,
            name: format!("user-{}", id),
            email: format!("user-{}@example.com", id),
        }
    }

    fn use_case() -> (CreateUserUseCase, Arc<InMemoryUsers>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let provider = Arc::new(CountingProvider {
            counters: counters.clone(),
        });
        let users = Arc::new(InMemoryUsers::default());
        let manager = Arc::new(TransactionCoordinator::new(provider));
        (
            CreateUserUseCase::new(users.clone(), manager),
            users,
            counters,
        )
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_user_commits() {
        let (use_case, users, counters) = use_case();

        let id = use_case.execute(&Context::background(), input(1)).await.unwrap();

        assert_eq!(id, 1);
        assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
        let inserted = users.inserted.lock().unwrap();
        assert!(inserted[0].1.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn test_invalid_input_never_opens_a_transaction() {
        let (use_case, _users, counters) = use_case();
        let mut bad = input(1);
        bad.email = "not-an-email".to_string();

        let err = use_case.execute(&Context::background(), bad).await.unwrap_err();

        assert!(matches!(err, CreateUserError::ValidationError(_)));
        assert_eq!(counters.begins.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_batch_shares_one_transaction() {
        let (use_case, users, counters) = use_case();

        let ids = use_case
            .execute_batch(&Context::background(), vec![input(1), input(2), input(3)])
            .await
            .unwrap();

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        let inserted = users.inserted.lock().unwrap();
        let tx_ids: Vec<_> = inserted.iter().map(|(_, tx)| *tx).collect();
        assert!(tx_ids[0].is_some());
        assert!(tx_ids.iter().all(|tx| *tx == tx_ids[0]));
    }

    #[rstest]
    #[tokio::test]
    async fn test_batch_failure_rolls_back_once() {
        let (use_case, _users, counters) = use_case();

        let err = use_case
            .execute_batch(&Context::background(), vec![input(1), input(1)])
            .await
            .unwrap_err();

        match err {
            CreateUserError::TransactionError(TransactionManagerError::WorkFailed(inner)) => {
                assert!(matches!(
                    inner,
                    TransactionOperationError::Coordinator(ref nested)
                        if matches!(**nested, TransactionManagerError::Operation(
                            TransactionOperationError::CommandError(CommandError::AlreadyExists { .. })
                        ))
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    }
}

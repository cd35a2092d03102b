use crate::data::BoardState;
use crate::internal_error::InternalResult;

use super::sync::{Ack, PendingSync, SyncHandle};

/// Waits for a mutation queued under the board lock.
///
/// When the store rejects it, the board is resynced from the store: the
/// worker first applies everything queued behind the failed mutation, then
/// replaces the board with what was actually persisted.
pub async fn settle_mutation(
    pending: PendingSync,
    sync: &SyncHandle,
    board: &BoardState,
) -> InternalResult<Ack> {
    match pending.wait().await {
        Ok(ack) => Ok(ack),
        Err(e) => {
            tracing::warn!(error = %e, "sync failed, resyncing board from store");
            if let Err(resync_error) = sync.resync(board.clone()).wait().await {
                tracing::error!(error = %resync_error, "board resync failed");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use crate::data::DBConnection;
    use crate::internal_error::InternalError;
    use crate::store::{load_board, memory_connection, seed_categories, StoreGateway};
    use crate::todo::data::TodoPatch;
    use crate::todo::reconciler::Board;
    use crate::todo::sync::{Mutation, SyncError, SyncGateway, SyncResult};

    /// Store gateway that refuses todos titled "reject" and is slow to
    /// create todos.
    struct FlakyGateway {
        store: StoreGateway,
    }

    impl SyncGateway for FlakyGateway {
        fn send(&self, mutation: &Mutation) -> SyncResult {
            match mutation {
                Mutation::CreateTodo(todo) if todo.text == "reject" => {
                    Err(SyncError::Server("refused".to_string()))
                }
                Mutation::CreateTodo(_) => {
                    thread::sleep(Duration::from_millis(200));
                    self.store.send(mutation)
                }
                _ => self.store.send(mutation),
            }
        }

        fn load_board(&self) -> Result<Board, SyncError> {
            self.store.load_board()
        }
    }

    fn setup() -> (DBConnection, BoardState, SyncHandle) {
        let connection = memory_connection();
        seed_categories(&["todo".to_string(), "done".to_string()], &connection).unwrap();
        let board = load_board(&connection).unwrap();

        let db_connection: DBConnection = Arc::new(Mutex::new(connection));
        let sync = SyncHandle::spawn(FlakyGateway {
            store: StoreGateway::new(db_connection.clone()),
        });

        (db_connection, Arc::new(Mutex::new(board)), sync)
    }

    fn queue_todo(board: &BoardState, sync: &SyncHandle, text: &str) -> (String, PendingSync) {
        let mut board = board.lock().unwrap();
        let (todo, mutation) = board.add_todo(text, "todo").unwrap();
        (todo.id, sync.send(mutation))
    }

    #[tokio::test]
    async fn failed_mutation_is_undone_locally() {
        let (db_connection, board, sync) = setup();

        let (id, pending) = queue_todo(&board, &sync, "reject");
        let result = settle_mutation(pending, &sync, &board).await;

        assert!(matches!(result, Err(InternalError::Sync(SyncError::Server(_)))));
        assert!(board.lock().unwrap().index().get(&id).is_none());
        assert_eq!(
            *board.lock().unwrap(),
            load_board(&db_connection.lock().unwrap()).unwrap()
        );
    }

    #[tokio::test]
    async fn resync_keeps_mutations_queued_behind_a_failure() {
        let (db_connection, board, sync) = setup();

        let (rejected, failing) = queue_todo(&board, &sync, "reject");
        let (kept, slow) = queue_todo(&board, &sync, "keep");

        assert!(settle_mutation(failing, &sync, &board).await.is_err());
        assert!(slow.wait().await.is_ok());

        let stored = load_board(&db_connection.lock().unwrap()).unwrap();
        let local = board.lock().unwrap().clone();
        assert_eq!(local, stored);
        assert!(local.index().get(&kept).is_some());
        assert!(local.index().get(&rejected).is_none());

        let todo_id = local.registry().find_by_name("todo").unwrap().id.clone();
        let mut local = local;
        assert!(local.reconciler().delete_category(&todo_id).is_err());
    }

    #[tokio::test]
    async fn store_follows_board_order_for_update_then_rename() {
        let (db_connection, board, sync) = setup();
        let (id, created) = queue_todo(&board, &sync, "ship");
        settle_mutation(created, &sync, &board).await.unwrap();

        let (update, rename) = {
            let mut board = board.lock().unwrap();
            let patch = TodoPatch {
                done: Some(true),
                ..TodoPatch::default()
            };
            let (_, mutation) = board.update_todo(&id, &patch).unwrap();
            let update = sync.send(mutation);

            let category_id = board.registry().find_by_name("todo").unwrap().id.clone();
            let (_, mutation) = board.reconciler().rename_category(&category_id, "backlog").unwrap();
            (update, sync.send(mutation))
        };

        settle_mutation(rename, &sync, &board).await.unwrap();
        settle_mutation(update, &sync, &board).await.unwrap();

        let stored = load_board(&db_connection.lock().unwrap()).unwrap();
        let todo = stored.index().get(&id).unwrap();
        assert_eq!(todo.category_name, "backlog");
        assert!(todo.done);
    }
}

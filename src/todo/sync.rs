//! Forwarding of confirmed local mutations to the backing store.
//!
//! Board operations apply locally first and hand the resulting [`Mutation`]
//! to a [`SyncHandle`]. A single worker task feeds mutations to the
//! [`SyncGateway`] in submission order and reports each outcome through the
//! [`PendingSync`] returned by [`SyncHandle::send`]. Dropping a `PendingSync`
//! abandons the result only; the mutation is still applied. Failed mutations
//! are not retried. The worker only writes the board when asked to through
//! [`SyncHandle::resync`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::data::BoardState;

use super::data::*;
use super::reconciler::Board;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Reorder,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Todos,
    Categories,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Todos => "todos",
            Collection::Categories => "categories",
        }
    }
}

/// A mutation descriptor, serialized as `{ "type": ..., "payload": ... }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Mutation {
    CreateCategory(Category),
    /// Renames a category and relabels its todos as one unit.
    RenameCategory {
        id: CategoryID,
        old_name: String,
        new_name: String,
    },
    DeleteCategory {
        id: CategoryID,
    },
    ReorderCategories(Vec<CategoryOrder>),
    CreateTodo(Todo),
    UpdateTodo(Todo),
    DeleteTodo {
        id: TodoID,
    },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::CreateCategory(_) | Mutation::CreateTodo(_) => MutationKind::Create,
            Mutation::RenameCategory { .. } | Mutation::UpdateTodo(_) => MutationKind::Update,
            Mutation::DeleteCategory { .. } | Mutation::DeleteTodo { .. } => MutationKind::Delete,
            Mutation::ReorderCategories(_) => MutationKind::Reorder,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            Mutation::CreateTodo(_) | Mutation::UpdateTodo(_) | Mutation::DeleteTodo { .. } => {
                Collection::Todos
            }
            _ => Collection::Categories,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub kind: MutationKind,
    pub collection: Collection,
    pub applied_at: DateTime<Utc>,
}

impl Ack {
    pub fn for_mutation(mutation: &Mutation) -> Ack {
        Ack {
            kind: mutation.kind(),
            collection: mutation.collection(),
            applied_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("server error: {0}")]
    Server(String),
}

pub type SyncResult = Result<Ack, SyncError>;

pub trait SyncGateway: Send + Sync + 'static {
    fn send(&self, mutation: &Mutation) -> SyncResult;

    /// Reads the whole board back as the store currently holds it.
    fn load_board(&self) -> Result<Board, SyncError>;
}

impl<G: SyncGateway + ?Sized> SyncGateway for Arc<G> {
    fn send(&self, mutation: &Mutation) -> SyncResult {
        (**self).send(mutation)
    }

    fn load_board(&self) -> Result<Board, SyncError> {
        (**self).load_board()
    }
}

enum Job {
    Apply(Mutation, oneshot::Sender<SyncResult>),
    Resync(BoardState, oneshot::Sender<Result<(), SyncError>>),
}

/// Outcome of one queued job.
pub struct PendingSync<T = Ack> {
    receiver: oneshot::Receiver<Result<T, SyncError>>,
}

impl<T> PendingSync<T> {
    pub async fn wait(self) -> Result<T, SyncError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Network("sync worker stopped".to_string())),
        }
    }
}

/// Queue into the sync worker.
///
/// Jobs run strictly in the order they were queued. Callers that must keep
/// the store in the same order as the board queue while still holding the
/// board lock; queuing never blocks.
#[derive(Clone)]
pub struct SyncHandle {
    sender: mpsc::UnboundedSender<Job>,
}

impl SyncHandle {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn<G: SyncGateway>(gateway: G) -> SyncHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(Arc::new(gateway), receiver));

        SyncHandle { sender }
    }

    pub fn send(&self, mutation: Mutation) -> PendingSync {
        let (reply, receiver) = oneshot::channel();

        if let Err(mpsc::error::SendError(job)) = self.sender.send(Job::Apply(mutation, reply)) {
            if let Job::Apply(mutation, reply) = job {
                tracing::warn!(?mutation, "sync worker is gone, dropping mutation");
                let _ = reply.send(Err(SyncError::Network("sync worker stopped".to_string())));
            }
        }

        PendingSync { receiver }
    }

    /// Replaces `board` with the store's view once every job queued before
    /// this call has been applied.
    ///
    /// The worker holds the board lock while it flushes whatever else is
    /// already queued and reads the store back, so no mutation applied to the
    /// board is lost by the reload.
    pub fn resync(&self, board: BoardState) -> PendingSync<()> {
        let (reply, receiver) = oneshot::channel();

        if let Err(mpsc::error::SendError(job)) = self.sender.send(Job::Resync(board, reply)) {
            if let Job::Resync(_, reply) = job {
                let _ = reply.send(Err(SyncError::Network("sync worker stopped".to_string())));
            }
        }

        PendingSync { receiver }
    }
}

fn apply<G: SyncGateway>(gateway: &G, mutation: &Mutation) -> SyncResult {
    let kind = mutation.kind();
    let collection = mutation.collection().as_str();
    let result = gateway.send(mutation);

    match &result {
        Ok(_) => tracing::info!(?kind, collection, "mutation synced"),
        Err(e) => tracing::warn!(?kind, collection, error = %e, "mutation sync failed"),
    }

    result
}

fn resync<G: SyncGateway>(
    gateway: &G,
    board: &BoardState,
    receiver: &mut mpsc::UnboundedReceiver<Job>,
) -> Result<(), SyncError> {
    let mut board = board
        .lock()
        .map_err(|e| SyncError::Server(e.to_string()))?;

    // Queued jobs are already on the board; persist them before reading back.
    while let Ok(job) = receiver.try_recv() {
        match job {
            Job::Apply(mutation, reply) => {
                let _ = reply.send(apply(gateway, &mutation));
            }
            Job::Resync(_, reply) => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    *board = gateway.load_board()?;
    tracing::info!(
        categories = board.registry().len(),
        todos = board.index().len(),
        "board reloaded from store"
    );

    Ok(())
}

async fn run_worker<G: SyncGateway>(gateway: Arc<G>, mut receiver: mpsc::UnboundedReceiver<Job>) {
    loop {
        let job = match receiver.recv().await {
            Some(job) => job,
            None => break,
        };

        match job {
            Job::Apply(mutation, reply) => {
                let worker_gateway = gateway.clone();
                let kind = mutation.kind();

                let result = match tokio::task::spawn_blocking(move || apply(&worker_gateway, &mutation)).await {
                    Ok(result) => result,
                    Err(e) => Err(SyncError::Server(e.to_string())),
                };

                if reply.send(result).is_err() {
                    tracing::debug!(?kind, "sync result abandoned by caller");
                }
            }
            Job::Resync(board, reply) => {
                let worker_gateway = gateway.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    let result = resync(&worker_gateway, &board, &mut receiver);
                    (receiver, result)
                })
                .await;

                match outcome {
                    Ok((returned, result)) => {
                        receiver = returned;
                        let _ = reply.send(result);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "board resync panicked, stopping sync worker");
                        return;
                    }
                }
            }
        }
    }
}

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;
use thiserror::Error;

use std::sync::PoisonError;

use crate::todo::error::ReconcileError;
use crate::todo::sync::SyncError;

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    #[error("corrupt store: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("user {0:?} already exists")]
    DuplicateUser(String),
    #[error("no user with id {0:?}")]
    UnknownUser(String),
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::Poisoned(e.to_string())
    }
}

impl InternalError {
    pub fn status(&self) -> Status {
        match self {
            InternalError::Reconcile(ReconcileError::NotFound { .. }) => Status::NotFound,
            InternalError::Reconcile(ReconcileError::DuplicateName(_))
            | InternalError::Reconcile(ReconcileError::Conflict { .. }) => Status::Conflict,
            InternalError::Reconcile(ReconcileError::InvalidSet(_)) => Status::UnprocessableEntity,
            InternalError::Sync(SyncError::Validation(_)) => Status::UnprocessableEntity,
            InternalError::Sync(SyncError::Network(_)) => Status::ServiceUnavailable,
            InternalError::Sync(SyncError::Server(_)) => Status::BadGateway,
            InternalError::DuplicateUser(_) => Status::Conflict,
            InternalError::UnknownUser(_) => Status::NotFound,
            InternalError::Database(_)
            | InternalError::Serialization(_)
            | InternalError::Poisoned(_)
            | InternalError::Corrupt(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for InternalError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            tracing::error!(uri = %request.uri(), error = %self, "request failed");
        } else {
            tracing::debug!(uri = %request.uri(), error = %self, "request rejected");
        }

        let body = Json(json!({ "error": self.to_string() }));
        response::status::Custom(status, body).respond_to(request)
    }
}

pub type InternalResult<T> = Result<T, InternalError>;

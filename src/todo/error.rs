use thiserror::Error;

/// Reasons a local board operation is rejected. Always raised before any
/// collection is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("a category named {0:?} already exists")]
    DuplicateName(String),
    #[error("no {kind} with id {id:?}")]
    NotFound { kind: &'static str, id: String },
    #[error("category {name:?} is still referenced by {count} todo(s)")]
    Conflict { name: String, count: usize },
    #[error("invalid category set: {0}")]
    InvalidSet(String),
}

impl ReconcileError {
    pub fn category_not_found(id: &str) -> ReconcileError {
        ReconcileError::NotFound {
            kind: "category",
            id: id.to_string(),
        }
    }

    pub fn todo_not_found(id: &str) -> ReconcileError {
        ReconcileError::NotFound {
            kind: "todo",
            id: id.to_string(),
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

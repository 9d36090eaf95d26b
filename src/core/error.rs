use thiserror::Error;

/// Pinpoints where inside an aggregate write a mid-sequence failure occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePoint {
    /// The parent insert was rejected by the backend.
    Parent,

    /// The parent insert succeeded but the backend returned no generated
    /// identifier, making every child write unsafe.
    ParentId,

    /// A child insert was rejected; carries the collection name and the
    /// zero-based index of the offending payload within it.
    Child { collection: String, index: usize },
}

impl std::fmt::Display for FailurePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePoint::Parent => write!(f, "parent insert"),
            FailurePoint::ParentId => write!(f, "parent identifier"),
            FailurePoint::Child { collection, index } => {
                write!(f, "collection '{}' index {}", collection, index)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Statement rejected on '{entity}': {reason}")]
    Statement { entity: String, reason: String },

    #[error("Aggregate write failed at {at}: {reason}")]
    Persistence { at: FailurePoint, reason: String },

    #[error("Commit error: {0}")]
    Commit(String),
}

pub type Result<T> = std::result::Result<T, WriteError>;

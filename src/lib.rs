// ============================================================================
// AggWrite Library
// ============================================================================
//
// Atomic aggregate persistence coordinator: creates a parent record together
// with its ordered child collections as one transaction, rolling everything
// back on any failure. The storage backend is pluggable behind the
// StorageSession trait; an in-memory transactional backend is bundled for
// tests and embedded use.
//
// ============================================================================

pub mod backend;
pub mod core;
pub mod session;
pub mod statement;
pub mod writer;

// Re-export main types for convenience
pub use crate::core::{FailurePoint, Payload, RecordId, Result, Value, WriteError};
pub use backend::{MemoryBackend, MemoryTransaction, StoredRow};
pub use session::{ExecOutcome, StorageSession, StorageTransaction};
pub use statement::InsertStatement;
pub use writer::{
    AggregateConfig, AggregateWriter, CollectionTemplate, Column, CreatePhase, EntityTemplate,
    PositionBase,
};

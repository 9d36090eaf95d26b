use crate::core::{RecordId, Result, Value};
use crate::statement::InsertStatement;
use async_trait::async_trait;

/// Outcome of executing a single insert statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The backend assigned a generated identifier to the new row.
    Inserted { id: RecordId },

    /// The statement succeeded without returning a generated identifier.
    RowsAffected(u64),
}

/// One logical connection to a transactional data store.
///
/// Implement this to bind the coordinator to a concrete backend (SQL,
/// document store, the bundled [`MemoryBackend`](crate::MemoryBackend), or a
/// test double). The coordinator never manages the session's lifecycle beyond
/// a single transaction.
#[async_trait]
pub trait StorageSession: Send + Sync {
    type Tx: StorageTransaction;

    /// Open a new transaction.
    ///
    /// # Errors
    /// Returns [`WriteError::Connection`](crate::WriteError::Connection) when
    /// the backend is unreachable. No partial state exists in that case.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// A single open transaction on a [`StorageSession`].
///
/// Statements are issued strictly in sequence on one handle; no effect is
/// observable outside the transaction until [`commit`](Self::commit) succeeds.
///
/// Implementations must discard uncommitted effects when the handle is
/// dropped, so a cancelled in-flight write never leaks an open transaction.
#[async_trait]
pub trait StorageTransaction: Send {
    /// Execute one parameterized insert inside this transaction.
    ///
    /// Parameters are bound positionally to the statement's column list.
    ///
    /// # Errors
    /// Returns [`WriteError::Statement`](crate::WriteError::Statement) on a
    /// constraint violation or malformed statement.
    async fn execute(
        &mut self,
        statement: &InsertStatement,
        params: &[Value],
    ) -> Result<ExecOutcome>;

    /// Make every statement in this transaction durable and visible.
    ///
    /// # Errors
    /// Returns [`WriteError::Commit`](crate::WriteError::Commit) when the
    /// backend rejects the commit (e.g., a conflicting concurrent writer).
    async fn commit(self) -> Result<()>;

    /// Discard every statement in this transaction.
    ///
    /// Best-effort: the coordinator logs rollback failures but never lets
    /// them override the error that triggered the rollback.
    async fn rollback(self) -> Result<()>;
}

use crate::core::{RecordId, Result, Value, WriteError};
use crate::session::{ExecOutcome, StorageSession, StorageTransaction};
use crate::statement::InsertStatement;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// A committed row, as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: RecordId,
    pub values: HashMap<String, Value>,
}

impl StoredRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

#[derive(Debug)]
struct Table {
    next_row_id: u64,
    rows: Vec<StoredRow>,
}

impl Table {
    fn new() -> Self {
        Self {
            next_row_id: 1,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<HashMap<String, Table>>,
    closed: AtomicBool,
}

/// In-memory transactional backend.
///
/// Writes are buffered on the transaction handle and published atomically
/// under one lock at commit, so readers see either none or all of a batch.
/// Identifiers are reserved at execute time; a rolled-back transaction
/// leaves a gap in the sequence, like any database with non-transactional
/// sequences.
///
/// Intended for tests and embedded use; clones share the same store.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub async fn create_table(&self, name: &str) -> Result<()> {
        let mut tables = self.shared.tables.write().await;
        if tables.contains_key(name) {
            return Err(WriteError::Statement {
                entity: name.to_string(),
                reason: "entity already exists".into(),
            });
        }
        tables.insert(name.to_string(), Table::new());
        Ok(())
    }

    /// Close the backend: subsequent `begin` calls fail with
    /// [`WriteError::Connection`], and open transactions fail at commit.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }

    /// Fetch one committed row by identifier.
    pub async fn fetch(&self, entity: &str, id: RecordId) -> Result<Option<StoredRow>> {
        let tables = self.shared.tables.read().await;
        let table = Self::table(&tables, entity)?;
        Ok(table.rows.iter().find(|r| r.id == id).cloned())
    }

    /// All committed rows of an entity, in insertion order.
    pub async fn rows(&self, entity: &str) -> Result<Vec<StoredRow>> {
        let tables = self.shared.tables.read().await;
        let table = Self::table(&tables, entity)?;
        Ok(table.rows.clone())
    }

    pub async fn row_count(&self, entity: &str) -> Result<usize> {
        let tables = self.shared.tables.read().await;
        let table = Self::table(&tables, entity)?;
        Ok(table.rows.len())
    }

    /// Committed rows whose `parent_key` column references the given parent.
    pub async fn children_of(
        &self,
        entity: &str,
        parent_key: &str,
        parent: RecordId,
    ) -> Result<Vec<StoredRow>> {
        let wanted = Value::Integer(parent.as_u64() as i64);
        let tables = self.shared.tables.read().await;
        let table = Self::table(&tables, entity)?;
        Ok(table
            .rows
            .iter()
            .filter(|r| r.get(parent_key) == Some(&wanted))
            .cloned()
            .collect())
    }

    fn table<'a>(tables: &'a HashMap<String, Table>, entity: &str) -> Result<&'a Table> {
        tables.get(entity).ok_or_else(|| WriteError::Statement {
            entity: entity.to_string(),
            reason: "unknown entity".into(),
        })
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageSession for MemoryBackend {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(WriteError::Connection("backend is closed".into()));
        }
        Ok(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            pending: Vec::new(),
            finished: false,
        })
    }
}

/// One open transaction on a [`MemoryBackend`].
///
/// Dropping the handle without committing discards every buffered row.
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    pending: Vec<(String, StoredRow)>,
    finished: bool,
}

#[async_trait]
impl StorageTransaction for MemoryTransaction {
    async fn execute(
        &mut self,
        statement: &InsertStatement,
        params: &[Value],
    ) -> Result<ExecOutcome> {
        if params.len() != statement.columns().len() {
            return Err(WriteError::Statement {
                entity: statement.entity().to_string(),
                reason: format!(
                    "expected {} parameters, got {}",
                    statement.columns().len(),
                    params.len()
                ),
            });
        }

        let mut tables = self.shared.tables.write().await;
        let table = tables
            .get_mut(statement.entity())
            .ok_or_else(|| WriteError::Statement {
                entity: statement.entity().to_string(),
                reason: "unknown entity".into(),
            })?;

        // Reserve the identifier now so it can be referenced by later
        // statements in the same transaction.
        let id = RecordId(table.next_row_id);
        table.next_row_id += 1;

        let values = statement
            .columns()
            .iter()
            .cloned()
            .zip(params.iter().cloned())
            .collect();
        self.pending
            .push((statement.entity().to_string(), StoredRow { id, values }));

        Ok(ExecOutcome::Inserted { id })
    }

    async fn commit(mut self) -> Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            self.finished = true;
            self.pending.clear();
            return Err(WriteError::Commit("backend closed before commit".into()));
        }

        // Publish the whole batch under one write lock so readers never see
        // a partial aggregate.
        let mut tables = self.shared.tables.write().await;
        for (entity, row) in self.pending.drain(..) {
            if let Some(table) = tables.get_mut(&entity) {
                table.rows.push(row);
            }
        }
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.pending.clear();
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.finished && !self.pending.is_empty() {
            debug!(
                "discarding {} uncommitted rows from dropped transaction",
                self.pending.len()
            );
            self.pending.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_stmt() -> InsertStatement {
        InsertStatement::new("items", vec!["name".to_string()])
    }

    async fn backend_with_items() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.create_table("items").await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_create_table_twice_fails() {
        let backend = backend_with_items().await;
        assert!(backend.create_table("items").await.is_err());
    }

    #[tokio::test]
    async fn test_rows_invisible_until_commit() {
        let backend = backend_with_items().await;
        let mut tx = backend.begin().await.unwrap();

        tx.execute(&insert_stmt(), &[Value::Text("one".into())])
            .await
            .unwrap();
        assert_eq!(backend.row_count("items").await.unwrap(), 0);

        tx.commit().await.unwrap();
        assert_eq!(backend.row_count("items").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_pending() {
        let backend = backend_with_items().await;
        let mut tx = backend.begin().await.unwrap();

        tx.execute(&insert_stmt(), &[Value::Text("one".into())])
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(backend.row_count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drop_discards_pending() {
        let backend = backend_with_items().await;

        {
            let mut tx = backend.begin().await.unwrap();
            tx.execute(&insert_stmt(), &[Value::Text("one".into())])
                .await
                .unwrap();
            // Dropped without commit.
        }

        assert_eq!(backend.row_count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_generated_ids_are_distinct() {
        let backend = backend_with_items().await;
        let mut tx = backend.begin().await.unwrap();

        let first = tx
            .execute(&insert_stmt(), &[Value::Text("one".into())])
            .await
            .unwrap();
        let second = tx
            .execute(&insert_stmt(), &[Value::Text("two".into())])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        match (first, second) {
            (ExecOutcome::Inserted { id: a }, ExecOutcome::Inserted { id: b }) => {
                assert_ne!(a, b);
            }
            other => panic!("expected generated ids, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_entity_rejected() {
        let backend = backend_with_items().await;
        let mut tx = backend.begin().await.unwrap();

        let stmt = InsertStatement::new("ghosts", vec!["name".to_string()]);
        let err = tx
            .execute(&stmt, &[Value::Text("boo".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Statement { .. }));
    }

    #[tokio::test]
    async fn test_parameter_count_mismatch_rejected() {
        let backend = backend_with_items().await;
        let mut tx = backend.begin().await.unwrap();

        let err = tx.execute(&insert_stmt(), &[]).await.unwrap_err();
        assert!(matches!(err, WriteError::Statement { .. }));
    }

    #[tokio::test]
    async fn test_closed_backend_rejects_begin() {
        let backend = backend_with_items().await;
        backend.close();

        let err = backend.begin().await.unwrap_err();
        assert!(matches!(err, WriteError::Connection(_)));
    }

    #[tokio::test]
    async fn test_close_mid_transaction_fails_commit() {
        let backend = backend_with_items().await;
        let mut tx = backend.begin().await.unwrap();
        tx.execute(&insert_stmt(), &[Value::Text("one".into())])
            .await
            .unwrap();

        backend.close();

        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, WriteError::Commit(_)));
        assert_eq!(backend.row_count("items").await.unwrap(), 0);
    }
}

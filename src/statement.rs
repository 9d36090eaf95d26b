//! Fixed, parameterized insert statements.
//!
//! Statements are built once when an [`AggregateWriter`](crate::AggregateWriter)
//! is configured and never assembled from caller input at runtime, so no
//! caller-controlled string ever reaches a query text.

/// A parameterized single-row insert for one entity type.
///
/// Carries the entity name and the column list in binding order. SQL backends
/// can use the pre-rendered [`sql`](Self::sql) text with `$1..$n`
/// placeholders; structural backends read [`entity`](Self::entity) and
/// [`columns`](Self::columns) directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    entity: String,
    columns: Vec<String>,
    sql: String,
}

impl InsertStatement {
    pub fn new(entity: impl Into<String>, columns: Vec<String>) -> Self {
        let entity = entity.into();
        let placeholders = (1..=columns.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            entity,
            columns.join(", "),
            placeholders
        );
        Self {
            entity,
            columns,
            sql,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Column names in the order parameters must be bound.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

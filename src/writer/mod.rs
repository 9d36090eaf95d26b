// ============================================================================
// Aggregate Writer
// ============================================================================
//
// Creates a parent record and its ordered child collections as one atomic
// unit of work: parent first, children in caller order with injected parent
// key and position, then a single commit. Any failure after the transaction
// opens rolls the whole write back.
//
// ============================================================================

pub mod config;
pub mod state;

pub use config::{AggregateConfig, CollectionTemplate, Column, EntityTemplate, PositionBase};
pub use state::CreatePhase;

use crate::core::{FailurePoint, Payload, RecordId, Result, WriteError};
use crate::session::{ExecOutcome, StorageSession, StorageTransaction};
use crate::statement::InsertStatement;
use log::{debug, warn};

/// Transactional coordinator for aggregate creation.
///
/// The storage session is injected at construction; the writer holds no
/// other state, so one instance can serve many concurrent `create` calls,
/// each on its own transaction.
///
/// # Examples
///
/// ```
/// use aggwrite::{
///     AggregateConfig, AggregateWriter, CollectionTemplate, Column, EntityTemplate,
///     MemoryBackend, Payload,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # tokio_test::block_on(async {
/// let backend = MemoryBackend::new();
/// backend.create_table("recipes").await?;
/// backend.create_table("ingredients").await?;
///
/// let config = AggregateConfig::new(
///     EntityTemplate::new("recipes").column(Column::new("title").required()),
/// )
/// .collection(
///     "ingredients",
///     CollectionTemplate::new("ingredients", "recipe_id", "sort_order")
///         .column(Column::new("name").required()),
/// );
///
/// let writer = AggregateWriter::new(backend.clone(), config)?;
///
/// let recipe_id = writer
///     .create(
///         Payload::new().set("title", "Pasta"),
///         vec![(
///             "ingredients".to_string(),
///             vec![Payload::new().set("name", "Spaghetti")],
///         )],
///     )
///     .await?;
///
/// assert!(backend.fetch("recipes", recipe_id).await?.is_some());
/// # Ok::<(), aggwrite::WriteError>(())
/// # })?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AggregateWriter<S: StorageSession> {
    session: S,
    config: AggregateConfig,
    parent_stmt: InsertStatement,
    collection_stmts: Vec<(String, InsertStatement)>,
}

impl<S: StorageSession> AggregateWriter<S> {
    /// Create a writer over an injected storage session.
    ///
    /// All insert statements are built here, once; nothing is assembled from
    /// caller input at write time.
    ///
    /// # Errors
    /// Returns [`WriteError::Validation`] if the configuration is malformed
    /// (no parent columns, duplicate collection names, injected columns
    /// colliding with caller columns).
    pub fn new(session: S, config: AggregateConfig) -> Result<Self> {
        config.validate()?;
        let parent_stmt = config.parent().insert_statement();
        let collection_stmts = config
            .collections()
            .iter()
            .map(|(name, template)| (name.clone(), template.insert_statement()))
            .collect();
        Ok(Self {
            session,
            config,
            parent_stmt,
            collection_stmts,
        })
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Persist a parent record and its child collections atomically.
    ///
    /// Child collections are written in the caller-supplied order; within a
    /// collection, each payload receives the parent identifier and a
    /// position of `base + index`, so reading children back sorted by
    /// position reproduces the input order exactly.
    ///
    /// # Errors
    /// - [`WriteError::Validation`]: the input could never persist; no
    ///   transaction was opened.
    /// - [`WriteError::Connection`]: the backend was unreachable; no partial
    ///   state exists.
    /// - [`WriteError::Persistence`]: a statement failed mid-sequence; the
    ///   transaction was rolled back and the error names the failure point.
    /// - [`WriteError::Commit`]: the backend rejected the commit; whether any
    ///   state persisted is ambiguous, so re-query before retrying.
    pub async fn create(
        &self,
        parent: Payload,
        collections: Vec<(String, Vec<Payload>)>,
    ) -> Result<RecordId> {
        // Fail fast: reject input that is guaranteed to fail before opening
        // a transaction.
        self.config.validate_parent(&parent)?;

        let mut plan = Vec::with_capacity(collections.len());
        for (name, payloads) in &collections {
            let (template, statement) = self.bound_collection(name).ok_or_else(|| {
                WriteError::Validation(format!("unknown collection '{}'", name))
            })?;
            for payload in payloads {
                template.validate(payload)?;
            }
            plan.push((name.as_str(), template, statement, payloads));
        }

        let mut tx = self.session.begin().await?;
        debug!("aggregate create on '{}': {}", self.parent_stmt.entity(), CreatePhase::TransactionOpen);

        let params = self.config.parent().bind(&parent);
        let outcome = match tx.execute(&self.parent_stmt, &params).await {
            Ok(outcome) => outcome,
            Err(err) => {
                return Self::abort(tx, FailurePoint::Parent, err.to_string()).await;
            }
        };

        let parent_id = match outcome {
            ExecOutcome::Inserted { id } => id,
            ExecOutcome::RowsAffected(_) => {
                return Self::abort(
                    tx,
                    FailurePoint::ParentId,
                    "backend returned no generated identifier".into(),
                )
                .await;
            }
        };
        debug!(
            "aggregate create on '{}': {} id={}",
            self.parent_stmt.entity(),
            CreatePhase::ParentWritten,
            parent_id
        );

        debug!("aggregate create on '{}': {}", self.parent_stmt.entity(), CreatePhase::ChildrenWriting);
        for (name, template, statement, payloads) in plan {
            for (index, payload) in payloads.iter().enumerate() {
                let position = template.base().position(index);
                let params = template.bind(payload, parent_id, position);
                if let Err(err) = tx.execute(statement, &params).await {
                    return Self::abort(
                        tx,
                        FailurePoint::Child {
                            collection: name.to_string(),
                            index,
                        },
                        err.to_string(),
                    )
                    .await;
                }
            }
        }

        tx.commit().await?;
        debug!(
            "aggregate create on '{}': {} id={}",
            self.parent_stmt.entity(),
            CreatePhase::Committed,
            parent_id
        );
        Ok(parent_id)
    }

    fn bound_collection(&self, name: &str) -> Option<(&CollectionTemplate, &InsertStatement)> {
        let template = self.config.collection_named(name)?;
        let statement = self
            .collection_stmts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)?;
        Some((template, statement))
    }

    /// Roll back and surface the original failure. A rollback failure is
    /// logged, never escalated: the transaction is already abandoned and the
    /// original error is what the caller must act on.
    async fn abort(tx: S::Tx, at: FailurePoint, reason: String) -> Result<RecordId> {
        if let Err(rollback_err) = tx.rollback().await {
            warn!("rollback failed after {}: {}", at, rollback_err);
        }
        debug!("aggregate create: {} at {}", CreatePhase::RolledBack, at);
        Err(WriteError::Persistence { at, reason })
    }
}

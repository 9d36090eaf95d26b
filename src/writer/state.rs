/// Phase of a single aggregate write.
///
/// Phase transitions:
/// ```text
/// Idle ──> TransactionOpen ──> ParentWritten ──> ChildrenWriting ──> Committed
///                 │                   │                  │
///                 └───────────────────┴──────────────────┴──> RolledBack
/// ```
///
/// No phase is retried automatically; the caller decides whether to retry
/// the whole write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePhase {
    Idle,
    TransactionOpen,
    ParentWritten,
    ChildrenWriting,

    /// Terminal success: the whole aggregate is durable.
    Committed,

    /// Terminal failure: nothing the write touched is visible.
    RolledBack,
}

impl CreatePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CreatePhase::Committed | CreatePhase::RolledBack)
    }
}

impl std::fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreatePhase::Idle => write!(f, "IDLE"),
            CreatePhase::TransactionOpen => write!(f, "TRANSACTION_OPEN"),
            CreatePhase::ParentWritten => write!(f, "PARENT_WRITTEN"),
            CreatePhase::ChildrenWriting => write!(f, "CHILDREN_WRITING"),
            CreatePhase::Committed => write!(f, "COMMITTED"),
            CreatePhase::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

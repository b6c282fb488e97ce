//! Run identifiers.

/// Names a directory sync run so its log lines can be grouped.
pub trait IdGenerator: Send + Sync {
    /// A fresh run ID, never repeated within a process.
    fn generate_id(&self) -> String;
}

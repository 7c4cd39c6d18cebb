//! The contract between a session and the authoritative log.

use crate::error::Result;
use crate::operation::Operation;
use async_trait::async_trait;

/// Access to the authoritative, versioned log of operations.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Append operations to the log. Operations whose id is already in the
    /// log are ignored.
    async fn write(&self, ops: Vec<Operation>) -> Result<()>;

    /// Read up to `limit` operations with `version >= version`.
    ///
    /// When none exist yet, waits up to `duration_ms` for new ones; a
    /// negative duration returns immediately. Returns `None` when nothing
    /// was found.
    async fn read(&self, version: i64, limit: usize, duration_ms: i64) -> Result<Option<Vec<Operation>>>;
}


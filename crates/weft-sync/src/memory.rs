//! In-process authoritative log.

use crate::connection::Connection;
use crate::error::Result;
use crate::operation::Operation;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct LogState {
    ops: Vec<Operation>,
    ids: HashSet<String>,
}

/// A log kept in memory that assigns versions in arrival order.
///
/// Useful as the server side of tests and simulations; it also backs a
/// [`crate::Server`] in process.
#[derive(Debug, Default)]
pub struct MemoryLog {
    state: Mutex<LogState>,
    appended: Notify,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version of the last accepted operation; -1 when empty.
    pub fn latest_version(&self) -> i64 {
        self.state.lock().ops.len() as i64 - 1
    }

    /// Every accepted operation in version order.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().ops.clone()
    }

    fn since(&self, version: i64, limit: usize) -> Option<Vec<Operation>> {
        let state = self.state.lock();
        let start = usize::try_from(version.max(0)).ok()?;
        if start >= state.ops.len() || limit == 0 {
            return None;
        }
        let end = state.ops.len().min(start.saturating_add(limit));
        Some(state.ops[start..end].to_vec())
    }
}

#[async_trait]
impl Connection for MemoryLog {
    async fn write(&self, ops: Vec<Operation>) -> Result<()> {
        let mut accepted = 0usize;
        {
            let mut state = self.state.lock();
            for mut op in ops {
                if !state.ids.insert(op.id.clone()) {
                    continue;
                }
                op.version = state.ops.len() as i64;
                state.ops.push(op);
                accepted += 1;
            }
        }
        if accepted > 0 {
            tracing::debug!(accepted, latest = self.latest_version(), "appended to memory log");
            self.appended.notify_waiters();
        }
        Ok(())
    }

    async fn read(&self, version: i64, limit: usize, duration_ms: i64) -> Result<Option<Vec<Operation>>> {
        let deadline = Instant::now() + Duration::from_millis(duration_ms.max(0) as u64);
        loop {
            let appended = self.appended.notified();
            if let Some(ops) = self.since(version, limit) {
                return Ok(Some(ops));
            }
            if duration_ms < 0 {
                return Ok(None);
            }
            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                tracing::debug!(version, duration_ms, "memory log read timed out");
                return Ok(self.since(version, limit));
            }
        }
    }
}

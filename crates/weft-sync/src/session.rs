//! Client sessions.
//!
//! A [`Session`] binds a [`Stream`] to a [`Connection`]. Local edits are
//! appended to the stream by the application; `push` turns them into
//! pending operations and writes them, `pull` reads the log, rebases what
//! it finds and folds it into the stream ahead of the pending edits.
//!
//! At most one write and one read are in flight at a time: calling `push`
//! or `pull` again while one is outstanding returns the outstanding handle.
//! Handles are eager; the work proceeds whether or not anyone awaits them.
//! Both must be called from within a Tokio runtime.

use crate::config::SessionConfig;
use crate::connection::Connection;
use crate::error::{Result, SyncError};
use crate::operation::{decode_ops, encode_ops, IdSource, Operation, UlidIds};
use crate::transformer::Transformer;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::{json, Value as Json};
use std::future::Future;
use std::sync::Arc;
use weft_core::{change, encode_value, CoreError, Registry, Value};
use weft_stream::Stream;

/// Outcome of a push or pull, shareable between callers.
pub type SyncHandle = Shared<BoxFuture<'static, Result<()>>>;

struct SessionState {
    version: i64,
    /// Position after the last local edit turned into an operation.
    stream: Stream,
    pending: Vec<Operation>,
    transformer: Transformer,
    writing: Option<SyncHandle>,
    reading: Option<SyncHandle>,
}

/// Synchronizes a local stream with an authoritative log.
pub struct Session<C: Connection> {
    conn: Arc<C>,
    config: SessionConfig,
    ids: Arc<dyn IdSource>,
    state: Arc<Mutex<SessionState>>,
}

impl<C: Connection> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            config: self.config.clone(),
            ids: Arc::clone(&self.ids),
            state: Arc::clone(&self.state),
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Writing,
    Reading,
}

impl SessionState {
    fn slot(&mut self, slot: Slot) -> &mut Option<SyncHandle> {
        match slot {
            Slot::Writing => &mut self.writing,
            Slot::Reading => &mut self.reading,
        }
    }
}

impl<C: Connection> Session<C> {
    /// A session over `stream` that has not seen any log version yet.
    pub fn new(conn: Arc<C>, stream: Stream) -> Self {
        Self {
            conn,
            config: SessionConfig::default(),
            ids: Arc::new(UlidIds),
            state: Arc::new(Mutex::new(SessionState {
                version: -1,
                stream,
                pending: Vec::new(),
                transformer: Transformer::new(),
                writing: None,
                reading: None,
            })),
        }
    }

    /// Rebuild a session from a snapshot.
    pub fn restore(conn: Arc<C>, snapshot: Snapshot) -> Self {
        Session::new(conn, Stream::new(snapshot.value)).with_pending(snapshot.pending, snapshot.version)
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Start from operations not yet confirmed by the log, made at `version`.
    pub fn with_pending(self, pending: Vec<Operation>, version: i64) -> Self {
        {
            let mut state = self.state.lock();
            state.pending = pending;
            state.version = version;
        }
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Last log version folded into the stream.
    pub fn version(&self) -> i64 {
        self.state.lock().version
    }

    /// Local operations the log has not confirmed yet.
    pub fn pending(&self) -> Vec<Operation> {
        self.state.lock().pending.clone()
    }

    /// The session's position in the stream. Local edits may be appended
    /// here or at any later position.
    pub fn stream(&self) -> Stream {
        self.state.lock().stream.clone()
    }

    /// The stream value with every local edit and pulled operation.
    pub fn snapshot(&self) -> Snapshot {
        let mut state = self.state.lock();
        self.collect_local(&mut state);
        Snapshot {
            value: state.stream.value().clone(),
            version: state.version,
            pending: state.pending.clone(),
        }
    }

    /// Write pending operations, including local edits not yet collected.
    ///
    /// Pending operations stay pending until a pull sees them in the log,
    /// so every push resends all of them; the log ignores duplicates.
    pub fn push(&self) -> SyncHandle {
        let mut state = self.state.lock();
        self.collect_local(&mut state);
        if let Some(writing) = &state.writing {
            return writing.clone();
        }
        if state.pending.is_empty() {
            return future::ready(Ok(())).boxed().shared();
        }

        let ops = state.pending.clone();
        let conn = Arc::clone(&self.conn);
        tracing::debug!(count = ops.len(), version = state.version, "pushing pending operations");
        let handle = self.spawn(Slot::Writing, async move {
            let result = conn.write(ops).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "write failed");
            }
            result
        });
        state.writing = Some(handle.clone());
        handle
    }

    /// Read the log past the current version and fold what arrives into
    /// the stream.
    pub fn pull(&self) -> SyncHandle {
        let mut state = self.state.lock();
        self.collect_local(&mut state);
        if let Some(reading) = &state.reading {
            return reading.clone();
        }

        let version = state.version;
        let session = self.clone();
        let handle = self.spawn(Slot::Reading, async move {
            let result = session.pull_since(version).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "pull failed");
            }
            result
        });
        state.reading = Some(handle.clone());
        handle
    }

    /// Run `work` on the runtime and clear `slot` once it finishes.
    fn spawn<F>(&self, slot: Slot, work: F) -> SyncHandle
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let result = work.await;
            *state.lock().slot(slot) = None;
            result
        });
        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => Err(SyncError::Transport(err.to_string())),
            }
        }
        .boxed()
        .shared()
    }

    async fn pull_since(&self, version: i64) -> Result<()> {
        let read = self
            .conn
            .read(version + 1, self.config.read_limit, self.config.poll_duration_ms)
            .await?;
        let Some(ops) = read else {
            return Ok(());
        };
        tracing::debug!(count = ops.len(), from = version + 1, "read operations");

        let rebased = self.rebase(&ops).await?;
        self.apply_remote(rebased);
        Ok(())
    }

    /// Rebase `ops`, reading missing journal entries from the log once.
    async fn rebase(&self, ops: &[Operation]) -> Result<Vec<Operation>> {
        let mut backfilled = false;
        loop {
            let result = self.state.lock().transformer.rebase(ops);
            match result {
                Err(SyncError::UnresolvableRebase { version, missing }) if !backfilled => {
                    backfilled = true;
                    let lowest = ops
                        .iter()
                        .map(|op| op.basis + 1)
                        .min()
                        .unwrap_or(missing)
                        .clamp(0, missing);
                    let upto = ops.first().map_or(version, |op| op.version).min(version);
                    let count = usize::try_from(upto - lowest).unwrap_or(0).max(1);
                    tracing::debug!(version, from = lowest, count, "backfilling journal");
                    if let Some(earlier) = self.conn.read(lowest, count, -1).await? {
                        self.state.lock().transformer.record(&earlier);
                    }
                }
                other => return other,
            }
        }
    }

    fn apply_remote(&self, rebased: Vec<Operation>) {
        let mut state = self.state.lock();
        self.collect_local(&mut state);

        for op in rebased {
            if op.version <= state.version {
                continue;
            }
            if state.pending.first().map_or(false, |p| p.id == op.id) {
                state.pending.remove(0);
                tracing::debug!(id = %op.id, version = op.version, "operation acknowledged");
            } else {
                let mut remote = op.change;
                for p in state.pending.iter_mut() {
                    let (local, rest) = change::merge(remote.as_ref(), p.change.as_ref());
                    p.change = local;
                    remote = rest;
                }
                if let Some(remote) = remote {
                    state.stream = state.stream.reverse_append(remote);
                }
            }
            state.version = op.version;
        }

        let version = state.version;
        for p in state.pending.iter_mut() {
            p.basis = version;
        }
        if let Some(keep) = self.config.journal_retention {
            state.transformer.prune_before(version - keep);
        }
    }

    /// Turn local edits appended after the session's position into pending
    /// operations.
    fn collect_local(&self, state: &mut SessionState) {
        while let Some((change, next)) = state.stream.next() {
            state.stream = next;
            if change.is_none() {
                continue;
            }
            let parent_id = state.pending.last().map(|p| p.id.clone());
            let op = Operation::new(self.ids.next_id(), parent_id, -1, state.version, change);
            state.pending.push(op);
        }
    }
}

/// Everything needed to resume a session later.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub value: Value,
    pub version: i64,
    pub pending: Vec<Operation>,
}

impl Snapshot {
    pub fn encode(&self) -> Json {
        json!({
            "value": encode_value(&self.value),
            "version": self.version,
            "pending": encode_ops(&self.pending),
        })
    }

    pub fn decode(registry: &Registry, json: &Json) -> Result<Snapshot> {
        let field = |name: &str| {
            json.get(name)
                .ok_or_else(|| SyncError::Codec(CoreError::Malformed(format!("snapshot without {}", name))))
        };
        let version = field("version")?
            .as_i64()
            .ok_or_else(|| SyncError::Codec(CoreError::Malformed("snapshot version".into())))?;
        Ok(Snapshot {
            value: registry.decode_value(field("value")?)?,
            version,
            pending: decode_ops(registry, field("pending")?)?,
        })
    }
}

//! In-flight request table for one server session.
//!
//! Every outbound request registers a slot keyed by its id before the
//! frame is written; the background reader resolves the slot when the
//! correlated response arrives. The table, not arrival order, decides
//! which caller is unblocked, so out-of-order responses are handled for
//! free. A slot is filled at most once: late responses for ids that were
//! abandoned (timeout) or already resolved find no slot and are dropped
//! by the caller of [`complete`](PendingTable::complete).

use crate::mcp::error::{McpError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Correlation table between request ids and waiting callers.
///
/// Shared between the session (insertions on send, removals on timeout)
/// and its background reader task (resolutions on response arrival), so
/// all access goes through a `Mutex` held only for map operations.
pub struct PendingTable {
    slots: Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Register a slot for `id` and return the receiver the caller awaits.
    pub fn register(&self, id: u64) -> oneshot::Receiver<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(id, tx);
        rx
    }

    /// Resolve the slot for `id` with `outcome`.
    ///
    /// Returns `false` when no slot exists, which covers both unknown ids
    /// and ids whose caller already timed out; the response is stale and
    /// the caller of this method decides how loudly to drop it.
    pub fn complete(&self, id: u64, outcome: Result<Value>) -> bool {
        let sender = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.remove(&id)
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Remove the slot for `id` without resolving it.
    ///
    /// Used by the timeout path: the caller stops waiting on its own, and
    /// removing the slot first guarantees a late response cannot reach it.
    pub fn abandon(&self, id: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(&id);
    }

    /// Resolve every outstanding slot with a fresh error.
    ///
    /// Called when the whole session fails (degraded transport, process
    /// exit, shutdown) so that no caller is left hanging.
    pub fn fail_all(&self, make_error: impl Fn() -> McpError) {
        let drained: Vec<_> = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.drain().collect()
        };
        for (_, tx) in drained {
            let _ = tx.send(Err(make_error()));
        }
    }

    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

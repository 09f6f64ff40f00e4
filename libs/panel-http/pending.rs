use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Public view of one in-flight call
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequestInfo {
    pub id: String,
    pub method: String,
    pub url: String,
    pub started_at: DateTime<Utc>,
}

struct PendingEntry {
    token: CancellationToken,
    info: PendingRequestInfo,
}

/// In-flight calls keyed by a time-based id
///
/// An entry lives from the first attempt until the call settles; the
/// returned [`PendingGuard`] removes it on drop, including when the caller
/// drops the request future.
#[derive(Default)]
pub struct PendingRequests {
    entries: Mutex<HashMap<String, PendingEntry>>,
    sequence: AtomicU64,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a call; `parent` is the caller's signal, if any
    pub fn register(
        &self,
        method: &Method,
        url: &str,
        parent: Option<&CancellationToken>,
    ) -> PendingGuard<'_> {
        let now = Utc::now();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{}", now.timestamp_millis(), seq);
        let token = parent.map_or_else(CancellationToken::new, CancellationToken::child_token);

        self.entries.lock().insert(
            id.clone(),
            PendingEntry {
                token: token.clone(),
                info: PendingRequestInfo {
                    id: id.clone(),
                    method: method.to_string(),
                    url: url.to_string(),
                    started_at: now,
                },
            },
        );

        PendingGuard {
            table: self,
            id,
            token,
        }
    }

    /// Abort every tracked call and clear the table
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            debug!("Cancelling {} {}", entry.info.method, entry.info.url);
            entry.token.cancel();
        }
        drained.len()
    }

    pub fn snapshot(&self) -> Vec<PendingRequestInfo> {
        let mut infos: Vec<PendingRequestInfo> =
            self.entries.lock().values().map(|e| e.info.clone()).collect();
        infos.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps one call registered until dropped
pub struct PendingGuard<'a> {
    table: &'a PendingRequests,
    id: String,
    token: CancellationToken,
}

impl PendingGuard<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Cancelled by the caller's signal or by `cancel_all`
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.entries.lock().remove(&self.id);
    }
}

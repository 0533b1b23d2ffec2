//! The synchronizing repository: stale-while-revalidate over the local
//! store and the remote fetch client.
//!
//! Every fetch shape drives one ordered emission sequence:
//! `Loading` first, then a cached `Success` when the store has data, then a
//! refreshed `Success` or - only when nothing was emitted yet - an `Error`.
//! The policy always prefers some answer over no answer; an error reaches
//! the consumer only when neither fresh nor cached data exists.
//!
//! Overlapping refreshes for the same code are not coalesced: both hit the
//! network and converge through the store's upsert, since draw data is
//! immutable once drawn.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::FetchClient;
use crate::config::MAX_HISTORY_SIZE;
use crate::error::LotteryError;
use crate::models::{DrawRecord, GameKind};
use crate::state::DataState;
use crate::store::DrawStore;

/// Per-request channel capacity, comfortably above the longest emission
/// sequence so a producing task never blocks on send.
const EMISSION_BUFFER: usize = 8;

/// Orchestrates the local store and the fetch client into `DataState`
/// sequences. Cheap to clone; both collaborators are injected at
/// construction time.
#[derive(Clone)]
pub struct LotteryRepository {
    client: Arc<dyn FetchClient>,
    store: DrawStore,
    keep_count: u32,
}

impl LotteryRepository {
    pub fn new(client: Arc<dyn FetchClient>, store: DrawStore, keep_count: u32) -> Self {
        Self {
            client,
            store,
            keep_count,
        }
    }

    /// Latest draw for a code: cached value first when present, then the
    /// network refresh. Dropping the receiver abandons the request.
    pub fn get_latest(&self, code: &str) -> mpsc::Receiver<DataState<DrawRecord>> {
        let (tx, rx) = mpsc::channel(EMISSION_BUFFER);
        let repo = self.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            repo.run_latest(code, tx).await;
        });
        rx
    }

    /// A specific draw. An exact cache hit terminates the sequence without
    /// contacting the network - issues are immutable once drawn.
    pub fn get_by_issue(&self, issue: &str, code: &str) -> mpsc::Receiver<DataState<DrawRecord>> {
        let (tx, rx) = mpsc::channel(EMISSION_BUFFER);
        let repo = self.clone();
        let issue = issue.to_string();
        let code = code.to_string();
        tokio::spawn(async move {
            repo.run_by_issue(issue, code, tx).await;
        });
        rx
    }

    /// Last `size` draws for a code, newest first. `force_refresh` skips the
    /// cached emission and goes straight to the network.
    pub fn get_history(
        &self,
        code: &str,
        size: u32,
        force_refresh: bool,
    ) -> mpsc::Receiver<DataState<Vec<DrawRecord>>> {
        let (tx, rx) = mpsc::channel(EMISSION_BUFFER);
        let repo = self.clone();
        let code = code.to_string();
        tokio::spawn(async move {
            repo.run_history(code, size, force_refresh, tx).await;
        });
        rx
    }

    /// Live, cache-only view of the history for a code: delivers the current
    /// rows immediately, then re-delivers whenever the store changes for
    /// that code. Cancel (or drop) to release the store watch.
    pub fn observe_history(&self, code: &str, size: u32) -> HistorySubscription {
        let (tx, rx) = mpsc::channel(EMISSION_BUFFER);
        let store = self.store.clone();
        let code = code.to_string();
        let task = tokio::spawn(async move {
            let mut changes = store.subscribe();

            match store.history(&code, size).await {
                Ok(rows) => {
                    if tx.send(rows).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(code = %code, error = %e, "initial history query failed"),
            }

            loop {
                let relevant = tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) => change.touches(&code),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(code = %code, skipped, "change feed lagged, re-querying");
                            true
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                    _ = tx.closed() => return,
                };
                if !relevant {
                    continue;
                }
                match store.history(&code, size).await {
                    Ok(rows) => {
                        if tx.send(rows).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(code = %code, error = %e, "history re-query failed"),
                }
            }
        });
        HistorySubscription { rx, task }
    }

    /// Drop all cached draws for one code.
    pub async fn clear_cache(&self, code: &str) -> Result<(), LotteryError> {
        self.store.clear(code).await?;
        Ok(())
    }

    /// Drop every cached draw.
    pub async fn clear_all_cache(&self) -> Result<(), LotteryError> {
        self.store.clear_all().await?;
        Ok(())
    }

    // ===== Request drivers =====

    async fn run_latest(&self, code: String, tx: mpsc::Sender<DataState<DrawRecord>>) {
        if tx.send(DataState::Loading).await.is_err() {
            return;
        }
        if GameKind::from_code(&code).is_none() {
            let _ = tx
                .send(DataState::failed(LotteryError::UnknownCode(code)))
                .await;
            return;
        }

        let cached = self.cached_latest(&code).await;
        if let Some(record) = &cached {
            debug!(code = %code, issue = %record.issue, "serving cached latest draw");
            if tx.send(DataState::Success(record.clone())).await.is_err() {
                return;
            }
        }

        // Abandoned before the refresh started; skip the network call.
        if tx.is_closed() {
            return;
        }

        match self.fetch_latest(&code).await {
            Ok(fresh) => {
                if cached.as_ref() != Some(&fresh) {
                    let _ = tx.send(DataState::Success(fresh)).await;
                }
            }
            Err(cause) => {
                if cached.is_none() {
                    let _ = tx.send(DataState::Error(Arc::new(cause))).await;
                } else {
                    debug!(code = %code, error = %cause, "refresh failed, cached emission stands");
                }
            }
        }
    }

    async fn run_by_issue(
        &self,
        issue: String,
        code: String,
        tx: mpsc::Sender<DataState<DrawRecord>>,
    ) {
        if tx.send(DataState::Loading).await.is_err() {
            return;
        }
        if GameKind::from_code(&code).is_none() {
            let _ = tx
                .send(DataState::failed(LotteryError::UnknownCode(code)))
                .await;
            return;
        }

        match self.store.by_issue(&code, &issue).await {
            Ok(Some(record)) => {
                debug!(code = %code, issue = %issue, "exact cache hit, skipping network");
                let _ = tx.send(DataState::Success(record)).await;
                return;
            }
            Ok(None) => {}
            Err(e) => warn!(code = %code, issue = %issue, error = %e, "cache lookup failed"),
        }

        if tx.is_closed() {
            return;
        }

        let result = async {
            let envelope = self.client.fetch_by_issue(&issue, &code).await?;
            Ok::<DrawRecord, LotteryError>(envelope.into_payload()?.into_record())
        }
        .await;

        match result {
            Ok(fresh) => {
                self.persist(std::slice::from_ref(&fresh), &code).await;
                let _ = tx.send(DataState::Success(fresh)).await;
            }
            Err(cause) => {
                let _ = tx.send(DataState::Error(Arc::new(cause))).await;
            }
        }
    }

    async fn run_history(
        &self,
        code: String,
        size: u32,
        force_refresh: bool,
        tx: mpsc::Sender<DataState<Vec<DrawRecord>>>,
    ) {
        if tx.send(DataState::Loading).await.is_err() {
            return;
        }
        if GameKind::from_code(&code).is_none() {
            let _ = tx
                .send(DataState::failed(LotteryError::UnknownCode(code)))
                .await;
            return;
        }
        let size = size.min(MAX_HISTORY_SIZE);

        let cached = if force_refresh {
            None
        } else {
            match self.store.history(&code, size).await {
                Ok(rows) if !rows.is_empty() => Some(rows),
                Ok(_) => None,
                Err(e) => {
                    warn!(code = %code, error = %e, "cached history query failed");
                    None
                }
            }
        };
        if let Some(rows) = &cached {
            debug!(code = %code, count = rows.len(), "serving cached history");
            if tx.send(DataState::Success(rows.clone())).await.is_err() {
                return;
            }
        }

        if tx.is_closed() {
            return;
        }

        let result = async {
            let envelope = self.client.fetch_history(&code, size).await?;
            let payloads = envelope.into_payload()?;
            Ok::<Vec<DrawRecord>, LotteryError>(
                payloads.into_iter().map(|p| p.into_record()).collect(),
            )
        }
        .await;

        match result {
            Ok(fresh) => {
                self.persist(&fresh, &code).await;
                if cached.as_ref() != Some(&fresh) {
                    let _ = tx.send(DataState::Success(fresh)).await;
                }
            }
            Err(cause) => {
                if cached.is_none() {
                    let _ = tx.send(DataState::Error(Arc::new(cause))).await;
                } else {
                    debug!(code = %code, error = %cause, "history refresh failed, cached emission stands");
                }
            }
        }
    }

    // ===== Helpers =====

    async fn cached_latest(&self, code: &str) -> Option<DrawRecord> {
        match self.store.latest(code).await {
            Ok(cached) => cached,
            Err(e) => {
                // Store faults fold into the same fallback path as a miss.
                warn!(code = %code, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn fetch_latest(&self, code: &str) -> Result<DrawRecord, LotteryError> {
        let envelope = self.client.fetch_latest(code).await?;
        let record = envelope.into_payload()?.into_record();
        self.persist(std::slice::from_ref(&record), code).await;
        Ok(record)
    }

    /// Write-through after a successful fetch. A persistence failure is
    /// logged and swallowed: the fetch succeeded, so the caller still gets
    /// its `Success`, and the next refresh repairs the cache.
    async fn persist(&self, records: &[DrawRecord], code: &str) {
        if let Err(e) = self.store.insert_batch(records).await {
            warn!(code = %code, error = %e, "failed to persist fetched draws");
            return;
        }
        if let Err(e) = self.store.evict_oldest(code, self.keep_count).await {
            warn!(code = %code, error = %e, "eviction after insert failed");
        }
    }
}

/// A live history view. Dropping or cancelling the subscription stops
/// store-change notifications and releases the underlying watch.
pub struct HistorySubscription {
    rx: mpsc::Receiver<Vec<DrawRecord>>,
    task: JoinHandle<()>,
}

impl HistorySubscription {
    /// Next delivery, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Vec<DrawRecord>> {
        self.rx.recv().await
    }

    /// Stop the subscription. Aborts the producing task and releases its
    /// store watch; subsequent `recv` calls drain to `None`.
    pub fn cancel(&mut self) {
        self.task.abort();
    }
}

impl Drop for HistorySubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//! Concurrent window aggregation
//!
//! A requested range is split into windows and every window is queried at
//! once. A single coordinator task owns the running total, the outstanding
//! count and the in-flight handles; query tasks only report back over a
//! channel. Cancellation aborts whatever is still in flight and finishes the
//! batch with the total accounted so far.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use riskwatch_types::{
    partition_with_span, BatchState, BatchSummary, Credential, TimeWindow, WindowOutcome,
    WindowReport,
};

use crate::config::ClientConfig;
use crate::query::{Endpoint, RiskListClient, RiskQuery};
use crate::transport::HttpTransport;
use crate::{ClientError, Result};

/// Launches query batches
pub struct QueryAggregator<Q: RiskQuery> {
    query: Arc<Q>,
    config: ClientConfig,
    next_id: AtomicU64,
}

impl QueryAggregator<RiskListClient> {
    /// Aggregator querying the appliance over HTTP
    pub fn over_http(transport: HttpTransport) -> Self {
        let config = transport.config().clone();
        Self::new(RiskListClient::new(transport), config)
    }
}

impl<Q: RiskQuery> QueryAggregator<Q> {
    /// Aggregator over any [`RiskQuery`]
    pub fn new(query: Q, config: ClientConfig) -> Self {
        Self {
            query: Arc::new(query),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Split `[start, end)` into windows and dispatch them all.
    ///
    /// The credential must carry a session token and base URL. Returns as
    /// soon as every window is in flight; use the handle to follow progress,
    /// cancel, or wait for the summary.
    #[instrument(skip(self, credential), fields(username = %credential.username))]
    pub async fn launch(
        &self,
        credential: &Credential,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<BatchHandle> {
        let endpoint = Arc::new(Endpoint::for_credential(credential, &self.config)?);
        let span = chrono::Duration::from_std(self.config.window_span())
            .map_err(|_| ClientError::Validation("window span out of range".into()))?;
        let windows = partition_with_span(start, end, span)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = BatchState::Idle;
        state.start()?;

        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let mut in_flight = BTreeMap::new();
        for (index, window) in windows.iter().copied().enumerate() {
            let query = Arc::clone(&self.query);
            let endpoint = Arc::clone(&endpoint);
            let tx = completion_tx.clone();
            let handle = tokio::spawn(async move {
                let result = query.count(&endpoint, &window).await;
                if tx.send(Completion { index, result }).is_err() {
                    debug!(batch = id, index, "completion arrived after the batch ended; ignored");
                }
            });
            in_flight.insert(index, handle.abort_handle());
        }
        drop(completion_tx);

        info!(batch = id, windows = windows.len(), "batch launched");

        let coordinator = Coordinator {
            id,
            state,
            windows: windows.clone(),
            in_flight,
            completions: completion_rx,
            reports: report_tx,
            cancel: cancel.clone(),
            total: 0,
            counted: 0,
            failed: 0,
            cancelled: 0,
        };

        Ok(BatchHandle {
            id,
            windows,
            canceller: BatchCanceller { token: cancel },
            reports: report_rx,
            summary: tokio::spawn(coordinator.run()),
        })
    }
}

/// Cancels a running batch. Cloneable and usable from any task.
#[derive(Debug, Clone)]
pub struct BatchCanceller {
    token: CancellationToken,
}

impl BatchCanceller {
    /// Request cancellation; later calls have no effect
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Handle to a launched batch
#[derive(Debug)]
pub struct BatchHandle {
    id: u64,
    windows: Vec<TimeWindow>,
    canceller: BatchCanceller,
    reports: mpsc::UnboundedReceiver<WindowReport>,
    summary: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Batch identifier, unique per aggregator
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Windows in dispatch order
    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// Canceller that outlives borrows of the handle
    pub fn canceller(&self) -> BatchCanceller {
        self.canceller.clone()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Next per-window report; `None` once the batch has finished and every
    /// report was received.
    pub async fn next_report(&mut self) -> Option<WindowReport> {
        self.reports.recv().await
    }

    /// Wait for the terminal summary.
    pub async fn wait(self) -> Result<BatchSummary> {
        self.summary
            .await
            .map_err(|e| ClientError::Internal(format!("batch coordinator failed: {e}")))
    }
}

struct Completion {
    index: usize,
    result: Result<u64>,
}

struct Coordinator {
    id: u64,
    state: BatchState,
    windows: Vec<TimeWindow>,
    in_flight: BTreeMap<usize, AbortHandle>,
    completions: mpsc::UnboundedReceiver<Completion>,
    reports: mpsc::UnboundedSender<WindowReport>,
    cancel: CancellationToken,
    total: u64,
    counted: usize,
    failed: usize,
    cancelled: usize,
}

impl Coordinator {
    async fn run(mut self) -> BatchSummary {
        loop {
            if self.in_flight.is_empty() {
                return self.finish(BatchState::Completed);
            }

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.abort_in_flight();
                    return self.finish(BatchState::Cancelled);
                }
                completion = self.completions.recv() => match completion {
                    Some(completion) => self.account(completion),
                    None => self.fail_silent_windows(),
                },
            }
        }
    }

    fn account(&mut self, completion: Completion) {
        let Completion { index, result } = completion;
        if self.in_flight.remove(&index).is_none() {
            warn!(batch = self.id, index, "duplicate completion ignored");
            return;
        }

        let outcome = match result {
            Ok(total) => {
                self.total = self.total.saturating_add(total);
                self.counted += 1;
                WindowOutcome::Counted { total }
            }
            Err(e) => {
                warn!(batch = self.id, index, error = %e, "window query failed");
                self.failed += 1;
                WindowOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.report(index, outcome);
    }

    // Every sender is gone but windows remain: their tasks ended without
    // reporting (panicked).
    fn fail_silent_windows(&mut self) {
        let silent = std::mem::take(&mut self.in_flight);
        for index in silent.into_keys() {
            error!(batch = self.id, index, "window task ended without reporting");
            self.failed += 1;
            self.report(
                index,
                WindowOutcome::Failed {
                    reason: "query task ended without reporting".into(),
                },
            );
        }
    }

    fn abort_in_flight(&mut self) {
        let pending = std::mem::take(&mut self.in_flight);
        for handle in pending.values() {
            handle.abort();
        }

        self.completions.close();
        while let Ok(late) = self.completions.try_recv() {
            debug!(
                batch = self.id,
                index = late.index,
                "completion arrived after cancellation; not counted"
            );
        }

        for index in pending.into_keys() {
            self.cancelled += 1;
            self.report(index, WindowOutcome::Cancelled);
        }
    }

    fn report(&self, index: usize, outcome: WindowOutcome) {
        let Some(window) = self.windows.get(index).copied() else {
            error!(batch = self.id, index, "report for unknown window");
            return;
        };
        // The receiver may be gone if the caller only waits for the summary.
        let _ = self.reports.send(WindowReport {
            index,
            window,
            outcome,
        });
    }

    fn finish(mut self, outcome: BatchState) -> BatchSummary {
        if let Err(e) = self.state.finish(outcome) {
            error!(batch = self.id, error = %e, "batch finished twice");
        }

        let summary = BatchSummary {
            state: self.state,
            total: self.total,
            windows: self.windows.len(),
            counted: self.counted,
            failed: self.failed,
            cancelled: self.cancelled,
        };
        info!(
            batch = self.id,
            state = %summary.state,
            total = summary.total,
            counted = summary.counted,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        summary
    }
}

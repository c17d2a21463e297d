//! Request coalescing.
//!
//! A single scheduler task owns the pending list. Callers hand it queries over
//! a channel and wait on a oneshot for their shaped response. On every
//! submission, every tick, and whenever the oldest query's latency budget runs
//! out, the scheduler answers what it can from the merged-result cache and
//! dispatches full or overdue batches to the aggregator, one spawned task per
//! batch.

use crate::aggregator::BatchDispatcher;
use crate::error::{EngineError, Result};
use crate::shaper::ResultShaper;
use partinfo_cache::ResponseCache;
use partinfo_core::{CoalescerConfig, Query, QueryResponse};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

const SUBMISSION_BUFFER: usize = 1024;

struct Submission {
    query: Query,
    responder: oneshot::Sender<QueryResponse>,
    received_at: Instant,
}

impl Submission {
    fn respond(self, shaper: &ResultShaper, response: QueryResponse) {
        let shaped = shaper.shape(response, &self.query.fields);
        if self.responder.send(shaped).is_err() {
            debug!(query_id = self.query.id, "Caller went away before its response");
        }
    }
}

/// Shared pieces every batch task needs.
struct Delivery {
    cache: ResponseCache,
    merged_ttl: Duration,
    shaper: ResultShaper,
}

/// Cloneable handle for submitting queries.
#[derive(Clone)]
pub struct CoalescerHandle {
    tx: mpsc::Sender<Submission>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for CoalescerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescerHandle")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

impl CoalescerHandle {
    /// Submit a query and wait for its shaped response.
    ///
    /// Queries without an id get the next free one. If the batch carrying the
    /// query fails to produce an answer for it, the response is empty.
    ///
    /// # Errors
    /// Returns [`EngineError::CoalescerClosed`] if the scheduler has stopped.
    pub async fn submit(&self, mut query: Query) -> Result<QueryResponse> {
        if query.id == 0 {
            query.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        }
        let empty = QueryResponse::empty_for(&query.target);
        let (responder, response) = oneshot::channel();
        self.tx
            .send(Submission {
                query,
                responder,
                received_at: Instant::now(),
            })
            .await
            .map_err(|_| EngineError::CoalescerClosed)?;

        Ok(response.await.unwrap_or(empty))
    }
}

/// The scheduler task's state.
pub struct Coalescer {
    dispatcher: Arc<dyn BatchDispatcher>,
    delivery: Arc<Delivery>,
    config: CoalescerConfig,
    pending: VecDeque<Submission>,
}

impl Coalescer {
    /// Start the scheduler and return a handle to it.
    ///
    /// `cache` should be the merged-result namespace. The scheduler stops once
    /// every handle is dropped, after dispatching whatever is still pending.
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(
        dispatcher: Arc<dyn BatchDispatcher>,
        cache: ResponseCache,
        merged_ttl: Duration,
        shaper: ResultShaper,
        config: CoalescerConfig,
    ) -> CoalescerHandle {
        let (tx, rx) = mpsc::channel(SUBMISSION_BUFFER);
        let coalescer = Self {
            dispatcher,
            delivery: Arc::new(Delivery {
                cache,
                merged_ttl,
                shaper,
            }),
            config,
            pending: VecDeque::new(),
        };
        tokio::spawn(coalescer.run(rx));

        CoalescerHandle {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Submission>) {
        let mut ticker = tokio::time::interval(self.config.tick().max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = self
                .pending
                .front()
                .map(|oldest| oldest.received_at + self.config.max_latency());

            tokio::select! {
                submission = rx.recv() => match submission {
                    Some(submission) => self.pending.push_back(submission),
                    None => break,
                },
                _ = ticker.tick() => {}
                () = sleep_until_some(deadline) => {}
            }

            self.process().await;
        }

        self.resolve_cached().await;
        while !self.pending.is_empty() {
            self.dispatch_batch();
        }
        debug!("Coalescer stopped");
    }

    async fn process(&mut self) {
        self.resolve_cached().await;

        let max_latency = self.config.max_latency();
        while let Some(oldest) = self.pending.front() {
            let full = self.pending.len() >= self.config.max_batch_size;
            if !full && oldest.received_at.elapsed() < max_latency {
                break;
            }
            self.dispatch_batch();
        }
    }

    /// Answer pending queries whose merged result is cached.
    async fn resolve_cached(&mut self) {
        let mut still_pending = VecDeque::with_capacity(self.pending.len());
        for submission in self.pending.drain(..) {
            let key = submission.query.fingerprint();
            match self.delivery.cache.get::<QueryResponse>(key.as_str()).await {
                Some(response) => {
                    debug!(query_id = submission.query.id, "Merged cache hit");
                    submission.respond(&self.delivery.shaper, response);
                }
                None => still_pending.push_back(submission),
            }
        }
        self.pending = still_pending;
    }

    /// Hand the oldest pending queries to a new aggregation task.
    fn dispatch_batch(&mut self) {
        let size = self.config.max_batch_size.max(1).min(self.pending.len());
        let batch: Vec<Submission> = self.pending.drain(..size).collect();
        debug!(batch = batch.len(), pending = self.pending.len(), "Dispatching batch");

        let dispatcher = Arc::clone(&self.dispatcher);
        let delivery = Arc::clone(&self.delivery);
        tokio::spawn(async move {
            let queries = batch.iter().map(|s| s.query.clone()).collect();
            let mut responses = dispatcher.dispatch(queries).await.into_iter();

            for submission in batch {
                let Some(response) = responses.next() else {
                    warn!(query_id = submission.query.id, "Batch returned no response for query");
                    let empty = QueryResponse::empty_for(&submission.query.target);
                    submission.respond(&delivery.shaper, empty);
                    continue;
                };
                if !response.is_empty() {
                    let key = submission.query.fingerprint();
                    delivery
                        .cache
                        .put(key.as_str(), &response, delivery.merged_ttl)
                        .await;
                }
                submission.respond(&delivery.shaper, response);
            }
        });
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use partinfo_core::retailers::default_retailers;
    use partinfo_core::{Mpn, Part, ResultKind};
    use std::sync::Mutex;

    /// Dispatcher that records batch sizes and answers every Mpn query with a
    /// bare part.
    #[derive(Default)]
    struct RecordingDispatcher {
        batches: Mutex<Vec<usize>>,
        drop_answers: bool,
    }

    impl RecordingDispatcher {
        fn batches(&self) -> Vec<usize> {
            self.batches.lock().expect("acquire batches lock").clone()
        }
    }

    #[async_trait]
    impl BatchDispatcher for RecordingDispatcher {
        async fn dispatch(&self, queries: Vec<Query>) -> Vec<QueryResponse> {
            self.batches
                .lock()
                .expect("acquire batches lock")
                .push(queries.len());
            if self.drop_answers {
                return Vec::new();
            }
            queries
                .iter()
                .map(|q| match &q.target {
                    partinfo_core::QueryTarget::Mpn(mpn) => {
                        QueryResponse::Match(Some(Part::new(mpn.clone(), ResultKind::Match)))
                    }
                    target => QueryResponse::empty_for(target),
                })
                .collect()
        }
    }

    fn config(max_batch_size: usize) -> CoalescerConfig {
        CoalescerConfig {
            max_batch_size,
            max_latency_ms: 100,
            tick_ms: 1000,
        }
    }

    fn spawn(dispatcher: &Arc<RecordingDispatcher>, config: CoalescerConfig) -> CoalescerHandle {
        Coalescer::spawn(
            Arc::clone(dispatcher) as Arc<dyn BatchDispatcher>,
            ResponseCache::in_memory("test:merged:"),
            Duration::from_secs(60),
            ResultShaper::new(default_retailers()),
            config,
        )
    }

    fn mpn_query(n: usize) -> Query {
        Query::mpn(Mpn::new("Yageo", format!("RC0805FR-07{n}KL")))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_batch_dispatches_without_waiting() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let handle = spawn(&dispatcher, config(3));
        let start = Instant::now();

        let responses =
            futures::future::join_all((0..3).map(|n| handle.submit(mpn_query(n)))).await;

        assert!(responses.iter().all(|r| r.as_ref().is_ok_and(|r| !r.is_empty())));
        assert_eq!(dispatcher.batches(), vec![3]);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_query_dispatches_after_latency() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let handle = spawn(&dispatcher, config(20));
        let start = Instant::now();

        let response = handle.submit(mpn_query(1)).await.expect("response");

        assert!(!response.is_empty());
        assert_eq!(dispatcher.batches(), vec![1]);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(100));
        assert!(waited < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_window_splits_into_batches() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let handle = spawn(&dispatcher, config(2));

        let responses =
            futures::future::join_all((0..5).map(|n| handle.submit(mpn_query(n)))).await;

        assert_eq!(responses.len(), 5);
        let mut batches = dispatcher.batches();
        batches.sort_unstable();
        assert_eq!(batches, vec![1, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_result_skips_dispatch() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let handle = spawn(&dispatcher, config(1));

        let first = handle.submit(mpn_query(7)).await.expect("first");
        let second = handle.submit(mpn_query(7)).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(dispatcher.batches(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_answers_resolve_empty() {
        let dispatcher = Arc::new(RecordingDispatcher {
            drop_answers: true,
            ..RecordingDispatcher::default()
        });
        let handle = spawn(&dispatcher, config(1));

        let response = handle.submit(mpn_query(1)).await.expect("response");
        assert_eq!(response, QueryResponse::Match(None));
    }
}

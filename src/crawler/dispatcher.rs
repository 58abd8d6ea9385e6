//! Bounded fan-out of message enrichment
//!
//! The stubs of one page are handed to a fixed number of workers through a bounded
//! channel; enriched messages come back through a second bounded channel and are
//! passed to the sink on the caller's task, one at a time.

use crate::crawler::enricher::MessageEnricher;
use crate::model::{Message, MessageStub};
use crate::HarvestError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// Turns a stub into a message; never fails, degraded fields are null
pub trait Enrich: Send + Sync + 'static {
    fn enrich(&self, stub: MessageStub) -> impl Future<Output = Message> + Send;
}

impl Enrich for MessageEnricher {
    fn enrich(&self, stub: MessageStub) -> impl Future<Output = Message> + Send {
        MessageEnricher::enrich(self, stub)
    }
}

/// Runs enrichment on up to `worker_count` stubs at once
#[derive(Debug, Clone)]
pub struct ParallelDispatcher {
    worker_count: usize,
}

impl ParallelDispatcher {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Enriches every stub and passes each message to `sink` exactly once
    ///
    /// Messages arrive in completion order. With a single worker that is the order
    /// of `stubs`. The first sink error stops the dispatch and is returned; messages
    /// still in flight are dropped.
    pub async fn dispatch<E, F>(
        &self,
        enricher: Arc<E>,
        stubs: Vec<MessageStub>,
        mut sink: F,
    ) -> Result<usize, HarvestError>
    where
        E: Enrich,
        F: FnMut(Message) -> Result<(), HarvestError>,
    {
        if stubs.is_empty() {
            return Ok(0);
        }

        if self.worker_count == 1 {
            let mut delivered = 0;
            for stub in stubs {
                sink(enricher.enrich(stub).await)?;
                delivered += 1;
            }
            return Ok(delivered);
        }

        let expected = stubs.len();
        let (stub_tx, stub_rx) = mpsc::channel::<MessageStub>(self.worker_count);
        let (message_tx, mut message_rx) = mpsc::channel::<Message>(self.worker_count);
        let stub_rx = Arc::new(Mutex::new(stub_rx));

        let mut workers = JoinSet::new();

        workers.spawn(async move {
            for stub in stubs {
                if stub_tx.send(stub).await.is_err() {
                    break;
                }
            }
        });

        for worker in 0..self.worker_count {
            let enricher = Arc::clone(&enricher);
            let stub_rx = Arc::clone(&stub_rx);
            let message_tx = message_tx.clone();

            workers.spawn(async move {
                loop {
                    let next = stub_rx.lock().await.recv().await;
                    let Some(stub) = next else {
                        break;
                    };

                    let message = enricher.enrich(stub).await;
                    if message_tx.send(message).await.is_err() {
                        break;
                    }
                }
                tracing::trace!("Enrichment worker {} finished", worker);
            });
        }
        drop(message_tx);

        let mut delivered = 0;
        while let Some(message) = message_rx.recv().await {
            if let Err(e) = sink(message) {
                workers.abort_all();
                return Err(e);
            }
            delivered += 1;
        }

        let mut panicked = 0;
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Enrichment worker failed: {}", e);
                panicked += 1;
            }
        }

        if panicked > 0 || delivered != expected {
            return Err(HarvestError::Worker(format!(
                "{} of {} messages enriched, {} workers failed",
                delivered, expected, panicked
            )));
        }

        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes stubs back as messages, tracking peak concurrency
    #[derive(Default)]
    struct FakeEnricher {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Enrich for FakeEnricher {
        fn enrich(&self, stub: MessageStub) -> impl Future<Output = Message> + Send {
            async move {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);

                let mut message = Message::from_parts(stub, Default::default());
                message.subject = Some(format!("subject {}", message.message_id));
                message
            }
        }
    }

    fn stubs(n: usize) -> Vec<MessageStub> {
        (0..n)
            .map(|i| MessageStub::root("test-list", "2020-January", &i.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_preserves_order() {
        let enricher = Arc::new(FakeEnricher::default());
        let mut seen = Vec::new();

        let delivered = ParallelDispatcher::new(1)
            .dispatch(enricher.clone(), stubs(5), |m| {
                seen.push(m.message_id);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(delivered, 5);
        assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
        assert_eq!(enricher.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parallel_delivers_each_message_once() {
        let enricher = Arc::new(FakeEnricher::default());
        let mut seen = Vec::new();

        let delivered = ParallelDispatcher::new(4)
            .dispatch(enricher.clone(), stubs(40), |m| {
                assert_eq!(m.subject, Some(format!("subject {}", m.message_id)));
                seen.push(m.message_id);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(delivered, 40);
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 40);
        assert!(enricher.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_empty_page() {
        let enricher = Arc::new(FakeEnricher::default());
        let delivered = ParallelDispatcher::new(4)
            .dispatch(enricher, Vec::new(), |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_sink_error_stops_dispatch() {
        let enricher = Arc::new(FakeEnricher::default());
        let mut calls = 0;

        let result = ParallelDispatcher::new(3)
            .dispatch(enricher, stubs(20), |_| {
                calls += 1;
                if calls == 2 {
                    Err(HarvestError::Worker("sink full".to_string()))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(HarvestError::Worker(_))));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_worker_count_is_at_least_one() {
        assert_eq!(ParallelDispatcher::new(0).worker_count(), 1);
    }
}

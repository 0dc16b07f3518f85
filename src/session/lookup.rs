//! Debounced overlay lookups.
//!
//! Scheduling a lookup replaces the pending one. The generation inside each
//! request is what makes superseded results discardable; aborting the old
//! task only saves work.

use crate::session::events::EngineMessage;
use crate::tui::overlay::LookupRequest;
use crate::tui::search::CandidateSource;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

#[derive(Debug)]
pub struct LookupScheduler {
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<EngineMessage>,
}

impl LookupScheduler {
    pub fn new(debounce: Duration, events: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self {
            debounce,
            pending: None,
            events,
        }
    }

    /// Run `request` against `source` once the debounce window passes.
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, request: LookupRequest, source: Arc<dyn CandidateSource>) {
        self.cancel();
        let events = self.events.clone();
        let debounce = self.debounce;
        tracing::trace!(generation = request.generation, kind = ?request.kind, query = %request.query, "lookup scheduled");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let result = source.search(&request.query).await;
            let _ = events.send(EngineMessage::LookupFinished {
                generation: request.generation,
                result,
            });
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for LookupScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::tui::overlay::{Candidate, OverlayKind};
    use async_trait::async_trait;
    use tokio::time::timeout;

    struct Echo;

    #[async_trait]
    impl CandidateSource for Echo {
        async fn search(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
            if query == "fail" {
                return Err(SearchError("boom".into()));
            }
            Ok(vec![Candidate::new(query)])
        }
    }

    fn request(generation: u64, query: &str) -> LookupRequest {
        LookupRequest {
            generation,
            kind: OverlayKind::File,
            query: query.into(),
        }
    }

    #[tokio::test]
    async fn only_the_latest_request_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = LookupScheduler::new(Duration::from_millis(30), tx);
        scheduler.schedule(request(1, "a"), Arc::new(Echo));
        scheduler.schedule(request(2, "ab"), Arc::new(Echo));

        let message = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("lookup timed out")
            .expect("channel open");
        let EngineMessage::LookupFinished { generation, result } = message else {
            panic!("unexpected message");
        };
        assert_eq!(generation, 2);
        assert_eq!(result, Ok(vec![Candidate::new("ab")]));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failures_are_delivered_as_errors() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = LookupScheduler::new(Duration::from_millis(1), tx);
        scheduler.schedule(request(7, "fail"), Arc::new(Echo));
        let Some(EngineMessage::LookupFinished { generation, result }) = rx.recv().await else {
            panic!("unexpected message");
        };
        assert_eq!(generation, 7);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancel_drops_pending_lookup() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = LookupScheduler::new(Duration::from_millis(20), tx);
        scheduler.schedule(request(1, "a"), Arc::new(Echo));
        scheduler.cancel();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }
}

//! Live refresh of the current page.
//!
//! A [`LiveRefresh`] owns one mutation subscription scoped to the rows of one
//! page. Bursts of notifications are collapsed: each notification pushes the
//! deadline out by the debounce window, and only when the window passes in
//! silence is the refresh callback run, once.
//!
//! The subscription is a scoped resource. Dropping or cancelling it stops the
//! background task, drops the pending burst (and its loading tag) and
//! unsubscribes, so a stale scope can never refresh the wrong page.

use std::future::Future;
use std::time::Duration;

use superpane_api::{DocumentStore, MutationStream, Result, Selection};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{LoadingGuard, LoadingTag, LoadingTracker};

/// Debounced mutation subscription for one page scope.
pub struct LiveRefresh {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl LiveRefresh {
    /// Subscribe to mutations of `selection` and run `on_settled` after each
    /// burst has been quiet for `debounce`.
    ///
    /// The subscription is established before this returns, so mutations made
    /// afterwards are never missed.
    pub async fn subscribe<F, Fut>(
        store: &dyn DocumentStore,
        selection: &Selection,
        debounce: Duration,
        loading: LoadingTracker,
        on_settled: F,
    ) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let stream = store.listen(selection).await?;
        let token = CancellationToken::new();
        let task = tokio::spawn(run(stream, debounce, loading, token.clone(), on_settled));
        Ok(Self { token, task })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// False once cancelled or once the store closed the channel and the
    /// last burst was handled.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for LiveRefresh {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Notifications collected since the last refresh.
struct Burst {
    deadline: Instant,
    changed: Vec<String>,
    _loading: LoadingGuard,
}

async fn run<F, Fut>(
    mut stream: MutationStream,
    debounce: Duration,
    loading: LoadingTracker,
    token: CancellationToken,
    mut on_settled: F,
) where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut burst: Option<Burst> = None;
    let mut closed = false;

    loop {
        let deadline = burst.as_ref().map(|b| b.deadline);
        if closed && deadline.is_none() {
            break;
        }

        tokio::select! {
            biased;

            _ = token.cancelled() => break,

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                // Keep the burst (and its loading tag) alive until the refresh is done
                let settled = burst.take();
                if let Some(settled) = &settled {
                    debug!(changed = ?settled.changed, "mutation burst settled, refreshing rows");
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = on_settled() => {}
                }
                drop(settled);
            }

            event = stream.next(), if !closed => match event {
                Some(Ok(event)) => {
                    let deadline = Instant::now() + debounce;
                    match burst.as_mut() {
                        Some(pending) => {
                            pending.deadline = deadline;
                            pending.changed.push(event.document_id);
                        }
                        None => {
                            burst = Some(Burst {
                                deadline,
                                changed: vec![event.document_id],
                                _loading: loading.start(LoadingTag::Reconciliation),
                            });
                        }
                    }
                }
                Some(Err(e)) => warn!(error = %e, "live update channel error"),
                None => {
                    debug!("live update channel closed");
                    closed = true;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use superpane_api::{IdScope, PhysicalRecord};
    use tokio::time::sleep;

    async fn counting_live(
        store: &MemoryStore,
        loading: &LoadingTracker,
    ) -> (Arc<AtomicUsize>, LiveRefresh) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let selection = Selection::default().with_ids(IdScope::In(vec!["a".into(), "b".into()]));
        let live = LiveRefresh::subscribe(
            store,
            &selection,
            Duration::from_millis(1000),
            loading.clone(),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        )
        .await
        .unwrap();
        (calls, live)
    }

    fn store() -> MemoryStore {
        MemoryStore::with_records([
            PhysicalRecord::new("a", "post"),
            PhysicalRecord::new("b", "post"),
            PhysicalRecord::new("c", "post"),
        ])
    }

    #[tokio::test(start_paused = true)]
    async fn burst_settles_into_one_call() {
        let store = store();
        let loading = LoadingTracker::new();
        let (calls, live) = counting_live(&store, &loading).await;

        store.patch("a", "title", "1").await;
        sleep(Duration::from_millis(400)).await;
        store.patch("b", "title", "2").await;
        sleep(Duration::from_millis(400)).await;
        assert!(loading.current().contains(LoadingTag::Reconciliation));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(700)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!loading.is_busy());
        assert!(live.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_burst() {
        let store = store();
        let loading = LoadingTracker::new();
        let (calls, live) = counting_live(&store, &loading).await;

        store.patch("a", "title", "1").await;
        sleep(Duration::from_millis(100)).await;
        live.cancel();
        sleep(Duration::from_secs(3)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!loading.is_busy());
        assert!(!live.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn other_documents_do_not_start_a_burst() {
        let store = store();
        let loading = LoadingTracker::new();
        let (calls, _live) = counting_live(&store, &loading).await;

        store.patch("c", "title", "1").await;
        sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

//! Debounced search input.
//!
//! Keystrokes are forwarded once typing pauses for the debounce window.
//! Clearing the input is forwarded right away.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

pub struct SearchDebouncer {
    tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl SearchDebouncer {
    pub fn spawn<F, Fut>(delay: Duration, on_search: F) -> Self
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, delay, on_search));
        Self { tx, task }
    }

    /// Record the current text of the search input.
    pub fn input(&self, text: impl Into<String>) {
        // A closed channel means the debouncer is being torn down
        let _ = self.tx.send(text.into());
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F, Fut>(mut rx: mpsc::UnboundedReceiver<String>, delay: Duration, mut on_search: F)
where
    F: FnMut(String) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut pending: Option<(String, Instant)> = None;

    loop {
        let deadline = pending.as_ref().map(|(_, deadline)| *deadline);
        tokio::select! {
            input = rx.recv() => match input {
                Some(text) if text.is_empty() => {
                    pending = None;
                    on_search(text).await;
                }
                Some(text) => {
                    trace!(%text, "search input");
                    pending = Some((text, Instant::now() + delay));
                }
                None => break,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((text, _)) = pending.take() {
                    on_search(text).await;
                }
            }
        }
    }
}

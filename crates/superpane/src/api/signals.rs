//! Pane-wide signals: commands broadcast to every pane that listens.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneSignal {
    /// Open the column picker
    SelectColumns,
    /// Recount and reload the current page
    Refresh,
    /// Show or hide the search input
    ToggleSearch,
}

/// Fan-out of [`PaneSignal`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct PaneSignals {
    tx: broadcast::Sender<PaneSignal>,
}

impl Default for PaneSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl PaneSignals {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Broadcast a signal; returns how many listeners received it.
    pub fn notify(&self, signal: PaneSignal) -> usize {
        self.tx.send(signal).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaneSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_listener_sees_the_signal() {
        let signals = PaneSignals::new();
        assert_eq!(signals.notify(PaneSignal::Refresh), 0);

        let mut a = signals.subscribe();
        let mut b = signals.clone().subscribe();
        assert_eq!(signals.notify(PaneSignal::ToggleSearch), 2);
        assert_eq!(a.recv().await.unwrap(), PaneSignal::ToggleSearch);
        assert_eq!(b.recv().await.unwrap(), PaneSignal::ToggleSearch);
    }

    #[tokio::test]
    async fn separate_panes_do_not_share_signals() {
        let first = PaneSignals::new();
        let second = PaneSignals::new();
        let mut rx = first.subscribe();

        assert_eq!(second.notify(PaneSignal::Refresh), 0);
        assert!(rx.try_recv().is_err());

        assert_eq!(first.notify(PaneSignal::SelectColumns), 1);
        assert_eq!(rx.recv().await.unwrap(), PaneSignal::SelectColumns);
    }
}

//! In-flight operation tracking behind the single `loading` flag.

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::watch;

/// Kinds of operation that keep the pane busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadingTag {
    Count,
    PageWindow,
    Reconciliation,
}

impl fmt::Display for LoadingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadingTag::Count => "count",
            LoadingTag::PageWindow => "page-window",
            LoadingTag::Reconciliation => "reconciliation",
        })
    }
}

/// Tags currently in flight, with how many holders each has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingSet(BTreeMap<LoadingTag, usize>);

impl LoadingSet {
    pub fn is_busy(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn contains(&self, tag: LoadingTag) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = LoadingTag> + '_ {
        self.0.keys().copied()
    }
}

/// Records which operations are in flight.
///
/// Tags are only ever removed by the [`LoadingGuard`] that added them, which
/// also covers the failure paths: a fetch that errors drops its guard and the
/// pane does not stay busy.
#[derive(Debug, Clone)]
pub struct LoadingTracker {
    tx: watch::Sender<LoadingSet>,
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LoadingSet::default());
        Self { tx }
    }

    #[must_use = "the tag is removed as soon as the guard is dropped"]
    pub fn start(&self, tag: LoadingTag) -> LoadingGuard {
        self.tx.send_modify(|set| *set.0.entry(tag).or_insert(0) += 1);
        LoadingGuard {
            tx: self.tx.clone(),
            tag,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.tx.borrow().is_busy()
    }

    pub fn current(&self) -> LoadingSet {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadingSet> {
        self.tx.subscribe()
    }
}

/// Holds one tag in the tracker until dropped.
#[derive(Debug)]
pub struct LoadingGuard {
    tx: watch::Sender<LoadingSet>,
    tag: LoadingTag,
}

impl LoadingGuard {
    pub fn tag(&self) -> LoadingTag {
        self.tag
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let tag = self.tag;
        self.tx.send_modify(|set| {
            if let Some(holders) = set.0.get_mut(&tag) {
                *holders -= 1;
                if *holders == 0 {
                    set.0.remove(&tag);
                }
            }
        });
    }
}

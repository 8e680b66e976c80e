//! The paginated client: one pane's view over a draft-aware store.
//!
//! Every input change (page, page size, user query, search field, columns,
//! explicit refresh) is a trigger. A trigger compiles the filter once and
//! runs the pipelines it needs:
//!
//! | trigger                 | count | window | rows |
//! |-------------------------|-------|--------|------|
//! | load / refresh          | yes   | yes    | yes  |
//! | user query, search field| yes   | yes    | yes  |
//! | page, page size         |       | yes    | yes  |
//! | columns                 |       |        | yes  |
//!
//! Each pipeline stamps its work with a generation and applies its result
//! only if no newer trigger started meanwhile, so a slow response can never
//! overwrite a newer one. Failures are logged and leave the last good state
//! in place.

use std::sync::Arc;

use superpane_api::{
    DocumentStore, FieldPath, LogicalDocument, PaneError, Result, Selection,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::search::SearchDebouncer;
use super::signals::{PaneSignal, PaneSignals};
use crate::config::PaneConfig;
use crate::core::{
    compile, count, reconcile, resolve_page, rows_selection, total_pages, Filter, Generation,
    LoadingSet, LoadingTag, LoadingTracker,
};
use crate::sync::LiveRefresh;

/// Everything a pane renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageState {
    /// Rows of the current page, in page order
    pub results: Vec<LogicalDocument>,
    /// Logical ids the window resolver picked for the current page
    pub page_ids: Vec<String>,
    /// Zero-based page index
    pub page: usize,
    pub page_size: usize,
    /// Distinct logical documents matching the filter
    pub total: u64,
    pub user_query: String,
    pub search_field: Option<FieldPath>,
    pub columns: Vec<FieldPath>,
    window: Option<WindowKey>,
}

impl PageState {
    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.page_size)
    }

    fn filter(&self, type_name: &str) -> Filter {
        compile(type_name, &self.user_query, self.search_field.as_ref())
    }
}

/// What `page_ids` was resolved for.
#[derive(Debug, Clone, PartialEq)]
struct WindowKey {
    page: usize,
    page_size: usize,
    filter: Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    /// Count, window and rows
    Full,
    /// Window and rows
    Window,
    /// Rows only, reusing the resolved window when it is still valid
    Rows,
}

/// Paginated, draft-aware listing of one document type.
///
/// Cloning is cheap and every clone drives the same pane.
#[derive(Clone)]
pub struct PaginatedClient {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    config: PaneConfig,
    state: watch::Sender<PageState>,
    loading: LoadingTracker,
    count_generation: Generation,
    page_generation: Generation,
    live: Mutex<Option<LiveRefresh>>,
}

impl PaginatedClient {
    /// Create a client. Nothing is fetched until [`load`](Self::load).
    pub fn new(store: Arc<dyn DocumentStore>, config: PaneConfig) -> Self {
        let state = PageState {
            page_size: config.page_size.max(1),
            search_field: config.search_field.clone(),
            columns: config.columns.clone(),
            ..PageState::default()
        };
        let (state, _) = watch::channel(state);
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                state,
                loading: LoadingTracker::new(),
                count_generation: Generation::new(),
                page_generation: Generation::new(),
                live: Mutex::new(None),
            }),
        }
    }

    // ==================== Observing ====================

    pub fn state(&self) -> PageState {
        self.inner.state.borrow().clone()
    }

    pub fn results(&self) -> Vec<LogicalDocument> {
        self.inner.state.borrow().results.clone()
    }

    pub fn page(&self) -> usize {
        self.inner.state.borrow().page
    }

    pub fn total(&self) -> u64 {
        self.inner.state.borrow().total
    }

    pub fn total_pages(&self) -> usize {
        self.inner.state.borrow().total_pages()
    }

    pub fn loading(&self) -> bool {
        self.inner.loading.is_busy()
    }

    pub fn loading_tags(&self) -> LoadingSet {
        self.inner.loading.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<PageState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<LoadingSet> {
        self.inner.loading.subscribe()
    }

    pub fn config(&self) -> &PaneConfig {
        &self.inner.config
    }

    /// Whether a live subscription for the current page is running.
    pub async fn is_live(&self) -> bool {
        self.inner
            .live
            .lock()
            .await
            .as_ref()
            .is_some_and(LiveRefresh::is_active)
    }

    // ==================== Triggers ====================

    /// Count and load the current page.
    pub async fn load(&self) {
        self.inner.trigger(Run::Full).await;
    }

    /// Recount and reload, e.g. after the store changed outside this page.
    pub async fn refresh(&self) {
        self.inner.trigger(Run::Full).await;
    }

    /// Go to `page` (zero-based). Pages past the end resolve to an empty
    /// page and are reset to the first page once the count is known.
    pub async fn set_page(&self, page: usize) {
        self.inner.state.send_modify(|s| s.page = page);
        self.inner.trigger(Run::Window).await;
    }

    pub async fn next_page(&self) {
        let (page, pages) = {
            let state = self.inner.state.borrow();
            (state.page, state.total_pages())
        };
        if page + 1 < pages {
            self.set_page(page + 1).await;
        }
    }

    pub async fn previous_page(&self) {
        let page = self.page();
        if page > 0 {
            self.set_page(page - 1).await;
        }
    }

    pub async fn set_page_size(&self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(PaneError::InvalidPageSize);
        }
        self.inner.state.send_modify(|s| s.page_size = page_size);
        self.inner.trigger(Run::Window).await;
        Ok(())
    }

    pub async fn set_user_query(&self, user_query: impl Into<String>) {
        self.inner.set_user_query(user_query.into()).await;
    }

    pub async fn set_search_field(&self, field: Option<FieldPath>) {
        self.inner.state.send_modify(|s| s.search_field = field);
        self.inner.trigger(Run::Full).await;
    }

    /// Change the projected fields. Only the rows are refetched.
    pub async fn set_columns(&self, columns: Vec<FieldPath>) {
        self.inner.state.send_modify(|s| s.columns = columns);
        self.inner.trigger(Run::Rows).await;
    }

    /// Stop live updates and discard anything still in flight.
    pub async fn close(&self) {
        self.inner.page_generation.advance();
        self.inner.count_generation.advance();
        self.inner.teardown_live().await;
    }

    // ==================== Inputs ====================

    /// A search input that forwards to [`set_user_query`](Self::set_user_query)
    /// once typing pauses.
    pub fn search_input(&self) -> SearchDebouncer {
        let weak = Arc::downgrade(&self.inner);
        SearchDebouncer::spawn(self.inner.config.search_debounce(), move |text| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.set_user_query(text).await;
                }
            }
        })
    }

    /// React to [`PaneSignal::Refresh`] until the binding is dropped.
    pub fn bind_signals(&self, signals: &PaneSignals) -> SignalBinding {
        let weak = Arc::downgrade(&self.inner);
        let mut rx = signals.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    signal = rx.recv() => match signal {
                        Ok(PaneSignal::Refresh) => {
                            let Some(inner) = weak.upgrade() else { break };
                            inner.trigger(Run::Full).await;
                        }
                        Ok(other) => debug!(signal = ?other, "signal not handled by the client"),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "pane signals lagged")
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
        SignalBinding { token, task }
    }
}

/// Keeps a client subscribed to pane signals.
pub struct SignalBinding {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SignalBinding {
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SignalBinding {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Inner {
    async fn set_user_query(self: &Arc<Self>, user_query: String) {
        self.state.send_modify(|s| s.user_query = user_query);
        self.trigger(Run::Full).await;
    }

    async fn trigger(self: &Arc<Self>, mut run: Run) {
        loop {
            let generation = self.page_generation.advance();
            self.teardown_live().await;

            let count_generation =
                (run == Run::Full).then(|| self.count_generation.advance());
            let counting = async {
                if let Some(generation) = count_generation {
                    report("count", self.run_count(generation).await);
                }
            };
            let paging = async {
                report("page", self.run_page(generation, run).await);
            };
            tokio::join!(counting, paging);

            if !self.reset_out_of_range_page(generation) {
                break;
            }
            run = Run::Window;
        }
    }

    async fn run_count(&self, generation: u64) -> Result<()> {
        let filter = self.state.borrow().filter(&self.config.type_name);
        let total = {
            let _loading = self.loading.start(LoadingTag::Count);
            count(self.store.as_ref(), &filter).await?
        };
        self.count_generation.check(generation, "count")?;
        self.state.send_modify(|s| s.total = total);
        Ok(())
    }

    async fn run_page(self: &Arc<Self>, generation: u64, run: Run) -> Result<()> {
        let state = self.state.borrow().clone();
        let filter = state.filter(&self.config.type_name);
        let key = WindowKey {
            page: state.page,
            page_size: state.page_size,
            filter: filter.clone(),
        };

        let ids = if run == Run::Rows && state.window.as_ref() == Some(&key) {
            state.page_ids
        } else {
            let _loading = self.loading.start(LoadingTag::PageWindow);
            let ids = resolve_page(self.store.as_ref(), &filter, key.page, key.page_size).await?;
            self.page_generation.check(generation, "page window")?;
            ids
        };

        let rows = {
            let _loading = self.loading.start(LoadingTag::Reconciliation);
            reconcile(self.store.as_ref(), &ids, &filter, &state.columns).await?
        };
        self.page_generation.check(generation, "reconciliation")?;

        info!(page = key.page, rows = rows.len(), "page loaded");
        let selection = rows_selection(&ids, &filter);
        self.state.send_modify(|s| {
            s.page_ids = ids.clone();
            s.results = rows;
            s.window = Some(key);
        });

        self.subscribe_live(generation, selection, ids, filter, state.columns)
            .await
    }

    async fn subscribe_live(
        self: &Arc<Self>,
        generation: u64,
        selection: Selection,
        ids: Vec<String>,
        filter: Filter,
        columns: Vec<FieldPath>,
    ) -> Result<()> {
        if !self.config.live_updates || ids.is_empty() {
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let live = LiveRefresh::subscribe(
            self.store.as_ref(),
            &selection,
            self.config.live_debounce(),
            self.loading.clone(),
            move || {
                let weak = weak.clone();
                let ids = ids.clone();
                let filter = filter.clone();
                let columns = columns.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        report(
                            "live refresh",
                            inner.refresh_rows(generation, &ids, &filter, &columns).await,
                        );
                    }
                }
            },
        )
        .await
        .map_err(|e| match e {
            PaneError::Fetch { message } => PaneError::Subscription { message },
            other => other,
        })?;

        let mut slot = self.live.lock().await;
        // A newer trigger may have torn down while we were subscribing
        self.page_generation.check(generation, "subscription")?;
        *slot = Some(live);
        debug!(generation, "live updates subscribed");
        Ok(())
    }

    async fn refresh_rows(
        &self,
        generation: u64,
        ids: &[String],
        filter: &Filter,
        columns: &[FieldPath],
    ) -> Result<()> {
        let rows = reconcile(self.store.as_ref(), ids, filter, columns).await?;
        self.page_generation.check(generation, "live refresh")?;
        self.state.send_modify(|s| s.results = rows);
        Ok(())
    }

    async fn teardown_live(&self) {
        if let Some(live) = self.live.lock().await.take() {
            live.cancel();
            debug!("live updates torn down");
        }
    }

    /// Back to the first page when the current one no longer exists.
    fn reset_out_of_range_page(&self, generation: u64) -> bool {
        if !self.page_generation.is_current(generation) {
            return false;
        }
        let reset = self.state.send_if_modified(|s| {
            if s.page > 0 && s.page >= s.total_pages() {
                s.page = 0;
                true
            } else {
                false
            }
        });
        if reset {
            info!("page out of range, back to the first page");
        }
        reset
    }
}

fn report(operation: &'static str, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_stale() => debug!(operation, error = %e, "result discarded"),
        Err(e) => warn!(operation, error = %e, "keeping previous state"),
    }
}

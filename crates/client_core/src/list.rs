//! Paginated remote list controller: fetch, filter, paginate and optimistically edit a
//! server-backed collection on behalf of a presentation layer.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use serde_json::{Map, Value};
use shared::{
    domain::{record_id, Filters, Record, DEFAULT_ID_KEY},
    error::FetchError,
    protocol::{PageQuery, RawPage},
};
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::fetcher::PageFetcher;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub type SuccessHandler = Arc<dyn Fn(&RawPage) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&FetchError) + Send + Sync>;

#[derive(Clone)]
pub struct ListOptions {
    pub page_size: u32,
    pub default_filters: Filters,
    pub auto_fetch: bool,
    pub id_key: String,
    pub debounce: Duration,
    pub on_success: Option<SuccessHandler>,
    pub on_error: Option<ErrorHandler>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_filters: Filters::new(),
            auto_fetch: true,
            id_key: DEFAULT_ID_KEY.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            on_success: None,
            on_error: None,
        }
    }
}

impl ListOptions {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_default_filters(mut self, default_filters: Filters) -> Self {
        self.default_filters = default_filters;
        self
    }

    pub fn with_auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = auto_fetch;
        self
    }

    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = id_key.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn on_success(mut self, handler: impl Fn(&RawPage) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(handler));
        self
    }

    pub fn on_error(mut self, handler: impl Fn(&FetchError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for ListOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListOptions")
            .field("page_size", &self.page_size)
            .field("default_filters", &self.default_filters)
            .field("auto_fetch", &self.auto_fetch)
            .field("id_key", &self.id_key)
            .field("debounce", &self.debounce)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything the presentation layer renders. Obtained as a snapshot; never mutated externally.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub data: Vec<Record>,
    pub loading: bool,
    pub initial_loading: bool,
    pub error: Option<String>,
    pub current_page: u32,
    pub total: u64,
    pub page_size: u32,
    pub filters: Filters,
}

impl ListState {
    fn new(page_size: u32, filters: Filters) -> Self {
        Self {
            data: Vec::new(),
            loading: false,
            initial_loading: true,
            error: None,
            current_page: 1,
            total: 0,
            page_size,
            filters,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page_size.max(1)))
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.current_page) < self.total_pages()
    }

    pub fn has_prev_page(&self) -> bool {
        self.current_page > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    Loading { page: u32 },
    Loaded { page: u32, total: u64 },
    Failed { page: u32, message: String },
    Superseded { page: u32 },
    ItemsChanged { total: u64 },
}

/// What happened to a single `fetch_data` call. Failures are reported here and in the
/// state, never as an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    /// A newer request was issued before this one completed; its result was dropped.
    Superseded,
    Rejected,
}

struct ControllerInner {
    state: ListState,
    latest_request: u64,
}

pub struct ListController {
    fetcher: Arc<dyn PageFetcher>,
    options: ListOptions,
    runtime: Handle,
    inner: Mutex<ControllerInner>,
    pending_fetch: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<ListEvent>,
}

impl ListController {
    /// Builds a controller and, with `auto_fetch`, schedules the first page load.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(fetcher: impl PageFetcher + 'static, options: ListOptions) -> Arc<Self> {
        Self::with_shared_fetcher(Arc::new(fetcher), options)
    }

    pub fn with_shared_fetcher(fetcher: Arc<dyn PageFetcher>, mut options: ListOptions) -> Arc<Self> {
        options.page_size = options.page_size.max(1);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = ListState::new(options.page_size, options.default_filters.clone());
        let controller = Arc::new(Self {
            fetcher,
            runtime: Handle::current(),
            inner: Mutex::new(ControllerInner {
                state,
                latest_request: 0,
            }),
            pending_fetch: Mutex::new(None),
            events,
            options,
        });

        if controller.options.auto_fetch {
            let client = Arc::clone(&controller);
            controller.runtime.spawn(async move {
                client.fetch_data(None, None).await;
            });
        }

        controller
    }

    pub fn snapshot(&self) -> ListState {
        self.lock_inner().state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Loads `page` (default: current page) with `filters` (default: current filters).
    ///
    /// The request and the state update run on their own task, so dropping this future
    /// stops only the wait: the fetch still settles and `loading` still clears.
    pub async fn fetch_data(
        self: &Arc<Self>,
        page: Option<u32>,
        filters: Option<Filters>,
    ) -> FetchOutcome {
        let Some((request_id, query)) = self.begin_request(page, filters) else {
            return FetchOutcome::Rejected;
        };
        let page = query.page;
        let controller = Arc::clone(self);
        let task = self
            .runtime
            .spawn(async move { controller.settle_request(request_id, query).await });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(page, "list: fetch task ended abnormally: {err}");
                self.abandon_request(request_id, page);
                FetchOutcome::Failed
            }
        }
    }

    fn begin_request(&self, page: Option<u32>, filters: Option<Filters>) -> Option<(u64, PageQuery)> {
        let (request_id, query) = {
            let mut guard = self.lock_inner();
            let page = page.unwrap_or(guard.state.current_page);
            if page == 0 {
                debug!("list: rejected fetch for page 0");
                return None;
            }
            let filters = filters.unwrap_or_else(|| guard.state.filters.clone());
            guard.latest_request += 1;
            guard.state.loading = true;
            guard.state.error = None;
            (
                guard.latest_request,
                PageQuery::new(page, guard.state.page_size, filters),
            )
        };
        let _ = self.events.send(ListEvent::Loading { page: query.page });
        Some((request_id, query))
    }

    async fn settle_request(&self, request_id: u64, query: PageQuery) -> FetchOutcome {
        let page = query.page;
        let result = self.fetcher.fetch_page(query).await;

        let mut guard = self.lock_inner();
        if guard.latest_request != request_id {
            drop(guard);
            debug!(page, request_id, "list: dropped superseded response");
            let _ = self.events.send(ListEvent::Superseded { page });
            return FetchOutcome::Superseded;
        }
        guard.state.loading = false;
        guard.state.initial_loading = false;

        match result {
            Ok(raw) => {
                let normalized = raw.normalize();
                let total = normalized.total;
                guard.state.data = normalized.items;
                guard.state.total = total;
                guard.state.current_page = page;
                drop(guard);

                debug!(page, total, "list: page loaded");
                let _ = self.events.send(ListEvent::Loaded { page, total });
                if let Some(handler) = &self.options.on_success {
                    handler(&raw);
                }
                FetchOutcome::Applied
            }
            Err(err) => {
                let message = err.display_message();
                guard.state.error = Some(message.clone());
                drop(guard);

                warn!(page, "list: fetch failed: {err}");
                let _ = self.events.send(ListEvent::Failed { page, message });
                if let Some(handler) = &self.options.on_error {
                    handler(&err);
                }
                FetchOutcome::Failed
            }
        }
    }

    /// Settles a request whose task panicked or was torn down before committing.
    fn abandon_request(&self, request_id: u64, page: u32) {
        let mut guard = self.lock_inner();
        if guard.latest_request != request_id || !guard.state.loading {
            return;
        }
        guard.state.loading = false;
        guard.state.initial_loading = false;
        let message = shared::error::FALLBACK_ERROR_MESSAGE.to_string();
        guard.state.error = Some(message.clone());
        drop(guard);
        let _ = self.events.send(ListEvent::Failed { page, message });
    }

    /// Re-issues the last query verbatim.
    pub async fn refresh(self: &Arc<Self>) -> FetchOutcome {
        let (page, filters) = {
            let guard = self.lock_inner();
            (guard.state.current_page, guard.state.filters.clone())
        };
        self.fetch_data(Some(page), Some(filters)).await
    }

    pub fn handle_page_change(self: &Arc<Self>, page: u32) {
        if page == 0 {
            return;
        }
        let filters = self.lock_inner().state.filters.clone();
        self.schedule_fetch(page, filters);
    }

    /// Shallow-merges `new_filters` into the current filters and returns to page 1.
    pub fn handle_filter_change(self: &Arc<Self>, new_filters: Filters) {
        let merged = {
            let mut guard = self.lock_inner();
            guard.state.filters.extend(new_filters);
            guard.state.current_page = 1;
            guard.state.filters.clone()
        };
        self.schedule_fetch(1, merged);
    }

    /// Restores the configured default filters and loads page 1 immediately.
    pub async fn handle_reset_filters(self: &Arc<Self>) -> FetchOutcome {
        self.cancel_pending_fetch();
        let defaults = self.options.default_filters.clone();
        {
            let mut guard = self.lock_inner();
            guard.state.filters = defaults.clone();
            guard.state.current_page = 1;
        }
        info!("list: filters reset to defaults");
        self.fetch_data(Some(1), Some(defaults)).await
    }

    /// Shallow-merges `updates` into every loaded record whose identity equals `id`.
    /// Returns whether any record matched.
    pub fn update_item(&self, id: &Value, updates: Map<String, Value>) -> bool {
        let (matched, total) = {
            let mut guard = self.lock_inner();
            let id_key = self.options.id_key.as_str();
            let mut matched = false;
            for record in guard.state.data.iter_mut() {
                if record_id(record, id_key) != Some(id) {
                    continue;
                }
                if let Some(fields) = record.as_object_mut() {
                    fields.extend(updates.clone());
                    matched = true;
                }
            }
            (matched, guard.state.total)
        };
        if matched {
            let _ = self.events.send(ListEvent::ItemsChanged { total });
        }
        matched
    }

    pub fn delete_item(&self, id: &Value) {
        let total = {
            let mut guard = self.lock_inner();
            let id_key = self.options.id_key.as_str();
            guard
                .state
                .data
                .retain(|record| record_id(record, id_key) != Some(id));
            guard.state.total = guard.state.total.saturating_sub(1);
            guard.state.total
        };
        let _ = self.events.send(ListEvent::ItemsChanged { total });
    }

    pub fn add_item(&self, item: Record) {
        let total = {
            let mut guard = self.lock_inner();
            guard.state.data.insert(0, item);
            guard.state.total += 1;
            guard.state.total
        };
        let _ = self.events.send(ListEvent::ItemsChanged { total });
    }

    /// Drops a pending debounced page/filter fetch, if any. In-flight requests are unaffected.
    pub fn cancel_pending_fetch(&self) {
        if let Some(pending) = self.lock_pending().take() {
            pending.abort();
        }
    }

    fn schedule_fetch(self: &Arc<Self>, page: u32, filters: Filters) {
        let controller: Weak<Self> = Arc::downgrade(self);
        let delay = self.options.debounce;
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(controller) = controller.upgrade() else {
                return;
            };
            // fetch_data runs on its own task, so a later reschedule cannot abort a request
            // already on the wire.
            controller.fetch_data(Some(page), Some(filters)).await;
        }));
    }

    fn lock_inner(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_fetch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        let pending = self
            .pending_fetch
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;

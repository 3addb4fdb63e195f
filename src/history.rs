use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::state::AppState;
use crate::tasks::TaskApi;
use crate::types::GeneratedImage;

/// Distance from the bottom (in pixels) that counts as "near the bottom".
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 200.0;

/// Scroll geometry reported by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Height of the visible area.
    pub viewport: f64,
    /// Total height of the scrollable content.
    pub content: f64,
}

impl ScrollPosition {
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.content - (self.offset + self.viewport) <= threshold
    }
}

/// Result of one [`HistoryPager::load_history`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// Nothing was fetched: a load was in flight, history is exhausted, or
    /// the scroll position was not near the bottom.
    Skipped,
    Loaded {
        /// Raw rows returned by the server, before filtering.
        fetched: usize,
        /// Images that became visible.
        added: usize,
        /// Whether more pages may follow.
        has_more: bool,
    },
}

/// Clears the in-flight flag on every exit path.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fetches history pages from a task server and merges them into [`AppState`].
///
/// Pages are requested by offset. The offset counts raw rows already fetched
/// this session, so tasks dropped by the completed-only filter are not
/// fetched twice. Tasks created after the first page shift later pages by
/// one row each; the id dedup in [`AppState::append_history`] absorbs the
/// resulting overlap, but a task inserted *and* pushed past the exhaustion
/// point is not seen until the next initial load.
pub struct HistoryPager<A: ?Sized> {
    api: Arc<A>,
    initial_page_size: usize,
    page_size: usize,
    scroll_threshold: f64,
    loading: AtomicBool,
    has_more: AtomicBool,
    fetched: AtomicUsize,
}

impl<A: TaskApi + ?Sized> HistoryPager<A> {
    pub fn new(api: Arc<A>, initial_page_size: usize, page_size: usize) -> Self {
        Self {
            api,
            initial_page_size: initial_page_size.max(1),
            page_size: page_size.max(1),
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
            loading: AtomicBool::new(false),
            has_more: AtomicBool::new(true),
            fetched: AtomicUsize::new(0),
        }
    }

    pub fn from_config(api: Arc<A>, config: &ClientConfig) -> Self {
        Self::new(api, config.initial_page_size, config.page_size)
    }

    pub fn with_scroll_threshold(mut self, threshold: f64) -> Self {
        self.scroll_threshold = threshold;
        self
    }

    pub fn has_more(&self) -> bool {
        self.has_more.load(Ordering::Acquire)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Load a page of history.
    ///
    /// An initial load fetches the larger first page and replaces the visible
    /// history. Later loads append the next page to the tail. Calls made
    /// while a load is in flight, or after exhaustion (unless initial), are
    /// skipped without touching the network.
    ///
    /// The offset of a later load is the number of raw rows fetched from the
    /// server so far, not the number of images shown: rows dropped by the
    /// completed-only filter still advance it, so they are never requested
    /// twice. If merging a page into `state` fails, neither the history nor
    /// the offset changes and the same page is requested again next time.
    pub async fn load_history(&self, state: &AppState, is_initial: bool) -> Result<PageLoad> {
        if !is_initial && !self.has_more() {
            return Ok(PageLoad::Skipped);
        }
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("History load already in flight");
            return Ok(PageLoad::Skipped);
        }
        let _guard = LoadingGuard(&self.loading);
        if is_initial {
            self.has_more.store(true, Ordering::Release);
        }

        let (limit, offset) = if is_initial {
            (self.initial_page_size, 0)
        } else {
            (self.page_size, self.fetched.load(Ordering::Acquire))
        };

        let tasks = self.api.list_history(limit, offset).await?;
        let fetched = tasks.len();
        let has_more = fetched >= limit;
        let images: Vec<GeneratedImage> = tasks.iter().filter_map(GeneratedImage::from_task).collect();

        let added = if is_initial {
            let count = images.len();
            state.replace_history(images)?;
            self.fetched.store(fetched, Ordering::Release);
            count
        } else {
            let added = state.append_history(images)?;
            self.fetched.fetch_add(fetched, Ordering::AcqRel);
            added
        };
        self.has_more.store(has_more, Ordering::Release);

        tracing::debug!(limit, offset, fetched, added, has_more, "Loaded history page");
        Ok(PageLoad::Loaded {
            fetched,
            added,
            has_more,
        })
    }

    /// Scroll trigger: loads the next page when `position` is near the bottom.
    pub async fn on_scroll(&self, state: &AppState, position: ScrollPosition) -> Result<PageLoad> {
        if !position.is_near_bottom(self.scroll_threshold) {
            return Ok(PageLoad::Skipped);
        }
        self.load_history(state, false).await
    }
}

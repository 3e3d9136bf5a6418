//! Search session state machine
//!
//! One `SearchSession` backs one search screen. Every search is tagged with a
//! generation number; responses that arrive after a newer search started are
//! dropped. Only one load-more runs at a time.

use crate::error::Result;
use crate::services::search::{load_more, ResultSet, SearchBackend, SearchFilter};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

pub const NOTHING_SELECTED_NOTICE: &str = "Please select at least one document to download";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchState {
    Idle,
    Searching,
    Ready,
    Failed,
    LoadingMore,
}

/// Everything a screen needs to render the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SearchState,
    pub filter: SearchFilter,
    pub results: ResultSet,
    pub selected: Vec<String>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Applied(SessionSnapshot),
    /// A newer search started before this one answered
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadMoreOutcome {
    Appended { added: usize, snapshot: SessionSnapshot },
    /// Everything is already loaded
    Exhausted,
    /// Another load-more is in flight
    Busy,
    /// No settled results to extend yet
    NotReady,
    Superseded,
}

/// What to show when the user asks to download their selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadPrompt {
    NothingSelected { notice: String },
    Confirm { ids: Vec<String>, message: String },
}

struct Inner {
    state: SearchState,
    filter: SearchFilter,
    /// Filter the current results were produced with
    results_filter: Option<SearchFilter>,
    results: ResultSet,
    selected: Vec<String>,
    generation: u64,
    loading_more: bool,
    /// Set when the last failure was a load-more, which may be retried
    load_more_failed: bool,
    last_error: Option<String>,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            filter: self.filter.clone(),
            results: self.results.clone(),
            selected: self.selected.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

pub struct SearchSession {
    backend: Arc<dyn SearchBackend>,
    inner: Mutex<Inner>,
}

impl SearchSession {
    pub fn new(backend: Arc<dyn SearchBackend>, page_size: usize) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                state: SearchState::Idle,
                filter: SearchFilter::with_page_size(page_size),
                results_filter: None,
                results: ResultSet::default(),
                selected: Vec::new(),
                generation: 0,
                loading_more: false,
                load_more_failed: false,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is only mutated in short non-panicking sections
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a new search from page 0, replacing the current results.
    pub async fn search(&self, filter: SearchFilter) -> Result<SearchOutcome> {
        filter.validate()?;
        let filter = filter.at_page(0);

        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state = SearchState::Searching;
            inner.filter = filter.clone();
            inner.loading_more = false;
            inner.load_more_failed = false;
            inner.generation
        };

        tracing::debug!("Search generation {} started", generation);
        let result = self.backend.search(&filter).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("Discarding stale search generation {}", generation);
            return Ok(SearchOutcome::Superseded);
        }

        match result {
            Ok(page) => {
                inner.results = ResultSet::first(page);
                inner.results_filter = Some(filter);
                inner.selected.clear();
                inner.state = SearchState::Ready;
                inner.last_error = None;
                Ok(SearchOutcome::Applied(inner.snapshot()))
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                inner.state = SearchState::Failed;
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch and append the next page of the current results.
    pub async fn load_more(&self) -> Result<LoadMoreOutcome> {
        let (generation, current, filter) = {
            let mut inner = self.lock();
            if inner.loading_more {
                return Ok(LoadMoreOutcome::Busy);
            }
            let resumable = match inner.state {
                SearchState::Ready => true,
                SearchState::Failed => inner.load_more_failed,
                _ => false,
            };
            if !resumable {
                return Ok(LoadMoreOutcome::NotReady);
            }
            let Some(filter) = inner.results_filter.clone() else {
                return Ok(LoadMoreOutcome::NotReady);
            };
            if !inner.results.has_more() {
                return Ok(LoadMoreOutcome::Exhausted);
            }

            inner.loading_more = true;
            inner.state = SearchState::LoadingMore;
            (inner.generation, inner.results.clone(), filter)
        };

        let result = load_more(self.backend.as_ref(), &current, &filter).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("Discarding stale load-more for generation {}", generation);
            return Ok(LoadMoreOutcome::Superseded);
        }
        inner.loading_more = false;

        match result {
            Ok(next) => {
                let added = next.records.len().saturating_sub(current.records.len());
                tracing::debug!("Loaded page {} ({} new documents)", next.page, added);
                inner.results = next;
                inner.state = SearchState::Ready;
                inner.load_more_failed = false;
                inner.last_error = None;
                Ok(LoadMoreOutcome::Appended {
                    added,
                    snapshot: inner.snapshot(),
                })
            }
            Err(e) => {
                tracing::warn!("Loading more documents failed: {}", e);
                inner.state = SearchState::Failed;
                inner.load_more_failed = true;
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Reset every criterion and search again
    pub async fn clear_filters(&self) -> Result<SearchOutcome> {
        let filter = self.lock().filter.cleared();
        self.search(filter).await
    }

    /// Select or deselect a document in the current results.
    ///
    /// Returns whether the document is now selected.
    pub fn toggle_selection(&self, id: &str) -> bool {
        let mut inner = self.lock();

        if let Some(position) = inner.selected.iter().position(|s| s == id) {
            inner.selected.remove(position);
            return false;
        }
        if !inner.results.records.iter().any(|r| r.id == id) {
            return false;
        }
        inner.selected.push(id.to_string());
        true
    }

    pub fn selected(&self) -> Vec<String> {
        self.lock().selected.clone()
    }

    pub fn request_download(&self) -> DownloadPrompt {
        let selected = self.selected();
        if selected.is_empty() {
            return DownloadPrompt::NothingSelected {
                notice: NOTHING_SELECTED_NOTICE.to_string(),
            };
        }

        DownloadPrompt::Confirm {
            message: format!("Download {} selected document(s)?", selected.len()),
            ids: selected,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }
}

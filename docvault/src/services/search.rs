//! Document search
//!
//! Filters, result pages and the two search backends: the local index
//! filtered in memory, and the paginated remote search endpoint.

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{AppError, Result};
use crate::models::{DocumentRecord, MajorHead};
use crate::remote::{DocumentApi, SearchRequest, SearchText, TagName};
use crate::services::index::DocumentIndex;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Search criteria plus the page being asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub major_head: Option<MajorHead>,
    pub minor_head: Option<String>,
    /// Every listed tag must be present
    pub tags: Vec<String>,
    /// Inclusive lower bound
    pub from_date: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to_date: Option<NaiveDate>,
    pub free_text: String,
    pub page: usize,
    pub page_size: usize,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            major_head: None,
            minor_head: None,
            tags: Vec::new(),
            from_date: None,
            to_date: None,
            free_text: String::new(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchFilter {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Changing the category always clears the subcategory
    pub fn set_major_head(&mut self, major_head: Option<MajorHead>) {
        self.major_head = major_head;
        self.minor_head = None;
    }

    pub fn set_minor_head(&mut self, minor_head: Option<&str>) {
        self.minor_head = minor_head
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
    }

    /// Same criteria, different page
    pub fn at_page(&self, page: usize) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Default criteria with this filter's page size
    pub fn cleared(&self) -> Self {
        Self::with_page_size(self.page_size)
    }

    fn minor_head(&self) -> Option<&str> {
        self.minor_head.as_deref().filter(|m| !m.is_empty())
    }

    /// Reject inconsistent filters before any I/O
    pub fn validate(&self) -> Result<()> {
        if let Some(minor) = self.minor_head() {
            let Some(major) = self.major_head else {
                return Err(AppError::Validation(
                    "Please select a category before choosing a subcategory".to_string(),
                ));
            };
            if !major.accepts_minor_head(minor) {
                return Err(AppError::Validation(format!(
                    "{} is not a subcategory of {}",
                    minor, major
                )));
            }
        }

        if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
            if from > to {
                return Err(AppError::Validation(
                    "From date cannot be after to date".to_string(),
                ));
            }
        }

        if self.page_size == 0 {
            return Err(AppError::Validation("Page size must be at least 1".to_string()));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "Page size must be at most {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }

    /// Whether a record satisfies every criterion that is set
    pub fn matches(&self, record: &DocumentRecord) -> bool {
        if self.major_head.is_some_and(|major| record.major_head != major) {
            return false;
        }
        if self.minor_head().is_some_and(|minor| record.minor_head != minor) {
            return false;
        }
        if !self.tags.iter().all(|tag| record.has_tag(tag)) {
            return false;
        }
        if self.from_date.is_some_and(|from| record.date < from) {
            return false;
        }
        if self.to_date.is_some_and(|to| record.date > to) {
            return false;
        }
        self.matches_text(record)
    }

    fn matches_text(&self, record: &DocumentRecord) -> bool {
        let needle = self.free_text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        record.title.as_deref().is_some_and(contains)
            || record.remarks.as_deref().is_some_and(contains)
            || contains(&record.minor_head)
            || record.tags.iter().any(|tag| contains(tag))
    }
}

/// One page of results from a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub records: Vec<DocumentRecord>,
    pub total_count: usize,
}

/// Results accumulated across pages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub records: Vec<DocumentRecord>,
    pub total_count: usize,
    pub page: usize,
}

impl ResultSet {
    pub fn first(page: SearchPage) -> Self {
        Self {
            records: page.records,
            total_count: page.total_count,
            page: 0,
        }
    }

    pub fn has_more(&self) -> bool {
        self.records.len() < self.total_count
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage>;
}

/// Searches the local index; everything matching comes back in one page
#[derive(Clone)]
pub struct LocalBackend {
    index: DocumentIndex,
}

impl LocalBackend {
    pub fn new(index: DocumentIndex) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SearchBackend for LocalBackend {
    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage> {
        filter.validate()?;

        let records = match self.index.load_all().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Local index unreadable, searching an empty list: {}", e);
                Vec::new()
            }
        };

        let records: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();

        tracing::debug!("Local search matched {} documents", records.len());

        Ok(SearchPage {
            total_count: records.len(),
            records,
        })
    }
}

/// Searches the remote endpoint one page at a time
#[derive(Clone)]
pub struct RemoteBackend {
    api: Arc<dyn DocumentApi>,
    user_id: String,
    timeout: Duration,
    empty_tag_placeholders: usize,
}

impl RemoteBackend {
    pub fn new(api: Arc<dyn DocumentApi>, user_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            timeout,
            empty_tag_placeholders: 0,
        }
    }

    /// Send this many `{tag_name: ""}` entries when no tags are selected,
    /// for servers that expect a non-empty list.
    pub fn with_empty_tag_placeholders(mut self, count: usize) -> Self {
        self.empty_tag_placeholders = count;
        self
    }

    pub fn build_request(&self, filter: &SearchFilter) -> SearchRequest {
        let format_date =
            |date: Option<NaiveDate>| date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();

        let mut tags: Vec<TagName> = filter
            .tags
            .iter()
            .map(|tag| TagName {
                tag_name: tag.clone(),
            })
            .collect();
        if tags.is_empty() {
            tags = vec![
                TagName {
                    tag_name: String::new()
                };
                self.empty_tag_placeholders
            ];
        }

        SearchRequest {
            major_head: filter.major_head.map(|m| m.to_string()).unwrap_or_default(),
            minor_head: filter.minor_head().unwrap_or_default().to_string(),
            from_date: format_date(filter.from_date),
            to_date: format_date(filter.to_date),
            tags,
            uploaded_by: self.user_id.clone(),
            start: filter.page * filter.page_size,
            length: filter.page_size,
            filter_id: self.user_id.clone(),
            search: SearchText {
                value: filter.free_text.clone(),
            },
        }
    }
}

#[async_trait]
impl SearchBackend for RemoteBackend {
    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage> {
        filter.validate()?;

        let request = self.build_request(filter);
        tracing::debug!(
            "Remote search: start={} length={}",
            request.start,
            request.length
        );

        let response = tokio::time::timeout(self.timeout, self.api.search_documents(&request))
            .await
            .map_err(|_| AppError::Timeout(self.timeout))??;

        if !response.status {
            let message = response
                .message
                .unwrap_or_else(|| "Failed to search documents".to_string());
            return Err(AppError::Remote(message));
        }

        let records = response
            .data
            .into_iter()
            .map(|doc| doc.into_record())
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Remote search returned {} of {} documents",
            records.len(),
            response.records_total
        );

        Ok(SearchPage {
            records,
            total_count: response.records_total,
        })
    }
}

/// Fetch the page after `current` and append it.
///
/// When everything is already loaded `current` comes back unchanged and no
/// request is made. On failure `current` is left as it was.
pub async fn load_more(
    backend: &dyn SearchBackend,
    current: &ResultSet,
    filter: &SearchFilter,
) -> Result<ResultSet> {
    if !current.has_more() {
        return Ok(current.clone());
    }

    let next_page = current.page + 1;
    let page = backend.search(&filter.at_page(next_page)).await?;

    let mut records = current.records.clone();
    records.extend(page.records);

    Ok(ResultSet {
        records,
        total_count: page.total_count,
        page: next_page,
    })
}

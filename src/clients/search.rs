//! Instrumented search index client.
//!
//! # Responsibilities
//! - Wrap a `SearchBackend` with timing, tracking and slow-query checks
//! - Provide an in-memory term-matching backend
//!
//! # Design Decisions
//! - Every call reports under the `elasticsearch` dependency kind
//! - `bulk_index` is one tracked call regardless of batch size

use dashmap::DashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::clients::observer::ThresholdObserver;
use crate::config::SearchConfig;
use crate::log::logger::Logger;
use crate::log::marker::ErrorCode;

pub const DEPENDENCY_KIND: &str = "elasticsearch";
pub const SLOW_QUERY: &str = "SLOW_QUERY";
pub const LOGGER_NAME: &str = "action_log::clients::search";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    #[error("search backend failure: {0}")]
    Backend(String),
}

impl ErrorCode for SearchError {}

/// A document that can be indexed.
pub trait Searchable: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Text matched against query terms.
    fn text(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Whitespace separated terms; a document matches if it contains any.
    pub query: String,
    pub skip: usize,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            skip: 0,
            limit: 10,
        }
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl fmt::Display for SearchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{query={}, skip={}, limit={}}}",
            self.query, self.skip, self.limit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse<T> {
    pub hits: Vec<T>,
    /// Matches before skip and limit.
    pub total: u64,
}

/// Index behind a `SearchType`.
pub trait SearchBackend<T>: Send + Sync {
    fn index(&self, document: T) -> Result<(), SearchError>;

    fn get(&self, id: &str) -> Result<Option<T>, SearchError>;

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse<T>, SearchError>;

    fn delete(&self, id: &str) -> Result<bool, SearchError>;
}

/// Case-insensitive term matching over an in-memory map.
#[derive(Debug, Default)]
pub struct MemorySearch<T> {
    documents: DashMap<String, T>,
}

impl<T> MemorySearch<T> {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }
}

impl<T: Searchable> SearchBackend<T> for MemorySearch<T> {
    fn index(&self, document: T) -> Result<(), SearchError> {
        self.documents.insert(document.id().to_string(), document);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<T>, SearchError> {
        Ok(self.documents.get(id).map(|doc| doc.value().clone()))
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse<T>, SearchError> {
        let terms: Vec<String> = request
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Err(SearchError::InvalidRequest("query must not be empty".into()));
        }

        let mut matches: Vec<(String, T)> = self
            .documents
            .iter()
            .filter(|doc| {
                let text = doc.value().text().to_lowercase();
                terms.iter().any(|term| text.contains(term.as_str()))
            })
            .map(|doc| (doc.key().clone(), doc.value().clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        let total = matches.len() as u64;
        let hits = matches
            .into_iter()
            .skip(request.skip)
            .take(request.limit)
            .map(|(_, doc)| doc)
            .collect();
        Ok(SearchResponse { hits, total })
    }

    fn delete(&self, id: &str) -> Result<bool, SearchError> {
        Ok(self.documents.remove(id).is_some())
    }
}

/// Instrumented search index of `T` documents.
pub struct SearchType<T, B = MemorySearch<T>> {
    index: String,
    backend: B,
    observer: ThresholdObserver,
    _document: PhantomData<fn() -> T>,
}

impl<T: Searchable, B: SearchBackend<T>> SearchType<T, B> {
    pub fn new(index: &str, backend: B, config: &SearchConfig) -> Self {
        Self::with_logger(index, backend, config, crate::log::get_logger(LOGGER_NAME))
    }

    pub fn with_logger(index: &str, backend: B, config: &SearchConfig, logger: Arc<Logger>) -> Self {
        Self {
            index: index.to_string(),
            backend,
            observer: ThresholdObserver::new(
                logger,
                DEPENDENCY_KIND,
                config.slow_query_threshold(),
                SLOW_QUERY,
                "slow elasticsearch query",
            ),
            _document: PhantomData,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn index(&self, document: T) -> Result<(), SearchError> {
        let id = document.id().to_string();
        self.observer.observe(
            || format!("index, index={}, id={}", self.index, id),
            || self.backend.index(document),
        )
    }

    pub fn bulk_index(&self, documents: Vec<T>) -> Result<(), SearchError> {
        let size = documents.len();
        self.observer.observe(
            || format!("bulkIndex, index={}, size={}", self.index, size),
            || documents.into_iter().try_for_each(|doc| self.backend.index(doc)),
        )
    }

    pub fn get(&self, id: &str) -> Result<Option<T>, SearchError> {
        self.observer.observe(
            || format!("get, index={}, id={}", self.index, id),
            || self.backend.get(id),
        )
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse<T>, SearchError> {
        self.observer.observe(
            || format!("search, index={}, request={}", self.index, request),
            || self.backend.search(request),
        )
    }

    pub fn delete(&self, id: &str) -> Result<bool, SearchError> {
        self.observer.observe(
            || format!("delete, index={}, id={}", self.index, id),
            || self.backend.delete(id),
        )
    }
}

impl<T, B> fmt::Debug for SearchType<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchType")
            .field("index", &self.index)
            .field("threshold", &self.observer.threshold())
            .finish()
    }
}

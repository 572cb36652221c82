//! Instrumented document store client.
//!
//! # Responsibilities
//! - Wrap a `StoreBackend` with timing, tracking and slow-operation checks
//! - Warn when a find returns more rows than expected
//! - Provide an in-memory backend for tests and the demo server
//!
//! # Design Decisions
//! - Every operation reports under the `mongoDB` dependency kind, failed
//!   operations included
//! - `replace` upserts and requires the document to carry an id
//! - `find_one` fails instead of picking one of several matches

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::clients::observer::{RowCountCheck, ThresholdObserver};
use crate::config::StoreConfig;
use crate::log::logger::Logger;
use crate::log::marker::{ErrorCode, Severity};

/// Dependency kind under which store calls are tracked.
pub const DEPENDENCY_KIND: &str = "mongoDB";
pub const SLOW_MONGODB: &str = "SLOW_MONGODB";
pub const TOO_MANY_ROWS_RETURNED: &str = "TOO_MANY_ROWS_RETURNED";
pub const LOGGER_NAME: &str = "action_log::clients::store";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key, collection={collection}, id={id}")]
    DuplicateKey { collection: String, id: String },

    #[error("entity must have id, collection={collection}")]
    MissingId { collection: String },

    #[error("more than one row returned, collection={collection}, size={size}")]
    MoreThanOneRow { collection: String, size: usize },

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> Option<&str> {
        match self {
            StoreError::DuplicateKey { .. } => Some("DUPLICATE_KEY"),
            _ => None,
        }
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// A stored entity.
pub trait Document: Clone + Send + Sync + 'static {
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);
}

/// Predicate with a printable description for debug logs.
pub struct Filter<T> {
    description: String,
    predicate: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Filter<T> {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Matches every document.
    pub fn all() -> Self {
        Self::new("{}", |_| true)
    }

    pub fn matches(&self, document: &T) -> bool {
        (self.predicate)(document)
    }
}

impl<T> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.description).finish()
    }
}

/// Storage behind a `Collection`.
pub trait StoreBackend<T>: Send + Sync {
    /// Insert a document that already has an id.
    fn insert(&self, id: &str, document: T) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Matching documents, ordered by id, at most `limit` of them.
    fn find(&self, filter: &Filter<T>, limit: Option<usize>) -> Result<Vec<T>, StoreError>;

    fn count(&self, filter: &Filter<T>) -> Result<u64, StoreError>;

    /// Insert or overwrite.
    fn replace(&self, id: &str, document: T) -> Result<(), StoreError>;

    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// In-memory backend keyed by document id.
#[derive(Debug)]
pub struct MemoryStore<T> {
    name: String,
    documents: DashMap<String, T>,
}

impl<T> MemoryStore<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<T: Document> StoreBackend<T> for MemoryStore<T> {
    fn insert(&self, id: &str, document: T) -> Result<(), StoreError> {
        match self.documents.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey {
                collection: self.name.clone(),
                id: id.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(document);
                Ok(())
            }
        }
    }

    fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.documents.get(id).map(|doc| doc.value().clone()))
    }

    fn find(&self, filter: &Filter<T>, limit: Option<usize>) -> Result<Vec<T>, StoreError> {
        let mut matches: Vec<(String, T)> = self
            .documents
            .iter()
            .filter(|doc| filter.matches(doc.value()))
            .map(|doc| (doc.key().clone(), doc.value().clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, doc)| doc)
            .collect())
    }

    fn count(&self, filter: &Filter<T>) -> Result<u64, StoreError> {
        Ok(self
            .documents
            .iter()
            .filter(|doc| filter.matches(doc.value()))
            .count() as u64)
    }

    fn replace(&self, id: &str, document: T) -> Result<(), StoreError> {
        self.documents.insert(id.to_string(), document);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.documents.remove(id).is_some())
    }
}

/// Instrumented collection of `T` documents.
pub struct Collection<T, B = MemoryStore<T>> {
    name: String,
    backend: B,
    observer: ThresholdObserver,
    rows: RowCountCheck,
    _document: PhantomData<fn() -> T>,
}

impl<T: Document, B: StoreBackend<T>> Collection<T, B> {
    /// Collection logging through the process-wide factory.
    pub fn new(name: &str, backend: B, config: &StoreConfig) -> Self {
        Self::with_logger(name, backend, config, crate::log::get_logger(LOGGER_NAME))
    }

    pub fn with_logger(name: &str, backend: B, config: &StoreConfig, logger: Arc<Logger>) -> Self {
        Self {
            name: name.to_string(),
            backend,
            observer: ThresholdObserver::new(
                logger.clone(),
                DEPENDENCY_KIND,
                config.slow_operation_threshold(),
                SLOW_MONGODB,
                "slow mongoDB query",
            ),
            rows: RowCountCheck::new(
                logger,
                config.too_many_rows_returned_threshold,
                TOO_MANY_ROWS_RETURNED,
            ),
            _document: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Insert `document`, assigning a new id if it has none. Returns the id.
    pub fn insert(&self, mut document: T) -> Result<String, StoreError> {
        let id = match document.id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                document.set_id(id.clone());
                id
            }
        };
        self.observer.observe(
            || format!("insert, collection={}, id={}", self.name, id),
            || self.backend.insert(&id, document),
        )?;
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.observer.observe(
            || format!("get, collection={}, id={}", self.name, id),
            || self.backend.get(id),
        )
    }

    /// The only document matching `filter`, if any.
    pub fn find_one(&self, filter: &Filter<T>) -> Result<Option<T>, StoreError> {
        self.observer.observe(
            || format!("findOne, collection={}, filter={}", self.name, filter),
            || {
                let mut results = self.backend.find(filter, Some(2))?;
                if results.len() > 1 {
                    return Err(StoreError::MoreThanOneRow {
                        collection: self.name.clone(),
                        size: results.len(),
                    });
                }
                Ok(results.pop())
            },
        )
    }

    pub fn find(&self, filter: &Filter<T>) -> Result<Vec<T>, StoreError> {
        self.observer.observe(
            || format!("find, collection={}, filter={}", self.name, filter),
            || {
                let results = self.backend.find(filter, None)?;
                self.rows.check(results.len());
                Ok(results)
            },
        )
    }

    pub fn count(&self, filter: &Filter<T>) -> Result<u64, StoreError> {
        self.observer.observe(
            || format!("count, collection={}, filter={}", self.name, filter),
            || self.backend.count(filter),
        )
    }

    /// Upsert `document` under its id.
    pub fn replace(&self, document: T) -> Result<(), StoreError> {
        let id = document.id().map(str::to_string);
        self.observer.observe(
            || {
                format!(
                    "replace, collection={}, id={}",
                    self.name,
                    id.as_deref().unwrap_or("null")
                )
            },
            || match id.as_deref() {
                Some(id) => self.backend.replace(id, document),
                None => Err(StoreError::MissingId {
                    collection: self.name.clone(),
                }),
            },
        )
    }

    /// Returns true if a document was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.observer.observe(
            || format!("delete, collection={}, id={}", self.name, id),
            || self.backend.delete(id),
        )
    }
}

impl<T, B> fmt::Debug for Collection<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("threshold", &self.observer.threshold())
            .finish()
    }
}

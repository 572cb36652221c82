//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use action_log::clients::store::{Document, Filter, MemoryStore, StoreBackend, StoreError};
use action_log::log::sink::MemorySink;
use action_log::log::{LoggerFactory, TraceLevelResolver};

/// Factory writing into a fresh memory sink, with the default level rules.
pub fn memory_factory() -> (LoggerFactory, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let factory = LoggerFactory::new(TraceLevelResolver::default(), sink.clone(), None);
    (factory, sink)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: Option<String>,
    pub name: String,
}

impl Account {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            name: name.to_string(),
        }
    }
}

impl Document for Account {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Memory store that sleeps before each call, taking delays in order.
pub struct DelayedStore<T> {
    inner: MemoryStore<T>,
    delays: Mutex<VecDeque<Duration>>,
}

impl<T> DelayedStore<T> {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            inner: MemoryStore::new("delayed"),
            delays: Mutex::new(delays.into_iter().collect()),
        }
    }

    fn pause(&self) {
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl<T: Document> StoreBackend<T> for DelayedStore<T> {
    fn insert(&self, id: &str, document: T) -> Result<(), StoreError> {
        self.pause();
        self.inner.insert(id, document)
    }

    fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.pause();
        self.inner.get(id)
    }

    fn find(&self, filter: &Filter<T>, limit: Option<usize>) -> Result<Vec<T>, StoreError> {
        self.pause();
        self.inner.find(filter, limit)
    }

    fn count(&self, filter: &Filter<T>) -> Result<u64, StoreError> {
        self.pause();
        self.inner.count(filter)
    }

    fn replace(&self, id: &str, document: T) -> Result<(), StoreError> {
        self.pause();
        self.inner.replace(id, document)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.pause();
        self.inner.delete(id)
    }
}

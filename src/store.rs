//! The data-access collaborator actions look records up through.
//!
//! railyard does not define storage. [`Store`] is the narrow surface an action
//! needs (find by id, filter by predicate), and [`MemoryStore`] is a plain
//! in-memory implementation for tests and demos.

use crate::error::Failure;

/// Lookup capability handed to actions.
///
/// A missing record is an ordinary `None`. What that means for the request is
/// the action's call: answer with nothing (return `None` from the action),
/// answer with a status, or fail via [`Store::find_or_fail`].
pub trait Store: Send + Sync {
    type Record;

    /// Entity name used in failure messages, e.g. `"User"`.
    fn entity(&self) -> &str;

    fn find(&self, id: &str) -> Option<Self::Record>;

    fn filter(&self, predicate: &dyn Fn(&Self::Record) -> bool) -> Vec<Self::Record>;

    /// Like [`find`](Store::find), but a missing record is a
    /// [`FailureKind::NotFound`](crate::FailureKind::NotFound) failure.
    fn find_or_fail(&self, id: &str) -> Result<Self::Record, Failure> {
        self.find(id).ok_or_else(|| Failure::not_found(self.entity(), id))
    }
}

/// An id-keyed, insertion-ordered in-memory store.
#[derive(Clone, Debug)]
pub struct MemoryStore<R> {
    entity: String,
    records: Vec<(String, R)>,
}

impl<R> MemoryStore<R> {
    pub fn new(entity: impl Into<String>) -> Self {
        Self { entity: entity.into(), records: Vec::new() }
    }

    /// Inserts or replaces the record stored under `id`.
    pub fn insert(&mut self, id: impl Into<String>, record: R) {
        let id = id.into();
        match self.records.iter_mut().find(|(k, _)| *k == id) {
            Some((_, slot)) => *slot = record,
            None => self.records.push((id, record)),
        }
    }

    pub fn with(mut self, id: impl Into<String>, record: R) -> Self {
        self.insert(id, record);
        self
    }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

impl<R: Clone + Send + Sync> Store for MemoryStore<R> {
    type Record = R;

    fn entity(&self) -> &str { &self.entity }

    fn find(&self, id: &str) -> Option<R> {
        self.records.iter().find(|(k, _)| k == id).map(|(_, r)| r.clone())
    }

    fn filter(&self, predicate: &dyn Fn(&R) -> bool) -> Vec<R> {
        self.records.iter().map(|(_, r)| r).filter(|r| predicate(r)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use serde_json::{Value, json};

    fn posts() -> MemoryStore<Value> {
        MemoryStore::new("Post")
            .with("1", json!({"title": "a", "page": 1}))
            .with("2", json!({"title": "b", "page": 2}))
            .with("3", json!({"title": "c", "page": 1}))
    }

    #[test]
    fn find_and_miss() {
        let store = posts();
        assert_eq!(store.find("2"), Some(json!({"title": "b", "page": 2})));
        assert_eq!(store.find("9"), None);
    }

    #[test]
    fn filter_keeps_insertion_order() {
        let page_one = posts().filter(&|r| r["page"] == 1);
        let titles: Vec<_> = page_one.iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("a"), json!("c")]);
    }

    #[test]
    fn insert_replaces_by_id() {
        let mut store = posts();
        store.insert("1", json!({"title": "z", "page": 4}));
        assert_eq!(store.len(), 3);
        assert_eq!(store.find("1").unwrap()["title"], "z");
    }

    #[test]
    fn find_or_fail_classifies_miss() {
        let err = posts().find_or_fail("9").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(err.message(), "couldn't find Post with id=9");
    }
}

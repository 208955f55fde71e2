use std::collections::HashMap;
use std::time::Instant;

/// Values produced by one successful poll cycle. Never mutated after publication.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: HashMap<String, String>,
    fetched_at: Instant,
}

impl Snapshot {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            fetched_at: Instant::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Keys from `expected` that this snapshot has no value for
    pub fn missing<'a>(&self, expected: &'a [String]) -> Vec<&'a str> {
        expected
            .iter()
            .filter(|k| !self.values.contains_key(k.as_str()))
            .map(String::as_str)
            .collect()
    }
}

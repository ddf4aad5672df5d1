/// Intensity-keyed range table.
///
/// Each record covers the intensity range starting at its key up to the next
/// key. Lookups take the record with the greatest key not above the query.
/// Keys are intended to be 0-255 but are not restricted.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMatrixTable<R> {
    records: BTreeMap<i32, R>,
    default: R,
}

impl<R: Default> Default for DynamicMatrixTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Default> DynamicMatrixTable<R> {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            default: R::default(),
        }
    }
}

impl<R> DynamicMatrixTable<R> {
    /// Table whose fallback record is `default` instead of `R::default()`.
    pub fn with_default(default: R) -> Self {
        Self {
            records: BTreeMap::new(),
            default,
        }
    }

    /// Insert a record, replacing any record with the same key.
    pub fn add_record(&mut self, key: i32, record: R) -> Option<R> {
        self.records.insert(key, record)
    }

    /// Record covering `key`: the greatest key <= `key`.
    ///
    /// Falls back to the default record when no range starts at or below
    /// `key`, or returns `None` if `use_default` is false.
    pub fn get_record(&self, key: i32, use_default: bool) -> Option<&R> {
        match self.records.range(..=key).next_back() {
            Some((_, record)) => Some(record),
            None if use_default => Some(&self.default),
            None => None,
        }
    }

    pub fn remove_record(&mut self, key: i32) -> Option<R> {
        self.records.remove(&key)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records in ascending key order.
    pub fn records(&self) -> impl Iterator<Item = (i32, &R)> {
        self.records.iter().map(|(&k, r)| (k, r))
    }

    pub fn default_record(&self) -> &R {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Default record followed by every stored record.
    pub fn all_records(&self) -> impl Iterator<Item = &R> {
        std::iter::once(&self.default).chain(self.records.values())
    }
}

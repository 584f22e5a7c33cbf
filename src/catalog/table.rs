use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::OnceLock};

use tracing::warn;

/// A catalog record addressable by a key.
pub trait Keyed {
    type Key: Eq + Hash + Clone + Debug;

    /// Lookup key, or `None` when the record cannot be addressed and must be skipped.
    fn key(&self) -> Option<Self::Key>;
}

/// Ordered records plus a key index built on first lookup.
///
/// Later records shadow earlier ones with the same key.
#[derive(Debug)]
pub struct Table<V: Keyed> {
    name: &'static str,
    records: Vec<V>,
    index: OnceLock<HashMap<V::Key, usize>>,
}

impl<V: Keyed> Table<V> {
    /// Wrap `records`; the index is built on first lookup.
    pub fn new(name: &'static str, records: Vec<V>) -> Self {
        Self {
            name,
            records,
            index: OnceLock::new(),
        }
    }

    /// Records in document order, including shadowed and unaddressable ones.
    pub fn records(&self) -> &[V] {
        &self.records
    }

    /// Number of records, duplicates included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record stored under `key`, if any.
    pub fn get(&self, key: &V::Key) -> Option<&V> {
        let index = self.index.get_or_init(|| self.build_index());
        index.get(key).map(|&position| &self.records[position])
    }

    /// Iterate over the addressable records, one per key.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        let index = self.index.get_or_init(|| self.build_index());
        let mut positions: Vec<usize> = index.values().copied().collect();
        positions.sort_unstable();
        positions.into_iter().map(|position| &self.records[position])
    }

    /// Swap in new records; the index is rebuilt on the next lookup.
    pub fn replace(&mut self, records: Vec<V>) {
        self.records = records;
        self.index = OnceLock::new();
    }

    fn build_index(&self) -> HashMap<V::Key, usize> {
        let mut index = HashMap::with_capacity(self.records.len());
        for (position, record) in self.records.iter().enumerate() {
            match record.key() {
                Some(key) => {
                    index.insert(key, position);
                }
                None => warn!(table = self.name, position, "catalog record has no usable key; skipped"),
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Entry {
        id: i32,
        label: &'static str,
    }

    impl Keyed for Entry {
        type Key = u32;

        fn key(&self) -> Option<u32> {
            u32::try_from(self.id).ok()
        }
    }

    fn entry(id: i32, label: &'static str) -> Entry {
        Entry { id, label }
    }

    #[test]
    fn last_duplicate_wins() {
        let table = Table::new("entries", vec![entry(1, "first"), entry(1, "second")]);
        assert_eq!(table.get(&1).map(|e| e.label), Some("second"));
        assert_eq!(table.values().count(), 1);
    }

    #[test]
    fn unaddressable_records_are_skipped() {
        let table = Table::new("entries", vec![entry(-1, "broken"), entry(2, "ok")]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&2).map(|e| e.label), Some("ok"));
        assert_eq!(table.values().count(), 1);
    }

    #[test]
    fn unknown_key_is_none() {
        let table: Table<Entry> = Table::new("entries", Vec::new());
        assert!(table.is_empty());
        assert!(table.get(&7).is_none());
    }

    #[test]
    fn replace_invalidates_the_index() {
        let mut table = Table::new("entries", vec![entry(1, "old")]);
        assert!(table.get(&1).is_some());

        table.replace(vec![entry(2, "new")]);

        assert!(table.get(&1).is_none());
        assert_eq!(table.get(&2).map(|e| e.label), Some("new"));
    }
}

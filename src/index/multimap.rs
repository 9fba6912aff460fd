use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::vfs::DocumentId;

/// Name-keyed multimap whose entries remember the document that added them.
///
/// Entries of one key are kept ordered by document id, then insertion, so
/// lookups do not depend on the order documents were analyzed in.
#[derive(Debug, Clone)]
pub struct DocMultimap<K, V> {
    entries: FxHashMap<K, Vec<(DocumentId, V)>>,
    keys_by_doc: FxHashMap<DocumentId, FxHashSet<K>>,
}

impl<K, V> Default for DocMultimap<K, V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            keys_by_doc: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> DocMultimap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc_id: DocumentId, key: K, value: V) {
        let values = self.entries.entry(key.clone()).or_default();
        let at = values.partition_point(|(doc, _)| *doc <= doc_id);
        values.insert(at, (doc_id, value));
        self.keys_by_doc.entry(doc_id).or_default().insert(key);
    }

    /// Drops everything `doc_id` contributed.
    pub fn remove_doc(&mut self, doc_id: DocumentId) {
        let Some(keys) = self.keys_by_doc.remove(&doc_id) else {
            return;
        };
        for key in keys {
            if let Some(values) = self.entries.get_mut(&key) {
                values.retain(|(doc, _)| *doc != doc_id);
                if values.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> impl Iterator<Item = &V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_with_doc(key).map(|(_, value)| value)
    }

    pub fn get_with_doc<Q>(&self, key: &Q) -> impl Iterator<Item = (DocumentId, &V)>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .into_iter()
            .flatten()
            .map(|(doc, value)| (*doc, value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Keys `doc_id` added at least one entry under.
    pub fn keys_of(&self, doc_id: DocumentId) -> impl Iterator<Item = &K> {
        self.keys_by_doc.get(&doc_id).into_iter().flatten()
    }

    pub fn values_of(&self, doc_id: DocumentId) -> impl Iterator<Item = (&K, &V)> {
        self.keys_of(doc_id).flat_map(move |key| {
            self.entries
                .get(key)
                .into_iter()
                .flatten()
                .filter(move |(doc, _)| *doc == doc_id)
                .map(move |(_, value)| (key, value))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_doc_leaves_others() {
        let mut map: DocMultimap<String, u32> = DocMultimap::new();
        map.insert(DocumentId(1), "a".to_string(), 10);
        map.insert(DocumentId(0), "a".to_string(), 20);
        map.insert(DocumentId(1), "b".to_string(), 30);

        assert_eq!(map.get("a").copied().collect::<Vec<_>>(), vec![20, 10]);

        map.remove_doc(DocumentId(1));
        assert_eq!(map.get("a").copied().collect::<Vec<_>>(), vec![20]);
        assert!(!map.contains_key("b"));
        assert_eq!(map.keys_of(DocumentId(1)).count(), 0);
    }

    #[test]
    fn test_order_does_not_depend_on_insertion() {
        let mut first: DocMultimap<&str, u32> = DocMultimap::new();
        first.insert(DocumentId(0), "k", 1);
        first.insert(DocumentId(1), "k", 2);

        let mut second: DocMultimap<&str, u32> = DocMultimap::new();
        second.insert(DocumentId(1), "k", 2);
        second.insert(DocumentId(0), "k", 1);

        assert_eq!(
            first.get("k").collect::<Vec<_>>(),
            second.get("k").collect::<Vec<_>>()
        );
    }
}

use crate::result::CrawlRecord;
use serde::Serialize;
use std::collections::HashMap;

/// A record as it appears in a pre-order walk of the crawl tree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry<'a> {
    pub url: &'a str,
    pub record: &'a CrawlRecord,
    pub depth: usize,
}

/// Crawl records keyed by URL, kept in admission order.
///
/// Parent pointers form the crawl tree. A record is only ever inserted after
/// its parent, so every chain of parents ends at a seed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStore {
    records: Vec<CrawlRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CrawlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns false, leaving the store untouched, if the
    /// URL is already present.
    pub fn insert(&mut self, record: CrawlRecord) -> bool {
        if self.index.contains_key(&record.url) {
            return false;
        }
        self.index.insert(record.url.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, url: &str) -> Option<&CrawlRecord> {
        self.index.get(url).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, url: &str) -> Option<&mut CrawlRecord> {
        self.index.get(url).map(|&i| &mut self.records[i])
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in admission order.
    pub fn records(&self) -> impl Iterator<Item = &CrawlRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<CrawlRecord> {
        self.records
    }

    /// Records with no parent.
    pub fn roots(&self) -> impl Iterator<Item = &CrawlRecord> {
        self.records.iter().filter(|r| r.parent.is_none())
    }

    /// Direct children of `url`, in admission order.
    pub fn children(&self, url: &str) -> Vec<&CrawlRecord> {
        self.records
            .iter()
            .filter(|r| r.parent.as_deref() == Some(url))
            .collect()
    }

    /// Pre-order walk from `root`: each record followed by its subtree.
    ///
    /// The parent to children index is built once up front. Returns an empty
    /// list if `root` is not in the store.
    pub fn as_tree(&self, root: &str) -> Vec<TreeEntry<'_>> {
        let Some(&root_idx) = self.index.get(root) else {
            return Vec::new();
        };

        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, record) in self.records.iter().enumerate() {
            if let Some(parent) = record.parent.as_deref() {
                children.entry(parent).or_default().push(i);
            }
        }

        let mut entries = Vec::with_capacity(self.records.len());
        let mut stack = vec![(root_idx, 0usize)];

        while let Some((idx, depth)) = stack.pop() {
            let record = &self.records[idx];
            entries.push(TreeEntry {
                url: &record.url,
                record,
                depth,
            });

            if let Some(kids) = children.get(record.url.as_str()) {
                // Reversed so the first-admitted child is visited first.
                for &kid in kids.iter().rev() {
                    stack.push((kid, depth + 1));
                }
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, parent: Option<&str>) -> CrawlRecord {
        CrawlRecord::new(url.to_string(), parent.map(str::to_string))
    }

    fn sample_store() -> CrawlStore {
        let mut store = CrawlStore::new();
        store.insert(record("http://a.test/", None));
        store.insert(record("http://a.test/b", Some("http://a.test/")));
        store.insert(record("http://a.test/c", Some("http://a.test/")));
        store.insert(record("http://a.test/b/d", Some("http://a.test/b")));
        store.insert(record("http://a.test/c/e", Some("http://a.test/c")));
        store.insert(record("http://a.test/b/f", Some("http://a.test/b")));
        store
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut store = CrawlStore::new();
        assert!(store.insert(record("http://a.test/", None)));
        assert!(!store.insert(record("http://a.test/", Some("http://x.test/"))));
        assert_eq!(store.len(), 1);
        assert!(store.get("http://a.test/").unwrap().parent.is_none());
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut store = sample_store();
        store.get_mut("http://a.test/c").unwrap().links_found = 7;
        assert_eq!(store.get("http://a.test/c").unwrap().links_found, 7);
    }

    #[test]
    fn test_records_keep_admission_order() {
        let store = sample_store();
        let urls: Vec<_> = store.records().map(|r| r.url.as_str()).collect();
        assert_eq!(urls[0], "http://a.test/");
        assert_eq!(urls[5], "http://a.test/b/f");
    }

    #[test]
    fn test_as_tree_is_preorder_with_depth() {
        let store = sample_store();
        let tree: Vec<_> = store
            .as_tree("http://a.test/")
            .into_iter()
            .map(|e| (e.url, e.depth))
            .collect();

        assert_eq!(
            tree,
            vec![
                ("http://a.test/", 0),
                ("http://a.test/b", 1),
                ("http://a.test/b/d", 2),
                ("http://a.test/b/f", 2),
                ("http://a.test/c", 1),
                ("http://a.test/c/e", 2),
            ]
        );
    }

    #[test]
    fn test_as_tree_subtree_and_missing_root() {
        let store = sample_store();
        let subtree = store.as_tree("http://a.test/c");
        assert_eq!(subtree.len(), 2);
        assert_eq!(subtree[0].depth, 0);
        assert!(store.as_tree("http://nowhere.test/").is_empty());
    }

    #[test]
    fn test_children_and_roots() {
        let store = sample_store();
        let kids: Vec<_> = store
            .children("http://a.test/b")
            .into_iter()
            .map(|r| r.url.as_str())
            .collect();
        assert_eq!(kids, vec!["http://a.test/b/d", "http://a.test/b/f"]);
        assert_eq!(store.roots().count(), 1);
    }
}

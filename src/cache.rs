use std::collections::BTreeMap;

use crate::data::loader::DataStore;
use crate::data::model::{ScanHeader, ScanId, ScanRef, ScanTable};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Scan cache
// ---------------------------------------------------------------------------

/// A fetched scan: its header and event table. Never modified once stored.
#[derive(Debug, Clone)]
pub struct CachedScan {
    pub header: ScanHeader,
    pub table: ScanTable,
}

/// Memo of fetched scans keyed by resolved scan id.
///
/// Entries are written once and live as long as the cache; there is no
/// eviction. Create one per session and pass it to every reconstruction.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: BTreeMap<ScanId, CachedScan>,
    hits: usize,
    misses: usize,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the scan for `scan`, fetching it from `store` on first use.
    ///
    /// An absolute reference that is already cached never touches the store.
    /// A relative one (e.g. `-1`) is always resolved first, since its target
    /// moves as new scans arrive, and then served from the cache if present.
    pub fn get<S: DataStore + ?Sized>(
        &mut self,
        store: &S,
        scan: ScanRef,
        fill_events: bool,
    ) -> Result<(ScanId, &CachedScan)> {
        if !scan.is_relative() && self.entries.contains_key(&scan.0) {
            self.hits += 1;
            log::debug!("Scan {scan}: cache hit");
            return Ok((scan.0, &self.entries[&scan.0]));
        }

        let header = store.resolve(scan)?;
        let id = header
            .scan_id
            .ok_or_else(|| anyhow::anyhow!("Store resolved scan {scan} without a scan_id"))?;
        if self.entries.contains_key(&id) {
            self.hits += 1;
            log::debug!("Scan {scan} resolved to {id}: cache hit");
        } else {
            self.misses += 1;
            log::debug!("Scan {scan} resolved to {id}: fetching table");
            let table = store.fetch_table(&header, fill_events)?;
            self.entries.insert(id, CachedScan { header, table });
        }
        Ok((id, &self.entries[&id]))
    }

    pub fn contains(&self, id: ScanId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since the cache was created.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use crate::error::ReconError;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    /// Store that never reports which scan a reference resolved to.
    struct AnonymousStore {
        newest: Cell<f64>,
    }

    impl DataStore for AnonymousStore {
        fn resolve(&self, _scan: ScanRef) -> anyhow::Result<ScanHeader> {
            Ok(ScanHeader::default())
        }

        fn fetch_table(&self, _header: &ScanHeader, _fill: bool) -> anyhow::Result<ScanTable> {
            let mut cols = BTreeMap::new();
            cols.insert("id".to_string(), Column::Numeric(vec![self.newest.get()]));
            ScanTable::from_columns(cols)
        }
    }

    /// In-memory store with ids 1..=3 that counts every call.
    #[derive(Default)]
    struct CountingStore {
        resolves: Cell<usize>,
        fetches: Cell<usize>,
    }

    impl DataStore for CountingStore {
        fn resolve(&self, scan: ScanRef) -> anyhow::Result<ScanHeader> {
            self.resolves.set(self.resolves.get() + 1);
            let id = if scan.is_relative() { 4 + scan.0 } else { scan.0 };
            anyhow::ensure!((1..=3).contains(&id), "no scan {scan}");
            Ok(ScanHeader {
                scan_id: Some(id),
                ..ScanHeader::default()
            })
        }

        fn fetch_table(&self, header: &ScanHeader, _fill: bool) -> anyhow::Result<ScanTable> {
            self.fetches.set(self.fetches.get() + 1);
            let id = header.scan_id.unwrap_or_default() as f64;
            let mut cols = BTreeMap::new();
            cols.insert("id".to_string(), Column::Numeric(vec![id]));
            ScanTable::from_columns(cols)
        }
    }

    #[test]
    fn absolute_hit_skips_the_store() {
        let store = CountingStore::default();
        let mut cache = ScanCache::new();

        let (id, scan) = cache.get(&store, ScanRef(2), false).unwrap();
        assert_eq!(id, 2);
        assert_eq!(scan.table.numeric("id").unwrap(), &[2.0]);

        cache.get(&store, ScanRef(2), false).unwrap();
        assert_eq!(store.resolves.get(), 1);
        assert_eq!(store.fetches.get(), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn relative_reference_shares_the_resolved_entry() {
        let store = CountingStore::default();
        let mut cache = ScanCache::new();

        let (id, _) = cache.get(&store, ScanRef(-1), false).unwrap();
        assert_eq!(id, 3);
        let (id, _) = cache.get(&store, ScanRef(3), false).unwrap();
        assert_eq!(id, 3);
        cache.get(&store, ScanRef(-1), false).unwrap();

        assert_eq!(store.fetches.get(), 1);
        assert_eq!(store.resolves.get(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn header_without_scan_id_is_rejected() {
        let store = AnonymousStore {
            newest: Cell::new(1.0),
        };
        let mut cache = ScanCache::new();
        let err = cache.get(&store, ScanRef(-1), false).unwrap_err();
        assert!(matches!(err, ReconError::Store(_)));
        assert!(cache.is_empty());

        store.newest.set(2.0);
        assert!(cache.get(&store, ScanRef(-1), false).is_err());
        assert!(!cache.contains(-1));
        assert_eq!(cache.stats(), (0, 0));
    }

    #[test]
    fn store_errors_are_not_cached() {
        let store = CountingStore::default();
        let mut cache = ScanCache::new();
        assert!(cache.get(&store, ScanRef(9), false).is_err());
        assert!(cache.is_empty());
        assert!(!cache.contains(9));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DashResult;

use super::loader::{self, DataSource};
use super::model::{DataKind, Dataset};

/// Identity of a parsed source: what it was loaded as, its name (which
/// picks the parser) and an MD5 digest of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub kind: DataKind,
    pub name: String,
    pub digest: [u8; 16],
}

impl SourceKey {
    pub fn new(kind: DataKind, name: &str, bytes: &[u8]) -> Self {
        SourceKey {
            kind,
            name: name.to_string(),
            digest: md5::compute(bytes).0,
        }
    }
}

/// Memoizes parsed datasets by [`SourceKey`].
///
/// Entries are never evicted: sources are immutable once referenced, so the
/// only invalidation is dropping the cache with the session that owns it.
/// Failed loads are not cached.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<SourceKey, Arc<Dataset>>,
    hits: u64,
    misses: u64,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the source and return the cached table for its content, parsing
    /// only on the first sighting.
    pub fn load(&mut self, source: &DataSource, kind: DataKind) -> DashResult<Arc<Dataset>> {
        let bytes = source.read()?;
        let name = source.name();
        let key = SourceKey::new(kind, &name, &bytes);

        if let Some(ds) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("Cache hit for {kind} data {name}");
            return Ok(Arc::clone(ds));
        }

        self.misses += 1;
        let ds = Arc::new(loader::load_bytes(&name, &source.extension(), &bytes, kind)?);
        self.entries.insert(key, Arc::clone(&ds));
        Ok(ds)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn upload(text: &str) -> DataSource {
        DataSource::Upload {
            name: "prod.csv".into(),
            bytes: Bytes::from(text.as_bytes().to_vec()),
        }
    }

    #[test]
    fn same_content_is_parsed_once() {
        let mut cache = LoadCache::new();
        let src = upload("Date,Oil\n2024-01-01,1\n");
        let a = cache.load(&src, DataKind::Production).unwrap();
        let b = cache.load(&src, DataKind::Production).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn different_content_or_kind_is_a_miss() {
        let mut cache = LoadCache::new();
        cache.load(&upload("Date,Oil\n2024-01-01,1\n"), DataKind::Production).unwrap();
        cache.load(&upload("Date,Oil\n2024-01-01,2\n"), DataKind::Production).unwrap();
        cache.load(&upload("Date,Oil\n2024-01-01,2\n"), DataKind::Drilling).unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = LoadCache::new();
        let bad = upload("Date\nnot-a-date\n");
        assert!(cache.load(&bad, DataKind::Production).is_err());
        assert!(cache.is_empty());
    }
}

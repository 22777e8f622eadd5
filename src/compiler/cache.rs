use std::sync::Arc;

use dashmap::DashMap;

use super::Artifact;

/// Append-only artifact cache keyed by `source_hash`.
///
/// Lets callers skip re-parsing identical sources. Entries are never
/// evicted; insertion is atomic insert-if-absent, so independent runs
/// may share one cache without further locking.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: DashMap<String, Arc<Artifact>>,
}

impl ArtifactCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an artifact by source hash
    pub fn get(&self, source_hash: &str) -> Option<Arc<Artifact>> {
        self.entries.get(source_hash).map(|e| e.value().clone())
    }

    /// Returns the cached artifact for `source_hash`, inserting the
    /// given one if absent. The first insertion wins.
    pub fn get_or_insert(&self, artifact: Artifact) -> Arc<Artifact> {
        let key = artifact.program.source_hash.clone();
        if let Some(existing) = self.entries.get(&key) {
            tracing::debug!(hash = %key, "artifact cache hit");
            return existing.value().clone();
        }
        self.entries
            .entry(key)
            .or_insert_with(|| Arc::new(artifact))
            .value()
            .clone()
    }

    /// Number of cached artifacts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    #[test]
    fn test_insert_if_absent() {
        let cache = ArtifactCache::new();
        let a1 = Compiler::default()
            .compile("py.x = 1", "a.lf")
            .unwrap()
            .artifact;
        let a2 = Compiler::default()
            .compile("py.x = 1", "b.lf")
            .unwrap()
            .artifact;

        let first = cache.get_or_insert(a1);
        let second = cache.get_or_insert(a2);

        // Same hash: the first insertion wins.
        assert_eq!(cache.len(), 1);
        assert_eq!(first.metadata.source_file, second.metadata.source_file);
    }

    #[test]
    fn test_distinct_sources_cached_separately() {
        let cache = ArtifactCache::new();
        for src in ["py.x = 1", "py.x = 2"] {
            let artifact = Compiler::default().compile(src, "s.lf").unwrap().artifact;
            cache.get_or_insert(artifact);
        }
        assert_eq!(cache.len(), 2);
    }
}

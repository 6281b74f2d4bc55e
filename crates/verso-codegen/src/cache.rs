//! Content-addressed parse cache using moka
//!
//! Canonical modules are parsed once per run no matter how many versions are
//! rendered from them. Entries are keyed by the blake3 hash of the source
//! text, so identical files share one parsed tree.

use moka::sync::Cache;
use std::sync::Arc;
use verso_syntax::{parse_module, Module, SyntaxResult};

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Parsed-module cache
#[derive(Debug, Clone)]
pub struct ModuleCache {
    inner: Cache<blake3::Hash, Arc<Module>>,
}

impl ModuleCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Parse source, reusing a cached tree for identical text
    ///
    /// # Errors
    /// Returns the parser's error; failures are not cached.
    pub fn parse(&self, source: &str) -> SyntaxResult<Arc<Module>> {
        let hash = blake3::hash(source.as_bytes());
        if let Some(cached) = self.inner.get(&hash) {
            return Ok(cached);
        }

        let module = Arc::new(parse_module(source)?);
        self.inner.insert(hash, Arc::clone(&module));
        Ok(module)
    }

    /// Check if source text has a cached tree
    #[inline]
    #[must_use]
    pub fn contains(&self, source: &str) -> bool {
        self.inner.contains_key(&blake3::hash(source.as_bytes()))
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    ///
    /// moka updates its counters lazily; call [`ModuleCache::sync`] first for
    /// exact numbers.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Run pending maintenance so statistics are current
    #[inline]
    pub fn sync(&self) {
        self.inner.run_pending_tasks();
    }
}

impl Default for ModuleCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

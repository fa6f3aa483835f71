use crate::util::write_atomic;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The raw forum documents kept per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheResource {
    Latest,
    Categories,
}

impl CacheResource {
    pub fn file_name(self) -> &'static str {
        match self {
            CacheResource::Latest => "latest.json",
            CacheResource::Categories => "categories.json",
        }
    }
}

/// A cached document as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub instance_key: String,
    pub payload: Vec<u8>,
    pub written_at: Option<DateTime<Utc>>,
}

/// On-disk snapshot of the last topic list and category list for one
/// instance, under `<root>/<instance_key>/`.
///
/// Entries never expire. Each successful fetch overwrites its file, and only
/// [`InstanceCache::invalidate_all`] (or deleting the directory) removes them.
/// Readers treat any failure as a miss.
#[derive(Debug, Clone)]
pub struct InstanceCache {
    root: PathBuf,
    instance_key: String,
}

impl InstanceCache {
    pub fn new(root: impl Into<PathBuf>, base_url: &Url) -> Self {
        Self {
            root: root.into(),
            instance_key: Self::instance_key(base_url),
        }
    }

    /// Base URL with the scheme stripped: `https://forum.example.com/` →
    /// `forum.example.com`.
    ///
    /// A port or sub-path is kept, with `:` and `/` mapped to `_` so the key
    /// is a single portable directory name.
    pub fn instance_key(base_url: &Url) -> String {
        let host = base_url.host_str().unwrap_or("unknown");
        let mut key = match base_url.port() {
            Some(port) => format!("{}_{}", host, port),
            None => host.to_string(),
        };
        let path = base_url.path().trim_matches('/');
        if !path.is_empty() {
            key.push('_');
            key.push_str(&path.replace('/', "_"));
        }
        key
    }

    pub fn key(&self) -> &str {
        &self.instance_key
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.instance_key)
    }

    fn path_for(&self, resource: CacheResource) -> PathBuf {
        self.dir().join(resource.file_name())
    }

    /// Read a cached document. A missing file is `Ok(None)`.
    pub fn read(&self, resource: CacheResource) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.path_for(resource);
        let payload = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let written_at = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(Some(CacheEntry {
            instance_key: self.instance_key.clone(),
            payload,
            written_at,
        }))
    }

    /// Overwrite the cached copy of `resource` with `payload`.
    pub fn write(&self, resource: CacheResource, payload: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(resource);
        write_atomic(&path, payload).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            bytes = payload.len(),
            "Wrote instance cache entry"
        );
        Ok(())
    }

    /// Best-effort write: failures are logged, never returned.
    pub fn store(&self, resource: CacheResource, payload: &[u8]) {
        if let Err(e) = self.write(resource, payload) {
            tracing::warn!(error = %e, resource = resource.file_name(), "Failed to update instance cache");
        }
    }

    /// Wipe the cache for every instance under `root`. Returns false if there
    /// was nothing to remove.
    pub fn invalidate_all(root: &Path) -> Result<bool, CacheError> {
        match std::fs::remove_dir_all(root) {
            Ok(()) => {
                tracing::info!(path = %root.display(), "Removed instance cache");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io {
                path: root.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_instance_key_strips_scheme() {
        assert_eq!(
            InstanceCache::instance_key(&url("https://forum.example.com")),
            "forum.example.com"
        );
        assert_eq!(
            InstanceCache::instance_key(&url("http://127.0.0.1:8080/")),
            "127.0.0.1_8080"
        );
        assert_eq!(
            InstanceCache::instance_key(&url("https://example.com/community/")),
            "example.com_community"
        );
    }

    #[test]
    fn test_read_miss_then_write_then_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let cache = InstanceCache::new(dir.path(), &url("https://forum.example.com"));

        assert!(cache.read(CacheResource::Latest).unwrap().is_none());

        cache.write(CacheResource::Latest, b"{\"v\":1}").unwrap();
        cache.write(CacheResource::Latest, b"{\"v\":2}").unwrap();

        let entry = cache.read(CacheResource::Latest).unwrap().unwrap();
        assert_eq!(entry.payload, b"{\"v\":2}");
        assert_eq!(entry.instance_key, "forum.example.com");
        assert!(entry.written_at.is_some());
        assert!(cache.read(CacheResource::Categories).unwrap().is_none());
    }

    #[test]
    fn test_instances_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let a = InstanceCache::new(dir.path(), &url("https://a.example.com"));
        let b = InstanceCache::new(dir.path(), &url("https://b.example.com"));

        a.write(CacheResource::Categories, b"a").unwrap();
        assert!(b.read(CacheResource::Categories).unwrap().is_none());
    }

    #[test]
    fn test_invalidate_all() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("instances");
        let cache = InstanceCache::new(&root, &url("https://forum.example.com"));
        cache.write(CacheResource::Latest, b"x").unwrap();

        assert!(InstanceCache::invalidate_all(&root).unwrap());
        assert!(cache.read(CacheResource::Latest).unwrap().is_none());
        assert!(!InstanceCache::invalidate_all(&root).unwrap());
    }
}

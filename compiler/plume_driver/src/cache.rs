//! Content-addressed rewrite cache.
//!
//! One [`CacheDocument`] per build maps each source path to the hash of
//! the text that was lowered and the lowered text. The document carries the
//! configuration hash it was produced under; a document written under a
//! different configuration is discarded wholesale.
//!
//! # Lifecycle
//!
//! ```text
//! open (load → invalidate → prune) → lookup/insert per file → persist
//! ```
//!
//! Loading and saving go through a [`CacheStore`], so tests can swap the
//! file system for a [`MemoryStore`].

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::hash::ContentHash;

/// Bumped whenever the document layout changes.
pub const CACHE_FORMAT: u32 = 1;

/// Extension of the persisted document.
pub const CACHE_EXTENSION: &str = "plume-cache";

/// Stored result of lowering one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: ContentHash,
    pub lowered: String,
}

/// The persisted form of the cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDocument {
    pub format: u32,
    pub config_hash: ContentHash,
    pub entries: BTreeMap<PathBuf, CacheEntry>,
}

impl CacheDocument {
    #[must_use]
    pub fn new(config_hash: ContentHash) -> Self {
        CacheDocument {
            format: CACHE_FORMAT,
            config_hash,
            entries: BTreeMap::new(),
        }
    }
}

/// Where a cache document is kept.
pub trait CacheStore: Send + Sync {
    /// Load the stored document; `Ok(None)` when nothing is stored yet.
    fn load(&self) -> Result<Option<CacheDocument>, CacheError>;

    fn save(&self, document: &CacheDocument) -> Result<(), CacheError>;
}

/// Cache document on disk, encoded with `bincode`.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// Store beside the build intermediates of `output`:
    /// `<dir of output>/obj/<output stem>.plume-cache`.
    #[must_use]
    pub fn for_output(output: &Path) -> Self {
        let dir = output.parent().unwrap_or_else(|| Path::new(""));
        let stem = output
            .file_stem()
            .map_or_else(|| "build".into(), |s| s.to_string_lossy());
        FileStore::new(dir.join("obj").join(format!("{stem}.{CACHE_EXTENSION}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for FileStore {
    fn load(&self) -> Result<Option<CacheDocument>, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&self.path, &e)),
        };
        let document: CacheDocument =
            bincode::deserialize(&bytes).map_err(|e| CacheError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        if document.format != CACHE_FORMAT {
            return Err(CacheError::Corrupt {
                path: self.path.clone(),
                message: format!(
                    "format {} (expected {CACHE_FORMAT})",
                    document.format
                ),
            });
        }
        Ok(Some(document))
    }

    fn save(&self, document: &CacheDocument) -> Result<(), CacheError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, &e))?;
        }
        let bytes = bincode::serialize(document).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        // Write then rename so a crashed build never leaves half a document.
        let tmp = self.path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
        fs::write(&tmp, bytes).map_err(|e| CacheError::io(&tmp, &e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CacheError::io(&self.path, &e))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<CacheDocument>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    #[must_use]
    pub fn with_document(document: CacheDocument) -> Self {
        MemoryStore {
            document: Mutex::new(Some(document)),
            saves: Mutex::new(0),
        }
    }

    /// The last saved document.
    pub fn document(&self) -> Option<CacheDocument> {
        self.document.lock().clone()
    }

    /// Number of times `save` was called.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<Option<CacheDocument>, CacheError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &CacheDocument) -> Result<(), CacheError> {
        *self.document.lock() = Some(document.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// The cache for one build.
///
/// Lookups and inserts take `&self` and may run from several file
/// pipelines at once.
pub struct RewriteCache {
    store: Arc<dyn CacheStore>,
    config_hash: ContentHash,
    entries: DashMap<PathBuf, CacheEntry>,
}

impl RewriteCache {
    /// Load the stored document and keep what is still valid.
    ///
    /// A document from another configuration, or any document when
    /// `force_rebuild` is set, is dropped entirely. Entries for paths
    /// outside `build_set` are pruned. A store that cannot be read is
    /// logged and treated as empty.
    pub fn open(
        store: Arc<dyn CacheStore>,
        config_hash: ContentHash,
        force_rebuild: bool,
        build_set: &[PathBuf],
    ) -> Self {
        let entries = DashMap::new();
        let document = match store.load() {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "discarding unreadable rewrite cache");
                None
            }
        };

        if let Some(document) = document {
            if force_rebuild {
                debug!(entries = document.entries.len(), "forced rebuild, cache discarded");
            } else if document.config_hash != config_hash {
                debug!(
                    stored = %document.config_hash,
                    current = %config_hash,
                    "configuration changed, cache discarded"
                );
            } else {
                let keep: FxHashSet<&Path> = build_set.iter().map(PathBuf::as_path).collect();
                let mut pruned = 0usize;
                for (path, entry) in document.entries {
                    if keep.contains(path.as_path()) {
                        entries.insert(path, entry);
                    } else {
                        pruned += 1;
                    }
                }
                debug!(kept = entries.len(), pruned, "rewrite cache loaded");
            }
        }

        RewriteCache {
            store,
            config_hash,
            entries,
        }
    }

    /// Lowered text for `path`, if it was produced from the same content.
    pub fn lookup(&self, path: &Path, content_hash: ContentHash) -> Option<String> {
        let entry = self.entries.get(path)?;
        (entry.content_hash == content_hash).then(|| entry.lowered.clone())
    }

    pub fn insert(&self, path: PathBuf, content_hash: ContentHash, lowered: String) {
        self.entries.insert(
            path,
            CacheEntry {
                content_hash,
                lowered,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config_hash(&self) -> ContentHash {
        self.config_hash
    }

    /// Snapshot of the current entries as a document.
    pub fn to_document(&self) -> CacheDocument {
        let mut document = CacheDocument::new(self.config_hash);
        for item in &self.entries {
            document
                .entries
                .insert(item.key().clone(), item.value().clone());
        }
        document
    }

    /// Write the cache back to its store.
    pub fn persist(&self) -> Result<(), CacheError> {
        let document = self.to_document();
        debug!(entries = document.entries.len(), "persisting rewrite cache");
        self.store.save(&document)
    }
}

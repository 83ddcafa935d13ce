//! Plume Driver - builds a set of files through the lowering pipeline.
//!
//! The driver owns everything around a single unit's lowering:
//!
//! - **Hashing** (`hash`): content hashes for source texts and the build
//!   configuration.
//! - **Configuration** (`config`): [`BuildConfig`] and [`DriverOptions`].
//! - **Rewrite cache** (`cache`): a content-addressed map from file path to
//!   lowered text, loaded once per build and persisted once at the end.
//! - **Driver** (`driver`): runs parse, lower and print per file, either
//!   sequentially or on the rayon pool, and reports per-file results.
//!
//! # Cache Semantics
//!
//! A file is served from the cache only when both its text hash and the
//! configuration hash match what was stored. Unreadable caches are logged
//! and treated as empty; they never fail a build.

mod cache;
mod config;
mod driver;
mod error;
mod hash;

use std::sync::Once;

pub use cache::{
    CacheDocument, CacheEntry, CacheStore, FileStore, MemoryStore, RewriteCache, CACHE_EXTENSION,
    CACHE_FORMAT,
};
pub use config::{BuildConfig, DriverOptions, Reference};
pub use driver::{lower_text, BuildReport, Driver, LoweredFile, SourceFile};
pub use error::{CacheError, PipelineError};
pub use hash::{combine_hashes, hash_str, ContentHash};

static TRACING_INIT: Once = Once::new();

/// Initialize the tracing subscriber.
///
/// Does nothing unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=plume_lower=debug,plume_driver=debug`. Safe to call more than
/// once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

//! Build driver: runs the lowering pipeline over a set of files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use plume_ir::{print_unit, SourceModel};
use plume_lower::lower_tree;

use crate::cache::{CacheStore, FileStore, RewriteCache};
use crate::config::{BuildConfig, DriverOptions};
use crate::error::PipelineError;
use crate::hash::hash_str;

/// One input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// One lowered file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredFile {
    pub path: PathBuf,
    pub text: String,
    /// Served from the rewrite cache without running any pass.
    pub from_cache: bool,
}

/// Outcome of a build, one result per input in input order.
#[derive(Debug)]
pub struct BuildReport {
    pub results: Vec<Result<LoweredFile, PipelineError>>,
}

impl BuildReport {
    pub fn hits(&self) -> usize {
        self.lowered().filter(|f| f.from_cache).count()
    }

    pub fn misses(&self) -> usize {
        self.lowered().filter(|f| !f.from_cache).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &PipelineError> {
        self.results.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn lowered(&self) -> impl Iterator<Item = &LoweredFile> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }
}

/// Lowers files through a front end, consulting the rewrite cache.
pub struct Driver<S> {
    source: S,
    config: BuildConfig,
    options: DriverOptions,
    store: Arc<dyn CacheStore>,
}

impl<S: SourceModel> Driver<S> {
    /// Driver that keeps its cache beside `config.output`.
    pub fn new(source: S, config: BuildConfig) -> Self {
        let store = Arc::new(FileStore::for_output(config.output()));
        Driver::with_store(source, config, store)
    }

    pub fn with_store(source: S, config: BuildConfig, store: Arc<dyn CacheStore>) -> Self {
        Driver {
            source,
            config,
            options: DriverOptions::default(),
            store,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lower every file of one build.
    ///
    /// A failing file does not stop the others. The cache is persisted
    /// once, after every file is done; a cache that cannot be written is
    /// logged and the build still succeeds.
    #[tracing::instrument(level = "debug", skip_all, fields(files = files.len()))]
    pub fn build(&self, files: &[SourceFile]) -> BuildReport {
        let build_set: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let cache = RewriteCache::open(
            Arc::clone(&self.store),
            self.config.config_hash(),
            self.options.force_rebuild,
            &build_set,
        );

        let results: Vec<_> = if self.options.parallel {
            files.par_iter().map(|f| self.lower_file(&cache, f)).collect()
        } else {
            files.iter().map(|f| self.lower_file(&cache, f)).collect()
        };

        if let Err(e) = cache.persist() {
            warn!(error = %e, "failed to persist rewrite cache");
        }
        let report = BuildReport { results };
        debug!(
            hits = report.hits(),
            misses = report.misses(),
            errors = report.errors().count(),
            "build finished"
        );
        report
    }

    /// Lower one file, or serve it from the cache when its text is unchanged.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %file.path.display()))]
    pub fn lower_file(
        &self,
        cache: &RewriteCache,
        file: &SourceFile,
    ) -> Result<LoweredFile, PipelineError> {
        let content_hash = hash_str(&file.text);
        if let Some(text) = cache.lookup(&file.path, content_hash) {
            debug!(hash = %content_hash, "cache hit");
            return Ok(LoweredFile {
                path: file.path.clone(),
                text,
                from_cache: true,
            });
        }
        debug!(hash = %content_hash, "cache miss");

        let text = lower_text(&self.source, &file.path, &file.text)?;
        cache.insert(file.path.clone(), content_hash, text.clone());
        Ok(LoweredFile {
            path: file.path.clone(),
            text,
            from_cache: false,
        })
    }
}

/// Parse, lower and print one source text without any caching.
pub fn lower_text<S: SourceModel>(
    source: &S,
    path: &Path,
    text: &str,
) -> Result<String, PipelineError> {
    let tree = source
        .parse(text)
        .map_err(|e| PipelineError::parse(path, text, e))?;
    let lowered = lower_tree(source, tree).map_err(|e| PipelineError::lower(path, text, e))?;
    Ok(print_unit(&lowered))
}

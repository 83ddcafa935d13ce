//! Build configuration and driver options.

use std::path::{Path, PathBuf};

use crate::hash::{combine_hashes, hash_str, ContentHash};

/// How the driver runs a build.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// Lower files on the rayon thread pool.
    pub parallel: bool,
    /// Discard every cached rewrite before the build.
    pub force_rebuild: bool,
}

impl DriverOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_force_rebuild(mut self, force: bool) -> Self {
        self.force_rebuild = force;
        self
    }
}

/// A library the build references, identified by name and timestamp.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
    pub identity: String,
    pub timestamp: u64,
}

/// Everything a cached rewrite depends on besides the source text.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// Path of the build output; the cache document lives beside it.
    pub output: PathBuf,
    /// Compiler options as `(name, value)` pairs.
    pub options: Vec<(String, String)>,
    pub references: Vec<Reference>,
    /// Version of the lowering tool.
    pub tool_version: String,
}

impl BuildConfig {
    #[must_use]
    pub fn new(output: impl Into<PathBuf>) -> Self {
        BuildConfig {
            output: output.into(),
            options: Vec::new(),
            references: Vec::new(),
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_reference(mut self, identity: impl Into<String>, timestamp: u64) -> Self {
        self.references.push(Reference {
            identity: identity.into(),
            timestamp,
        });
        self
    }

    #[must_use]
    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = version.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Hash of the options, references and tool version.
    ///
    /// Options and references are sorted first, so declaration order does
    /// not matter. The output path is not part of the hash.
    #[must_use]
    pub fn config_hash(&self) -> ContentHash {
        let mut options = self.options.clone();
        options.sort();
        let mut references = self.references.clone();
        references.sort();

        let mut parts = Vec::with_capacity(options.len() + references.len() + 1);
        for (name, value) in &options {
            parts.push(hash_str(&format!("option:{name}={value}")));
        }
        for reference in &references {
            parts.push(hash_str(&format!(
                "reference:{}@{}",
                reference.identity, reference.timestamp
            )));
        }
        parts.push(hash_str(&format!("tool:{}", self.tool_version)));
        combine_hashes(&parts)
    }
}

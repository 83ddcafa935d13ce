//! Driver errors.

use std::path::{Path, PathBuf};

use plume_ir::{ParseError, Span};
use plume_lower::LowerError;
use thiserror::Error;

/// Failure to read or write the persisted cache document.
///
/// Neither variant fails a build: the driver logs it and carries on with
/// an empty cache.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache i/o error at '{}': {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("corrupt cache document at '{}': {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
}

impl CacheError {
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Failure of one file's pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("{}:{line}:{column}: {source}", path.display())]
    Lower {
        path: PathBuf,
        line: u32,
        column: u32,
        #[source]
        source: LowerError,
    },
}

impl PipelineError {
    pub(crate) fn parse(path: &Path, text: &str, err: ParseError) -> Self {
        let (line, column) = err.span.line_col(text);
        PipelineError::Parse {
            path: path.to_path_buf(),
            line,
            column,
            message: err.message,
        }
    }

    pub(crate) fn lower(path: &Path, text: &str, err: LowerError) -> Self {
        let (line, column) = err.span().line_col(text);
        PipelineError::Lower {
            path: path.to_path_buf(),
            line,
            column,
            source: err,
        }
    }

    /// File whose pipeline failed.
    pub fn path(&self) -> &Path {
        match self {
            PipelineError::Parse { path, .. } | PipelineError::Lower { path, .. } => path,
        }
    }

    /// Byte span of the offending construct, when lowering failed.
    pub fn span(&self) -> Option<Span> {
        match self {
            PipelineError::Parse { .. } => None,
            PipelineError::Lower { source, .. } => Some(source.span()),
        }
    }
}

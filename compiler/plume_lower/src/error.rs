//! Lowering errors.
//!
//! Every error carries the span of the user-written construct that caused
//! it. Synthesized nodes inherit spans from what they were lowered from, so
//! a failure in a late pass still points at source text.

use plume_ir::Span;
use thiserror::Error;

/// Failure of a lowering pass.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LowerError {
    /// A construct the pipeline cannot express in the target subset.
    #[error("{pass}: unsupported construct: {what}")]
    Unsupported {
        pass: &'static str,
        what: String,
        span: Span,
    },

    /// Lowering one node failed; `node` is the printed node.
    #[error("{pass}: failed to lower `{node}`: {source}")]
    Internal {
        pass: &'static str,
        node: String,
        span: Span,
        #[source]
        source: Box<LowerError>,
    },

    /// A value that must be a compile-time constant is not.
    #[error("{pass}: {what} must be a compile-time constant")]
    NonConstant {
        pass: &'static str,
        what: String,
        span: Span,
    },

    /// A type or member that lowering needs could not be resolved.
    #[error("cannot resolve {what}")]
    Resolution { what: String, span: Span },
}

impl LowerError {
    pub fn unsupported(pass: &'static str, what: impl Into<String>, span: Span) -> Self {
        LowerError::Unsupported {
            pass,
            what: what.into(),
            span,
        }
    }

    pub fn resolution(what: impl Into<String>, span: Span) -> Self {
        LowerError::Resolution {
            what: what.into(),
            span,
        }
    }

    /// Wrap `self` with the node it was raised for.
    #[must_use]
    pub fn within(self, pass: &'static str, node: String, span: Span) -> Self {
        match self {
            // Already attributed to a node; keep the innermost one.
            LowerError::Internal { .. } => self,
            other => LowerError::Internal {
                pass,
                node,
                span,
                source: Box::new(other),
            },
        }
    }

    /// Source location of the offending construct.
    pub fn span(&self) -> Span {
        match self {
            LowerError::Unsupported { span, .. }
            | LowerError::Internal { span, .. }
            | LowerError::NonConstant { span, .. }
            | LowerError::Resolution { span, .. } => *span,
        }
    }

    /// Name of the pass that raised the error, if known.
    pub fn pass(&self) -> Option<&'static str> {
        match self {
            LowerError::Unsupported { pass, .. }
            | LowerError::Internal { pass, .. }
            | LowerError::NonConstant { pass, .. } => Some(*pass),
            LowerError::Resolution { .. } => None,
        }
    }
}

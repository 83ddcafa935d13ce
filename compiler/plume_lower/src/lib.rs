//! Desugaring pipeline for the Plume source-to-source compiler.
//!
//! This crate rewrites an analyzed [`SyntaxTree`](plume_ir::SyntaxTree) into
//! an equivalent tree that only uses the conservative language subset. Each
//! pass reads one tree, consults the semantic model built for exactly that
//! tree, and writes a new tree. When a pass changes anything, the pipeline
//! asks the front end for a fresh model before the next pass runs.
//!
//! # Pipeline Position
//!
//! ```text
//! Parse → Analyze → **Lower** (normalize → desugar → conditional passes) → Validate → Print
//! ```
//!
//! # What Happens During Lowering
//!
//! 1. **Normalization** (`normalize`): expression bodies become blocks,
//!    implicit member references gain explicit receivers, deconstruction
//!    and `out` declarations become plain locals.
//!
//! 2. **Desugaring** (`desugar`): one traversal lowers switch expressions,
//!    index and range operators, null-conditional access, spread
//!    collections, interpolated strings, `with` expressions, records and
//!    primary constructors. It also records which conditional passes the
//!    unit needs ([`PassTriggers`]).
//!
//! 3. **Conditional passes**: local functions, chained assignment, static
//!    imports, pattern lowering (`patterns`) and pattern switch labels. Each
//!    runs only when its construct was observed.
//!
//! 4. **Validation** (`validate`): the result must be free of sugar.

mod chained;
mod desugar;
mod error;
mod hoist;
mod local_fns;
mod normalize;
mod patterns;
mod pipeline;
mod rewrite;
mod static_using;
mod switch_labels;
mod synth;
mod validate;

#[cfg(test)]
mod eval;
#[cfg(test)]
mod test_support;

pub use error::LowerError;
pub use pipeline::{lower_tree, PassKind, PassTriggers};
pub use validate::validate;

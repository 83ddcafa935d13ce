//! Normalization passes.
//!
//! These run on every unit before desugaring and bring the tree to a
//! uniform shape: block bodies everywhere, explicit receivers on member
//! references, and no declaration expressions.

pub(crate) mod deconstruct;
pub(crate) mod expr_body;
pub(crate) mod names;

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

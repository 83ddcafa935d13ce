//! `using static` directives.
//!
//! A simple name bound to a static member of an imported type becomes
//! `Type.Name`, and the directives are dropped. Ambiguous overloads
//! resolve through their unique candidate, or through any candidate when
//! they all live on the same type.

use rustc_hash::FxHashSet;

use plume_ir::ast::ExprKind;
use plume_ir::{NodeRef, SemanticModel, SyntaxTree, TypeId};

use crate::normalize::names::{enclosing_type, in_base_chain, member_symbol, qualify};
use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::LowerError;

pub(crate) const PASS: &str = "static-usings";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
    let imported = imported_types(input, model);

    let mut qualified = 0usize;
    for node in post_order(input) {
        let NodeRef::Expr(id) = node else { continue };
        let ExprKind::Ident(name) = input.expr_kind(id) else {
            continue;
        };
        let Some(symbol) = member_symbol(&model.symbol_info(id)) else {
            continue;
        };
        let Some(container) = symbol.container else {
            continue;
        };
        if !symbol.is_static || !imported.contains(&container) {
            continue;
        }
        if enclosing_type(&rw, id).is_some_and(|owner| in_base_chain(model, owner, container)) {
            continue;
        }
        qualify(&mut rw, id, name, symbol, container);
        qualified += 1;
    }

    let before = rw.out.unit.usings.len();
    rw.out.unit.usings.retain(|using| !using.is_static);
    if rw.out.unit.usings.len() != before {
        rw.mark_changed();
    }
    tracing::debug!(qualified, "static imports resolved");
    Ok(rw.finish())
}

/// Types named by `using static` directives that the model knows.
///
/// Qualified paths are looked up by their last segment.
fn imported_types(tree: &SyntaxTree, model: &dyn SemanticModel) -> FxHashSet<TypeId> {
    tree.unit
        .usings
        .iter()
        .filter(|using| using.is_static)
        .filter_map(|using| {
            let path = tree.name_str(using.path);
            let simple = path.rsplit('.').next().unwrap_or(path);
            model.lookup_type(tree.intern(simple))
        })
        .collect()
}

//! Explicit receivers for implicit member references.
//!
//! A simple name that resolves to a field, property or method of the
//! enclosing type (or one of its bases) becomes `this.Name`, or
//! `Type.Name` for static members. Later passes move code around (into
//! lambdas, constructors, synthesized methods) and must not depend on
//! where a bare name happened to be written.

use plume_ir::ast::ExprKind;
use plume_ir::{ExprId, Name, NodeRef, Parent, SemanticModel, Symbol, SymbolInfo, SyntaxTree, TypeId};

use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::LowerError;

pub(crate) const PASS: &str = "names";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
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
        let Some(owner) = enclosing_type(&rw, id) else {
            continue;
        };
        if !in_base_chain(model, owner, container) {
            continue;
        }
        qualify(&mut rw, id, name, symbol, container);
    }
    Ok(rw.finish())
}

/// Rewrite `id` into `this.name` or `Container.name`.
pub(crate) fn qualify(rw: &mut Rewriter<'_>, id: ExprId, name: Name, symbol: Symbol, container: TypeId) {
    let span = rw.input.expr_span(id);
    let receiver = if symbol.is_static {
        let ty = rw.type_syntax(container);
        rw.out.alloc_expr(ExprKind::TypeRef(ty), span)
    } else {
        rw.out.this(span)
    };
    rw.set_kind(id, ExprKind::Member { receiver, name });
}

/// The type member a name refers to.
///
/// Overloads of one method leave several candidates behind; they qualify
/// the same way, so any of them will do.
pub(crate) fn member_symbol(info: &SymbolInfo) -> Option<Symbol> {
    let symbol = match info.symbol_or_unique_candidate() {
        Some(symbol) => symbol,
        None => {
            let first = *info.candidates.first()?;
            let uniform = info
                .candidates
                .iter()
                .all(|c| c.container == first.container && c.is_static == first.is_static);
            if !uniform {
                return None;
            }
            first
        }
    };
    symbol.kind.is_type_member().then_some(symbol)
}

/// Type declared by the declaration that contains `id`.
pub(crate) fn enclosing_type(rw: &Rewriter<'_>, id: ExprId) -> Option<TypeId> {
    let index = match rw.parents.root_owner(NodeRef::Expr(id)) {
        Parent::Member { ty, .. } | Parent::TypeHeader(ty) => ty,
        Parent::None | Parent::Node(_) => return None,
    };
    let decl = rw.input.unit.types.get(index)?;
    rw.model.lookup_type(decl.name)
}

/// Whether `container` is `owner` or one of its base types.
///
/// Types are compared by name: a generic declaration and its members see
/// the same definition under different instantiations.
pub(crate) fn in_base_chain(model: &dyn SemanticModel, owner: TypeId, container: TypeId) -> bool {
    let target = model.type_data(container).name;
    let mut current = Some(owner);
    let mut depth = 0;
    while let Some(ty) = current {
        if ty == container || model.type_data(ty).name == target {
            return true;
        }
        current = model.type_data(ty).base;
        depth += 1;
        if depth > 64 {
            break;
        }
    }
    false
}

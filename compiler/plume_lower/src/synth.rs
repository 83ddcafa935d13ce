//! Synthesizing syntax from semantic facts.

use plume_ir::ast::{ExprKind, Literal, TypeExpr};
use plume_ir::stack::ensure_sufficient_stack;
use plume_ir::{
    Conversion, ExprId, Name, SemanticModel, SyntaxTree, TypeExprId, TypeId, TypeShape,
};

/// Type syntax naming `ty`. Unresolved types print as `dynamic`.
pub(crate) fn type_syntax(out: &mut SyntaxTree, model: &dyn SemanticModel, ty: TypeId) -> TypeExprId {
    ensure_sufficient_stack(|| {
        let data = model.type_data(ty);
        match data.shape {
            TypeShape::Unknown => out.alloc_type(TypeExpr::Dynamic),
            TypeShape::Void => out.alloc_type(TypeExpr::Void),
            TypeShape::Null => out.type_str("object"),
            TypeShape::Array => {
                let element = type_syntax(out, model, data.element.unwrap_or(TypeId::UNKNOWN));
                out.alloc_type(TypeExpr::Array(element))
            }
            TypeShape::Nullable => {
                let element = type_syntax(out, model, data.element.unwrap_or(TypeId::UNKNOWN));
                out.alloc_type(TypeExpr::Nullable(element))
            }
            TypeShape::Tuple => {
                let elements: Vec<TypeExprId> = data
                    .args
                    .iter()
                    .map(|&arg| type_syntax(out, model, arg))
                    .collect();
                out.tuple_type(&elements)
            }
            TypeShape::Delegate => {
                let mut args: &[TypeId] = &data.args;
                if let [params @ .., TypeId::VOID] = args {
                    args = params;
                }
                let args: Vec<TypeExprId> = args.iter().map(|&a| type_syntax(out, model, a)).collect();
                out.named_type(data.name, &args)
            }
            TypeShape::Primitive
            | TypeShape::Class
            | TypeShape::Struct
            | TypeShape::Interface
            | TypeShape::TypeParam => {
                let args: Vec<TypeExprId> = data
                    .args
                    .iter()
                    .map(|&arg| type_syntax(out, model, arg))
                    .collect();
                out.named_type(data.name, &args)
            }
        }
    })
}

/// `T` as written, or `var` when only inference can name it.
pub(crate) fn local_type(out: &mut SyntaxTree, model: &dyn SemanticModel, ty: TypeId) -> TypeExprId {
    if ty.is_unknown() || ty == TypeId::NULL {
        out.var_type()
    } else {
        type_syntax(out, model, ty)
    }
}

/// Whether reading `id` more than once is free of side effects and cheap.
///
/// Locals, parameters, `this` and literals qualify. Member and element
/// access, calls, `await` and object creation do not.
pub(crate) fn is_simple(tree: &SyntaxTree, id: ExprId) -> bool {
    match tree.expr_kind(id) {
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::This
        | ExprKind::Base
        | ExprKind::TypeRef(_)
        | ExprKind::Default(_) => true,
        ExprKind::Parenthesized(inner) => is_simple(tree, inner),
        _ => false,
    }
}

/// Conversion between two types, judged from type facts alone.
///
/// Used for synthesized subjects the model has never seen.
pub(crate) fn classify_types(model: &dyn SemanticModel, from: TypeId, to: TypeId) -> Conversion {
    if from == to {
        return Conversion::Identity;
    }
    if from.is_unknown() || to.is_unknown() {
        return Conversion::Explicit;
    }
    if model.is_value_type(from) {
        return if to == TypeId::OBJECT {
            Conversion::Boxing
        } else {
            Conversion::Explicit
        };
    }
    if is_subtype(model, from, to) {
        Conversion::ImplicitReference
    } else {
        Conversion::Explicit
    }
}

fn is_subtype(model: &dyn SemanticModel, from: TypeId, to: TypeId) -> bool {
    if to == TypeId::OBJECT {
        return true;
    }
    let mut work = vec![from];
    let mut steps = 0;
    while let Some(ty) = work.pop() {
        if ty == to {
            return true;
        }
        steps += 1;
        if steps > 256 {
            break;
        }
        let data = model.type_data(ty);
        work.extend(data.base);
        work.extend(data.interfaces.iter().copied());
    }
    false
}

/// Members read for `n` positional components of `ty`, with their types.
///
/// Tuples use `Item1..ItemN`; other types use their deconstruction
/// components. Anything unresolved falls back to `ItemN` of unknown type.
pub(crate) fn components(
    model: &dyn SemanticModel,
    tree: &SyntaxTree,
    ty: TypeId,
    n: usize,
) -> Vec<(Name, TypeId)> {
    let data = model.type_data(ty);
    if data.shape == TypeShape::Tuple && data.args.len() == n {
        return data
            .args
            .iter()
            .enumerate()
            .map(|(i, &arg)| (tree.intern(&format!("Item{}", i + 1)), arg))
            .collect();
    }
    if data.components.len() == n {
        return data.components.iter().map(|c| (c.member, c.ty)).collect();
    }
    (1..=n)
        .map(|i| (tree.intern(&format!("Item{i}")), TypeId::UNKNOWN))
        .collect()
}

/// Member used to read the length of a sequence: `Count` on collections
/// that declare it, `Length` otherwise.
pub(crate) fn length_member(model: &dyn SemanticModel, out: &SyntaxTree, ty: TypeId) -> &'static str {
    let count = out.intern("Count");
    if !ty.is_unknown() && model.find_member(ty, count).is_some() {
        "Count"
    } else {
        "Length"
    }
}

/// `default` value for `ty`: `null` for reference types, `default(T)`
/// otherwise.
pub(crate) fn default_value(
    out: &mut SyntaxTree,
    model: &dyn SemanticModel,
    ty: TypeId,
    span: plume_ir::Span,
) -> ExprId {
    let data = model.type_data(ty);
    if ty.is_unknown() || !data.is_value_type || data.shape == TypeShape::Nullable {
        return out.alloc_expr(ExprKind::Literal(Literal::Null), span);
    }
    let syntax = type_syntax(out, model, ty);
    out.alloc_expr(ExprKind::Default(syntax), span)
}

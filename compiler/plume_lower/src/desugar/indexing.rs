//! Index-from-end and range operators.
//!
//! Inside a subscript, `^i` is computed from the receiver's length and a
//! range becomes a `Substring` or `Slice` call:
//!
//! ```text
//! a[^1]      → a[a.Length - 1]
//! s[1..^1]   → s.Substring(1, s.Length - 1 - 1)
//! xs[i..j]   → xs.Slice(i, j)
//! a[idx]     → a[idx.GetOffset(a.Length)]       (idx : Index)
//! ```
//!
//! Elsewhere the operators construct `Index` and `Range` values.

use plume_ir::ast::{BinaryOp, ExprKind, Literal};
use plume_ir::{ExprId, ExprRange, NodeRef, Parent, Span, SyntaxTree, TypeId};

use crate::rewrite::Rewriter;
use crate::synth::length_member;
use crate::LowerError;

/// A subscript argument that needs lowering.
#[derive(Copy, Clone, Debug)]
pub(super) enum Arg {
    /// `^value`
    FromEnd(ExprId),
    /// A value of type `Index`.
    IndexValue(ExprId),
    /// `start..end`; either bound may be absent.
    Range { start: ExprId, end: ExprId },
    /// A value of type `Range`.
    RangeValue(ExprId),
}

/// Classify the single argument of a subscript, if it needs lowering.
pub(super) fn classify(rw: &Rewriter<'_>, args: ExprRange) -> Option<Arg> {
    let &[arg] = rw.input.exprs(args) else {
        return None;
    };
    match rw.out.expr_kind(arg) {
        ExprKind::FromEnd(value) => Some(Arg::FromEnd(value)),
        ExprKind::Range { start, end } => Some(Arg::Range { start, end }),
        _ => {
            let ty = rw.type_of(arg);
            if is_named(rw, ty, "Index") {
                Some(Arg::IndexValue(arg))
            } else if is_named(rw, ty, "Range") {
                Some(Arg::RangeValue(arg))
            } else {
                None
            }
        }
    }
}

pub(super) fn lower_index(
    rw: &mut Rewriter<'_>,
    id: ExprId,
    receiver: ExprId,
    args: ExprRange,
) -> Result<(), LowerError> {
    // Inside `a?.b[^1]` the receiver only exists once the conditional
    // access is lowered; that lowering calls back into `subscript`.
    if binding_rooted(rw.input, receiver) {
        return Ok(());
    }
    let Some(arg) = classify(rw, args) else {
        return Ok(());
    };
    let span = rw.input.expr_span(id);
    let receiver_ty = rw.type_of(receiver);
    let (receiver, capture) = rw.stabilize(id, receiver, receiver_ty, "r")?;
    let mut result = subscript(rw, id, receiver, receiver_ty, arg, span)?;
    if let Some(capture) = capture {
        result = rw.out.seq(&[capture], result, span);
    }
    rw.replace(id, result);
    Ok(())
}

/// Lowered form of `receiver[arg]`.
///
/// `receiver` is a template that is copied for every read, so it must be
/// simple. `anchor` is the input node temporaries are hoisted for.
pub(super) fn subscript(
    rw: &mut Rewriter<'_>,
    anchor: ExprId,
    receiver: ExprId,
    receiver_ty: TypeId,
    arg: Arg,
    span: Span,
) -> Result<ExprId, LowerError> {
    let length = length_member(rw.model, &rw.out, receiver_ty);
    let result = match arg {
        Arg::FromEnd(value) => {
            let offset = from_end(rw, receiver, length, value, span);
            let target = rw.read(receiver);
            rw.out.index(target, &[offset], span)
        }
        Arg::IndexValue(index) => {
            let len = read_length(rw, receiver, length, span);
            let offset = rw.out.method_call(index, "GetOffset", &[len], span);
            let target = rw.read(receiver);
            rw.out.index(target, &[offset], span)
        }
        Arg::Range { start, end } => {
            let start = bound(rw, receiver, length, start, false, span);
            let end = bound(rw, receiver, length, end, true, span);
            slice(rw, anchor, receiver, receiver_ty, start, end, span)?
        }
        Arg::RangeValue(range) => {
            let range_ty = rw.type_of(range);
            let (range, capture) = rw.stabilize(anchor, range, range_ty, "g")?;
            let mut offsets = [ExprId::INVALID; 2];
            for (slot, member) in offsets.iter_mut().zip(["Start", "End"]) {
                let value = rw.read(range);
                let index = rw.out.member_str(value, member, span);
                let len = read_length(rw, receiver, length, span);
                *slot = rw.out.method_call(index, "GetOffset", &[len], span);
            }
            let result = slice(rw, anchor, receiver, receiver_ty, offsets[0], offsets[1], span)?;
            match capture {
                Some(capture) => rw.out.seq(&[capture], result, span),
                None => result,
            }
        }
    };
    Ok(result)
}

fn read_length(rw: &mut Rewriter<'_>, receiver: ExprId, length: &str, span: Span) -> ExprId {
    let value = rw.read(receiver);
    rw.out.member_str(value, length, span)
}

/// `len - value`
fn from_end(rw: &mut Rewriter<'_>, receiver: ExprId, length: &str, value: ExprId, span: Span) -> ExprId {
    let len = read_length(rw, receiver, length, span);
    rw.out.binary(BinaryOp::Sub, len, value, span)
}

/// Offset of one range bound. A missing start is `0`, a missing end is the
/// length.
fn bound(
    rw: &mut Rewriter<'_>,
    receiver: ExprId,
    length: &str,
    value: ExprId,
    is_end: bool,
    span: Span,
) -> ExprId {
    if !value.is_valid() {
        return if is_end {
            read_length(rw, receiver, length, span)
        } else {
            rw.out.int(0, span)
        };
    }
    if let ExprKind::FromEnd(inner) = rw.out.expr_kind(value) {
        return from_end(rw, receiver, length, inner, span);
    }
    if is_named(rw, rw.type_of(value), "Index") {
        let len = read_length(rw, receiver, length, span);
        return rw.out.method_call(value, "GetOffset", &[len], span);
    }
    value
}

/// `s.Substring(start, end - start)` for strings, `xs.Slice(start, end)`
/// otherwise.
fn slice(
    rw: &mut Rewriter<'_>,
    anchor: ExprId,
    receiver: ExprId,
    receiver_ty: TypeId,
    start: ExprId,
    end: ExprId,
    span: Span,
) -> Result<ExprId, LowerError> {
    if receiver_ty != TypeId::STRING {
        let target = rw.read(receiver);
        return Ok(rw.out.method_call(target, "Slice", &[start, end], span));
    }
    if is_zero(&rw.out, start) {
        let target = rw.read(receiver);
        return Ok(rw.out.method_call(target, "Substring", &[start, end], span));
    }
    // `start` is read twice.
    let (start, capture) = rw.stabilize(anchor, start, TypeId::INT, "i")?;
    let first = rw.read(start);
    let second = rw.read(start);
    let count = rw.out.binary(BinaryOp::Sub, end, second, span);
    let target = rw.read(receiver);
    let call = rw.out.method_call(target, "Substring", &[first, count], span);
    Ok(match capture {
        Some(capture) => rw.out.seq(&[capture], call, span),
        None => call,
    })
}

fn is_zero(tree: &SyntaxTree, id: ExprId) -> bool {
    matches!(tree.expr_kind(id), ExprKind::Literal(Literal::Int(0)))
}

pub(super) fn lower_from_end(rw: &mut Rewriter<'_>, id: ExprId, value: ExprId) {
    if in_subscript(rw, id) {
        return;
    }
    let span = rw.input.expr_span(id);
    let index = new_index(rw, value, true, span);
    rw.replace(id, index);
}

pub(super) fn lower_range(rw: &mut Rewriter<'_>, id: ExprId, start: ExprId, end: ExprId) {
    if in_subscript(rw, id) {
        return;
    }
    let span = rw.input.expr_span(id);
    let start = range_bound(rw, start, false, span);
    let end = range_bound(rw, end, true, span);
    let ty = rw.out.type_str("Range");
    let range = rw.out.new_object(ty, &[start, end], span);
    rw.replace(id, range);
}

/// `Index` value of a standalone range bound. `^i` bounds were already
/// rewritten to `new Index(i, true)`.
fn range_bound(rw: &mut Rewriter<'_>, value: ExprId, is_end: bool, span: Span) -> ExprId {
    if !value.is_valid() {
        let zero = rw.out.int(0, span);
        return new_index(rw, zero, is_end, span);
    }
    if matches!(rw.input.expr_kind(value), ExprKind::FromEnd(_)) || is_named(rw, rw.type_of(value), "Index") {
        return value;
    }
    new_index(rw, value, false, span)
}

fn new_index(rw: &mut Rewriter<'_>, value: ExprId, from_end: bool, span: Span) -> ExprId {
    let ty = rw.out.type_str("Index");
    let flag = rw.out.bool_lit(from_end, span);
    rw.out.new_object(ty, &[value, flag], span)
}

/// Whether `id` is a subscript argument, or a bound of a range that is.
fn in_subscript(rw: &Rewriter<'_>, id: ExprId) -> bool {
    let Parent::Node(NodeRef::Expr(parent)) = rw.parents.parent(NodeRef::Expr(id)) else {
        return false;
    };
    match rw.input.expr_kind(parent) {
        ExprKind::Index { args, .. } | ExprKind::ElementBinding(args) => {
            rw.input.exprs(args).contains(&id)
        }
        ExprKind::Range { .. } => in_subscript(rw, parent),
        _ => false,
    }
}

/// Whether the access chain ending in `id` starts at a conditional-access
/// binding (`.b` or `[i]` after `?`).
pub(super) fn binding_rooted(tree: &SyntaxTree, id: ExprId) -> bool {
    let mut current = id;
    loop {
        match tree.expr_kind(current) {
            ExprKind::Member { receiver, .. } | ExprKind::Index { receiver, .. } => current = receiver,
            ExprKind::Invocation { callee, .. } => current = callee,
            ExprKind::MemberBinding(_) | ExprKind::ElementBinding(_) => return true,
            _ => return false,
        }
    }
}

fn is_named(rw: &Rewriter<'_>, ty: TypeId, name: &str) -> bool {
    !ty.is_unknown() && rw.out.name_str(rw.model.type_data(ty).name) == name
}

//! Constant folding over literal syntax.

use plume_ir::ast::{BinaryOp, ExprKind, Literal, UnaryOp};
use plume_ir::{ConstValue, ExprId, SyntaxTree};

/// Constant value of `id`, or `None` if it is not a compile-time constant.
///
/// `resolve` supplies values for names that refer to constants.
pub(super) fn fold(
    tree: &SyntaxTree,
    id: ExprId,
    resolve: &dyn Fn(ExprId) -> Option<ConstValue>,
) -> Option<ConstValue> {
    if !id.is_valid() {
        return None;
    }
    match tree.expr_kind(id) {
        ExprKind::Literal(lit) => Some(literal(lit)),
        ExprKind::Parenthesized(inner) => fold(tree, inner, resolve),
        ExprKind::Ident(_) | ExprKind::Member { .. } => resolve(id),
        ExprKind::Unary { op, operand } => {
            let value = fold(tree, operand, resolve)?;
            match (op, value) {
                (UnaryOp::Neg, ConstValue::Int(n)) => n.checked_neg().map(ConstValue::Int),
                (UnaryOp::Neg, ConstValue::Float(f)) => Some(ConstValue::Float(-f)),
                (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
                (UnaryOp::BitNot, ConstValue::Int(n)) => Some(ConstValue::Int(!n)),
                _ => None,
            }
        }
        ExprKind::Binary { op, left, right } => {
            let left = fold(tree, left, resolve)?;
            let right = fold(tree, right, resolve)?;
            binary(tree, op, left, right)
        }
        _ => None,
    }
}

pub(super) fn literal(lit: Literal) -> ConstValue {
    match lit {
        Literal::Int(n) => ConstValue::Int(n),
        Literal::Float(bits) => ConstValue::Float(f64::from_bits(bits)),
        Literal::Bool(b) => ConstValue::Bool(b),
        Literal::Char(c) => ConstValue::Char(c),
        Literal::Str(s) => ConstValue::Str(s),
        Literal::Null => ConstValue::Null,
    }
}

fn binary(tree: &SyntaxTree, op: BinaryOp, left: ConstValue, right: ConstValue) -> Option<ConstValue> {
    use ConstValue::{Bool, Int, Str};
    let value = match (op, left, right) {
        (BinaryOp::Add, Int(a), Int(b)) => Int(a.checked_add(b)?),
        (BinaryOp::Sub, Int(a), Int(b)) => Int(a.checked_sub(b)?),
        (BinaryOp::Mul, Int(a), Int(b)) => Int(a.checked_mul(b)?),
        (BinaryOp::Div, Int(a), Int(b)) => Int(a.checked_div(b)?),
        (BinaryOp::Mod, Int(a), Int(b)) => Int(a.checked_rem(b)?),
        (BinaryOp::BitAnd, Int(a), Int(b)) => Int(a & b),
        (BinaryOp::BitOr, Int(a), Int(b)) => Int(a | b),
        (BinaryOp::BitXor, Int(a), Int(b)) => Int(a ^ b),
        (BinaryOp::Add, Str(a), Str(b)) => {
            let joined = format!("{}{}", tree.name_str(a), tree.name_str(b));
            Str(tree.intern(&joined))
        }
        (BinaryOp::Eq, Int(a), Int(b)) => Bool(a == b),
        (BinaryOp::NotEq, Int(a), Int(b)) => Bool(a != b),
        (BinaryOp::Lt, Int(a), Int(b)) => Bool(a < b),
        (BinaryOp::LtEq, Int(a), Int(b)) => Bool(a <= b),
        (BinaryOp::Gt, Int(a), Int(b)) => Bool(a > b),
        (BinaryOp::GtEq, Int(a), Int(b)) => Bool(a >= b),
        (BinaryOp::And, Bool(a), Bool(b)) => Bool(a && b),
        (BinaryOp::Or, Bool(a), Bool(b)) => Bool(a || b),
        _ => return None,
    };
    Some(value)
}

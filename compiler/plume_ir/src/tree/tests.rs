use super::*;
use crate::ast::{BinaryOp, ExprKind, PatternKind, StmtKind};
use crate::{print_expr, print_stmt};

fn tree() -> SyntaxTree {
    SyntaxTree::new(SharedInterner::new())
}

#[test]
fn duplicate_expr_copies_every_node() {
    let mut t = tree();
    let s = Span::DUMMY;
    let a = t.ident_str("a", s);
    let one = t.int(1, s);
    let sum = t.binary(BinaryOp::Add, a, one, s);
    let call = t.method_call(sum, "ToString", &[], s);

    let before = t.expr_count();
    let copy = t.duplicate_expr(call);

    assert_ne!(copy, call);
    assert_eq!(t.expr_count(), before * 2);
    assert_eq!(print_expr(&t, copy), print_expr(&t, call));
}

#[test]
fn duplicate_expr_copies_patterns_inside_is() {
    let mut t = tree();
    let s = Span::DUMMY;
    let x = t.ident_str("x", s);
    let ty = t.type_str("string");
    let name = t.intern("text");
    let pattern = t.alloc_pattern(PatternKind::Declaration { ty, name }, s);
    let is = t.alloc_expr(ExprKind::Is { subject: x, pattern }, s);

    let copy = t.duplicate_expr(is);
    let ExprKind::Is {
        pattern: copied, ..
    } = t.expr_kind(copy)
    else {
        panic!("expected is-expression");
    };
    assert_ne!(copied, pattern);
    assert_eq!(print_expr(&t, copy), "x is string text");
}

#[test]
fn duplicate_stmt_copies_blocks() {
    let mut t = tree();
    let s = Span::DUMMY;
    let value = t.int(3, s);
    let ret = t.return_stmt(value, s);
    let block = t.block(&[ret], s);

    let copy = t.duplicate_stmt(block);
    let StmtKind::Block(stmts) = t.stmt_kind(copy) else {
        panic!("expected block");
    };
    assert_ne!(t.stmts(stmts)[0], ret);
    assert_eq!(print_stmt(&t, copy), print_stmt(&t, block));
}

#[test]
fn fresh_names_survive_clone() {
    let mut t = tree();
    let first = t.fresh_name("t");
    let mut cloned = t.clone();
    let second = cloned.fresh_name("t");

    assert_eq!(t.name_str(first), "__t0");
    assert_eq!(cloned.name_str(second), "__t1");
}

#[test]
fn empty_lists_use_empty_range() {
    let mut t = tree();
    let range = t.alloc_exprs(std::iter::empty());
    assert_eq!(range, ExprRange::EMPTY);
    assert!(t.exprs(range).is_empty());
}

#[test]
fn set_expr_kind_keeps_span() {
    let mut t = tree();
    let id = t.int(1, Span::new(4, 5));
    t.set_expr_kind(id, ExprKind::This);
    assert_eq!(t.expr_span(id), Span::new(4, 5));
    assert_eq!(t.expr_kind(id), ExprKind::This);
}

//! Syntax tree traversal.
//!
//! [`children`] enumerates the direct children of a node in evaluation
//! order. The [`Visitor`] trait, the parent map and the rewriting passes all
//! walk the tree through it, so they agree on what "child" means.
//!
//! # Example
//!
//! ```text
//! struct CountSwitches {
//!     count: usize,
//! }
//!
//! impl<'ast> Visitor<'ast> for CountSwitches {
//!     fn visit_expr(&mut self, id: ExprId, tree: &'ast SyntaxTree) {
//!         if matches!(tree.expr_kind(id), ExprKind::Switch { .. }) {
//!             self.count += 1;
//!         }
//!         walk_expr(self, id, tree);
//!     }
//! }
//! ```

use smallvec::SmallVec;

use crate::ast::{
    Body, ExprKind, InterpolationPart, LambdaBody, Member, MemberKind, PatternKind, StmtKind,
    SwitchLabel, TypeDecl,
};
use crate::stack::ensure_sufficient_stack;
use crate::{ExprId, ParamRange, PatternId, StmtId, SyntaxTree};

/// Reference to any node that can hold a parent pointer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeRef {
    Expr(ExprId),
    Stmt(StmtId),
    Pattern(PatternId),
}

pub type Children = SmallVec<[NodeRef; 8]>;

fn push_expr(out: &mut Children, id: ExprId) {
    if id.is_valid() {
        out.push(NodeRef::Expr(id));
    }
}

fn push_stmt(out: &mut Children, id: StmtId) {
    if id.is_valid() {
        out.push(NodeRef::Stmt(id));
    }
}

fn push_pattern(out: &mut Children, id: PatternId) {
    if id.is_valid() {
        out.push(NodeRef::Pattern(id));
    }
}

fn push_param_defaults(out: &mut Children, tree: &SyntaxTree, params: ParamRange) {
    for param in tree.params(params) {
        push_expr(out, param.default);
    }
}

fn push_body(out: &mut Children, body: Body) {
    match body {
        Body::None => {}
        Body::Block(s) => push_stmt(out, s),
        Body::Expr(e) => push_expr(out, e),
    }
}

/// Direct children of a node, in evaluation order.
pub fn children(tree: &SyntaxTree, node: NodeRef) -> Children {
    let mut out = Children::new();
    match node {
        NodeRef::Expr(id) => expr_children(tree, id, &mut out),
        NodeRef::Stmt(id) => stmt_children(tree, id, &mut out),
        NodeRef::Pattern(id) => pattern_children(tree, id, &mut out),
    }
    out
}

fn expr_children(tree: &SyntaxTree, id: ExprId, out: &mut Children) {
    match tree.expr_kind(id) {
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::This
        | ExprKind::Base
        | ExprKind::TypeRef(_)
        | ExprKind::MemberBinding(_)
        | ExprKind::Default(_)
        | ExprKind::Declaration { .. }
        | ExprKind::Discard => {}

        ExprKind::Member { receiver: inner, .. }
        | ExprKind::FromEnd(inner)
        | ExprKind::Unary { operand: inner, .. }
        | ExprKind::TypeTest { subject: inner, .. }
        | ExprKind::Cast { operand: inner, .. }
        | ExprKind::Spread(inner)
        | ExprKind::Throw(inner)
        | ExprKind::Await(inner)
        | ExprKind::Out(inner)
        | ExprKind::Parenthesized(inner) => push_expr(out, inner),

        ExprKind::ConditionalAccess { receiver, access } => {
            push_expr(out, receiver);
            push_expr(out, access);
        }
        ExprKind::ElementBinding(args) | ExprKind::Collection(args) | ExprKind::Tuple(args) => {
            for &arg in tree.exprs(args) {
                push_expr(out, arg);
            }
        }
        ExprKind::Invocation { callee: head, args }
        | ExprKind::Index {
            receiver: head,
            args,
        } => {
            push_expr(out, head);
            for &arg in tree.exprs(args) {
                push_expr(out, arg);
            }
        }
        ExprKind::Range { start, end } => {
            push_expr(out, start);
            push_expr(out, end);
        }
        ExprKind::Binary { left, right, .. } => {
            push_expr(out, left);
            push_expr(out, right);
        }
        ExprKind::Assign { target, value, .. } => {
            push_expr(out, target);
            push_expr(out, value);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            push_expr(out, cond);
            push_expr(out, then_expr);
            push_expr(out, else_expr);
        }
        ExprKind::Is { subject, pattern } => {
            push_expr(out, subject);
            push_pattern(out, pattern);
        }
        ExprKind::Seq { effects, value } => {
            for &effect in tree.exprs(effects) {
                push_expr(out, effect);
            }
            push_expr(out, value);
        }
        ExprKind::Lambda(lambda) => {
            let lambda = tree.lambda(lambda);
            push_param_defaults(out, tree, lambda.params);
            match lambda.body {
                LambdaBody::Expr(e) => push_expr(out, e),
                LambdaBody::Block(s) => push_stmt(out, s),
            }
        }
        ExprKind::New { args, inits, .. } => {
            for &arg in tree.exprs(args) {
                push_expr(out, arg);
            }
            for init in tree.field_inits(inits) {
                push_expr(out, init.value);
            }
        }
        ExprKind::With { receiver, inits } => {
            push_expr(out, receiver);
            for init in tree.field_inits(inits) {
                push_expr(out, init.value);
            }
        }
        ExprKind::Switch { subject, arms } => {
            push_expr(out, subject);
            for arm in tree.arms(arms) {
                push_pattern(out, arm.pattern);
                push_expr(out, arm.guard);
                push_expr(out, arm.result);
            }
        }
        ExprKind::Interpolated(parts) => {
            for part in tree.interp_parts(parts) {
                if let InterpolationPart::Hole {
                    expr, alignment, ..
                } = *part
                {
                    push_expr(out, expr);
                    push_expr(out, alignment);
                }
            }
        }
    }
}

fn stmt_children(tree: &SyntaxTree, id: StmtId, out: &mut Children) {
    match tree.stmt_kind(id) {
        StmtKind::Block(stmts) => {
            for &stmt in tree.stmts(stmts) {
                push_stmt(out, stmt);
            }
        }
        StmtKind::Expr(e) | StmtKind::Return(e) | StmtKind::Throw(e) => push_expr(out, e),
        StmtKind::Local { init, .. } => push_expr(out, init),
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            push_expr(out, cond);
            push_stmt(out, then_branch);
            push_stmt(out, else_branch);
        }
        StmtKind::While { cond, body } => {
            push_expr(out, cond);
            push_stmt(out, body);
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            for &stmt in tree.stmts(init) {
                push_stmt(out, stmt);
            }
            push_expr(out, cond);
            for &e in tree.exprs(step) {
                push_expr(out, e);
            }
            push_stmt(out, body);
        }
        StmtKind::Foreach { iterable, body, .. } => {
            push_expr(out, iterable);
            push_stmt(out, body);
        }
        StmtKind::Switch { subject, sections } => {
            push_expr(out, subject);
            for section in tree.sections(sections) {
                for label in tree.labels(section.labels) {
                    if let SwitchLabel::Case { pattern, guard } = *label {
                        push_pattern(out, pattern);
                        push_expr(out, guard);
                    }
                }
                for &stmt in tree.stmts(section.body) {
                    push_stmt(out, stmt);
                }
            }
        }
        StmtKind::LocalFunction(func) => {
            let func = tree.local_fn(func);
            push_param_defaults(out, tree, func.params);
            push_body(out, func.body);
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
    }
}

fn pattern_children(tree: &SyntaxTree, id: PatternId, out: &mut Children) {
    match tree.pattern_kind(id) {
        PatternKind::Constant(e) | PatternKind::Relational { value: e, .. } => push_expr(out, e),
        PatternKind::Recursive {
            positional,
            properties,
            ..
        } => {
            for &p in tree.patterns(positional) {
                push_pattern(out, p);
            }
            for prop in tree.prop_pats(properties) {
                push_pattern(out, prop.pattern);
            }
        }
        PatternKind::List { elements, .. } => {
            for &p in tree.patterns(elements) {
                push_pattern(out, p);
            }
        }
        PatternKind::Slice(inner) | PatternKind::Not(inner) | PatternKind::Parenthesized(inner) => {
            push_pattern(out, inner);
        }
        PatternKind::Binary { left, right, .. } => {
            push_pattern(out, left);
            push_pattern(out, right);
        }
        PatternKind::Declaration { .. }
        | PatternKind::Var(_)
        | PatternKind::Type(_)
        | PatternKind::Discard => {}
    }
}

/// Root nodes owned directly by a member declaration.
pub fn member_roots(tree: &SyntaxTree, member: &Member) -> Children {
    let mut out = Children::new();
    match &member.kind {
        MemberKind::Field { init, .. } => push_expr(&mut out, *init),
        MemberKind::Property {
            getter,
            setter,
            init,
            ..
        } => {
            if let Some(body) = getter {
                push_body(&mut out, *body);
            }
            if let Some(body) = setter {
                push_body(&mut out, *body);
            }
            push_expr(&mut out, *init);
        }
        MemberKind::Method { params, body, .. } | MemberKind::Operator { params, body, .. } => {
            push_param_defaults(&mut out, tree, *params);
            push_body(&mut out, *body);
        }
        MemberKind::Constructor {
            params,
            initializer,
            body,
        } => {
            push_param_defaults(&mut out, tree, *params);
            if let Some(init) = initializer {
                for &arg in tree.exprs(init.args) {
                    push_expr(&mut out, arg);
                }
            }
            push_body(&mut out, *body);
        }
    }
    out
}

/// Root nodes owned by a type declaration header: primary-parameter
/// defaults and base-call arguments.
pub fn type_decl_roots(tree: &SyntaxTree, decl: &TypeDecl) -> Children {
    let mut out = Children::new();
    if let Some(params) = decl.primary_params {
        push_param_defaults(&mut out, tree, params);
    }
    if let Some(args) = decl.base_args {
        for &arg in tree.exprs(args) {
            push_expr(&mut out, arg);
        }
    }
    out
}

/// Syntax tree visitor.
///
/// Override `visit_*` methods to add behavior at specific nodes and call
/// the matching `walk_*` function to continue into children.
pub trait Visitor<'ast> {
    fn visit_tree(&mut self, tree: &'ast SyntaxTree) {
        walk_tree(self, tree);
    }

    fn visit_type_decl(&mut self, decl: &'ast TypeDecl, tree: &'ast SyntaxTree) {
        walk_type_decl(self, decl, tree);
    }

    fn visit_member(&mut self, member: &'ast Member, tree: &'ast SyntaxTree) {
        walk_member(self, member, tree);
    }

    fn visit_expr(&mut self, id: ExprId, tree: &'ast SyntaxTree) {
        walk_expr(self, id, tree);
    }

    fn visit_stmt(&mut self, id: StmtId, tree: &'ast SyntaxTree) {
        walk_stmt(self, id, tree);
    }

    fn visit_pattern(&mut self, id: PatternId, tree: &'ast SyntaxTree) {
        walk_pattern(self, id, tree);
    }
}

pub fn walk_tree<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, tree: &'ast SyntaxTree) {
    for decl in &tree.unit.types {
        visitor.visit_type_decl(decl, tree);
    }
}

pub fn walk_type_decl<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    decl: &'ast TypeDecl,
    tree: &'ast SyntaxTree,
) {
    visit_nodes(visitor, &type_decl_roots(tree, decl), tree);
    for member in &decl.members {
        visitor.visit_member(member, tree);
    }
}

pub fn walk_member<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    member: &'ast Member,
    tree: &'ast SyntaxTree,
) {
    visit_nodes(visitor, &member_roots(tree, member), tree);
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    id: ExprId,
    tree: &'ast SyntaxTree,
) {
    ensure_sufficient_stack(|| {
        visit_nodes(visitor, &children(tree, NodeRef::Expr(id)), tree);
    });
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    id: StmtId,
    tree: &'ast SyntaxTree,
) {
    ensure_sufficient_stack(|| {
        visit_nodes(visitor, &children(tree, NodeRef::Stmt(id)), tree);
    });
}

pub fn walk_pattern<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    id: PatternId,
    tree: &'ast SyntaxTree,
) {
    visit_nodes(visitor, &children(tree, NodeRef::Pattern(id)), tree);
}

fn visit_nodes<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    nodes: &[NodeRef],
    tree: &'ast SyntaxTree,
) {
    for &node in nodes {
        match node {
            NodeRef::Expr(id) => visitor.visit_expr(id, tree),
            NodeRef::Stmt(id) => visitor.visit_stmt(id, tree),
            NodeRef::Pattern(id) => visitor.visit_pattern(id, tree),
        }
    }
}

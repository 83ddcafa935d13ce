//! Variable hoisting.
//!
//! Lowering turns expression-scoped variables (pattern designations, `out`
//! declarations, subject temporaries) into plain locals. Each one is
//! declared at the nearest point where a statement can go: just before the
//! enclosing statement, or at the top of an expression-bodied lambda, which
//! is converted to a block body. Instance initializers of a type with a
//! primary constructor have no statement yet; their declarations wait for
//! the constructor statement the initializer is moved into. Declarations
//! are queued while a pass runs and applied when it finishes, so the pass
//! never edits a statement list it is still walking.

use rustc_hash::{FxHashMap, FxHashSet};

use plume_ir::ast::{ExprKind, LambdaBody, MemberKind, StmtKind};
use plume_ir::{
    ExprId, LambdaId, Name, NodeRef, Parent, ParentMap, SemanticModel, Span, StmtId, SyntaxTree,
    TypeExprId, TypeId, TypeShape,
};

use crate::LowerError;

/// Where hoisted declarations are installed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum InstallPoint {
    /// Before this statement, in its enclosing list.
    Stmt(StmtId),
    /// At the top of an expression-bodied lambda.
    Lambda { lambda: LambdaId, returns_value: bool },
    /// Before the constructor statement that will receive this instance
    /// initializer. Must be relocated before the declarations are applied.
    Initializer(ExprId),
}

/// Nearest install point for `node`, walking up the input tree.
///
/// A node that sits directly in a member (a field initializer, say) has no
/// statement to hoist in front of and is rejected, unless `initializers` is
/// set and the initializer moves into a primary constructor.
pub(crate) fn install_point(
    input: &SyntaxTree,
    parents: &ParentMap,
    model: &dyn SemanticModel,
    pass: &'static str,
    initializers: bool,
    node: NodeRef,
    span: Span,
) -> Result<InstallPoint, LowerError> {
    let mut root = node;
    for current in std::iter::once(node).chain(parents.ancestors(node)) {
        root = current;
        match current {
            NodeRef::Stmt(id) => return Ok(InstallPoint::Stmt(id)),
            NodeRef::Expr(id) => {
                if let ExprKind::Lambda(lambda) = input.expr_kind(id) {
                    if let LambdaBody::Expr(body) = input.lambda(lambda).body {
                        return Ok(InstallPoint::Lambda {
                            lambda,
                            returns_value: lambda_returns_value(model, id, body),
                        });
                    }
                }
            }
            NodeRef::Pattern(_) => {}
        }
    }
    if let (true, NodeRef::Expr(init)) = (initializers, root) {
        if moves_into_constructor(input, parents, init) {
            return Ok(InstallPoint::Initializer(init));
        }
    }
    Err(LowerError::unsupported(
        pass,
        "expression-scoped variable outside of any statement or lambda",
        span,
    ))
}

/// Whether `init` is the initializer of an instance field or property of a
/// type with a primary constructor.
fn moves_into_constructor(input: &SyntaxTree, parents: &ParentMap, init: ExprId) -> bool {
    let Parent::Member { ty, member } = parents.parent(NodeRef::Expr(init)) else {
        return false;
    };
    let Some(decl) = input.unit.types.get(ty) else {
        return false;
    };
    let Some(member) = decl.members.get(member) else {
        return false;
    };
    let is_init = match &member.kind {
        MemberKind::Field { init: value, .. } | MemberKind::Property { init: value, .. } => *value == init,
        _ => false,
    };
    is_init && decl.primary_params.is_some() && !member.is_static()
}

fn lambda_returns_value(model: &dyn SemanticModel, lambda: ExprId, body: ExprId) -> bool {
    let ty = model.type_info(lambda).converted;
    let data = model.type_data(ty);
    if data.shape == TypeShape::Delegate {
        return data.args.last().is_some_and(|&ret| ret != TypeId::VOID);
    }
    model.type_info(body).ty != TypeId::VOID
}

struct Pending {
    name: Name,
    ty: TypeExprId,
    span: Span,
}

/// Declarations queued by one pass.
#[derive(Default)]
pub(crate) struct Hoister {
    order: Vec<InstallPoint>,
    pending: FxHashMap<InstallPoint, Vec<Pending>>,
    seen: FxHashSet<(InstallPoint, Name)>,
}

impl Hoister {
    /// Queue `ty name;` at `point`. The first declaration of a name at a
    /// point wins; later ones are dropped.
    pub(crate) fn declare(&mut self, point: InstallPoint, name: Name, ty: TypeExprId, span: Span) {
        if !self.seen.insert((point, name)) {
            tracing::trace!(?point, ?name, "duplicate hoisted declaration dropped");
            return;
        }
        let list = self.pending.entry(point).or_default();
        if list.is_empty() {
            self.order.push(point);
        }
        list.push(Pending { name, ty, span });
    }

    /// Move the declarations queued at `from` to `to`, after any already
    /// queued there.
    pub(crate) fn relocate(&mut self, from: InstallPoint, to: InstallPoint) {
        let Some(moved) = self.pending.remove(&from) else {
            return;
        };
        self.order.retain(|&point| point != from);
        for pending in moved {
            self.seen.remove(&(from, pending.name));
            self.declare(to, pending.name, pending.ty, pending.span);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Install every queued declaration into `out`.
    ///
    /// `parents` describes the tree the pass read; install points refer to
    /// its nodes, which keep their IDs in `out`.
    pub(crate) fn apply(mut self, out: &mut SyntaxTree, parents: &ParentMap) {
        for point in std::mem::take(&mut self.order) {
            let Some(list) = self.pending.remove(&point) else {
                continue;
            };
            let decls: Vec<StmtId> = list
                .into_iter()
                .map(|p| out.local(p.ty, p.name, ExprId::INVALID, p.span))
                .collect();
            match point {
                InstallPoint::Stmt(stmt) => insert_before(out, parents, stmt, &decls),
                InstallPoint::Lambda {
                    lambda,
                    returns_value,
                } => install_in_lambda(out, lambda, returns_value, &decls),
                InstallPoint::Initializer(init) => {
                    tracing::error!(?init, "hoisted declarations left at an initializer were dropped");
                }
            }
        }
    }
}

fn install_in_lambda(out: &mut SyntaxTree, lambda: LambdaId, returns_value: bool, decls: &[StmtId]) {
    match out.lambda(lambda).body {
        LambdaBody::Expr(body) => {
            let span = out.expr_span(body);
            let last = if returns_value {
                out.return_stmt(body, span)
            } else {
                out.expr_stmt(body, span)
            };
            let mut stmts = decls.to_vec();
            stmts.push(last);
            let block = out.block(&stmts, span);
            out.set_lambda_body(lambda, LambdaBody::Block(block));
        }
        LambdaBody::Block(block) => {
            if let StmtKind::Block(list) = out.stmt_kind(block) {
                let mut stmts = decls.to_vec();
                stmts.extend_from_slice(out.stmts(list));
                let list = out.alloc_stmts(stmts);
                out.set_stmt_kind(block, StmtKind::Block(list));
            } else {
                let moved = out.alloc_stmt(out.stmt_kind(block), out.stmt_span(block));
                let mut stmts = decls.to_vec();
                stmts.push(moved);
                let list = out.alloc_stmts(stmts);
                out.set_stmt_kind(block, StmtKind::Block(list));
            }
        }
    }
}

/// Insert `decls` immediately before `stmt`.
///
/// When `stmt` is not an item of a statement list (an `if` branch, a loop
/// body) it is wrapped in a new block holding the declarations.
pub(crate) fn insert_before(
    out: &mut SyntaxTree,
    parents: &ParentMap,
    stmt: StmtId,
    decls: &[StmtId],
) {
    let in_list = rewrite_enclosing_list(out, parents, stmt, |list| {
        let at = list.iter().position(|&s| s == stmt).unwrap_or(0);
        let mut items = list[..at].to_vec();
        items.extend_from_slice(decls);
        items.extend_from_slice(&list[at..]);
        items
    });
    if !in_list {
        let moved = out.alloc_stmt(out.stmt_kind(stmt), out.stmt_span(stmt));
        let mut items = decls.to_vec();
        items.push(moved);
        let list = out.alloc_stmts(items);
        out.set_stmt_kind(stmt, StmtKind::Block(list));
    }
}

/// Replace `stmt` with a sequence of statements.
///
/// The slot of `stmt` is reused for the first replacement, so install
/// points that name `stmt` stay valid.
pub(crate) fn replace_with_many(
    out: &mut SyntaxTree,
    parents: &ParentMap,
    stmt: StmtId,
    items: &[StmtId],
) {
    let Some((&first, rest)) = items.split_first() else {
        out.set_stmt_kind(stmt, StmtKind::Empty);
        return;
    };
    if rest.is_empty() {
        let kind = out.stmt_kind(first);
        out.set_stmt_kind(stmt, kind);
        return;
    }
    let in_list = rewrite_enclosing_list(out, parents, stmt, |list| {
        let mut result = Vec::with_capacity(list.len() + rest.len());
        for &s in list {
            result.push(s);
            if s == stmt {
                result.extend_from_slice(rest);
            }
        }
        result
    });
    if in_list {
        let kind = out.stmt_kind(first);
        out.set_stmt_kind(stmt, kind);
    } else {
        let list = out.alloc_stmts(items.iter().copied());
        out.set_stmt_kind(stmt, StmtKind::Block(list));
    }
}

/// Rebuild the statement list that holds `stmt`, if there is one.
fn rewrite_enclosing_list(
    out: &mut SyntaxTree,
    parents: &ParentMap,
    stmt: StmtId,
    rebuild: impl FnOnce(&[StmtId]) -> Vec<StmtId>,
) -> bool {
    let Parent::Node(NodeRef::Stmt(parent)) = parents.parent(NodeRef::Stmt(stmt)) else {
        return false;
    };
    match out.stmt_kind(parent) {
        StmtKind::Block(list) if out.stmts(list).contains(&stmt) => {
            let items = rebuild(out.stmts(list));
            let list = out.alloc_stmts(items);
            out.set_stmt_kind(parent, StmtKind::Block(list));
            true
        }
        StmtKind::Switch { subject, sections } => {
            let mut copies = out.sections(sections).to_vec();
            let Some(section) = copies
                .iter_mut()
                .find(|section| out.stmts(section.body).contains(&stmt))
            else {
                return false;
            };
            let items = rebuild(out.stmts(section.body));
            section.body = out.alloc_stmts(items);
            let sections = out.alloc_sections(copies);
            out.set_stmt_kind(parent, StmtKind::Switch { subject, sections });
            true
        }
        _ => false,
    }
}

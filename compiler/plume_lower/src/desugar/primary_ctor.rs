//! Primary constructors.
//!
//! `class C(int x, string name) : Base(x) { ... }` gets an ordinary
//! constructor with the same parameters that calls `base(x)`. A parameter
//! read from a method, operator, constructor or accessor body is captured:
//! it gets a private field `__x`, assigned first thing in the constructor,
//! and those reads become `this.__x`. Parameters only used by initializers
//! stay constructor-only.
//!
//! Instance field and property initializers move into the constructor
//! after the capture assignments, in declaration order. Temporaries the
//! desugaring of an initializer needed are declared just before its
//! assignment.

use rustc_hash::FxHashSet;

use plume_ir::ast::{
    Body, CtorInitializer, CtorTarget, ExprKind, Member, MemberKind, Modifiers, Param,
};
use plume_ir::visitor::{walk_expr, Visitor};
use plume_ir::{ExprId, Name, SemanticModel, StmtId, SymbolKind, SyntaxTree};

use crate::rewrite::Rewriter;
use crate::LowerError;

/// Redirect captured parameter reads to their fields.
///
/// Runs before the expression traversal, so reads copied by other
/// lowerings already point at the field. Returns the captured parameters
/// in declaration order.
pub(super) fn capture(rw: &mut Rewriter<'_>, index: usize) -> Vec<Param> {
    let input = rw.input;
    let decl = &input.unit.types[index];
    let Some(params) = decl.primary_params else {
        return Vec::new();
    };
    let params = input.params(params);
    let captures = find_captures(input, rw.model, &decl.members, params);
    for &(id, name) in &captures {
        let span = input.expr_span(id);
        let receiver = rw.out.this(span);
        let field = capture_field(&rw.out, name);
        rw.set_kind(id, ExprKind::Member { receiver, name: field });
    }
    let captured: Vec<Param> = params
        .iter()
        .copied()
        .filter(|p| captures.iter().any(|&(_, name)| name == p.name))
        .collect();
    tracing::trace!(captured = captured.len(), "primary constructor parameters captured");
    captured
}

/// Rewrite the primary constructor of the type at `index`.
///
/// `leading` statements open the constructor body; records pass their
/// property assignments here. `captured` comes from [`capture`].
#[tracing::instrument(level = "trace", skip(rw, leading, captured))]
pub(super) fn lower(
    rw: &mut Rewriter<'_>,
    index: usize,
    leading: Vec<StmtId>,
    captured: &[Param],
) -> Result<(), LowerError> {
    let input = rw.input;
    let decl = &input.unit.types[index];
    let Some(params) = decl.primary_params else {
        return Ok(());
    };
    let span = decl.span;
    let base_args = decl.base_args;

    let mut fields = Vec::with_capacity(captured.len());
    let mut body = leading;
    for param in captured {
        let field = capture_field(&rw.out, param.name);
        fields.push(Member::new(
            MemberKind::Field {
                ty: param.ty,
                name: field,
                init: ExprId::INVALID,
            },
            Modifiers::PRIVATE,
            span,
        ));
        let this = rw.out.this(span);
        let target = rw.out.member(this, field, span);
        let value = rw.out.ident(param.name, span);
        let assign = rw.out.assign(target, value, span);
        body.push(rw.out.expr_stmt(assign, span));
    }

    let mut members = std::mem::take(&mut rw.out.unit.types[index].members);
    for member in &mut members {
        if member.is_static() {
            continue;
        }
        let (name, init) = match &mut member.kind {
            MemberKind::Field { name, init, .. } | MemberKind::Property { name, init, .. } => (*name, init),
            _ => continue,
        };
        if !init.is_valid() {
            continue;
        }
        let value = std::mem::replace(init, ExprId::INVALID);
        let value_span = rw.out.expr_span(value);
        let this = rw.out.this(value_span);
        let target = rw.out.member(this, name, value_span);
        let assign = rw.out.assign(target, value, value_span);
        let stmt = rw.out.expr_stmt(assign, value_span);
        rw.relocate_hoists(value, stmt);
        body.push(stmt);
    }

    let ctor = Member::new(
        MemberKind::Constructor {
            params,
            initializer: base_args.map(|args| CtorInitializer {
                target: CtorTarget::Base,
                args,
            }),
            body: rw.out.block_body(&body, span),
        },
        Modifiers::PUBLIC,
        span,
    );

    let decl = &mut rw.out.unit.types[index];
    decl.members = fields.into_iter().chain(members).chain(std::iter::once(ctor)).collect();
    decl.primary_params = None;
    decl.base_args = None;
    rw.mark_changed();
    Ok(())
}

fn capture_field(tree: &SyntaxTree, param: Name) -> Name {
    tree.intern(&format!("__{}", tree.name_str(param)))
}

/// Reads of primary parameters from member bodies, in source order.
fn find_captures(
    tree: &SyntaxTree,
    model: &dyn SemanticModel,
    members: &[Member],
    params: &[Param],
) -> Vec<(ExprId, Name)> {
    let mut finder = CaptureFinder {
        model,
        params: params.iter().map(|p| p.name).collect(),
        found: Vec::new(),
    };
    for member in members {
        if member.is_static() {
            continue;
        }
        for body in bodies(member) {
            match body {
                Body::None => {}
                Body::Block(stmt) => finder.visit_stmt(stmt, tree),
                Body::Expr(expr) => finder.visit_expr(expr, tree),
            }
        }
    }
    finder.found
}

/// Executable bodies of a member. Initializers, parameter defaults and
/// constructor-initializer arguments are not bodies.
fn bodies(member: &Member) -> Vec<Body> {
    match &member.kind {
        MemberKind::Method { body, .. }
        | MemberKind::Operator { body, .. }
        | MemberKind::Constructor { body, .. } => vec![*body],
        MemberKind::Property { getter, setter, .. } => getter.iter().chain(setter.iter()).copied().collect(),
        MemberKind::Field { .. } => Vec::new(),
    }
}

struct CaptureFinder<'m> {
    model: &'m dyn SemanticModel,
    params: FxHashSet<Name>,
    found: Vec<(ExprId, Name)>,
}

impl<'ast> Visitor<'ast> for CaptureFinder<'_> {
    fn visit_expr(&mut self, id: ExprId, tree: &'ast SyntaxTree) {
        if let ExprKind::Ident(name) = tree.expr_kind(id) {
            let is_primary = self
                .model
                .symbol_info(id)
                .symbol
                .is_some_and(|symbol| symbol.kind == SymbolKind::PrimaryParameter);
            if is_primary && self.params.contains(&name) {
                self.found.push((id, name));
            }
        }
        walk_expr(self, id, tree);
    }
}

//! Shared state of one rewriting pass.
//!
//! A pass reads an input tree through the semantic model built for it and
//! writes into `out`, which starts as a clone of the input. Input nodes
//! keep their IDs in `out`, so a pass walks the input, asks the model about
//! input nodes only, and overwrites the matching `out` slots. Nodes the
//! pass creates are appended past the end of the input arenas and are
//! never handed to the model.

use plume_ir::ast::{ExprKind, StmtKind};
use plume_ir::visitor::{walk_expr, walk_pattern, walk_stmt, Visitor};
use plume_ir::{
    ExprId, Name, NodeRef, ParentMap, PatternId, SemanticModel, Span, StmtId, SyntaxTree,
    TypeExprId, TypeId, TypeInfo,
};

use crate::hoist::{self, Hoister, InstallPoint};
use crate::synth;
use crate::LowerError;

/// Output of a pass.
pub(crate) struct Rewritten {
    pub(crate) tree: SyntaxTree,
    /// Whether the pass edited anything. An unchanged tree can keep its
    /// semantic view.
    pub(crate) changed: bool,
}

pub(crate) struct Rewriter<'a> {
    pub(crate) pass: &'static str,
    pub(crate) input: &'a SyntaxTree,
    pub(crate) model: &'a dyn SemanticModel,
    pub(crate) parents: ParentMap,
    pub(crate) out: SyntaxTree,
    hoister: Hoister,
    changed: bool,
    input_exprs: usize,
    initializer_hoists: bool,
}

impl<'a> Rewriter<'a> {
    pub(crate) fn new(pass: &'static str, input: &'a SyntaxTree, model: &'a dyn SemanticModel) -> Self {
        Rewriter {
            pass,
            input,
            model,
            parents: ParentMap::build(input),
            out: input.clone(),
            hoister: Hoister::default(),
            changed: false,
            input_exprs: input.expr_count(),
            initializer_hoists: false,
        }
    }

    /// Let instance initializers of primary-constructor types take hoisted
    /// declarations. The pass must later call [`Rewriter::relocate_hoists`]
    /// for every such initializer it moves into a constructor.
    pub(crate) fn with_initializer_hoists(mut self) -> Self {
        self.initializer_hoists = true;
        self
    }

    /// Apply queued hoists and hand back the rewritten tree.
    pub(crate) fn finish(self) -> Rewritten {
        let Rewriter {
            mut out,
            parents,
            hoister,
            changed,
            ..
        } = self;
        let changed = changed || !hoister.is_empty();
        hoister.apply(&mut out, &parents);
        Rewritten { tree: out, changed }
    }

    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    // Model queries

    fn is_input(&self, id: ExprId) -> bool {
        id.is_valid() && id.index() < self.input_exprs
    }

    pub(crate) fn type_info(&self, id: ExprId) -> TypeInfo {
        if self.is_input(id) {
            self.model.type_info(id)
        } else {
            TypeInfo::UNKNOWN
        }
    }

    pub(crate) fn type_of(&self, id: ExprId) -> TypeId {
        self.type_info(id).ty
    }

    // Output editing

    /// Overwrite `id` in `out` with a copy of `replacement`.
    pub(crate) fn replace(&mut self, id: ExprId, replacement: ExprId) {
        if id != replacement {
            self.out.replace_expr_with(id, replacement);
            self.changed = true;
        }
    }

    pub(crate) fn set_kind(&mut self, id: ExprId, kind: ExprKind) {
        self.out.set_expr_kind(id, kind);
        self.changed = true;
    }

    pub(crate) fn set_stmt(&mut self, id: StmtId, kind: StmtKind) {
        self.out.set_stmt_kind(id, kind);
        self.changed = true;
    }

    /// Replace a statement with a sequence of statements.
    pub(crate) fn splice(&mut self, stmt: StmtId, items: &[StmtId]) {
        hoist::replace_with_many(&mut self.out, &self.parents, stmt, items);
        self.changed = true;
    }

    pub(crate) fn fresh(&mut self, prefix: &str) -> Name {
        self.out.fresh_name(prefix)
    }

    pub(crate) fn type_syntax(&mut self, ty: TypeId) -> TypeExprId {
        synth::type_syntax(&mut self.out, self.model, ty)
    }

    /// Evaluate `value` once when it is not simple.
    ///
    /// Returns an expression to copy for every read, and the assignment
    /// that captures `value` into a hoisted temporary when one was needed.
    pub(crate) fn stabilize(
        &mut self,
        anchor: ExprId,
        value: ExprId,
        ty: TypeId,
        prefix: &str,
    ) -> Result<(ExprId, Option<ExprId>), LowerError> {
        if synth::is_simple(&self.out, value) {
            return Ok((value, None));
        }
        let span = self.out.expr_span(value);
        let point = self.install_point(NodeRef::Expr(anchor), span)?;
        let temp = self.temp(point, prefix, ty, span);
        let target = self.out.ident(temp, span);
        let capture = self.out.assign(target, value, span);
        Ok((self.out.ident(temp, span), Some(capture)))
    }

    /// Fresh copy of `template`.
    pub(crate) fn read(&mut self, template: ExprId) -> ExprId {
        self.out.duplicate_expr(template)
    }

    // Hoisting

    pub(crate) fn install_point(&self, node: NodeRef, span: Span) -> Result<InstallPoint, LowerError> {
        hoist::install_point(
            self.input,
            &self.parents,
            self.model,
            self.pass,
            self.initializer_hoists,
            node,
            span,
        )
    }

    /// Declarations hoisted out of the initializer `init` go before `stmt`.
    pub(crate) fn relocate_hoists(&mut self, init: ExprId, stmt: StmtId) {
        self.hoister
            .relocate(InstallPoint::Initializer(init), InstallPoint::Stmt(stmt));
    }

    /// Declare `ty name;` at `point` when the pass finishes.
    pub(crate) fn hoist(&mut self, point: InstallPoint, name: Name, ty: TypeExprId, span: Span) {
        self.hoister.declare(point, name, ty, span);
    }

    /// Fresh temporary of type `ty` declared at `point`; returns its name.
    pub(crate) fn temp(&mut self, point: InstallPoint, prefix: &str, ty: TypeId, span: Span) -> Name {
        let name = self.fresh(prefix);
        let syntax = self.type_syntax(ty);
        self.hoist(point, name, syntax, span);
        name
    }

    // Errors

    pub(crate) fn unsupported(&self, what: impl Into<String>, span: Span) -> LowerError {
        LowerError::unsupported(self.pass, what, span)
    }

    /// Attribute `err` to the input node `id`.
    pub(crate) fn wrap_expr(&self, err: LowerError, id: ExprId) -> LowerError {
        let node = plume_ir::print_expr(self.input, id);
        err.within(self.pass, node, self.input.expr_span(id))
    }
}

/// Every reachable node of `tree`, children before parents.
pub(crate) fn post_order(tree: &SyntaxTree) -> Vec<NodeRef> {
    struct Collect(Vec<NodeRef>);

    impl<'ast> Visitor<'ast> for Collect {
        fn visit_expr(&mut self, id: ExprId, tree: &'ast SyntaxTree) {
            walk_expr(self, id, tree);
            self.0.push(NodeRef::Expr(id));
        }

        fn visit_stmt(&mut self, id: StmtId, tree: &'ast SyntaxTree) {
            walk_stmt(self, id, tree);
            self.0.push(NodeRef::Stmt(id));
        }

        fn visit_pattern(&mut self, id: PatternId, tree: &'ast SyntaxTree) {
            walk_pattern(self, id, tree);
            self.0.push(NodeRef::Pattern(id));
        }
    }

    let mut collect = Collect(Vec::with_capacity(tree.expr_count() + tree.stmt_count()));
    collect.visit_tree(tree);
    collect.0
}

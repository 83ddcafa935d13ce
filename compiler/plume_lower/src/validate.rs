//! Post-lowering validation.
//!
//! Walks a lowered tree and rejects any construct outside the target
//! subset. A survivor means some pass skipped a node it should have
//! lowered (or could not express it), so the error names the construct and
//! points at its source span.

use plume_ir::ast::{ExprKind, Member, StmtKind, TypeDecl};
use plume_ir::visitor::{walk_expr, walk_member, walk_stmt, walk_type_decl, Visitor};
use plume_ir::{ExprId, PatternId, Span, StmtId, SyntaxTree};

use crate::desugar::is_constant_label;
use crate::LowerError;

const PASS: &str = "validate";

/// Check that `tree` only uses the target subset.
///
/// Reports the first remaining construct in traversal order.
#[tracing::instrument(level = "debug", skip_all)]
pub fn validate(tree: &SyntaxTree) -> Result<(), LowerError> {
    let mut validator = Validator { first: None };
    validator.visit_tree(tree);
    match validator.first {
        Some((what, span)) => {
            tracing::debug!(what, %span, "sugar survived lowering");
            Err(LowerError::unsupported(PASS, format!("{what} remains after lowering"), span))
        }
        None => Ok(()),
    }
}

struct Validator {
    first: Option<(&'static str, Span)>,
}

impl Validator {
    fn report(&mut self, what: &'static str, span: Span) {
        if self.first.is_none() {
            self.first = Some((what, span));
        }
    }
}

fn expr_sugar(tree: &SyntaxTree, id: ExprId) -> Option<&'static str> {
    let what = match tree.expr_kind(id) {
        ExprKind::Is { .. } => "pattern test",
        ExprKind::Switch { .. } => "switch expression",
        ExprKind::FromEnd(_) => "index from end",
        ExprKind::Range { .. } => "range",
        ExprKind::ConditionalAccess { .. } => "null-conditional access",
        ExprKind::MemberBinding(_) | ExprKind::ElementBinding(_) => "conditional-access binding",
        ExprKind::Spread(_) => "spread element",
        ExprKind::With { .. } => "with expression",
        ExprKind::Interpolated(_) => "interpolated string",
        ExprKind::Declaration { .. } => "declaration expression",
        ExprKind::Discard => "discard",
        ExprKind::Assign { target, .. } if matches!(tree.expr_kind(target), ExprKind::Tuple(_)) => {
            "deconstructing assignment"
        }
        _ => return None,
    };
    Some(what)
}

impl<'ast> Visitor<'ast> for Validator {
    fn visit_type_decl(&mut self, decl: &'ast TypeDecl, tree: &'ast SyntaxTree) {
        if decl.kind.is_record() {
            self.report("record declaration", decl.span);
        } else if decl.primary_params.is_some() {
            self.report("primary constructor", decl.span);
        }
        walk_type_decl(self, decl, tree);
    }

    fn visit_member(&mut self, member: &'ast Member, tree: &'ast SyntaxTree) {
        if self.first.is_none() {
            walk_member(self, member, tree);
        }
    }

    fn visit_expr(&mut self, id: ExprId, tree: &'ast SyntaxTree) {
        if self.first.is_some() {
            return;
        }
        if let Some(what) = expr_sugar(tree, id) {
            self.report(what, tree.expr_span(id));
            return;
        }
        walk_expr(self, id, tree);
    }

    fn visit_stmt(&mut self, id: StmtId, tree: &'ast SyntaxTree) {
        if self.first.is_some() {
            return;
        }
        match tree.stmt_kind(id) {
            StmtKind::LocalFunction(_) => {
                self.report("local function", tree.stmt_span(id));
                return;
            }
            StmtKind::Switch { sections, .. } => {
                let patterned = tree.sections(sections).iter().any(|section| {
                    tree.labels(section.labels)
                        .iter()
                        .any(|&label| !is_constant_label(tree, label))
                });
                if patterned {
                    self.report("switch with pattern labels", tree.stmt_span(id));
                    return;
                }
            }
            _ => {}
        }
        walk_stmt(self, id, tree);
    }

    fn visit_pattern(&mut self, _id: PatternId, _tree: &'ast SyntaxTree) {
        // Only constant case labels can still hold patterns.
    }
}

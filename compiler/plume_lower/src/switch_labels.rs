//! Switch statements with pattern labels.
//!
//! A switch whose labels are all constants (or `default`) is left alone.
//! Any other switch becomes an if/else chain:
//!
//! ```text
//! switch (Next()) {                    {
//!     case int n when n > 0:               object __s0 = Next();
//!     case string:                         if (__s0 is int && (n = (int)__s0, true) && n > 0
//!         Log("a");              →             || __s0 is string) {
//!         break;                               Log("a");
//!     default:                             } else {
//!         Log("b");                            Log("b");
//!         break;                           }
//! }                                    }
//! ```
//!
//! Labels of one section are OR-ed. The `default` section becomes the
//! final `else` wherever it was written. A trailing `break;` is dropped;
//! any other `break` that leaves the switch cannot be expressed and is
//! rejected.

use plume_ir::ast::{BinaryOp, StmtKind, SwitchLabel, SwitchSection};
use plume_ir::visitor::{walk_stmt, Visitor};
use plume_ir::{ExprId, NodeRef, SemanticModel, Span, StmtId, SyntaxTree};

use crate::desugar::is_constant_label;
use crate::hoist::InstallPoint;
use crate::patterns::{PatternLowerer, Subject};
use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::synth::{is_simple, local_type};
use crate::LowerError;

pub(crate) const PASS: &str = "switch-labels";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
    for node in post_order(input) {
        let NodeRef::Stmt(id) = node else { continue };
        let StmtKind::Switch { subject, sections } = input.stmt_kind(id) else {
            continue;
        };
        let sections = input.sections(sections);
        let all_constant = sections
            .iter()
            .all(|section| input.labels(section.labels).iter().all(|&label| is_constant_label(input, label)));
        if !all_constant {
            lower_switch(&mut rw, id, subject, sections)?;
        }
    }
    Ok(rw.finish())
}

fn lower_switch(
    rw: &mut Rewriter<'_>,
    id: StmtId,
    subject: ExprId,
    sections: &[SwitchSection],
) -> Result<(), LowerError> {
    let span = rw.input.stmt_span(id);
    let subject_ty = rw.type_of(subject);

    let mut prelude = Vec::new();
    let tested = if is_simple(&rw.out, subject) {
        subject
    } else {
        let temp = rw.fresh("s");
        let ty = local_type(&mut rw.out, rw.model, subject_ty);
        prelude.push(rw.out.local(ty, temp, subject, span));
        rw.out.ident(temp, span)
    };
    let tested = Subject {
        expr: tested,
        ty: subject_ty,
        source: Some(subject),
    };

    let mut default_body = None;
    let mut arms: Vec<(ExprId, StmtId)> = Vec::with_capacity(sections.len());
    for section in sections {
        let body = section_body(rw, section, span)?;
        let labels = rw.input.labels(section.labels);
        if labels.contains(&SwitchLabel::Default) {
            default_body = Some(body);
            continue;
        }
        let mut conds = Vec::with_capacity(labels.len());
        for &label in labels {
            let SwitchLabel::Case { pattern, guard } = label else {
                continue;
            };
            let pattern_span = rw.input.pattern(pattern).span;
            let mut lowerer = PatternLowerer::new(rw, InstallPoint::Stmt(id), pattern_span);
            let mut cond = lowerer.lower(tested, pattern)?;
            if guard.is_valid() {
                cond = rw.out.binary(BinaryOp::And, cond, guard, pattern_span);
            }
            conds.push(cond);
        }
        let mut conds = conds.into_iter();
        let Some(first) = conds.next() else { continue };
        let cond = conds.fold(first, |acc, c| rw.out.binary(BinaryOp::Or, acc, c, span));
        arms.push((cond, body));
    }

    let mut chain = default_body.unwrap_or(StmtId::INVALID);
    for (cond, body) in arms.into_iter().rev() {
        chain = rw.out.if_stmt(cond, body, chain, span);
    }
    if chain.is_valid() {
        prelude.push(chain);
    }
    tracing::trace!(sections = sections.len(), "switch lowered to if chain");
    let list = rw.out.alloc_stmts(prelude);
    rw.set_stmt(id, StmtKind::Block(list));
    Ok(())
}

/// Block holding the statements of `section` without its trailing
/// `break`.
fn section_body(rw: &mut Rewriter<'_>, section: &SwitchSection, span: Span) -> Result<StmtId, LowerError> {
    let mut stmts = rw.input.stmts(section.body).to_vec();
    let trailing = strip_trailing_break(rw, &mut stmts);

    let mut finder = BreakFinder::default();
    for &stmt in rw.input.stmts(section.body) {
        finder.visit_stmt(stmt, rw.input);
    }
    if let Some(&stray) = finder.found.iter().find(|&&b| Some(b) != trailing) {
        return Err(rw.unsupported(
            "`break` that leaves a switch with pattern labels",
            rw.input.stmt_span(stray),
        ));
    }
    Ok(rw.out.block(&stmts, span))
}

/// Drop a `break;` at the end of `stmts`, looking through nested blocks.
/// Returns the dropped statement.
fn strip_trailing_break(rw: &mut Rewriter<'_>, stmts: &mut Vec<StmtId>) -> Option<StmtId> {
    let &last = stmts.last()?;
    match rw.input.stmt_kind(last) {
        StmtKind::Break => {
            stmts.pop();
            Some(last)
        }
        StmtKind::Block(list) => {
            let mut inner = rw.input.stmts(list).to_vec();
            let dropped = strip_trailing_break(rw, &mut inner)?;
            let list = rw.out.alloc_stmts(inner);
            rw.set_stmt(last, StmtKind::Block(list));
            Some(dropped)
        }
        _ => None,
    }
}

/// `break` statements that target the enclosing switch.
#[derive(Default)]
struct BreakFinder {
    found: Vec<StmtId>,
}

impl<'ast> Visitor<'ast> for BreakFinder {
    fn visit_expr(&mut self, _id: ExprId, _tree: &'ast SyntaxTree) {
        // Statements inside expressions belong to lambdas.
    }

    fn visit_stmt(&mut self, id: StmtId, tree: &'ast SyntaxTree) {
        match tree.stmt_kind(id) {
            StmtKind::Break => self.found.push(id),
            StmtKind::While { .. }
            | StmtKind::For { .. }
            | StmtKind::Foreach { .. }
            | StmtKind::Switch { .. }
            | StmtKind::LocalFunction(_) => {}
            _ => walk_stmt(self, id, tree),
        }
    }
}

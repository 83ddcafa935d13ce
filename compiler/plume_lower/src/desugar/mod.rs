//! Main desugaring traversal.
//!
//! One post-order walk over the unit lowers expression-level sugar, then
//! every record and primary-constructor declaration is rewritten. While
//! walking, the traversal records which conditional passes the unit needs.
//!
//! | Construct | Lowered to |
//! |-----------|------------|
//! | `s switch { p => r, .. }` | conditional chain over `is` tests |
//! | `a[^i]`, `a[i..j]` | length arithmetic, `Substring`/`Slice` |
//! | `a?.b` | null guards over stabilized receivers |
//! | `[x, ..ys]` | buffer-building lambda |
//! | `$"{x}"` | concatenation or `string.Format` |
//! | `r with { P = v }` | clone-and-assign lambda |
//! | `record R(..)` | class or struct with synthesized members |

mod collections;
mod indexing;
mod interpolation;
mod null_cond;
mod primary_ctor;
mod records;
mod switch_expr;


use plume_ir::ast::{ExprKind, Param, PatternKind, StmtKind, SwitchLabel};
use plume_ir::{ExprId, NodeRef, SemanticModel, StmtId, SyntaxTree};

use crate::pipeline::PassTriggers;
use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::LowerError;

pub(crate) const PASS: &str = "desugar";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(
    input: &SyntaxTree,
    model: &dyn SemanticModel,
    triggers: &mut PassTriggers,
) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model).with_initializer_hoists();
    if input.unit.usings.iter().any(|using| using.is_static) {
        triggers.static_usings = true;
    }

    let captured: Vec<Vec<Param>> = (0..input.unit.types.len())
        .map(|index| primary_ctor::capture(&mut rw, index))
        .collect();

    for node in post_order(input) {
        match node {
            NodeRef::Expr(id) => expr(&mut rw, triggers, id)?,
            NodeRef::Stmt(id) => observe_stmt(input, triggers, id),
            NodeRef::Pattern(_) => {}
        }
    }

    for (index, decl) in input.unit.types.iter().enumerate() {
        if decl.kind.is_record() {
            records::lower_decl(&mut rw, index, &captured[index])?;
        } else if decl.primary_params.is_some() {
            primary_ctor::lower(&mut rw, index, Vec::new(), &captured[index])?;
        }
    }

    tracing::debug!(?triggers, "desugar traversal finished");
    Ok(rw.finish())
}

fn expr(rw: &mut Rewriter<'_>, triggers: &mut PassTriggers, id: ExprId) -> Result<(), LowerError> {
    match rw.input.expr_kind(id) {
        ExprKind::Is { .. } => triggers.patterns = true,
        ExprKind::Switch { subject, arms } => {
            switch_expr::lower(rw, id, subject, arms)?;
            triggers.patterns = true;
        }
        ExprKind::Index { receiver, args } => indexing::lower_index(rw, id, receiver, args)?,
        ExprKind::FromEnd(value) => indexing::lower_from_end(rw, id, value),
        ExprKind::Range { start, end } => indexing::lower_range(rw, id, start, end),
        ExprKind::ConditionalAccess { .. } => null_cond::lower(rw, id)?,
        ExprKind::Collection(items) => collections::lower(rw, id, items),
        ExprKind::Interpolated(parts) => interpolation::lower(rw, id, parts)?,
        ExprKind::With { receiver, inits } => records::lower_with(rw, id, receiver, inits),
        _ => {}
    }
    Ok(())
}

fn observe_stmt(input: &SyntaxTree, triggers: &mut PassTriggers, id: StmtId) {
    match input.stmt_kind(id) {
        StmtKind::LocalFunction(_) => triggers.local_functions = true,
        StmtKind::Expr(e) => {
            if let ExprKind::Assign {
                op: None, value, ..
            } = input.expr_kind(e)
            {
                if matches!(input.expr_kind(value), ExprKind::Assign { op: None, .. }) {
                    triggers.chained_assignment = true;
                }
            }
        }
        StmtKind::Switch { sections, .. } => {
            if input
                .sections(sections)
                .iter()
                .any(|section| input.labels(section.labels).iter().any(|&label| !is_constant_label(input, label)))
            {
                triggers.switch_labels = true;
            }
        }
        _ => {}
    }
}

/// `case <constant>:` and `default:` labels are already in the subset.
pub(crate) fn is_constant_label(tree: &SyntaxTree, label: SwitchLabel) -> bool {
    match label {
        SwitchLabel::Default => true,
        SwitchLabel::Case { pattern, guard } => {
            !guard.is_valid() && matches!(tree.pattern_kind(pattern), PatternKind::Constant(_))
        }
    }
}

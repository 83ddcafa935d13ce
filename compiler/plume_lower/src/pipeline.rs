//! Pass sequencing for one compilation unit.

use std::fmt;

use plume_ir::{SemanticModel, SourceModel, SyntaxTree};

use crate::rewrite::Rewritten;
use crate::{chained, desugar, local_fns, normalize, patterns, static_using, switch_labels};
use crate::{validate, LowerError};

/// One rewriting pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PassKind {
    /// Expression-bodied members and local functions become block bodies.
    ExpressionBodies,
    /// Implicit `this.` and `Type.` receivers are made explicit.
    Names,
    /// Deconstruction, discards and `out` declarations.
    Deconstruction,
    /// The main desugaring traversal.
    Desugar,
    LocalFunctions,
    ChainedAssignment,
    StaticUsings,
    Patterns,
    SwitchLabels,
}

impl PassKind {
    /// Passes that run on every unit, in order, before [`PassKind::Desugar`].
    pub const NORMALIZATION: [PassKind; 3] = [
        PassKind::ExpressionBodies,
        PassKind::Names,
        PassKind::Deconstruction,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassKind::ExpressionBodies => normalize::expr_body::PASS,
            PassKind::Names => normalize::names::PASS,
            PassKind::Deconstruction => normalize::deconstruct::PASS,
            PassKind::Desugar => desugar::PASS,
            PassKind::LocalFunctions => local_fns::PASS,
            PassKind::ChainedAssignment => chained::PASS,
            PassKind::StaticUsings => static_using::PASS,
            PassKind::Patterns => patterns::PASS,
            PassKind::SwitchLabels => switch_labels::PASS,
        }
    }

    pub(crate) fn run(
        self,
        tree: &SyntaxTree,
        model: &dyn SemanticModel,
        triggers: &mut PassTriggers,
    ) -> Result<Rewritten, LowerError> {
        match self {
            PassKind::ExpressionBodies => normalize::expr_body::run(tree, model),
            PassKind::Names => normalize::names::run(tree, model),
            PassKind::Deconstruction => normalize::deconstruct::run(tree, model),
            PassKind::Desugar => desugar::run(tree, model, triggers),
            PassKind::LocalFunctions => local_fns::run(tree, model),
            PassKind::ChainedAssignment => chained::run(tree, model),
            PassKind::StaticUsings => static_using::run(tree, model),
            PassKind::Patterns => patterns::run(tree, model),
            PassKind::SwitchLabels => switch_labels::run(tree, model),
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Constructs observed by the desugaring traversal.
///
/// Each flag enables one conditional pass. A unit that never uses a
/// construct never pays for its pass.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PassTriggers {
    pub local_functions: bool,
    pub chained_assignment: bool,
    pub static_usings: bool,
    /// Set for `is` expressions, including the ones switch expressions
    /// lower to.
    pub patterns: bool,
    /// A `switch` statement has a label that is not a plain constant.
    pub switch_labels: bool,
}

impl PassTriggers {
    /// Conditional passes to run, in order.
    ///
    /// Local functions go first so the later passes see their bodies as
    /// ordinary lambdas. Pattern switch labels go last and drive the pattern
    /// engine directly, so they never leave `is` tests behind.
    pub fn plan(&self) -> Vec<PassKind> {
        let mut passes = Vec::new();
        if self.local_functions {
            passes.push(PassKind::LocalFunctions);
        }
        if self.chained_assignment {
            passes.push(PassKind::ChainedAssignment);
        }
        if self.static_usings {
            passes.push(PassKind::StaticUsings);
        }
        if self.patterns {
            passes.push(PassKind::Patterns);
        }
        if self.switch_labels {
            passes.push(PassKind::SwitchLabels);
        }
        passes
    }
}

/// Lower one unit to the conservative subset.
///
/// The front end re-analyzes the tree after every pass that changed it, so
/// each pass reads a model that describes its exact input. The lowered tree
/// is validated before it is returned.
#[tracing::instrument(level = "debug", skip_all, fields(types = tree.unit.types.len()))]
pub fn lower_tree<S: SourceModel>(source: &S, mut tree: SyntaxTree) -> Result<SyntaxTree, LowerError> {
    let mut triggers = PassTriggers::default();
    let mut view: Option<S::View> = None;

    let fixed = PassKind::NORMALIZATION.into_iter().chain([PassKind::Desugar]);
    for pass in fixed {
        run_pass(source, pass, &mut tree, &mut view, &mut triggers)?;
    }
    // The conditional plan is only known once desugaring has run.
    for pass in triggers.plan() {
        run_pass(source, pass, &mut tree, &mut view, &mut triggers)?;
    }

    tracing::debug!(?triggers, "lowering finished");
    validate(&tree)?;
    Ok(tree)
}

fn run_pass<S: SourceModel>(
    source: &S,
    pass: PassKind,
    tree: &mut SyntaxTree,
    view: &mut Option<S::View>,
    triggers: &mut PassTriggers,
) -> Result<(), LowerError> {
    let current = view.get_or_insert_with(|| source.analyze(tree));
    let model: &dyn SemanticModel = &*current;
    let rewritten = pass.run(tree, model, triggers)?;
    tracing::debug!(pass = pass.name(), changed = rewritten.changed, "pass finished");
    if rewritten.changed {
        *tree = rewritten.tree;
        *view = None;
    }
    Ok(())
}

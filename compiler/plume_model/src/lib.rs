//! Plume Model - reference semantic model
//!
//! `TableModel` implements the [`SourceModel`] and
//! [`SemanticModel`](plume_ir::SemanticModel) traits over an in-memory type table. It does not parse: embedders
//! register a tree builder per source text and `parse` replays it. Analysis
//! is a scoped walk that binds names, propagates expected types, and folds
//! constants, which is all lowering asks of a model.
//!
//! The table knows the primitive types, a small library (`List<T>`,
//! `IEnumerable<T>`, `Func<..>`, `Action<..>`, `Index`, `Range`,
//! `Console`, `Math`, exception types) and every type declared in the tree
//! being analyzed.

mod analyze;
mod library;
mod table;
mod view;


use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use plume_ir::{ParseError, SharedInterner, SourceModel, Span, SyntaxTree};

pub use view::TableView;

type TreeBuilder = Arc<dyn Fn(&mut SyntaxTree) + Send + Sync>;

/// Table-driven source model.
pub struct TableModel {
    interner: SharedInterner,
    sources: RwLock<FxHashMap<String, TreeBuilder>>,
}

impl TableModel {
    pub fn new(interner: SharedInterner) -> Self {
        TableModel {
            interner,
            sources: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Register the tree that `parse(text)` produces.
    ///
    /// Registering the same text again replaces the earlier builder.
    pub fn register_source(
        &self,
        text: impl Into<String>,
        build: impl Fn(&mut SyntaxTree) + Send + Sync + 'static,
    ) {
        self.sources.write().insert(text.into(), Arc::new(build));
    }

    /// Fresh empty tree sharing this model's interner.
    pub fn new_tree(&self) -> SyntaxTree {
        SyntaxTree::new(self.interner.clone())
    }
}

impl Default for TableModel {
    fn default() -> Self {
        TableModel::new(SharedInterner::new())
    }
}

impl SourceModel for TableModel {
    type View = TableView;

    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        let build = self.sources.read().get(text).cloned();
        let Some(build) = build else {
            let end = u32::try_from(text.len()).unwrap_or(u32::MAX);
            return Err(ParseError::new(
                "no syntax registered for this source text",
                Span::new(0, end),
            ));
        };
        let mut tree = self.new_tree();
        build(&mut tree);
        Ok(tree)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(exprs = tree.expr_count()))]
    fn analyze(&self, tree: &SyntaxTree) -> TableView {
        let table = table::TypeTable::new(self.interner.clone());
        TableView::build(tree, table)
    }
}

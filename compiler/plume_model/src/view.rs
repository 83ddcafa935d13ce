//! Semantic view over one analyzed tree.

use plume_ir::ast::{ExprKind, Literal};
use plume_ir::{
    ConstValue, Conversion, ExprId, MemberInfo, Name, NodeRef, SemanticModel, Symbol, SymbolInfo,
    SyntaxTree, TypeData, TypeExprId, TypeId, TypeInfo,
};

use crate::analyze::{Analyzer, Facts};
use crate::table::TypeTable;

/// Facts about exactly one tree, produced by [`TableModel::analyze`].
///
/// [`TableModel::analyze`]: plume_ir::SourceModel::analyze
pub struct TableView {
    table: TypeTable,
    facts: Facts,
    /// Expressions that are the `null` literal, which convert differently
    /// from other values of their type.
    null_literals: Vec<bool>,
}

impl TableView {
    pub(crate) fn build(tree: &SyntaxTree, mut table: TypeTable) -> Self {
        table.declare_tree(tree);
        let facts = Analyzer::run(tree, &mut table);
        let null_literals = (0..tree.expr_count())
            .map(|i| {
                let id = ExprId::new(u32::try_from(i).unwrap_or(u32::MAX));
                matches!(tree.expr_kind(id), ExprKind::Literal(Literal::Null))
            })
            .collect();
        TableView {
            table,
            facts,
            null_literals,
        }
    }

    /// Number of expressions this view has facts for.
    pub fn expr_count(&self) -> usize {
        self.facts.types.len()
    }
}

impl SemanticModel for TableView {
    fn type_info(&self, expr: ExprId) -> TypeInfo {
        self.facts
            .types
            .get(expr.index())
            .copied()
            .unwrap_or(TypeInfo::UNKNOWN)
    }

    fn declared_symbol(&self, node: NodeRef) -> Option<Symbol> {
        self.facts.declared.get(&node).copied()
    }

    fn symbol_info(&self, expr: ExprId) -> SymbolInfo {
        self.facts.symbols.get(&expr).cloned().unwrap_or_default()
    }

    fn constant_value(&self, expr: ExprId) -> Option<ConstValue> {
        self.facts.constants.get(&expr).copied()
    }

    fn classify_conversion(&self, expr: ExprId, target: TypeId) -> Conversion {
        let from = if self.null_literals.get(expr.index()).copied().unwrap_or(false) {
            TypeId::NULL
        } else {
            self.type_info(expr).ty
        };
        self.table.classify(from, target)
    }

    fn bind_type(&self, ty: TypeExprId) -> TypeId {
        self.table.bound(ty)
    }

    fn type_data(&self, ty: TypeId) -> &TypeData {
        self.table.data(ty)
    }

    fn lookup_type(&self, name: Name) -> Option<TypeId> {
        self.table.lookup(name)
    }

    fn find_member(&self, ty: TypeId, name: Name) -> Option<&MemberInfo> {
        self.table.find_member(ty, name)
    }
}

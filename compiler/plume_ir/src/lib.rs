//! Plume IR - syntax tree and semantic model interface
//!
//! This crate contains the data structures shared by every stage of the
//! desugaring pipeline:
//! - Spans for source locations
//! - Names for interned identifiers
//! - The arena syntax tree (`SyntaxTree`) and its node kinds
//! - Parent maps and the tree visitor
//! - The semantic model traits consumed by lowering
//! - The printer that turns a tree back into text
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: identifiers and literals are `Name(u32)`
//! - **Flatten Everything**: no `Box<Expr>`, children are `u32` IDs
//! - **Copy Kinds**: node kinds are `Copy`, so a pass can read a node,
//!   build its replacement, and overwrite the slot without borrow juggling

pub mod ast;
mod ids;
mod interner;
mod name;
mod parents;
mod print;
mod semantic;
mod span;
pub mod stack;
mod tree;
pub mod visitor;

pub use ids::{
    ArmRange, ExprId, ExprRange, FieldInitRange, InterpPartRange, LabelRange, LambdaId, LocalFnId,
    ParamRange, PatternId, PatternRange, PropPatRange, SectionRange, StmtId, StmtRange, TypeExprId,
    TypeRange,
};
pub use interner::{InternError, SharedInterner, StringInterner, StringLookup};
pub use name::Name;
pub use parents::{Ancestors, Parent, ParentMap};
pub use print::{print_expr, print_pattern, print_stmt, print_type, print_unit};
pub use semantic::{
    Component, ConstValue, Conversion, MemberInfo, ParseError, SemanticModel, SourceModel, Symbol,
    SymbolInfo, SymbolKind, TypeData, TypeId, TypeInfo, TypeShape,
};
pub use span::Span;
pub use tree::SyntaxTree;
pub use visitor::NodeRef;

//! Semantic model interface.
//!
//! Lowering is type-directed but does not type-check. It asks a
//! [`SemanticModel`] about the tree it is rewriting: expression types,
//! declared and referenced symbols, constant values and conversions. A
//! [`SourceModel`] parses text into trees and analyzes a tree into a fresh
//! model. A model only answers questions about the exact tree it was
//! built from.

use std::fmt;

use crate::visitor::NodeRef;
use crate::{ExprId, Name, Span, SyntaxTree, TypeExprId};

/// Handle to a type known to a semantic model.
///
/// Primitive types are pre-allocated at fixed indices so every model agrees
/// on them. Other IDs are only meaningful to the model that produced them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// Universal fallback for anything that cannot be resolved.
    pub const UNKNOWN: TypeId = TypeId(0);
    pub const OBJECT: TypeId = TypeId(1);
    pub const BOOL: TypeId = TypeId(2);
    pub const INT: TypeId = TypeId(3);
    pub const LONG: TypeId = TypeId(4);
    pub const DOUBLE: TypeId = TypeId(5);
    pub const CHAR: TypeId = TypeId(6);
    pub const STRING: TypeId = TypeId(7);
    pub const VOID: TypeId = TypeId(8);
    /// Type of the `null` literal.
    pub const NULL: TypeId = TypeId(9);

    /// First ID for model-allocated types.
    pub const FIRST_DYNAMIC: u32 = 10;

    #[inline]
    pub const fn new(index: u32) -> Self {
        TypeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TypeId::UNKNOWN => write!(f, "TypeId::UNKNOWN"),
            TypeId::OBJECT => write!(f, "TypeId::OBJECT"),
            TypeId::BOOL => write!(f, "TypeId::BOOL"),
            TypeId::INT => write!(f, "TypeId::INT"),
            TypeId::LONG => write!(f, "TypeId::LONG"),
            TypeId::DOUBLE => write!(f, "TypeId::DOUBLE"),
            TypeId::CHAR => write!(f, "TypeId::CHAR"),
            TypeId::STRING => write!(f, "TypeId::STRING"),
            TypeId::VOID => write!(f, "TypeId::VOID"),
            TypeId::NULL => write!(f, "TypeId::NULL"),
            TypeId(n) => write!(f, "TypeId({n})"),
        }
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Broad category of a type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeShape {
    Primitive,
    Class,
    Struct,
    Interface,
    /// `T[]`; element in [`TypeData::element`].
    Array,
    /// `(T1, T2)`; elements in [`TypeData::args`].
    Tuple,
    /// `T?` over a value type; underlying type in [`TypeData::element`].
    Nullable,
    /// `Func`/`Action`; parameter types then return type in `args`.
    Delegate,
    /// Generic type parameter in scope.
    TypeParam,
    Null,
    Void,
    Unknown,
}

/// Member of a type as seen by lowering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: Name,
    pub kind: SymbolKind,
    /// Field/property type, or method return type.
    pub ty: TypeId,
    pub params: Vec<TypeId>,
    pub is_static: bool,
}

/// One positional component exposed by a deconstruction method.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Component {
    /// Member read to obtain the component.
    pub member: Name,
    pub ty: TypeId,
}

/// Facts about one type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeData {
    pub name: Name,
    pub shape: TypeShape,
    /// Generic arguments, tuple elements, or delegate signature.
    pub args: Vec<TypeId>,
    /// Array element, nullable underlying type, or enumerated element.
    pub element: Option<TypeId>,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub members: Vec<MemberInfo>,
    /// Positional components, empty when the type has no deconstruction.
    pub components: Vec<Component>,
    pub is_value_type: bool,
}

impl TypeData {
    pub fn unknown(name: Name) -> Self {
        TypeData {
            name,
            shape: TypeShape::Unknown,
            args: Vec::new(),
            element: None,
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            components: Vec::new(),
            is_value_type: false,
        }
    }
}

/// Static and converted type of an expression.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeInfo {
    /// Natural type of the expression.
    pub ty: TypeId,
    /// Type after the implicit conversion its context applies.
    pub converted: TypeId,
}

impl TypeInfo {
    pub const UNKNOWN: TypeInfo = TypeInfo {
        ty: TypeId::UNKNOWN,
        converted: TypeId::UNKNOWN,
    };

    pub fn same(ty: TypeId) -> Self {
        TypeInfo { ty, converted: ty }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SymbolKind {
    Local,
    Parameter,
    /// Parameter of a type's primary constructor.
    PrimaryParameter,
    Field,
    Property,
    Method,
    LocalFunction,
    Type,
}

impl SymbolKind {
    /// Fields, properties and methods.
    pub fn is_type_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Field | SymbolKind::Property | SymbolKind::Method
        )
    }
}

/// Declared or referenced symbol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    pub ty: TypeId,
    /// Declaring type, for type members.
    pub container: Option<TypeId>,
    pub is_static: bool,
}

/// Result of resolving a reference.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolInfo {
    pub symbol: Option<Symbol>,
    /// Candidates when resolution was ambiguous.
    pub candidates: Vec<Symbol>,
}

impl SymbolInfo {
    pub fn resolved(symbol: Symbol) -> Self {
        SymbolInfo {
            symbol: Some(symbol),
            candidates: Vec::new(),
        }
    }

    /// Resolved symbol, or the single candidate of an ambiguous lookup.
    pub fn symbol_or_unique_candidate(&self) -> Option<Symbol> {
        match (&self.symbol, self.candidates.as_slice()) {
            (Some(symbol), _) => Some(*symbol),
            (None, [only]) => Some(*only),
            _ => None,
        }
    }
}

/// Compile-time constant value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(Name),
    Null,
}

impl ConstValue {
    pub fn as_int(self) -> Option<i64> {
        match self {
            ConstValue::Int(n) => Some(n),
            _ => None,
        }
    }
}

/// Classification of an implicit or explicit conversion.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Conversion {
    Identity,
    /// Derived to base, or anything to `object` for reference types.
    ImplicitReference,
    /// Value type to `object`.
    Boxing,
    ImplicitNumeric,
    /// `T` to `T?`.
    ImplicitNullable,
    /// Requires a cast and may fail at run time.
    Explicit,
    None,
}

impl Conversion {
    /// Converting never changes the value's representation or identity.
    pub fn is_identity_or_reference(self) -> bool {
        matches!(self, Conversion::Identity | Conversion::ImplicitReference)
    }

    pub fn is_implicit(self) -> bool {
        !matches!(self, Conversion::Explicit | Conversion::None)
    }
}

/// Semantic facts about one analyzed tree.
pub trait SemanticModel {
    /// Type of an expression. `TypeInfo::UNKNOWN` when unresolved.
    fn type_info(&self, expr: ExprId) -> TypeInfo;

    /// Symbol declared by a node: locals, pattern designations, declaration
    /// expressions.
    fn declared_symbol(&self, node: NodeRef) -> Option<Symbol>;

    /// Symbol an identifier or member access refers to.
    fn symbol_info(&self, expr: ExprId) -> SymbolInfo;

    fn constant_value(&self, expr: ExprId) -> Option<ConstValue>;

    /// How the value of `expr` converts to `target`.
    fn classify_conversion(&self, expr: ExprId, target: TypeId) -> Conversion;

    /// Resolve type syntax. `TypeId::UNKNOWN` when unresolved.
    fn bind_type(&self, ty: TypeExprId) -> TypeId;

    fn type_data(&self, ty: TypeId) -> &TypeData;

    /// Resolve a type by simple name.
    fn lookup_type(&self, name: Name) -> Option<TypeId>;

    /// Member named `name` on `ty` or one of its bases.
    fn find_member(&self, ty: TypeId, name: Name) -> Option<&MemberInfo> {
        let mut current = Some(ty);
        let mut depth = 0;
        while let Some(t) = current {
            let data = self.type_data(t);
            if let Some(member) = data.members.iter().find(|m| m.name == name) {
                return Some(member);
            }
            current = data.base;
            depth += 1;
            if depth > 64 {
                break;
            }
        }
        None
    }

    fn is_value_type(&self, ty: TypeId) -> bool {
        self.type_data(ty).is_value_type
    }
}

/// Parse failure reported by a [`SourceModel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.span, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Front end consumed by the lowering pipeline.
///
/// `analyze` is how a pipeline refreshes its view after a structural edit:
/// it returns a model for exactly the tree passed in.
pub trait SourceModel: Send + Sync {
    type View: SemanticModel;

    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError>;

    fn analyze(&self, tree: &SyntaxTree) -> Self::View;
}

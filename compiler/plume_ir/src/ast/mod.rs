//! Syntax node kinds.
//!
//! Node kinds are `Copy`: children are IDs into the arenas of a
//! [`SyntaxTree`](crate::SyntaxTree) and lists are ranges into its side
//! tables. Declarations live in [`decl`] as owned structs.

mod decl;
mod operators;

pub use decl::{
    CompilationUnit, CtorInitializer, CtorTarget, Member, MemberKind, Modifiers, TypeDecl,
    TypeDeclKind, UsingDirective,
};
pub use operators::{BinaryOp, PatternOp, RelationalOp, UnaryOp};

use smallvec::SmallVec;

use crate::{
    ArmRange, ExprId, ExprRange, FieldInitRange, InterpPartRange, LabelRange, LambdaId, LocalFnId,
    Name, ParamRange, PatternId, PatternRange, PropPatRange, SectionRange, Span, StmtId, StmtRange,
    TypeExprId, TypeRange,
};

/// Literal values.
///
/// Floats are stored as bits so literals stay `Eq + Hash`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Literal {
    Int(i64),
    Float(u64),
    Bool(bool),
    Char(char),
    Str(Name),
    Null,
}

/// Expression node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Expression kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// Simple name.
    Ident(Name),
    This,
    Base,
    /// Type in expression position, e.g. the receiver of `string.Format`.
    TypeRef(TypeExprId),
    /// `receiver.name`
    Member { receiver: ExprId, name: Name },
    /// `receiver?<access>`: `access` is rooted at a binding node.
    ConditionalAccess { receiver: ExprId, access: ExprId },
    /// `.name` on the implicit receiver of the nearest conditional access.
    MemberBinding(Name),
    /// `[args]` on the implicit receiver of the nearest conditional access.
    ElementBinding(ExprRange),
    Invocation { callee: ExprId, args: ExprRange },
    /// `receiver[args]`
    Index { receiver: ExprId, args: ExprRange },
    /// `^value`
    FromEnd(ExprId),
    /// `start..end`, either bound may be `INVALID`.
    Range { start: ExprId, end: ExprId },
    Unary { op: UnaryOp, operand: ExprId },
    Binary { op: BinaryOp, left: ExprId, right: ExprId },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign { op: Option<BinaryOp>, target: ExprId, value: ExprId },
    Conditional { cond: ExprId, then_expr: ExprId, else_expr: ExprId },
    /// `subject is <pattern>`
    Is { subject: ExprId, pattern: PatternId },
    /// `subject is T`: plain runtime type test.
    TypeTest { subject: ExprId, ty: TypeExprId },
    /// `(T)operand`
    Cast { ty: TypeExprId, operand: ExprId },
    /// Evaluates `effects` in order, then yields `value`.
    Seq { effects: ExprRange, value: ExprId },
    Lambda(LambdaId),
    /// `new T(args) { inits }`
    New { ty: TypeExprId, args: ExprRange, inits: FieldInitRange },
    /// `receiver with { inits }`
    With { receiver: ExprId, inits: FieldInitRange },
    /// `[a, ..b, c]`
    Collection(ExprRange),
    /// `..value` inside a collection expression.
    Spread(ExprId),
    /// `subject switch { arms }`
    Switch { subject: ExprId, arms: ArmRange },
    Throw(ExprId),
    /// `default(T)`, or the target-typed `default` when `INVALID`.
    Default(TypeExprId),
    Tuple(ExprRange),
    Await(ExprId),
    /// `$"..."`
    Interpolated(InterpPartRange),
    /// `T name` in an `out` argument or deconstruction target.
    Declaration { ty: TypeExprId, name: Name },
    /// `_`
    Discard,
    /// `out arg`
    Out(ExprId),
    Parenthesized(ExprId),
}

/// Statement node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub const fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

/// Statement kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StmtKind {
    Block(StmtRange),
    Expr(ExprId),
    /// `T name = init;` (`init` may be `INVALID`).
    Local { ty: TypeExprId, name: Name, init: ExprId },
    If { cond: ExprId, then_branch: StmtId, else_branch: StmtId },
    While { cond: ExprId, body: StmtId },
    /// `for (init; cond; step) body`
    For { init: StmtRange, cond: ExprId, step: ExprRange, body: StmtId },
    Foreach { ty: TypeExprId, name: Name, iterable: ExprId, body: StmtId },
    Return(ExprId),
    Break,
    Continue,
    Throw(ExprId),
    Switch { subject: ExprId, sections: SectionRange },
    LocalFunction(LocalFnId),
    Empty,
}

/// Pattern node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

impl Pattern {
    pub const fn new(kind: PatternKind, span: Span) -> Self {
        Pattern { kind, span }
    }
}

/// Pattern kinds.
///
/// `designation` fields hold `Name::EMPTY` when the pattern binds nothing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PatternKind {
    /// `null`, `42`, `"text"`, `Color.Red`
    Constant(ExprId),
    /// `T name`
    Declaration { ty: TypeExprId, name: Name },
    /// `var name`
    Var(Name),
    /// `T(p1, p2) { A: p3 } name`
    Recursive {
        ty: TypeExprId,
        positional: PatternRange,
        properties: PropPatRange,
        designation: Name,
    },
    /// `[p1, .., p2] name`
    List { elements: PatternRange, designation: Name },
    /// `..` or `.. p` inside a list pattern.
    Slice(PatternId),
    /// `> 3`
    Relational { op: RelationalOp, value: ExprId },
    /// `T`
    Type(TypeExprId),
    Binary { op: PatternOp, left: PatternId, right: PatternId },
    Not(PatternId),
    /// `_`
    Discard,
    Parenthesized(PatternId),
}

/// `A.B: pattern` inside a property pattern clause.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertySubpattern {
    pub path: SmallVec<[Name; 2]>,
    pub pattern: PatternId,
}

/// One arm of a switch expression.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SwitchArm {
    pub pattern: PatternId,
    /// `when` clause, `INVALID` if absent.
    pub guard: ExprId,
    pub result: ExprId,
    pub span: Span,
}

/// One section of a switch statement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SwitchSection {
    pub labels: LabelRange,
    pub body: StmtRange,
}

/// `case <pattern> when <guard>:` or `default:`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwitchLabel {
    Case { pattern: PatternId, guard: ExprId },
    Default,
}

/// `Name = value` inside an object initializer or `with` expression.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FieldInit {
    pub name: Name,
    pub value: ExprId,
}

/// Piece of an interpolated string.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterpolationPart {
    Text(Name),
    /// `{expr,alignment:format}`; `alignment` may be `INVALID`,
    /// `format` may be `Name::EMPTY`.
    Hole { expr: ExprId, alignment: ExprId, format: Name },
}

/// Body of a lambda.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LambdaBody {
    Expr(ExprId),
    Block(StmtId),
}

/// Lambda expression payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Lambda {
    pub params: ParamRange,
    pub body: LambdaBody,
    pub is_async: bool,
}

/// Body of a member or local function.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Body {
    /// Abstract, extern, or auto accessor.
    None,
    Block(StmtId),
    /// `=> expr`
    Expr(ExprId),
}

/// Local function declared inside a block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalFunction {
    pub name: Name,
    pub type_params: Vec<Name>,
    pub params: ParamRange,
    pub ret: TypeExprId,
    pub body: Body,
}

/// Parameter passing mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ParamModifier {
    #[default]
    None,
    Out,
    Ref,
    In,
    Params,
}

/// Method, constructor, lambda or primary-constructor parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Param {
    /// `INVALID` for implicitly typed lambda parameters.
    pub ty: TypeExprId,
    pub name: Name,
    pub modifier: ParamModifier,
    pub default: ExprId,
}

impl Param {
    pub fn new(ty: TypeExprId, name: Name) -> Self {
        Param {
            ty,
            name,
            modifier: ParamModifier::None,
            default: ExprId::INVALID,
        }
    }
}

/// Type syntax.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeExpr {
    /// `Name` or `Name<args>`; qualified names are interned whole.
    Named { name: Name, args: TypeRange },
    /// `T[]`
    Array(TypeExprId),
    /// `T?`
    Nullable(TypeExprId),
    /// `(T1, T2)`
    Tuple(TypeRange),
    /// `var`
    Var,
    /// Universal fallback when a type cannot be resolved.
    Dynamic,
    Void,
}

//! Declarations: compilation unit, types and members.
//!
//! Declarations are owned structs rather than arena nodes. Passes that
//! restructure types (records, primary constructors) rebuild member lists
//! wholesale, while bodies stay in the arenas.

use bitflags::bitflags;

use super::{BinaryOp, Body};
use crate::{ExprId, ExprRange, Name, ParamRange, Span, TypeExprId};

bitflags! {
    /// Declaration modifiers.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Modifiers: u16 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const READONLY = 1 << 5;
        const ABSTRACT = 1 << 6;
        const VIRTUAL = 1 << 7;
        const OVERRIDE = 1 << 8;
        const SEALED = 1 << 9;
        const PARTIAL = 1 << 10;
        const CONST = 1 << 11;
        const ASYNC = 1 << 12;
    }
}

impl Modifiers {
    /// Keywords in canonical order, for printing.
    pub const KEYWORDS: [(Modifiers, &'static str); 13] = [
        (Modifiers::PUBLIC, "public"),
        (Modifiers::PRIVATE, "private"),
        (Modifiers::PROTECTED, "protected"),
        (Modifiers::INTERNAL, "internal"),
        (Modifiers::STATIC, "static"),
        (Modifiers::CONST, "const"),
        (Modifiers::READONLY, "readonly"),
        (Modifiers::ABSTRACT, "abstract"),
        (Modifiers::VIRTUAL, "virtual"),
        (Modifiers::OVERRIDE, "override"),
        (Modifiers::SEALED, "sealed"),
        (Modifiers::ASYNC, "async"),
        (Modifiers::PARTIAL, "partial"),
    ];
}

/// A parsed source file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompilationUnit {
    pub usings: Vec<UsingDirective>,
    pub namespace: Option<Name>,
    pub types: Vec<TypeDecl>,
}

/// `using X;` or `using static X;`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UsingDirective {
    pub path: Name,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeDeclKind {
    Class,
    Struct,
    Interface,
    /// `record` / `record class`
    Record,
    RecordStruct,
}

impl TypeDeclKind {
    pub fn is_record(self) -> bool {
        matches!(self, TypeDeclKind::Record | TypeDeclKind::RecordStruct)
    }

    pub fn is_value_type(self) -> bool {
        matches!(self, TypeDeclKind::Struct | TypeDeclKind::RecordStruct)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            TypeDeclKind::Class => "class",
            TypeDeclKind::Struct => "struct",
            TypeDeclKind::Interface => "interface",
            TypeDeclKind::Record => "record",
            TypeDeclKind::RecordStruct => "record struct",
        }
    }
}

/// Class, struct, interface or record declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeDecl {
    pub name: Name,
    pub kind: TypeDeclKind,
    pub modifiers: Modifiers,
    pub type_params: Vec<Name>,
    /// Primary-constructor parameter list, if the declaration has one.
    pub primary_params: Option<ParamRange>,
    pub bases: Vec<TypeExprId>,
    /// Arguments passed to the first base in `: Base(args)`.
    pub base_args: Option<ExprRange>,
    pub members: Vec<Member>,
    pub span: Span,
}

impl TypeDecl {
    pub fn new(name: Name, kind: TypeDeclKind, span: Span) -> Self {
        TypeDecl {
            name,
            kind,
            modifiers: Modifiers::PUBLIC,
            type_params: Vec::new(),
            primary_params: None,
            bases: Vec::new(),
            base_args: None,
            members: Vec::new(),
            span,
        }
    }

    /// First member declared with `name`.
    pub fn find_member(&self, name: Name) -> Option<&Member> {
        self.members.iter().find(|m| m.kind.name() == Some(name))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Member {
    pub kind: MemberKind,
    pub modifiers: Modifiers,
    pub span: Span,
}

impl Member {
    pub fn new(kind: MemberKind, modifiers: Modifiers, span: Span) -> Self {
        Member {
            kind,
            modifiers,
            span,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.intersects(Modifiers::STATIC | Modifiers::CONST)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberKind {
    /// `T name = init;`
    Field {
        ty: TypeExprId,
        name: Name,
        init: ExprId,
    },
    /// `T Name { get; set; } = init;`
    ///
    /// `Some(Body::None)` is an auto accessor; an arrow property is a getter
    /// with `Body::Expr`.
    Property {
        ty: TypeExprId,
        name: Name,
        getter: Option<Body>,
        setter: Option<Body>,
        init: ExprId,
    },
    Method {
        name: Name,
        type_params: Vec<Name>,
        params: ParamRange,
        ret: TypeExprId,
        body: Body,
    },
    Constructor {
        params: ParamRange,
        initializer: Option<CtorInitializer>,
        body: Body,
    },
    /// `static bool operator ==(T left, T right)`
    Operator {
        op: BinaryOp,
        params: ParamRange,
        ret: TypeExprId,
        body: Body,
    },
}

impl MemberKind {
    pub fn name(&self) -> Option<Name> {
        match self {
            MemberKind::Field { name, .. }
            | MemberKind::Property { name, .. }
            | MemberKind::Method { name, .. } => Some(*name),
            MemberKind::Constructor { .. } | MemberKind::Operator { .. } => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CtorTarget {
    Base,
    This,
}

/// `: base(args)` / `: this(args)` on a constructor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CtorInitializer {
    pub target: CtorTarget,
    pub args: ExprRange,
}

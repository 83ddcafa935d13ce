//! Tree builders and runners shared by the pass tests.

use plume_ir::ast::{Body, Member, MemberKind, Modifiers, Param, TypeDecl, TypeDeclKind};
use plume_ir::{ExprId, ParamRange, SourceModel, Span, StmtId, SyntaxTree, TypeExprId};
use plume_model::TableModel;

use crate::eval::{Interpreter, Value};
use crate::pipeline::{PassKind, PassTriggers};
use crate::{lower_tree, LowerError};

pub(crate) const S: Span = Span::DUMMY;

pub(crate) fn params(tree: &mut SyntaxTree, list: &[(TypeExprId, &str)]) -> ParamRange {
    let list: Vec<Param> = list.iter().map(|&(ty, name)| tree.param(ty, name)).collect();
    tree.alloc_params(list)
}

fn method_with(
    tree: &mut SyntaxTree,
    name: &str,
    ret: TypeExprId,
    params: ParamRange,
    stmts: &[StmtId],
    modifiers: Modifiers,
) -> Member {
    let body = tree.block(stmts, S);
    Member::new(
        MemberKind::Method {
            name: tree.intern(name),
            type_params: Vec::new(),
            params,
            ret,
            body: Body::Block(body),
        },
        modifiers,
        S,
    )
}

/// Public instance method with a block body.
pub(crate) fn method(
    tree: &mut SyntaxTree,
    name: &str,
    ret: TypeExprId,
    params: ParamRange,
    stmts: &[StmtId],
) -> Member {
    method_with(tree, name, ret, params, stmts, Modifiers::PUBLIC)
}

/// Public static method with a block body.
pub(crate) fn static_method(
    tree: &mut SyntaxTree,
    name: &str,
    ret: TypeExprId,
    params: ParamRange,
    stmts: &[StmtId],
) -> Member {
    method_with(tree, name, ret, params, stmts, Modifiers::PUBLIC | Modifiers::STATIC)
}

/// Public auto property `{ get; set; }`.
pub(crate) fn property(tree: &mut SyntaxTree, ty: TypeExprId, name: &str) -> Member {
    Member::new(
        MemberKind::Property {
            ty,
            name: tree.intern(name),
            getter: Some(Body::None),
            setter: Some(Body::None),
            init: ExprId::INVALID,
        },
        Modifiers::PUBLIC,
        S,
    )
}

/// Append a type declaration and return its index in the unit.
pub(crate) fn declare(tree: &mut SyntaxTree, name: &str, kind: TypeDeclKind, members: Vec<Member>) -> usize {
    let mut decl = TypeDecl::new(tree.intern(name), kind, S);
    decl.members = members;
    tree.unit.types.push(decl);
    tree.unit.types.len() - 1
}

pub(crate) fn class(tree: &mut SyntaxTree, name: &str, members: Vec<Member>) -> usize {
    declare(tree, name, TypeDeclKind::Class, members)
}

/// Run the whole pipeline.
pub(crate) fn lower(model: &TableModel, tree: SyntaxTree) -> Result<SyntaxTree, LowerError> {
    lower_tree(model, tree)
}

/// Run one pass over `tree` against a model built for it.
pub(crate) fn run_pass(
    model: &TableModel,
    tree: &SyntaxTree,
    pass: PassKind,
) -> Result<(SyntaxTree, PassTriggers), LowerError> {
    let view = model.analyze(tree);
    let mut triggers = PassTriggers::default();
    let rewritten = pass.run(tree, &view, &mut triggers)?;
    Ok((rewritten.tree, triggers))
}

/// Outcome of running a lowered program.
pub(crate) struct Run {
    pub(crate) result: Result<Value, String>,
    pub(crate) output: String,
}

/// Call the static method `class.method()` of a lowered tree.
pub(crate) fn run(tree: &SyntaxTree, class: &str, method: &str) -> Run {
    let mut interpreter = Interpreter::new(tree);
    let result = interpreter.call_static(class, method, Vec::new());
    Run {
        result,
        output: interpreter.output().to_owned(),
    }
}

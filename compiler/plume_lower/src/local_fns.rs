//! Local functions become delegate-typed locals.
//!
//! ```text
//! {                                  {
//!     int Twice(int x) => x * 2;         Func<int, int> Twice;
//!     Log(Twice(n));          →          Twice = (int x) => x * 2;
//! }                                      Log(Twice(n));
//!                                    }
//! ```
//!
//! Every local function of a block is declared before any of them is
//! assigned, so they may call each other. Declarations and assignments
//! keep source order and go to the top of the block.

use plume_ir::ast::{Body, LambdaBody, LocalFunction, ParamModifier, StmtKind};
use plume_ir::{ExprId, NodeRef, SemanticModel, Span, StmtId, SyntaxTree, TypeExprId, TypeId};

use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::LowerError;

pub(crate) const PASS: &str = "local-functions";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
    for node in post_order(input) {
        let NodeRef::Stmt(id) = node else { continue };
        let StmtKind::Block(list) = input.stmt_kind(id) else {
            continue;
        };
        let stmts = input.stmts(list);
        if !stmts
            .iter()
            .any(|&s| matches!(input.stmt_kind(s), StmtKind::LocalFunction(_)))
        {
            continue;
        }
        lower_block(&mut rw, id, stmts)?;
    }
    Ok(rw.finish())
}

fn lower_block(rw: &mut Rewriter<'_>, block: StmtId, stmts: &[StmtId]) -> Result<(), LowerError> {
    let mut decls = Vec::new();
    let mut assigns = Vec::new();
    let mut rest = Vec::with_capacity(stmts.len());
    for &stmt in stmts {
        let StmtKind::LocalFunction(func) = rw.input.stmt_kind(stmt) else {
            rest.push(stmt);
            continue;
        };
        let span = rw.input.stmt_span(stmt);
        let func = rw.input.local_fn(func).clone();
        let body = lambda_body(rw, &func, span)?;

        let ty = delegate_type(rw, &func);
        decls.push(rw.out.local(ty, func.name, ExprId::INVALID, span));

        let lambda = rw.out.lambda_expr(func.params, body, span);
        let target = rw.out.ident(func.name, span);
        let assign = rw.out.assign(target, lambda, span);
        rw.set_stmt(stmt, StmtKind::Expr(assign));
        assigns.push(stmt);
    }
    tracing::trace!(functions = assigns.len(), "local functions converted");

    let items: Vec<StmtId> = decls.into_iter().chain(assigns).chain(rest).collect();
    let list = rw.out.alloc_stmts(items);
    rw.set_stmt(block, StmtKind::Block(list));
    Ok(())
}

/// Body of the lambda replacing `func`, if it can be expressed as one.
fn lambda_body(rw: &Rewriter<'_>, func: &LocalFunction, span: Span) -> Result<LambdaBody, LowerError> {
    let name = rw.input.name_str(func.name);
    if !func.type_params.is_empty() {
        return Err(rw.unsupported(format!("generic local function `{name}`"), span));
    }
    if rw
        .input
        .params(func.params)
        .iter()
        .any(|p| p.modifier != ParamModifier::None)
    {
        return Err(rw.unsupported(
            format!("local function `{name}` with ref, out, in or params parameters"),
            span,
        ));
    }
    match func.body {
        Body::Block(body) => Ok(LambdaBody::Block(body)),
        Body::Expr(expr) => Ok(LambdaBody::Expr(expr)),
        Body::None => Err(rw.unsupported(format!("local function `{name}` without a body"), span)),
    }
}

/// `Func<P1, .., R>`, or `Action<P1, ..>` for void functions.
fn delegate_type(rw: &mut Rewriter<'_>, func: &LocalFunction) -> TypeExprId {
    let mut args: Vec<TypeExprId> = rw.input.params(func.params).iter().map(|p| p.ty).collect();
    if rw.model.bind_type(func.ret) == TypeId::VOID {
        rw.out.generic_type("Action", &args)
    } else {
        args.push(func.ret);
        rw.out.generic_type("Func", &args)
    }
}

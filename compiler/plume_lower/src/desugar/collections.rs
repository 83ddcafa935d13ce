//! Collection expressions with spread elements.
//!
//! ```text
//! int[] all = [first, ..rest];
//! ```
//!
//! becomes an immediately invoked lambda that fills a buffer:
//!
//! ```text
//! int[] all = ((Func<int[]>)(() => {
//!     List<int> __b0 = new List<int>();
//!     __b0.Add(first);
//!     var __t1 = rest;
//!     if (__t1 != null) __b0.AddRange(__t1);
//!     return __b0.ToArray();
//! }))();
//! ```
//!
//! Spread-free collections are already in the subset.

use plume_ir::ast::{BinaryOp, ExprKind, LambdaBody};
use plume_ir::{ExprId, ExprRange, ParamRange, StmtId, TypeId, TypeShape};

use crate::rewrite::Rewriter;
use crate::synth::local_type;

pub(super) fn lower(rw: &mut Rewriter<'_>, id: ExprId, items: ExprRange) {
    let items = rw.input.exprs(items).to_vec();
    if !items
        .iter()
        .any(|&item| matches!(rw.input.expr_kind(item), ExprKind::Spread(_)))
    {
        return;
    }
    let span = rw.input.expr_span(id);
    let info = rw.type_info(id);
    let target = if info.converted.is_unknown() {
        info.ty
    } else {
        info.converted
    };
    let model = rw.model;
    let data = model.type_data(target);
    let element = data
        .element
        .or_else(|| data.args.first().copied())
        .unwrap_or(TypeId::UNKNOWN);
    let to_array = data.shape == TypeShape::Array || target.is_unknown();

    let element_ty = rw.type_syntax(element);
    let list_ty = rw.out.generic_type("List", &[element_ty]);
    let buffer = rw.fresh("b");
    let created = rw.out.new_object(list_ty, &[], span);
    let mut stmts: Vec<StmtId> = vec![rw.out.local(list_ty, buffer, created, span)];

    for item in items {
        let item_span = rw.input.expr_span(item);
        match rw.out.expr_kind(item) {
            ExprKind::Spread(value) => {
                let temp = rw.fresh("t");
                let value_ty = rw.type_of(value);
                let ty = local_type(&mut rw.out, model, value_ty);
                stmts.push(rw.out.local(ty, temp, value, item_span));
                let tested = rw.out.ident(temp, item_span);
                let null = rw.out.null(item_span);
                let cond = rw.out.binary(BinaryOp::NotEq, tested, null, item_span);
                let target = rw.out.ident(buffer, item_span);
                let source = rw.out.ident(temp, item_span);
                let add = rw.out.method_call(target, "AddRange", &[source], item_span);
                let add = rw.out.expr_stmt(add, item_span);
                stmts.push(rw.out.if_stmt(cond, add, StmtId::INVALID, item_span));
            }
            _ => {
                let target = rw.out.ident(buffer, item_span);
                let add = rw.out.method_call(target, "Add", &[item], item_span);
                stmts.push(rw.out.expr_stmt(add, item_span));
            }
        }
    }

    let mut result = rw.out.ident(buffer, span);
    if to_array {
        result = rw.out.method_call(result, "ToArray", &[], span);
    }
    stmts.push(rw.out.return_stmt(result, span));

    let body = rw.out.block(&stmts, span);
    let lambda = rw.out.lambda_expr(ParamRange::EMPTY, LambdaBody::Block(body), span);
    let result_ty = if target.is_unknown() {
        let element_ty = rw.type_syntax(element);
        rw.out.array_type(element_ty)
    } else {
        rw.type_syntax(target)
    };
    let func = rw.out.generic_type("Func", &[result_ty]);
    let delegate = rw.out.cast(func, lambda, span);
    let call = rw.out.call(delegate, &[], span);
    rw.replace(id, call);
}

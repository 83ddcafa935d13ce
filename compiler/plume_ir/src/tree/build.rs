//! Node construction helpers.
//!
//! Shorthands used both by lowering passes to synthesize code and by tests
//! to assemble input trees.

use super::SyntaxTree;
use crate::ast::{
    BinaryOp, Body, ExprKind, Lambda, LambdaBody, Literal, Param, StmtKind, TypeExpr, UnaryOp,
};
use crate::{ExprId, Name, ParamRange, Span, StmtId, TypeExprId, TypeRange};

impl SyntaxTree {
    // Literals and names

    pub fn int(&mut self, value: i64, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Literal(Literal::Int(value)), span)
    }

    pub fn bool_lit(&mut self, value: bool, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Literal(Literal::Bool(value)), span)
    }

    pub fn null(&mut self, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Literal(Literal::Null), span)
    }

    pub fn str_lit(&mut self, value: &str, span: Span) -> ExprId {
        let name = self.intern(value);
        self.alloc_expr(ExprKind::Literal(Literal::Str(name)), span)
    }

    pub fn ident(&mut self, name: Name, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Ident(name), span)
    }

    pub fn ident_str(&mut self, name: &str, span: Span) -> ExprId {
        let name = self.intern(name);
        self.ident(name, span)
    }

    pub fn this(&mut self, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::This, span)
    }

    // Access and calls

    pub fn member(&mut self, receiver: ExprId, name: Name, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Member { receiver, name }, span)
    }

    pub fn member_str(&mut self, receiver: ExprId, name: &str, span: Span) -> ExprId {
        let name = self.intern(name);
        self.member(receiver, name, span)
    }

    pub fn call(&mut self, callee: ExprId, args: &[ExprId], span: Span) -> ExprId {
        let args = self.alloc_exprs(args.iter().copied());
        self.alloc_expr(ExprKind::Invocation { callee, args }, span)
    }

    /// `receiver.name(args)`
    pub fn method_call(
        &mut self,
        receiver: ExprId,
        name: &str,
        args: &[ExprId],
        span: Span,
    ) -> ExprId {
        let callee = self.member_str(receiver, name, span);
        self.call(callee, args, span)
    }

    pub fn index(&mut self, receiver: ExprId, args: &[ExprId], span: Span) -> ExprId {
        let args = self.alloc_exprs(args.iter().copied());
        self.alloc_expr(ExprKind::Index { receiver, args }, span)
    }

    pub fn new_object(&mut self, ty: TypeExprId, args: &[ExprId], span: Span) -> ExprId {
        let args = self.alloc_exprs(args.iter().copied());
        self.alloc_expr(
            ExprKind::New {
                ty,
                args,
                inits: crate::FieldInitRange::EMPTY,
            },
            span,
        )
    }

    // Operators

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Unary { op, operand }, span)
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Binary { op, left, right }, span)
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId, span: Span) -> ExprId {
        self.alloc_expr(
            ExprKind::Assign {
                op: None,
                target,
                value,
            },
            span,
        )
    }

    pub fn conditional(
        &mut self,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        span: Span,
    ) -> ExprId {
        self.alloc_expr(
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            },
            span,
        )
    }

    pub fn cast(&mut self, ty: TypeExprId, operand: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Cast { ty, operand }, span)
    }

    pub fn type_test(&mut self, subject: ExprId, ty: TypeExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::TypeTest { subject, ty }, span)
    }

    pub fn paren(&mut self, inner: ExprId, span: Span) -> ExprId {
        self.alloc_expr(ExprKind::Parenthesized(inner), span)
    }

    pub fn seq(&mut self, effects: &[ExprId], value: ExprId, span: Span) -> ExprId {
        let effects = self.alloc_exprs(effects.iter().copied());
        self.alloc_expr(ExprKind::Seq { effects, value }, span)
    }

    pub fn lambda_expr(&mut self, params: ParamRange, body: LambdaBody, span: Span) -> ExprId {
        let id = self.alloc_lambda(Lambda {
            params,
            body,
            is_async: false,
        });
        self.alloc_expr(ExprKind::Lambda(id), span)
    }

    // Types

    pub fn named_type(&mut self, name: Name, args: &[TypeExprId]) -> TypeExprId {
        let args = self.alloc_types(args.iter().copied());
        self.alloc_type(TypeExpr::Named { name, args })
    }

    pub fn type_str(&mut self, name: &str) -> TypeExprId {
        let name = self.intern(name);
        self.named_type(name, &[])
    }

    pub fn generic_type(&mut self, name: &str, args: &[TypeExprId]) -> TypeExprId {
        let name = self.intern(name);
        self.named_type(name, args)
    }

    pub fn array_type(&mut self, element: TypeExprId) -> TypeExprId {
        self.alloc_type(TypeExpr::Array(element))
    }

    pub fn tuple_type(&mut self, elements: &[TypeExprId]) -> TypeExprId {
        let elements: TypeRange = self.alloc_types(elements.iter().copied());
        self.alloc_type(TypeExpr::Tuple(elements))
    }

    pub fn var_type(&mut self) -> TypeExprId {
        self.alloc_type(TypeExpr::Var)
    }

    pub fn void_type(&mut self) -> TypeExprId {
        self.alloc_type(TypeExpr::Void)
    }

    // Statements

    pub fn expr_stmt(&mut self, expr: ExprId, span: Span) -> StmtId {
        self.alloc_stmt(StmtKind::Expr(expr), span)
    }

    pub fn local(&mut self, ty: TypeExprId, name: Name, init: ExprId, span: Span) -> StmtId {
        self.alloc_stmt(StmtKind::Local { ty, name, init }, span)
    }

    pub fn block(&mut self, stmts: &[StmtId], span: Span) -> StmtId {
        let stmts = self.alloc_stmts(stmts.iter().copied());
        self.alloc_stmt(StmtKind::Block(stmts), span)
    }

    pub fn return_stmt(&mut self, value: ExprId, span: Span) -> StmtId {
        self.alloc_stmt(StmtKind::Return(value), span)
    }

    pub fn if_stmt(
        &mut self,
        cond: ExprId,
        then_branch: StmtId,
        else_branch: StmtId,
        span: Span,
    ) -> StmtId {
        self.alloc_stmt(
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    /// Block body from a list of statements.
    pub fn block_body(&mut self, stmts: &[StmtId], span: Span) -> Body {
        Body::Block(self.block(stmts, span))
    }

    pub fn param(&self, ty: TypeExprId, name: &str) -> Param {
        Param::new(ty, self.intern(name))
    }
}

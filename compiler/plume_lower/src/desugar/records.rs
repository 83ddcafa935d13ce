//! Records and `with` expressions.
//!
//! `record R(int A, string B);` becomes a class (a `record struct` becomes
//! a struct) with:
//!
//! - a public `{ get; set; }` property per positional parameter
//! - a constructor assigning them, plus a parameterless constructor
//! - `Deconstruct(out int A, out string B)`
//! - `Equals(object)`, `Equals(R)`, `GetHashCode()`, `==` and `!=`
//! - `__PrintMembers()` and `ToString()` printing `R { A = 1, B = x }`
//! - `__Clone()`, the shallow copy `with` expressions start from
//!
//! Members the user already wrote are kept and not synthesized again.

use plume_ir::ast::{
    BinaryOp, Body, ExprKind, FieldInit, LambdaBody, Member, MemberKind, Modifiers, Param,
    ParamModifier, TypeDeclKind, TypeExpr, UnaryOp,
};
use plume_ir::{
    ExprId, FieldInitRange, Name, ParamRange, Span, StmtId, SyntaxTree, TypeExprId, TypeShape,
};

use super::primary_ctor;
use crate::rewrite::Rewriter;
use crate::LowerError;

const HASH_SEED: i64 = 17;
const HASH_FACTOR: i64 = 31;

/// `r with { A = e }` → `((Func<R>)(() => { R __c = r.__Clone(); __c.A = e; return __c; }))()`
///
/// Value types are copied by assignment and skip `__Clone`.
pub(super) fn lower_with(rw: &mut Rewriter<'_>, id: ExprId, receiver: ExprId, inits: FieldInitRange) {
    let span = rw.input.expr_span(id);
    let mut ty = rw.type_of(id);
    if ty.is_unknown() {
        ty = rw.type_of(receiver);
    }
    let copy = rw.fresh("c");
    let value = if !ty.is_unknown() && rw.model.is_value_type(ty) {
        receiver
    } else {
        rw.out.method_call(receiver, "__Clone", &[], span)
    };
    let local_ty = rw.type_syntax(ty);
    let mut stmts = vec![rw.out.local(local_ty, copy, value, span)];
    let inits: Vec<FieldInit> = rw.input.field_inits(inits).to_vec();
    for init in inits {
        let target = rw.out.ident(copy, span);
        let target = rw.out.member(target, init.name, span);
        let assign = rw.out.assign(target, init.value, span);
        stmts.push(rw.out.expr_stmt(assign, span));
    }
    let result = rw.out.ident(copy, span);
    stmts.push(rw.out.return_stmt(result, span));

    let body = rw.out.block(&stmts, span);
    let lambda = rw.out.lambda_expr(ParamRange::EMPTY, LambdaBody::Block(body), span);
    let result_ty = rw.type_syntax(ty);
    let func = rw.out.generic_type("Func", &[result_ty]);
    let delegate = rw.out.cast(func, lambda, span);
    let call = rw.out.call(delegate, &[], span);
    rw.replace(id, call);
}

/// Rewrite the record declared at `index` into an ordinary type.
#[tracing::instrument(level = "trace", skip(rw, captured))]
pub(super) fn lower_decl(rw: &mut Rewriter<'_>, index: usize, captured: &[Param]) -> Result<(), LowerError> {
    let decl = rw.input.unit.types[index].clone();
    let span = decl.span;
    let params: Vec<Param> = decl
        .primary_params
        .map(|range| rw.input.params(range).to_vec())
        .unwrap_or_default();
    let is_struct = decl.kind == TypeDeclKind::RecordStruct;

    let mut synth = Synth {
        rw: &mut *rw,
        name: decl.name,
        type_params: decl.type_params.clone(),
        span,
    };

    let mut properties = Vec::new();
    let mut assigns = Vec::new();
    for param in &params {
        if decl.find_member(param.name).is_some() {
            continue;
        }
        properties.push(Member::new(
            MemberKind::Property {
                ty: param.ty,
                name: param.name,
                getter: Some(Body::None),
                setter: Some(Body::None),
                init: ExprId::INVALID,
            },
            Modifiers::PUBLIC,
            span,
        ));
        let target = synth.this_member(param.name);
        let value = synth.rw.out.ident(param.name, span);
        let assign = synth.rw.out.assign(target, value, span);
        assigns.push(synth.rw.out.expr_stmt(assign, span));
    }

    let user = UserMembers::scan(synth.rw.input, &decl.members, decl.name);
    let mut methods = Vec::new();
    if !params.is_empty() && !user.parameterless_ctor {
        let body = synth.rw.out.block_body(&[], span);
        methods.push(Member::new(
            MemberKind::Constructor {
                params: ParamRange::EMPTY,
                initializer: None,
                body,
            },
            Modifiers::PUBLIC,
            span,
        ));
    }
    if !params.is_empty() && !user.deconstruct {
        methods.push(synth.deconstruct(&params));
    }
    if !user.equals_object {
        methods.push(synth.equals_object());
    }
    if !user.equals_self {
        methods.push(synth.equals_self(&params, is_struct));
    }
    if !user.hash {
        methods.push(synth.hash(&params));
    }
    if !user.eq_operator {
        methods.push(synth.eq_operator(is_struct));
    }
    if !user.ne_operator {
        methods.push(synth.ne_operator());
    }
    if !user.print_members {
        methods.push(synth.print_members(&params));
    }
    if !user.to_string {
        methods.push(synth.to_string(params.is_empty()));
    }
    if !user.clone {
        methods.push(synth.clone_method(is_struct));
    }

    let target = &mut rw.out.unit.types[index];
    target.kind = if is_struct {
        TypeDeclKind::Struct
    } else {
        TypeDeclKind::Class
    };
    let existing = std::mem::take(&mut target.members);
    target.members = properties.into_iter().chain(existing).chain(methods).collect();
    rw.mark_changed();

    primary_ctor::lower(rw, index, assigns, captured)
}

/// Which record members the user wrote by hand.
#[derive(Default)]
#[allow(clippy::struct_excessive_bools)]
struct UserMembers {
    parameterless_ctor: bool,
    deconstruct: bool,
    equals_object: bool,
    equals_self: bool,
    hash: bool,
    eq_operator: bool,
    ne_operator: bool,
    print_members: bool,
    to_string: bool,
    clone: bool,
}

impl UserMembers {
    fn scan(tree: &SyntaxTree, members: &[Member], record: Name) -> Self {
        let mut found = UserMembers::default();
        for member in members {
            match &member.kind {
                MemberKind::Constructor { params, .. } if params.is_empty() => {
                    found.parameterless_ctor = true;
                }
                MemberKind::Method { name, params, .. } => {
                    let params = tree.params(*params);
                    match (tree.name_str(*name), params) {
                        ("Deconstruct", _) => found.deconstruct = true,
                        ("Equals", [param]) => {
                            if names_type(tree, param.ty, "object") {
                                found.equals_object = true;
                            } else if names_type(tree, param.ty, tree.name_str(record)) {
                                found.equals_self = true;
                            }
                        }
                        ("GetHashCode", []) => found.hash = true,
                        ("__PrintMembers", []) => found.print_members = true,
                        ("ToString", []) => found.to_string = true,
                        ("__Clone", []) => found.clone = true,
                        _ => {}
                    }
                }
                MemberKind::Operator { op, .. } => match op {
                    BinaryOp::Eq => found.eq_operator = true,
                    BinaryOp::NotEq => found.ne_operator = true,
                    _ => {}
                },
                _ => {}
            }
        }
        found
    }
}

fn names_type(tree: &SyntaxTree, ty: TypeExprId, name: &str) -> bool {
    match tree.type_expr(ty) {
        TypeExpr::Named { name: n, .. } => tree.name_str(n) == name,
        _ => false,
    }
}

/// Member synthesis for one record.
struct Synth<'r, 'a> {
    rw: &'r mut Rewriter<'a>,
    name: Name,
    type_params: Vec<Name>,
    span: Span,
}

impl Synth<'_, '_> {
    /// `R<T..>` as written in the declaration.
    fn self_type(&mut self) -> TypeExprId {
        let args: Vec<TypeExprId> = self
            .type_params
            .iter()
            .map(|&param| self.rw.out.named_type(param, &[]))
            .collect();
        self.rw.out.named_type(self.name, &args)
    }

    fn this_member(&mut self, name: Name) -> ExprId {
        let this = self.rw.out.this(self.span);
        self.rw.out.member(this, name, self.span)
    }

    fn object_call(&mut self, method: &str, args: &[ExprId]) -> ExprId {
        let object = self.rw.out.type_str("object");
        let receiver = self.rw.out.alloc_expr(ExprKind::TypeRef(object), self.span);
        self.rw.out.method_call(receiver, method, args, self.span)
    }

    fn param(&mut self, ty: TypeExprId, name: &str) -> Param {
        self.rw.out.param(ty, name)
    }

    fn method(&mut self, name: &str, params: Vec<Param>, ret: TypeExprId, stmts: &[StmtId], modifiers: Modifiers) -> Member {
        let span = self.span;
        let params = self.rw.out.alloc_params(params);
        let body = self.rw.out.block_body(stmts, span);
        Member::new(
            MemberKind::Method {
                name: self.rw.out.intern(name),
                type_params: Vec::new(),
                params,
                ret,
                body,
            },
            modifiers,
            span,
        )
    }

    fn returning(&mut self, value: ExprId) -> StmtId {
        self.rw.out.return_stmt(value, self.span)
    }

    fn deconstruct(&mut self, params: &[Param]) -> Member {
        let span = self.span;
        let mut outs = Vec::with_capacity(params.len());
        let mut stmts = Vec::with_capacity(params.len());
        for param in params {
            outs.push(Param {
                ty: param.ty,
                name: param.name,
                modifier: ParamModifier::Out,
                default: ExprId::INVALID,
            });
            let target = self.rw.out.ident(param.name, span);
            let value = self.this_member(param.name);
            let assign = self.rw.out.assign(target, value, span);
            stmts.push(self.rw.out.expr_stmt(assign, span));
        }
        let void = self.rw.out.void_type();
        self.method("Deconstruct", outs, void, &stmts, Modifiers::PUBLIC)
    }

    /// `obj is R && this.Equals((R)obj)`
    fn equals_object(&mut self) -> Member {
        let span = self.span;
        let object = self.rw.out.type_str("object");
        let param = self.param(object, "obj");
        let subject = self.rw.out.ident_str("obj", span);
        let ty = self.self_type();
        let test = self.rw.out.type_test(subject, ty, span);
        let subject = self.rw.out.ident_str("obj", span);
        let ty = self.self_type();
        let cast = self.rw.out.cast(ty, subject, span);
        let this = self.rw.out.this(span);
        let call = self.rw.out.method_call(this, "Equals", &[cast], span);
        let result = self.rw.out.binary(BinaryOp::And, test, call, span);
        let ret = self.returning(result);
        let bool_ty = self.rw.out.type_str("bool");
        self.method("Equals", vec![param], bool_ty, &[ret], Modifiers::PUBLIC | Modifiers::OVERRIDE)
    }

    /// Component-wise `object.Equals`, after a null check for classes.
    fn equals_self(&mut self, params: &[Param], is_struct: bool) -> Member {
        let span = self.span;
        let ty = self.self_type();
        let param = self.param(ty, "other");
        let mut terms = Vec::new();
        if !is_struct {
            let other = self.rw.out.ident_str("other", span);
            let null = self.rw.out.null(span);
            let same = self.object_call("ReferenceEquals", &[other, null]);
            terms.push(self.rw.out.unary(UnaryOp::Not, same, span));
        }
        for p in params {
            let mine = self.this_member(p.name);
            let other = self.rw.out.ident_str("other", span);
            let theirs = self.rw.out.member(other, p.name, span);
            terms.push(self.object_call("Equals", &[mine, theirs]));
        }
        let mut terms = terms.into_iter();
        let result = match terms.next() {
            Some(first) => terms.fold(first, |acc, term| self.rw.out.binary(BinaryOp::And, acc, term, span)),
            None => self.rw.out.bool_lit(true, span),
        };
        let ret = self.returning(result);
        let bool_ty = self.rw.out.type_str("bool");
        self.method("Equals", vec![param], bool_ty, &[ret], Modifiers::PUBLIC)
    }

    /// `int hash = 17; hash = hash * 31 + h(P); ... return hash;`
    fn hash(&mut self, params: &[Param]) -> Member {
        let span = self.span;
        let hash = self.rw.out.intern("hash");
        let int = self.rw.out.type_str("int");
        let seed = self.rw.out.int(HASH_SEED, span);
        let mut stmts = vec![self.rw.out.local(int, hash, seed, span)];
        for p in params {
            let component = self.component_hash(p);
            let current = self.rw.out.ident(hash, span);
            let factor = self.rw.out.int(HASH_FACTOR, span);
            let scaled = self.rw.out.binary(BinaryOp::Mul, current, factor, span);
            let combined = self.rw.out.binary(BinaryOp::Add, scaled, component, span);
            let target = self.rw.out.ident(hash, span);
            let assign = self.rw.out.assign(target, combined, span);
            stmts.push(self.rw.out.expr_stmt(assign, span));
        }
        let result = self.rw.out.ident(hash, span);
        stmts.push(self.returning(result));
        let int = self.rw.out.type_str("int");
        self.method("GetHashCode", Vec::new(), int, &stmts, Modifiers::PUBLIC | Modifiers::OVERRIDE)
    }

    /// `this.P.GetHashCode()`, guarded against null unless `P` is a value.
    fn component_hash(&mut self, param: &Param) -> ExprId {
        let span = self.span;
        let ty = self.rw.model.bind_type(param.ty);
        let data = self.rw.model.type_data(ty);
        let is_value = !ty.is_unknown() && data.is_value_type && data.shape != TypeShape::Nullable;
        let value = self.this_member(param.name);
        let hash = self.rw.out.method_call(value, "GetHashCode", &[], span);
        if is_value {
            return hash;
        }
        let value = self.this_member(param.name);
        let null = self.rw.out.null(span);
        let is_null = self.rw.out.binary(BinaryOp::Eq, value, null, span);
        let zero = self.rw.out.int(0, span);
        self.rw.out.conditional(is_null, zero, hash, span)
    }

    fn operator(&mut self, op: BinaryOp, result: ExprId) -> Member {
        let span = self.span;
        let left = self.self_type();
        let right = self.self_type();
        let params = vec![self.param(left, "left"), self.param(right, "right")];
        let params = self.rw.out.alloc_params(params);
        let ret = self.returning(result);
        let body = self.rw.out.block_body(&[ret], span);
        let bool_ty = self.rw.out.type_str("bool");
        Member::new(
            MemberKind::Operator {
                op,
                params,
                ret: bool_ty,
                body,
            },
            Modifiers::PUBLIC | Modifiers::STATIC,
            span,
        )
    }

    fn eq_operator(&mut self, is_struct: bool) -> Member {
        let span = self.span;
        let left = self.rw.out.ident_str("left", span);
        let right = self.rw.out.ident_str("right", span);
        let equals = self.rw.out.method_call(left, "Equals", &[right], span);
        let result = if is_struct {
            equals
        } else {
            let left = self.rw.out.ident_str("left", span);
            let null = self.rw.out.null(span);
            let left_null = self.object_call("ReferenceEquals", &[left, null]);
            let right = self.rw.out.ident_str("right", span);
            let null = self.rw.out.null(span);
            let right_null = self.object_call("ReferenceEquals", &[right, null]);
            self.rw.out.conditional(left_null, right_null, equals, span)
        };
        self.operator(BinaryOp::Eq, result)
    }

    fn ne_operator(&mut self) -> Member {
        let span = self.span;
        let left = self.rw.out.ident_str("left", span);
        let right = self.rw.out.ident_str("right", span);
        let equal = self.rw.out.binary(BinaryOp::Eq, left, right, span);
        let paren = self.rw.out.paren(equal, span);
        let result = self.rw.out.unary(UnaryOp::Not, paren, span);
        self.operator(BinaryOp::NotEq, result)
    }

    /// `"A = " + this.A + ", B = " + this.B`
    fn print_members(&mut self, params: &[Param]) -> Member {
        let span = self.span;
        let mut result: Option<ExprId> = None;
        for (i, p) in params.iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            let label = format!("{sep}{} = ", self.rw.out.name_str(p.name));
            let label = self.rw.out.str_lit(&label, span);
            let value = self.this_member(p.name);
            let piece = match result {
                Some(acc) => self.rw.out.binary(BinaryOp::Add, acc, label, span),
                None => label,
            };
            result = Some(self.rw.out.binary(BinaryOp::Add, piece, value, span));
        }
        let result = match result {
            Some(result) => result,
            None => self.rw.out.str_lit("", span),
        };
        let ret = self.returning(result);
        let string = self.rw.out.type_str("string");
        self.method("__PrintMembers", Vec::new(), string, &[ret], Modifiers::PROTECTED)
    }

    /// `"R { " + this.__PrintMembers() + " }"`, or `"R { }"` without members.
    fn to_string(&mut self, empty: bool) -> Member {
        let span = self.span;
        let name = self.rw.out.name_str(self.name);
        let result = if empty {
            self.rw.out.str_lit(&format!("{name} {{ }}"), span)
        } else {
            let open = self.rw.out.str_lit(&format!("{name} {{ "), span);
            let this = self.rw.out.this(span);
            let members = self.rw.out.method_call(this, "__PrintMembers", &[], span);
            let close = self.rw.out.str_lit(" }", span);
            let head = self.rw.out.binary(BinaryOp::Add, open, members, span);
            self.rw.out.binary(BinaryOp::Add, head, close, span)
        };
        let ret = self.returning(result);
        let string = self.rw.out.type_str("string");
        self.method("ToString", Vec::new(), string, &[ret], Modifiers::PUBLIC | Modifiers::OVERRIDE)
    }

    /// `(R)this.MemberwiseClone()` for classes; structs copy on return.
    fn clone_method(&mut self, is_struct: bool) -> Member {
        let span = self.span;
        let this = self.rw.out.this(span);
        let result = if is_struct {
            this
        } else {
            let copy = self.rw.out.method_call(this, "MemberwiseClone", &[], span);
            let ty = self.self_type();
            self.rw.out.cast(ty, copy, span)
        };
        let ret = self.returning(result);
        let ty = self.self_type();
        self.method("__Clone", Vec::new(), ty, &[ret], Modifiers::PUBLIC)
    }
}

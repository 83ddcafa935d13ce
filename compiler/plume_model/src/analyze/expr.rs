//! Expression typing.

use plume_ir::ast::{BinaryOp, ExprKind, InterpolationPart, Literal, MemberKind, UnaryOp};
use plume_ir::stack::ensure_sufficient_stack;
use plume_ir::{
    ArmRange, ExprId, ExprRange, FieldInitRange, LambdaId, Name, NodeRef, Symbol, SymbolInfo,
    SymbolKind, TypeExprId, TypeId, TypeShape,
};

use super::{fold, Analyzer};

impl Analyzer<'_> {
    /// Type `id` against the type its context expects and record it.
    pub(super) fn expr(&mut self, id: ExprId, expected: TypeId) -> TypeId {
        if !id.is_valid() {
            return TypeId::UNKNOWN;
        }
        ensure_sufficient_stack(|| {
            let ty = self.expr_inner(id, expected);
            self.record(id, ty, expected);
            self.record_constant(id);
            ty
        })
    }

    fn expr_inner(&mut self, id: ExprId, expected: TypeId) -> TypeId {
        let tree = self.tree;
        match tree.expr_kind(id) {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(_) => TypeId::INT,
                Literal::Float(_) => TypeId::DOUBLE,
                Literal::Bool(_) => TypeId::BOOL,
                Literal::Char(_) => TypeId::CHAR,
                Literal::Str(_) => TypeId::STRING,
                Literal::Null => TypeId::NULL,
            },
            ExprKind::Ident(name) => {
                let symbol = self.resolve_ident(id, name, None);
                value_type(symbol)
            }
            ExprKind::This => self.current_type.unwrap_or(TypeId::UNKNOWN),
            ExprKind::Base => self
                .current_type
                .and_then(|ty| self.table.data(ty).base)
                .unwrap_or(TypeId::UNKNOWN),
            ExprKind::TypeRef(ty) => {
                let bound = self.table.bound(ty);
                self.type_symbol(id, bound);
                bound
            }
            ExprKind::Member { receiver, name } => {
                let symbol = self.member_access(id, receiver, name, None);
                value_type(symbol)
            }
            ExprKind::ConditionalAccess { receiver, access } => {
                let receiver_ty = self.expr(receiver, TypeId::UNKNOWN);
                let underlying = self.underlying(receiver_ty);
                self.receivers.push(underlying);
                let access_ty = self.expr(access, TypeId::UNKNOWN);
                self.receivers.pop();
                if access_ty == TypeId::VOID || access_ty.is_unknown() {
                    access_ty
                } else {
                    self.table.nullable_of(access_ty)
                }
            }
            ExprKind::MemberBinding(name) => {
                let receiver = self.receivers.last().copied().unwrap_or(TypeId::UNKNOWN);
                let symbol = self.member_on(id, receiver, name, None, None);
                value_type(symbol)
            }
            ExprKind::ElementBinding(args) => {
                let receiver = self.receivers.last().copied().unwrap_or(TypeId::UNKNOWN);
                self.element_access(receiver, args)
            }
            ExprKind::Invocation { callee, args } => self.invocation(callee, args),
            ExprKind::Index { receiver, args } => {
                let receiver_ty = self.expr(receiver, TypeId::UNKNOWN);
                self.element_access(receiver_ty, args)
            }
            ExprKind::FromEnd(value) => {
                self.expr(value, TypeId::INT);
                self.library_type("Index")
            }
            ExprKind::Range { start, end } => {
                let index = self.library_type("Index");
                self.expr(start, index);
                self.expr(end, index);
                self.library_type("Range")
            }
            ExprKind::Unary { op, operand } => {
                if op == UnaryOp::Not {
                    self.expr(operand, TypeId::BOOL);
                    TypeId::BOOL
                } else {
                    self.expr(operand, TypeId::UNKNOWN)
                }
            }
            ExprKind::Binary { op, left, right } => self.binary(op, left, right, expected),
            ExprKind::Assign { op, target, value } => self.assignment(op, target, value),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond, TypeId::BOOL);
                let then_ty = self.expr(then_expr, expected);
                let else_ty = self.expr(else_expr, expected);
                let common = self.common_type(then_ty, else_ty);
                if common.is_unknown() {
                    expected
                } else {
                    common
                }
            }
            ExprKind::Is { subject, pattern } => {
                let subject_ty = self.expr(subject, TypeId::UNKNOWN);
                self.pattern(pattern, subject_ty);
                TypeId::BOOL
            }
            ExprKind::TypeTest { subject, .. } => {
                self.expr(subject, TypeId::UNKNOWN);
                TypeId::BOOL
            }
            ExprKind::Cast { ty, operand } => {
                self.expr(operand, TypeId::UNKNOWN);
                self.table.bound(ty)
            }
            ExprKind::Seq { effects, value } => {
                for &effect in tree.exprs(effects) {
                    self.expr(effect, TypeId::UNKNOWN);
                }
                self.expr(value, expected)
            }
            ExprKind::Lambda(lambda) => self.lambda(lambda, expected),
            ExprKind::New { ty, args, inits } => {
                let created = if ty.is_valid() {
                    self.table.bound(ty)
                } else {
                    expected
                };
                let params = self.constructor_params(created, args.len());
                for (i, &arg) in tree.exprs(args).iter().enumerate() {
                    let param = params.get(i).copied().unwrap_or(TypeId::UNKNOWN);
                    self.expr(arg, param);
                }
                self.initializers(created, inits);
                created
            }
            ExprKind::With { receiver, inits } => {
                let receiver_ty = self.expr(receiver, expected);
                self.initializers(receiver_ty, inits);
                receiver_ty
            }
            ExprKind::Collection(elements) => self.collection(elements, expected),
            ExprKind::Spread(value) => self.expr(value, TypeId::UNKNOWN),
            ExprKind::Switch { subject, arms } => self.switch(subject, arms, expected),
            ExprKind::Throw(value) => {
                self.expr(value, TypeId::UNKNOWN);
                expected
            }
            ExprKind::Default(ty) => {
                if ty.is_valid() {
                    self.table.bound(ty)
                } else {
                    expected
                }
            }
            ExprKind::Tuple(elements) => {
                let expected_elements = self.tuple_elements(expected, elements.len());
                let mut types = Vec::with_capacity(elements.len());
                for (i, &element) in tree.exprs(elements).iter().enumerate() {
                    types.push(self.expr(element, expected_elements[i]));
                }
                self.table.tuple_of(&types)
            }
            ExprKind::Await(value) => {
                self.expr(value, TypeId::UNKNOWN);
                TypeId::UNKNOWN
            }
            ExprKind::Interpolated(parts) => {
                for part in tree.interp_parts(parts) {
                    if let InterpolationPart::Hole {
                        expr, alignment, ..
                    } = *part
                    {
                        self.expr(expr, TypeId::UNKNOWN);
                        self.expr(alignment, TypeId::INT);
                    }
                }
                TypeId::STRING
            }
            ExprKind::Declaration { ty, name } => self.declaration(id, ty, name, expected),
            ExprKind::Discard => expected,
            ExprKind::Out(inner) | ExprKind::Parenthesized(inner) => self.expr(inner, expected),
        }
    }

    fn library_type(&self, name: &str) -> TypeId {
        self.table
            .lookup(self.table.name(name))
            .unwrap_or(TypeId::UNKNOWN)
    }

    fn underlying(&self, ty: TypeId) -> TypeId {
        let data = self.table.data(ty);
        if data.shape == TypeShape::Nullable {
            data.element.unwrap_or(TypeId::UNKNOWN)
        } else {
            ty
        }
    }

    fn type_symbol(&mut self, id: ExprId, ty: TypeId) {
        let name = self.table.data(ty).name;
        self.facts.symbols.insert(
            id,
            SymbolInfo::resolved(Symbol {
                name,
                kind: SymbolKind::Type,
                ty,
                container: None,
                is_static: true,
            }),
        );
    }

    // Names and members

    fn resolve_ident(&mut self, id: ExprId, name: Name, arity: Option<usize>) -> Option<Symbol> {
        let info = self.resolve_name(name, arity);
        let symbol = info.symbol_or_unique_candidate();
        self.facts.symbols.insert(id, info);
        symbol
    }

    fn member_access(
        &mut self,
        id: ExprId,
        receiver: ExprId,
        name: Name,
        arity: Option<usize>,
    ) -> Option<Symbol> {
        let receiver_ty = self.expr(receiver, TypeId::UNKNOWN);
        let statics = self.is_type_receiver(receiver).then_some(true);
        self.member_on(id, receiver_ty, name, arity, statics)
    }

    fn is_type_receiver(&self, receiver: ExprId) -> bool {
        matches!(self.tree.expr_kind(receiver), ExprKind::TypeRef(_))
            || self
                .facts
                .symbols
                .get(&receiver)
                .and_then(|info| info.symbol)
                .is_some_and(|s| s.kind == SymbolKind::Type)
    }

    fn member_on(
        &mut self,
        id: ExprId,
        receiver: TypeId,
        name: Name,
        arity: Option<usize>,
        statics: Option<bool>,
    ) -> Option<Symbol> {
        if receiver.is_unknown() {
            self.facts.symbols.insert(id, SymbolInfo::default());
            return None;
        }
        let info = self.member_symbols(receiver, name, arity, statics);
        let symbol = info.symbol_or_unique_candidate();
        self.facts.symbols.insert(id, info);
        symbol
    }

    // Calls

    fn invocation(&mut self, callee: ExprId, args: ExprRange) -> TypeId {
        let tree = self.tree;
        let arity = Some(args.len());
        let symbol = match tree.expr_kind(callee) {
            ExprKind::Ident(name) => Some(self.resolve_ident(callee, name, arity)),
            ExprKind::Member { receiver, name } => {
                Some(self.member_access(callee, receiver, name, arity))
            }
            ExprKind::MemberBinding(name) => {
                let receiver = self.receivers.last().copied().unwrap_or(TypeId::UNKNOWN);
                Some(self.member_on(callee, receiver, name, arity, None))
            }
            _ => None,
        };
        let (ret, params) = match symbol {
            Some(resolved) => {
                let callee_ty = value_type(resolved);
                self.record(callee, callee_ty, TypeId::UNKNOWN);
                match resolved {
                    Some(s) if s.kind == SymbolKind::Method => {
                        (s.ty, self.method_params(s, args.len()))
                    }
                    Some(s) => self.delegate_signature(s.ty),
                    None => (TypeId::UNKNOWN, Vec::new()),
                }
            }
            None => {
                let callee_ty = self.expr(callee, TypeId::UNKNOWN);
                self.delegate_signature(callee_ty)
            }
        };
        for (i, &arg) in tree.exprs(args).iter().enumerate() {
            let param = params.get(i).copied().unwrap_or(TypeId::UNKNOWN);
            self.expr(arg, param);
        }
        ret
    }

    fn method_params(&self, symbol: Symbol, arity: usize) -> Vec<TypeId> {
        let Some(container) = symbol.container else {
            return Vec::new();
        };
        self.table
            .candidates(container, symbol.name)
            .into_iter()
            .map(|(_, m)| m)
            .find(|m| m.params.len() == arity)
            .map(|m| m.params)
            .unwrap_or_default()
    }

    /// Return type and parameter types of a delegate type.
    fn delegate_signature(&self, ty: TypeId) -> (TypeId, Vec<TypeId>) {
        let data = self.table.data(ty);
        if data.shape != TypeShape::Delegate {
            return (TypeId::UNKNOWN, Vec::new());
        }
        match data.args.split_last() {
            Some((&ret, params)) => (ret, params.to_vec()),
            None => (TypeId::VOID, Vec::new()),
        }
    }

    fn constructor_params(&self, ty: TypeId, arity: usize) -> Vec<TypeId> {
        let primary = self.table.primary_params(ty);
        if primary.len() == arity && arity > 0 {
            return primary.iter().map(|p| p.1).collect();
        }
        let name = self.table.data(ty).name;
        let tree = self.tree;
        for decl in tree.unit.types.iter().filter(|d| d.name == name) {
            for member in &decl.members {
                if let MemberKind::Constructor { params, .. } = member.kind {
                    if params.len() == arity {
                        return tree
                            .params(params)
                            .iter()
                            .map(|p| self.table.bound(p.ty))
                            .collect();
                    }
                }
            }
        }
        Vec::new()
    }

    fn initializers(&mut self, ty: TypeId, inits: FieldInitRange) {
        let tree = self.tree;
        for init in tree.field_inits(inits) {
            let member_ty = self
                .table
                .find_member(ty, init.name)
                .map_or(TypeId::UNKNOWN, |m| m.ty);
            self.expr(init.value, member_ty);
        }
    }

    fn element_access(&mut self, receiver: TypeId, args: ExprRange) -> TypeId {
        let tree = self.tree;
        let mut arg_types = Vec::with_capacity(args.len());
        for &arg in tree.exprs(args) {
            arg_types.push(self.expr(arg, TypeId::UNKNOWN));
        }
        let range = self.library_type("Range");
        if arg_types.len() == 1 && arg_types[0] == range && !range.is_unknown() {
            return receiver;
        }
        self.table.element_of(receiver)
    }

    // Operators

    fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId, expected: TypeId) -> TypeId {
        if op.is_logical() {
            self.expr(left, TypeId::BOOL);
            self.expr(right, TypeId::BOOL);
            return TypeId::BOOL;
        }
        if op == BinaryOp::Coalesce {
            let left_ty = self.expr(left, expected);
            let underlying = self.underlying(left_ty);
            let right_ty = self.expr(right, underlying);
            let right_nullable = right_ty == TypeId::NULL
                || self.table.data(right_ty).shape == TypeShape::Nullable;
            return if right_nullable { left_ty } else { underlying };
        }
        let left_ty = self.expr(left, TypeId::UNKNOWN);
        let right_expected = if left_ty == TypeId::NULL {
            TypeId::UNKNOWN
        } else {
            left_ty
        };
        let right_ty = if op.is_comparison() {
            self.expr(right, right_expected)
        } else {
            self.expr(right, TypeId::UNKNOWN)
        };
        if op.is_comparison() {
            return TypeId::BOOL;
        }
        if op == BinaryOp::Add && (left_ty == TypeId::STRING || right_ty == TypeId::STRING) {
            return TypeId::STRING;
        }
        promote(left_ty, right_ty)
    }

    fn assignment(&mut self, op: Option<BinaryOp>, target: ExprId, value: ExprId) -> TypeId {
        let tree = self.tree;
        match tree.expr_kind(target) {
            ExprKind::Tuple(elements) if op.is_none() => {
                let value_ty = self.expr(value, TypeId::UNKNOWN);
                self.deconstruction_targets(elements, value_ty);
                self.record(target, value_ty, TypeId::UNKNOWN);
                value_ty
            }
            ExprKind::Discard => {
                let value_ty = self.expr(value, TypeId::UNKNOWN);
                self.record(target, value_ty, TypeId::UNKNOWN);
                value_ty
            }
            _ => {
                let target_ty = self.expr(target, TypeId::UNKNOWN);
                let expected = if op.is_none() {
                    target_ty
                } else {
                    TypeId::UNKNOWN
                };
                self.expr(value, expected);
                target_ty
            }
        }
    }

    /// Type the targets of `(a, var b, _) = value`.
    fn deconstruction_targets(&mut self, elements: ExprRange, source: TypeId) {
        let tree = self.tree;
        let components = self.tuple_elements(source, elements.len());
        for (i, &element) in tree.exprs(elements).iter().enumerate() {
            let component = components[i];
            match tree.expr_kind(element) {
                ExprKind::Tuple(nested) => {
                    self.deconstruction_targets(nested, component);
                    self.record(element, component, TypeId::UNKNOWN);
                }
                ExprKind::Declaration { .. } | ExprKind::Discard => {
                    self.expr(element, component);
                }
                _ => {
                    self.expr(element, TypeId::UNKNOWN);
                }
            }
        }
    }

    /// Element types of a tuple or the components of a deconstructable
    /// type, padded to `len` with `UNKNOWN`.
    pub(super) fn tuple_elements(&self, ty: TypeId, len: usize) -> Vec<TypeId> {
        let data = self.table.data(ty);
        let mut types: Vec<TypeId> = if data.shape == TypeShape::Tuple {
            data.args.clone()
        } else {
            data.components.iter().map(|c| c.ty).collect()
        };
        types.resize(len, TypeId::UNKNOWN);
        types
    }

    fn declaration(&mut self, id: ExprId, ty: TypeExprId, name: Name, expected: TypeId) -> TypeId {
        let declared = self.bind_or(ty, expected);
        let symbol = self.declare(name, SymbolKind::Local, declared);
        self.facts.declared.insert(NodeRef::Expr(id), symbol);
        declared
    }

    pub(super) fn common_type(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == TypeId::NULL {
            return self.table.nullable_of(b);
        }
        if b == TypeId::NULL {
            return self.table.nullable_of(a);
        }
        if a.is_unknown() || b.is_unknown() {
            return if a.is_unknown() { b } else { a };
        }
        if self.table.classify(a, b).is_implicit() {
            return b;
        }
        if self.table.classify(b, a).is_implicit() {
            return a;
        }
        TypeId::UNKNOWN
    }

    // Lambdas, collections and switches

    fn lambda(&mut self, lambda: LambdaId, expected: TypeId) -> TypeId {
        let tree = self.tree;
        let lambda = tree.lambda(lambda);
        let target = self.table.data(expected);
        let is_delegate = target.shape == TypeShape::Delegate;
        let (expected_ret, expected_params) = self.delegate_signature(expected);
        self.push_scope();
        let mut params = Vec::new();
        for (i, param) in tree.params(lambda.params).iter().enumerate() {
            let ty = if param.ty.is_valid() {
                self.table.bound(param.ty)
            } else {
                expected_params.get(i).copied().unwrap_or(TypeId::UNKNOWN)
            };
            self.declare(param.name, SymbolKind::Parameter, ty);
            params.push(ty);
        }
        let ret = self.function_body(lambda.body, expected_ret);
        self.pop_scope();
        if is_delegate {
            expected
        } else {
            self.delegate_type(params, ret)
        }
    }

    fn collection(&mut self, elements: ExprRange, expected: TypeId) -> TypeId {
        let tree = self.tree;
        let element_ty = self.table.element_of(expected);
        let mut first = None;
        for &element in tree.exprs(elements) {
            let ty = if let ExprKind::Spread(_) = tree.expr_kind(element) {
                let spread = self.expr(element, TypeId::UNKNOWN);
                self.table.element_of(spread)
            } else {
                self.expr(element, element_ty)
            };
            if first.is_none() && !ty.is_unknown() && ty != TypeId::NULL {
                first = Some(ty);
            }
        }
        if expected.is_unknown() {
            let element = first.unwrap_or(TypeId::OBJECT);
            self.table.array_of(element)
        } else {
            expected
        }
    }

    fn switch(&mut self, subject: ExprId, arms: ArmRange, expected: TypeId) -> TypeId {
        let tree = self.tree;
        let subject_ty = self.expr(subject, TypeId::UNKNOWN);
        let mut result: Option<TypeId> = None;
        let mut saw_null = false;
        let mut conflict = false;
        for arm in tree.arms(arms) {
            self.push_scope();
            self.pattern(arm.pattern, subject_ty);
            if arm.guard.is_valid() {
                self.expr(arm.guard, TypeId::BOOL);
            }
            let ty = self.expr(arm.result, expected);
            self.pop_scope();
            if matches!(tree.expr_kind(arm.result), ExprKind::Throw(_)) || ty.is_unknown() {
                continue;
            }
            if ty == TypeId::NULL {
                saw_null = true;
                continue;
            }
            result = match result {
                None => Some(ty),
                Some(previous) => {
                    let common = self.common_type(previous, ty);
                    if common.is_unknown() {
                        conflict = true;
                        Some(previous)
                    } else {
                        Some(common)
                    }
                }
            };
        }
        match result {
            Some(_) if conflict => expected,
            Some(ty) if saw_null => self.table.nullable_of(ty),
            Some(ty) => ty,
            None => expected,
        }
    }

    // Constants

    fn record_constant(&mut self, id: ExprId) {
        let tree = self.tree;
        let value = match tree.expr_kind(id) {
            ExprKind::Ident(_) | ExprKind::Member { .. } => self
                .facts
                .symbols
                .get(&id)
                .and_then(|info| info.symbol)
                .filter(|s| s.kind == SymbolKind::Field)
                .and_then(|s| {
                    let container = s.container?;
                    self.const_fields.get(&(container, s.name)).copied()
                }),
            _ => {
                let constants = &self.facts.constants;
                fold::fold(tree, id, &|e| constants.get(&e).copied())
            }
        };
        if let Some(value) = value {
            self.facts.constants.insert(id, value);
        }
    }
}

/// Type of a resolved symbol used as a value. Method groups have none.
fn value_type(symbol: Option<Symbol>) -> TypeId {
    match symbol {
        Some(s) if s.kind != SymbolKind::Method => s.ty,
        _ => TypeId::UNKNOWN,
    }
}

fn promote(left: TypeId, right: TypeId) -> TypeId {
    let rank = |t: TypeId| match t {
        TypeId::CHAR | TypeId::INT => Some(1),
        TypeId::LONG => Some(2),
        TypeId::DOUBLE => Some(3),
        _ => None,
    };
    if left == TypeId::BOOL && right == TypeId::BOOL {
        return TypeId::BOOL;
    }
    match (rank(left), rank(right)) {
        (Some(a), Some(b)) => match a.max(b) {
            1 => TypeId::INT,
            2 => TypeId::LONG,
            _ => TypeId::DOUBLE,
        },
        _ => TypeId::UNKNOWN,
    }
}

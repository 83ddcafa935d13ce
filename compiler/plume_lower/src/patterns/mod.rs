//! Pattern lowering engine.
//!
//! Turns `subject is <pattern>` into a plain boolean condition. Every
//! pattern kind contributes two lists: checks (boolean tests over the
//! subject) and assignments (bindings of designated variables). The result
//! has the shape
//!
//! ```text
//! check1 && check2 && ... && (x = ..., y = ..., true)
//! ```
//!
//! so bindings are written only after every check succeeded. Designated
//! variables become hoisted locals.
//!
//! A subject that is read more than once is stabilized when it is not
//! already a simple name: it is evaluated once into a hoisted temporary.

mod pass;


pub(crate) use pass::{run, PASS};

use plume_ir::ast::{BinaryOp, ExprKind, Literal, PatternKind, PatternOp, TypeExpr};
use plume_ir::stack::ensure_sufficient_stack;
use plume_ir::{
    ConstValue, Conversion, ExprId, Name, NodeRef, PatternId, Span, TypeExprId, TypeId, TypeShape,
};

use crate::hoist::InstallPoint;
use crate::rewrite::Rewriter;
use crate::synth::{classify_types, components, is_simple, length_member};
use crate::LowerError;

/// The value a pattern is matched against.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Subject {
    /// Expression in the output tree; every read copies it.
    pub(crate) expr: ExprId,
    pub(crate) ty: TypeId,
    /// Input node the model can classify conversions for.
    pub(crate) source: Option<ExprId>,
}

impl Subject {
    pub(crate) fn synthesized(expr: ExprId, ty: TypeId) -> Self {
        Subject {
            expr,
            ty,
            source: None,
        }
    }
}

#[derive(Default)]
struct Parts {
    checks: Vec<ExprId>,
    assigns: Vec<ExprId>,
}

impl Parts {
    fn extend(&mut self, other: Parts) {
        self.checks.extend(other.checks);
        self.assigns.extend(other.assigns);
    }
}

/// Lowers the patterns of one construct, hoisting into one install point.
pub(crate) struct PatternLowerer<'r, 'a> {
    rw: &'r mut Rewriter<'a>,
    point: InstallPoint,
    span: Span,
}

impl<'r, 'a> PatternLowerer<'r, 'a> {
    pub(crate) fn new(rw: &'r mut Rewriter<'a>, point: InstallPoint, span: Span) -> Self {
        PatternLowerer { rw, point, span }
    }

    /// Condition equivalent to `subject is pattern`.
    pub(crate) fn lower(&mut self, subject: Subject, pattern: PatternId) -> Result<ExprId, LowerError> {
        let span = self.span;
        let stabilize = self.reads(pattern, subject.ty) > 1 && !is_simple(&self.rw.out, subject.expr);
        if !stabilize {
            let parts = self.pattern(pattern, subject)?;
            return Ok(self.finish(parts));
        }
        let temp = self.rw.temp(self.point, "t", subject.ty, span);
        let target = self.rw.out.ident(temp, span);
        let capture = self.rw.out.assign(target, subject.expr, span);
        let stable = Subject {
            expr: self.rw.out.ident(temp, span),
            ..subject
        };
        let parts = self.pattern(pattern, stable)?;
        let cond = self.finish(parts);
        Ok(self.rw.out.seq(&[capture], cond, span))
    }

    /// `checks && (assigns, true)`
    fn finish(&mut self, parts: Parts) -> ExprId {
        let span = self.span;
        let mut terms = parts.checks;
        if !parts.assigns.is_empty() {
            let yes = self.rw.out.bool_lit(true, span);
            terms.push(self.rw.out.seq(&parts.assigns, yes, span));
        }
        self.conjunction(terms)
    }

    fn conjunction(&mut self, terms: Vec<ExprId>) -> ExprId {
        let span = self.span;
        let mut terms = terms.into_iter();
        let Some(first) = terms.next() else {
            return self.rw.out.bool_lit(true, span);
        };
        terms.fold(first, |acc, term| {
            self.rw.out.binary(BinaryOp::And, acc, term, span)
        })
    }

    fn read(&mut self, subject: Subject) -> ExprId {
        self.rw.out.duplicate_expr(subject.expr)
    }

    fn conversion(&self, subject: Subject, target: TypeId) -> Conversion {
        match subject.source {
            Some(source) => self.rw.model.classify_conversion(source, target),
            None => classify_types(self.rw.model, subject.ty, target),
        }
    }

    fn is_value_type(&self, ty: TypeId) -> bool {
        !ty.is_unknown() && self.rw.model.is_value_type(ty)
    }

    fn null_check(&mut self, subject: Subject, op: BinaryOp) -> ExprId {
        let span = self.span;
        let value = self.read(subject);
        let null = self.rw.out.null(span);
        self.rw.out.binary(op, value, null, span)
    }

    /// Test that `subject` has type `target`, plus the subject to use once
    /// the test passed.
    ///
    /// Identity and reference conversions degrade to a null check (or to
    /// nothing for value types); anything else is a runtime type test and
    /// a cast.
    fn type_check(&mut self, subject: Subject, target: TypeId, syntax: TypeExprId) -> (Option<ExprId>, Subject) {
        let span = self.span;
        let conversion = if target.is_unknown() {
            Conversion::Explicit
        } else {
            self.conversion(subject, target)
        };
        if conversion.is_identity_or_reference() {
            let check = if self.is_value_type(subject.ty) {
                None
            } else {
                Some(self.null_check(subject, BinaryOp::NotEq))
            };
            let narrowed = if conversion == Conversion::Identity {
                subject
            } else {
                Subject::synthesized(subject.expr, target)
            };
            return (check, narrowed);
        }
        let value = self.read(subject);
        let test = self.rw.out.type_test(value, syntax, span);
        let value = self.read(subject);
        let cast = self.rw.out.cast(syntax, value, span);
        (Some(test), Subject::synthesized(cast, target))
    }

    fn pattern(&mut self, id: PatternId, subject: Subject) -> Result<Parts, LowerError> {
        ensure_sufficient_stack(|| self.pattern_inner(id, subject)).map_err(|err| {
            let input = self.rw.input;
            err.within(
                self.rw.pass,
                plume_ir::print_pattern(input, id),
                input.pattern(id).span,
            )
        })
    }

    fn pattern_inner(&mut self, id: PatternId, subject: Subject) -> Result<Parts, LowerError> {
        let span = self.span;
        let mut parts = Parts::default();
        match self.rw.input.pattern_kind(id) {
            PatternKind::Discard => {}
            PatternKind::Parenthesized(inner) => return self.pattern(inner, subject),
            PatternKind::Constant(value) => {
                let check = self.constant(subject, value);
                parts.checks.push(check);
            }
            PatternKind::Relational { op, value } => {
                self.relational(subject, op.to_binary(), value, &mut parts);
            }
            PatternKind::Type(ty) => {
                let target = self.rw.model.bind_type(ty);
                let (check, _) = self.type_check(subject, target, ty);
                parts.checks.extend(check);
            }
            PatternKind::Var(name) => {
                let value = self.read(subject);
                self.bind(id, name, TypeExprId::INVALID, subject.ty, value, &mut parts);
            }
            PatternKind::Declaration { ty, name } => {
                let target = self.rw.model.bind_type(ty);
                let (check, narrowed) = self.type_check(subject, target, ty);
                parts.checks.extend(check);
                let value = self.read(narrowed);
                self.bind(id, name, ty, subject.ty, value, &mut parts);
            }
            PatternKind::Recursive {
                ty,
                positional,
                properties,
                designation,
            } => {
                let narrowed = if ty.is_valid() {
                    let target = self.rw.model.bind_type(ty);
                    let (check, narrowed) = self.type_check(subject, target, ty);
                    parts.checks.extend(check);
                    narrowed
                } else {
                    if !self.is_value_type(subject.ty) {
                        let check = self.null_check(subject, BinaryOp::NotEq);
                        parts.checks.push(check);
                    }
                    subject
                };
                let items = self.rw.input.patterns(positional).to_vec();
                if !items.is_empty() {
                    let members = components(self.rw.model, &self.rw.out, narrowed.ty, items.len());
                    for (&item, (member, ty)) in items.iter().zip(members) {
                        let receiver = self.read(narrowed);
                        let access = self.rw.out.member(receiver, member, span);
                        let child = self.subpattern(item, Subject::synthesized(access, ty))?;
                        parts.extend(child);
                    }
                }
                let props = self.rw.input.prop_pats(properties).to_vec();
                for prop in props {
                    let mut current = narrowed;
                    for &name in &prop.path {
                        current = self.member_subject(current, name)?;
                    }
                    let child = self.subpattern(prop.pattern, current)?;
                    parts.extend(child);
                }
                if is_designation(self.rw, designation) {
                    let value = self.read(narrowed);
                    self.bind(id, designation, ty, narrowed.ty, value, &mut parts);
                }
            }
            PatternKind::List {
                elements,
                designation,
            } => {
                self.list(subject, elements, &mut parts)?;
                if is_designation(self.rw, designation) {
                    let value = self.read(subject);
                    self.bind(id, designation, TypeExprId::INVALID, subject.ty, value, &mut parts);
                }
            }
            PatternKind::Slice(_) => {
                return Err(self.rw.unsupported("slice pattern outside of a list pattern", span));
            }
            PatternKind::Binary {
                op: PatternOp::And,
                left,
                right,
            } => {
                parts = self.pattern(left, subject)?;
                let right = self.pattern(right, subject)?;
                parts.extend(right);
            }
            PatternKind::Binary {
                op: PatternOp::Or,
                left,
                right,
            } => {
                let left = self.pattern(left, subject)?;
                let left = self.finish(left);
                let right = self.pattern(right, subject)?;
                let right = self.finish(right);
                let either = self.rw.out.binary(BinaryOp::Or, left, right, span);
                parts.checks.push(either);
            }
            PatternKind::Not(inner) => {
                if self.is_null_constant(inner) {
                    let check = self.null_check(subject, BinaryOp::NotEq);
                    parts.checks.push(check);
                } else {
                    let inner = self.pattern(inner, subject)?;
                    let inner = self.finish(inner);
                    let negated = self.rw.out.unary(plume_ir::ast::UnaryOp::Not, inner, span);
                    parts.checks.push(negated);
                }
            }
        }
        Ok(parts)
    }

    /// Lower a nested pattern over a member or element of the subject,
    /// stabilizing the access when the nested pattern reads it repeatedly.
    fn subpattern(&mut self, id: PatternId, subject: Subject) -> Result<Parts, LowerError> {
        if self.reads(id, subject.ty) <= 1 || is_simple(&self.rw.out, subject.expr) {
            return self.pattern(id, subject);
        }
        let span = self.span;
        let temp = self.rw.temp(self.point, "t", subject.ty, span);
        let target = self.rw.out.ident(temp, span);
        let value = self.read(subject);
        let capture = self.rw.out.assign(target, value, span);
        let stable = Subject::synthesized(self.rw.out.ident(temp, span), subject.ty);
        let mut parts = self.pattern(id, stable)?;
        if let Some(first) = parts.checks.first_mut() {
            *first = self.rw.out.seq(&[capture], *first, span);
        } else {
            parts.assigns.insert(0, capture);
        }
        Ok(parts)
    }

    fn is_null_constant(&self, id: PatternId) -> bool {
        match self.rw.input.pattern_kind(id) {
            PatternKind::Constant(value) => self.is_null(value),
            PatternKind::Parenthesized(inner) => self.is_null_constant(inner),
            _ => false,
        }
    }

    fn is_null(&self, value: ExprId) -> bool {
        matches!(self.rw.input.expr_kind(value), ExprKind::Literal(Literal::Null))
            || self.rw.model.constant_value(value) == Some(ConstValue::Null)
    }

    /// `subject == value` when both sides are primitives that compare by
    /// value after conversion (so `long l; l is 5` compares numerically),
    /// otherwise `object.Equals(subject, value)`.
    fn constant(&mut self, subject: Subject, value: ExprId) -> ExprId {
        let span = self.span;
        if self.is_null(value) {
            return self.null_check(subject, BinaryOp::Eq);
        }
        let lhs = self.read(subject);
        if self.compares_by_value(subject.ty, value) {
            return self.rw.out.binary(BinaryOp::Eq, lhs, value, span);
        }
        let object = self.rw.out.type_str("object");
        let object = self.rw.out.alloc_expr(ExprKind::TypeRef(object), span);
        self.rw.out.method_call(object, "Equals", &[lhs, value], span)
    }

    fn compares_by_value(&self, subject: TypeId, value: ExprId) -> bool {
        let Some(subject) = self.primitive_operand(subject) else {
            return false;
        };
        let info = self.rw.type_info(value);
        info.ty == subject
            || info.converted == subject
            || (is_numeric(subject) && is_numeric(info.ty))
    }

    /// `ty` (or the underlying type of `ty?`) when `==` on it is value
    /// equality.
    fn primitive_operand(&self, ty: TypeId) -> Option<TypeId> {
        if ty.is_unknown() {
            return None;
        }
        let data = self.rw.model.type_data(ty);
        let ty = match data.shape {
            TypeShape::Nullable => data.element?,
            _ => ty,
        };
        (is_numeric(ty) || matches!(ty, TypeId::BOOL | TypeId::STRING)).then_some(ty)
    }

    fn relational(&mut self, subject: Subject, op: BinaryOp, value: ExprId, parts: &mut Parts) {
        let span = self.span;
        let value_ty = self.rw.type_of(value);
        if self.compares_directly(subject.ty, value_ty) {
            let lhs = self.read(subject);
            parts.checks.push(self.rw.out.binary(op, lhs, value, span));
            return;
        }
        let syntax = self.rw.type_syntax(value_ty);
        let (check, narrowed) = self.type_check(subject, value_ty, syntax);
        parts.checks.extend(check);
        let lhs = self.read(narrowed);
        parts.checks.push(self.rw.out.binary(op, lhs, value, span));
    }

    fn compares_directly(&self, subject: TypeId, value: TypeId) -> bool {
        if subject == value || value.is_unknown() {
            return true;
        }
        let data = self.rw.model.type_data(subject);
        let subject = match data.shape {
            TypeShape::Nullable => data.element.unwrap_or(TypeId::UNKNOWN),
            _ => subject,
        };
        subject == value || (is_numeric(subject) && is_numeric(value))
    }

    fn member_subject(&mut self, subject: Subject, name: Name) -> Result<Subject, LowerError> {
        let span = self.span;
        let ty = if subject.ty.is_unknown() {
            TypeId::UNKNOWN
        } else {
            let Some(member) = self.rw.model.find_member(subject.ty, name) else {
                let owner = self.rw.model.type_data(subject.ty).name;
                return Err(LowerError::resolution(
                    format!(
                        "member `{}` on `{}`",
                        self.rw.out.name_str(name),
                        self.rw.out.name_str(owner)
                    ),
                    span,
                ));
            };
            member.ty
        };
        let receiver = self.read(subject);
        let access = self.rw.out.member(receiver, name, span);
        Ok(Subject::synthesized(access, ty))
    }

    fn list(&mut self, subject: Subject, elements: plume_ir::PatternRange, parts: &mut Parts) -> Result<(), LowerError> {
        let span = self.span;
        if !self.is_value_type(subject.ty) {
            let check = self.null_check(subject, BinaryOp::NotEq);
            parts.checks.push(check);
        }
        let length = length_member(self.rw.model, &self.rw.out, subject.ty);
        let items = self.rw.input.patterns(elements).to_vec();
        let slice_at = items
            .iter()
            .position(|&p| matches!(self.rw.input.pattern_kind(p), PatternKind::Slice(_)));
        let n = items.len();
        let fixed = if slice_at.is_some() { n - 1 } else { n };

        let len = self.length(subject, length);
        let count = self.int(fixed);
        let op = if slice_at.is_some() {
            BinaryOp::GtEq
        } else {
            BinaryOp::Eq
        };
        parts.checks.push(self.rw.out.binary(op, len, count, span));

        let element = self.element_type(subject.ty);
        for (i, &item) in items.iter().enumerate() {
            if Some(i) == slice_at {
                if let PatternKind::Slice(inner) = self.rw.input.pattern_kind(item) {
                    if inner.is_valid() && !self.is_discard(inner) {
                        let after = n - i - 1;
                        let slice = self.slice(subject, length, i, after);
                        let child = self.subpattern(inner, slice)?;
                        parts.extend(child);
                    }
                }
                continue;
            }
            if self.is_discard(item) {
                continue;
            }
            let index = match slice_at {
                Some(at) if i > at => {
                    let len = self.length(subject, length);
                    let back = self.int(n - i);
                    self.rw.out.binary(BinaryOp::Sub, len, back, span)
                }
                _ => self.int(i),
            };
            let receiver = self.read(subject);
            let access = self.rw.out.index(receiver, &[index], span);
            let child = self.subpattern(item, Subject::synthesized(access, element))?;
            parts.extend(child);
        }
        Ok(())
    }

    /// Sub-sequence matched by `.. p`: `Substring(start, length)` for text,
    /// `Slice(start, end)` otherwise.
    fn slice(&mut self, subject: Subject, length: &str, start: usize, after: usize) -> Subject {
        let span = self.span;
        let receiver = self.read(subject);
        let first = self.int(start);
        let len = self.length(subject, length);
        let expr = if subject.ty == TypeId::STRING {
            let trim = start + after;
            let count = if trim == 0 {
                len
            } else {
                let trim = self.int(trim);
                self.rw.out.binary(BinaryOp::Sub, len, trim, span)
            };
            self.rw.out.method_call(receiver, "Substring", &[first, count], span)
        } else {
            let end = if after == 0 {
                len
            } else {
                let after = self.int(after);
                self.rw.out.binary(BinaryOp::Sub, len, after, span)
            };
            self.rw.out.method_call(receiver, "Slice", &[first, end], span)
        };
        Subject::synthesized(expr, subject.ty)
    }

    fn length(&mut self, subject: Subject, member: &str) -> ExprId {
        let receiver = self.read(subject);
        self.rw.out.member_str(receiver, member, self.span)
    }

    fn int(&mut self, value: usize) -> ExprId {
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        self.rw.out.int(value, self.span)
    }

    fn element_type(&self, ty: TypeId) -> TypeId {
        if ty == TypeId::STRING {
            return TypeId::CHAR;
        }
        self.rw.model.type_data(ty).element.unwrap_or(TypeId::UNKNOWN)
    }

    fn is_discard(&self, id: PatternId) -> bool {
        match self.rw.input.pattern_kind(id) {
            PatternKind::Discard => true,
            PatternKind::Var(name) => !is_designation(self.rw, name),
            PatternKind::Parenthesized(inner) => self.is_discard(inner),
            _ => false,
        }
    }

    /// Hoist a designated variable and queue its assignment.
    ///
    /// The local's type is the model's type for the designation when it
    /// has one, then the subject type for `var`, then the written type.
    fn bind(
        &mut self,
        pattern: PatternId,
        name: Name,
        annotation: TypeExprId,
        subject_ty: TypeId,
        value: ExprId,
        parts: &mut Parts,
    ) {
        if !is_designation(self.rw, name) {
            return;
        }
        let span = self.span;
        let declared = self
            .rw
            .model
            .declared_symbol(NodeRef::Pattern(pattern))
            .map(|symbol| symbol.ty)
            .filter(|ty| !ty.is_unknown());
        let written = annotation
            .valid()
            .filter(|&ty| !matches!(self.rw.input.type_expr(ty), TypeExpr::Var));
        let ty = match (declared, written) {
            (Some(ty), _) => ty,
            (None, None) => subject_ty,
            (None, Some(ty)) => self.rw.model.bind_type(ty),
        };
        let syntax = match written {
            Some(syntax) if ty.is_unknown() => syntax,
            _ => self.rw.type_syntax(ty),
        };
        self.rw.hoist(self.point, name, syntax, span);
        let target = self.rw.out.ident(name, span);
        parts.assigns.push(self.rw.out.assign(target, value, span));
    }

    /// Upper bound on how often lowering `id` reads its subject.
    fn reads(&self, id: PatternId, subject: TypeId) -> usize {
        let input = self.rw.input;
        match input.pattern_kind(id) {
            PatternKind::Discard => 0,
            PatternKind::Constant(_) | PatternKind::Var(_) | PatternKind::Type(_) => 1,
            PatternKind::Relational { value, .. } => {
                if self.compares_directly(subject, self.rw.type_of(value)) {
                    1
                } else {
                    3
                }
            }
            PatternKind::Declaration { ty, .. } => {
                let target = self.rw.model.bind_type(ty);
                if target == subject && self.is_value_type(subject) {
                    1
                } else {
                    2
                }
            }
            PatternKind::Recursive {
                positional,
                properties,
                ..
            } => 2 + positional.len() + properties.len(),
            PatternKind::List { elements, .. } => 3 + elements.len(),
            PatternKind::Slice(inner) | PatternKind::Not(inner) | PatternKind::Parenthesized(inner) => {
                if inner.is_valid() {
                    self.reads(inner, subject)
                } else {
                    0
                }
            }
            PatternKind::Binary { left, right, .. } => {
                self.reads(left, subject) + self.reads(right, subject)
            }
        }
    }
}

fn is_numeric(ty: TypeId) -> bool {
    matches!(
        ty,
        TypeId::INT | TypeId::LONG | TypeId::DOUBLE | TypeId::CHAR
    )
}

/// Whether `name` designates a variable (not empty, not `_`).
fn is_designation(rw: &Rewriter<'_>, name: Name) -> bool {
    !name.is_empty() && rw.out.name_str(name) != "_"
}

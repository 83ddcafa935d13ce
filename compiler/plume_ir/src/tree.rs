//! Arena syntax tree.
//!
//! `SyntaxTree` owns every node of one compilation unit in struct-of-arrays
//! arenas. Children are referenced by ID and lists by range, so a pass can
//! clone a tree, overwrite individual slots, and append new nodes without
//! touching the parents that point at them.
//!
//! # Ownership
//!
//! Expressions, statements and patterns form a proper tree: every node has
//! at most one parent. Code that needs a node twice must call one of the
//! `duplicate_*` methods. Type syntax is immutable and may be shared.

mod build;

use crate::ast::{
    Body, CompilationUnit, Expr, ExprKind, FieldInit, InterpolationPart, Lambda, LambdaBody,
    LocalFunction, Param, Pattern, PatternKind, PropertySubpattern, Stmt, StmtKind, SwitchArm,
    SwitchLabel, SwitchSection, TypeExpr,
};
use crate::{
    ArmRange, ExprId, ExprRange, FieldInitRange, InterpPartRange, LabelRange, LambdaId, LocalFnId,
    Name, ParamRange, PatternId, PatternRange, PropPatRange, SectionRange, SharedInterner, Span,
    StmtId, StmtRange, TypeExprId, TypeRange,
};

/// Convert a table length to `u32`.
///
/// # Panics
/// Panics if a table exceeds `u32::MAX` entries.
#[inline]
fn to_u32(value: usize, what: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("{what} exceeded u32::MAX entries"))
}

/// Convert a list length to `u16`.
///
/// # Panics
/// Panics if one list exceeds `u16::MAX` items.
#[inline]
fn to_u16(value: usize, what: &str) -> u16 {
    u16::try_from(value).unwrap_or_else(|_| panic!("{what} exceeded u16::MAX items"))
}

/// Generate the allocate and read methods of one flattened side table.
macro_rules! side_table {
    ($field:ident, $alloc:ident, $get:ident, $item:ty, $range:ty, $what:literal) => {
        #[doc = concat!("Append a list of ", $what, " and return its range.")]
        pub fn $alloc(&mut self, items: impl IntoIterator<Item = $item>) -> $range {
            let start = self.$field.len();
            self.$field.extend(items);
            let len = self.$field.len() - start;
            if len == 0 {
                return <$range>::EMPTY;
            }
            <$range>::new(to_u32(start, $what), to_u16(len, $what))
        }

        #[doc = concat!("Read a list of ", $what, ".")]
        pub fn $get(&self, range: $range) -> &[$item] {
            if range.is_empty() {
                return &[];
            }
            &self.$field[range.indices()]
        }
    };
}

/// One compilation unit in arena form.
#[derive(Clone)]
pub struct SyntaxTree {
    interner: SharedInterner,
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    patterns: Vec<Pattern>,
    types: Vec<TypeExpr>,
    lambdas: Vec<Lambda>,
    local_fns: Vec<LocalFunction>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
    pattern_lists: Vec<PatternId>,
    type_lists: Vec<TypeExprId>,
    params: Vec<Param>,
    arms: Vec<SwitchArm>,
    sections: Vec<SwitchSection>,
    labels: Vec<SwitchLabel>,
    prop_pats: Vec<PropertySubpattern>,
    field_inits: Vec<FieldInit>,
    interp_parts: Vec<InterpolationPart>,
    /// Declarations of the unit.
    pub unit: CompilationUnit,
    /// Counter behind [`SyntaxTree::fresh_name`]; survives cloning.
    next_temp: u32,
}

impl SyntaxTree {
    pub fn new(interner: SharedInterner) -> Self {
        SyntaxTree {
            interner,
            exprs: Vec::new(),
            stmts: Vec::new(),
            patterns: Vec::new(),
            types: Vec::new(),
            lambdas: Vec::new(),
            local_fns: Vec::new(),
            expr_lists: Vec::new(),
            stmt_lists: Vec::new(),
            pattern_lists: Vec::new(),
            type_lists: Vec::new(),
            params: Vec::new(),
            arms: Vec::new(),
            sections: Vec::new(),
            labels: Vec::new(),
            prop_pats: Vec::new(),
            field_inits: Vec::new(),
            interp_parts: Vec::new(),
            unit: CompilationUnit::default(),
            next_temp: 0,
        }
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    #[inline]
    pub fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Allocate a compiler-reserved name such as `__t3`.
    ///
    /// The counter is per tree and copied by `clone`, so names handed out
    /// by earlier passes are never reused by later ones.
    pub fn fresh_name(&mut self, prefix: &str) -> Name {
        let n = self.next_temp;
        self.next_temp += 1;
        self.interner.intern(&format!("__{prefix}{n}"))
    }

    // Expressions

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::new(to_u32(self.exprs.len(), "expressions"));
        self.exprs.push(Expr::new(kind, span));
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn expr_kind(&self, id: ExprId) -> ExprKind {
        self.exprs[id.index()].kind
    }

    #[inline]
    pub fn expr_span(&self, id: ExprId) -> Span {
        self.exprs[id.index()].span
    }

    /// Overwrite an expression slot, keeping its span.
    pub fn set_expr_kind(&mut self, id: ExprId, kind: ExprKind) {
        self.exprs[id.index()].kind = kind;
    }

    /// Overwrite an expression slot with a copy of another node.
    pub fn replace_expr_with(&mut self, id: ExprId, source: ExprId) {
        self.exprs[id.index()] = self.exprs[source.index()];
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    // Statements

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::new(to_u32(self.stmts.len(), "statements"));
        self.stmts.push(Stmt::new(kind, span));
        id
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    #[inline]
    pub fn stmt_kind(&self, id: StmtId) -> StmtKind {
        self.stmts[id.index()].kind
    }

    #[inline]
    pub fn stmt_span(&self, id: StmtId) -> Span {
        self.stmts[id.index()].span
    }

    pub fn set_stmt_kind(&mut self, id: StmtId, kind: StmtKind) {
        self.stmts[id.index()].kind = kind;
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    // Patterns

    pub fn alloc_pattern(&mut self, kind: PatternKind, span: Span) -> PatternId {
        let id = PatternId::new(to_u32(self.patterns.len(), "patterns"));
        self.patterns.push(Pattern::new(kind, span));
        id
    }

    #[inline]
    pub fn pattern(&self, id: PatternId) -> &Pattern {
        &self.patterns[id.index()]
    }

    #[inline]
    pub fn pattern_kind(&self, id: PatternId) -> PatternKind {
        self.patterns[id.index()].kind
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    // Type syntax

    pub fn alloc_type(&mut self, ty: TypeExpr) -> TypeExprId {
        let id = TypeExprId::new(to_u32(self.types.len(), "type expressions"));
        self.types.push(ty);
        id
    }

    #[inline]
    pub fn type_expr(&self, id: TypeExprId) -> TypeExpr {
        self.types[id.index()]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // Lambdas and local functions

    pub fn alloc_lambda(&mut self, lambda: Lambda) -> LambdaId {
        let id = LambdaId::new(to_u32(self.lambdas.len(), "lambdas"));
        self.lambdas.push(lambda);
        id
    }

    #[inline]
    pub fn lambda(&self, id: LambdaId) -> Lambda {
        self.lambdas[id.index()]
    }

    pub fn set_lambda_body(&mut self, id: LambdaId, body: LambdaBody) {
        self.lambdas[id.index()].body = body;
    }

    pub fn alloc_local_fn(&mut self, func: LocalFunction) -> LocalFnId {
        let id = LocalFnId::new(to_u32(self.local_fns.len(), "local functions"));
        self.local_fns.push(func);
        id
    }

    #[inline]
    pub fn local_fn(&self, id: LocalFnId) -> &LocalFunction {
        &self.local_fns[id.index()]
    }

    pub fn local_fn_count(&self) -> usize {
        self.local_fns.len()
    }

    // Side tables

    side_table!(expr_lists, alloc_exprs, exprs, ExprId, ExprRange, "expression list");
    side_table!(stmt_lists, alloc_stmts, stmts, StmtId, StmtRange, "statement list");
    side_table!(pattern_lists, alloc_patterns, patterns, PatternId, PatternRange, "pattern list");
    side_table!(type_lists, alloc_types, types, TypeExprId, TypeRange, "type list");
    side_table!(params, alloc_params, params, Param, ParamRange, "parameter list");
    side_table!(arms, alloc_arms, arms, SwitchArm, ArmRange, "switch arm list");
    side_table!(sections, alloc_sections, sections, SwitchSection, SectionRange, "switch section list");
    side_table!(labels, alloc_labels, labels, SwitchLabel, LabelRange, "switch label list");
    side_table!(prop_pats, alloc_prop_pats, prop_pats, PropertySubpattern, PropPatRange, "property pattern list");
    side_table!(field_inits, alloc_field_inits, field_inits, FieldInit, FieldInitRange, "initializer list");
    side_table!(interp_parts, alloc_interp_parts, interp_parts, InterpolationPart, InterpPartRange, "interpolation part list");

    // Deep copies

    /// Deep-copy an expression subtree, returning the new root.
    pub fn duplicate_expr(&mut self, id: ExprId) -> ExprId {
        if !id.is_valid() {
            return id;
        }
        let Expr { kind, span } = *self.expr(id);
        let kind = match kind {
            ExprKind::Literal(_)
            | ExprKind::Ident(_)
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::TypeRef(_)
            | ExprKind::MemberBinding(_)
            | ExprKind::Default(_)
            | ExprKind::Declaration { .. }
            | ExprKind::Discard => kind,
            ExprKind::Member { receiver, name } => ExprKind::Member {
                receiver: self.duplicate_expr(receiver),
                name,
            },
            ExprKind::ConditionalAccess { receiver, access } => ExprKind::ConditionalAccess {
                receiver: self.duplicate_expr(receiver),
                access: self.duplicate_expr(access),
            },
            ExprKind::ElementBinding(args) => ExprKind::ElementBinding(self.duplicate_exprs(args)),
            ExprKind::Invocation { callee, args } => ExprKind::Invocation {
                callee: self.duplicate_expr(callee),
                args: self.duplicate_exprs(args),
            },
            ExprKind::Index { receiver, args } => ExprKind::Index {
                receiver: self.duplicate_expr(receiver),
                args: self.duplicate_exprs(args),
            },
            ExprKind::FromEnd(value) => ExprKind::FromEnd(self.duplicate_expr(value)),
            ExprKind::Range { start, end } => ExprKind::Range {
                start: self.duplicate_expr(start),
                end: self.duplicate_expr(end),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: self.duplicate_expr(operand),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: self.duplicate_expr(left),
                right: self.duplicate_expr(right),
            },
            ExprKind::Assign { op, target, value } => ExprKind::Assign {
                op,
                target: self.duplicate_expr(target),
                value: self.duplicate_expr(value),
            },
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => ExprKind::Conditional {
                cond: self.duplicate_expr(cond),
                then_expr: self.duplicate_expr(then_expr),
                else_expr: self.duplicate_expr(else_expr),
            },
            ExprKind::Is { subject, pattern } => ExprKind::Is {
                subject: self.duplicate_expr(subject),
                pattern: self.duplicate_pattern(pattern),
            },
            ExprKind::TypeTest { subject, ty } => ExprKind::TypeTest {
                subject: self.duplicate_expr(subject),
                ty,
            },
            ExprKind::Cast { ty, operand } => ExprKind::Cast {
                ty,
                operand: self.duplicate_expr(operand),
            },
            ExprKind::Seq { effects, value } => ExprKind::Seq {
                effects: self.duplicate_exprs(effects),
                value: self.duplicate_expr(value),
            },
            ExprKind::Lambda(lambda) => ExprKind::Lambda(self.duplicate_lambda(lambda)),
            ExprKind::New { ty, args, inits } => ExprKind::New {
                ty,
                args: self.duplicate_exprs(args),
                inits: self.duplicate_field_inits(inits),
            },
            ExprKind::With { receiver, inits } => ExprKind::With {
                receiver: self.duplicate_expr(receiver),
                inits: self.duplicate_field_inits(inits),
            },
            ExprKind::Collection(items) => ExprKind::Collection(self.duplicate_exprs(items)),
            ExprKind::Spread(value) => ExprKind::Spread(self.duplicate_expr(value)),
            ExprKind::Switch { subject, arms } => {
                let subject = self.duplicate_expr(subject);
                let copies: Vec<SwitchArm> = self
                    .arms(arms)
                    .to_vec()
                    .into_iter()
                    .map(|arm| SwitchArm {
                        pattern: self.duplicate_pattern(arm.pattern),
                        guard: self.duplicate_expr(arm.guard),
                        result: self.duplicate_expr(arm.result),
                        span: arm.span,
                    })
                    .collect();
                ExprKind::Switch {
                    subject,
                    arms: self.alloc_arms(copies),
                }
            }
            ExprKind::Throw(value) => ExprKind::Throw(self.duplicate_expr(value)),
            ExprKind::Tuple(items) => ExprKind::Tuple(self.duplicate_exprs(items)),
            ExprKind::Await(value) => ExprKind::Await(self.duplicate_expr(value)),
            ExprKind::Interpolated(parts) => {
                let copies: Vec<InterpolationPart> = self
                    .interp_parts(parts)
                    .to_vec()
                    .into_iter()
                    .map(|part| match part {
                        InterpolationPart::Text(_) => part,
                        InterpolationPart::Hole {
                            expr,
                            alignment,
                            format,
                        } => InterpolationPart::Hole {
                            expr: self.duplicate_expr(expr),
                            alignment: self.duplicate_expr(alignment),
                            format,
                        },
                    })
                    .collect();
                ExprKind::Interpolated(self.alloc_interp_parts(copies))
            }
            ExprKind::Out(value) => ExprKind::Out(self.duplicate_expr(value)),
            ExprKind::Parenthesized(inner) => ExprKind::Parenthesized(self.duplicate_expr(inner)),
        };
        self.alloc_expr(kind, span)
    }

    pub fn duplicate_exprs(&mut self, range: ExprRange) -> ExprRange {
        let items = self.exprs(range).to_vec();
        let copies: Vec<ExprId> = items.into_iter().map(|e| self.duplicate_expr(e)).collect();
        self.alloc_exprs(copies)
    }

    fn duplicate_field_inits(&mut self, range: FieldInitRange) -> FieldInitRange {
        let items = self.field_inits(range).to_vec();
        let copies: Vec<FieldInit> = items
            .into_iter()
            .map(|init| FieldInit {
                name: init.name,
                value: self.duplicate_expr(init.value),
            })
            .collect();
        self.alloc_field_inits(copies)
    }

    fn duplicate_lambda(&mut self, id: LambdaId) -> LambdaId {
        let lambda = self.lambda(id);
        let params = self.duplicate_params(lambda.params);
        let body = match lambda.body {
            LambdaBody::Expr(e) => LambdaBody::Expr(self.duplicate_expr(e)),
            LambdaBody::Block(s) => LambdaBody::Block(self.duplicate_stmt(s)),
        };
        self.alloc_lambda(Lambda {
            params,
            body,
            is_async: lambda.is_async,
        })
    }

    fn duplicate_params(&mut self, range: ParamRange) -> ParamRange {
        let items = self.params(range).to_vec();
        let copies: Vec<Param> = items
            .into_iter()
            .map(|p| Param {
                default: self.duplicate_expr(p.default),
                ..p
            })
            .collect();
        self.alloc_params(copies)
    }

    pub fn duplicate_body(&mut self, body: Body) -> Body {
        match body {
            Body::None => Body::None,
            Body::Block(s) => Body::Block(self.duplicate_stmt(s)),
            Body::Expr(e) => Body::Expr(self.duplicate_expr(e)),
        }
    }

    /// Deep-copy a statement subtree, returning the new root.
    pub fn duplicate_stmt(&mut self, id: StmtId) -> StmtId {
        if !id.is_valid() {
            return id;
        }
        let Stmt { kind, span } = *self.stmt(id);
        let kind = match kind {
            StmtKind::Block(stmts) => StmtKind::Block(self.duplicate_stmts(stmts)),
            StmtKind::Expr(e) => StmtKind::Expr(self.duplicate_expr(e)),
            StmtKind::Local { ty, name, init } => StmtKind::Local {
                ty,
                name,
                init: self.duplicate_expr(init),
            },
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.duplicate_expr(cond),
                then_branch: self.duplicate_stmt(then_branch),
                else_branch: self.duplicate_stmt(else_branch),
            },
            StmtKind::While { cond, body } => StmtKind::While {
                cond: self.duplicate_expr(cond),
                body: self.duplicate_stmt(body),
            },
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => StmtKind::For {
                init: self.duplicate_stmts(init),
                cond: self.duplicate_expr(cond),
                step: self.duplicate_exprs(step),
                body: self.duplicate_stmt(body),
            },
            StmtKind::Foreach {
                ty,
                name,
                iterable,
                body,
            } => StmtKind::Foreach {
                ty,
                name,
                iterable: self.duplicate_expr(iterable),
                body: self.duplicate_stmt(body),
            },
            StmtKind::Return(e) => StmtKind::Return(self.duplicate_expr(e)),
            StmtKind::Throw(e) => StmtKind::Throw(self.duplicate_expr(e)),
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => kind,
            StmtKind::Switch { subject, sections } => {
                let subject = self.duplicate_expr(subject);
                let items = self.sections(sections).to_vec();
                let copies: Vec<SwitchSection> = items
                    .into_iter()
                    .map(|section| {
                        let labels = self.labels(section.labels).to_vec();
                        let labels: Vec<SwitchLabel> = labels
                            .into_iter()
                            .map(|label| match label {
                                SwitchLabel::Default => SwitchLabel::Default,
                                SwitchLabel::Case { pattern, guard } => SwitchLabel::Case {
                                    pattern: self.duplicate_pattern(pattern),
                                    guard: self.duplicate_expr(guard),
                                },
                            })
                            .collect();
                        SwitchSection {
                            labels: self.alloc_labels(labels),
                            body: self.duplicate_stmts(section.body),
                        }
                    })
                    .collect();
                StmtKind::Switch {
                    subject,
                    sections: self.alloc_sections(copies),
                }
            }
            StmtKind::LocalFunction(id) => {
                let func = self.local_fn(id).clone();
                let params = self.duplicate_params(func.params);
                let body = self.duplicate_body(func.body);
                StmtKind::LocalFunction(self.alloc_local_fn(LocalFunction {
                    params,
                    body,
                    ..func
                }))
            }
        };
        self.alloc_stmt(kind, span)
    }

    pub fn duplicate_stmts(&mut self, range: StmtRange) -> StmtRange {
        let items = self.stmts(range).to_vec();
        let copies: Vec<StmtId> = items.into_iter().map(|s| self.duplicate_stmt(s)).collect();
        self.alloc_stmts(copies)
    }

    /// Deep-copy a pattern subtree, returning the new root.
    pub fn duplicate_pattern(&mut self, id: PatternId) -> PatternId {
        if !id.is_valid() {
            return id;
        }
        let Pattern { kind, span } = *self.pattern(id);
        let kind = match kind {
            PatternKind::Constant(e) => PatternKind::Constant(self.duplicate_expr(e)),
            PatternKind::Declaration { .. }
            | PatternKind::Var(_)
            | PatternKind::Type(_)
            | PatternKind::Discard => kind,
            PatternKind::Recursive {
                ty,
                positional,
                properties,
                designation,
            } => {
                let positional = self.duplicate_patterns(positional);
                let props = self.prop_pats(properties).to_vec();
                let props: Vec<PropertySubpattern> = props
                    .into_iter()
                    .map(|p| PropertySubpattern {
                        pattern: self.duplicate_pattern(p.pattern),
                        path: p.path,
                    })
                    .collect();
                PatternKind::Recursive {
                    ty,
                    positional,
                    properties: self.alloc_prop_pats(props),
                    designation,
                }
            }
            PatternKind::List {
                elements,
                designation,
            } => PatternKind::List {
                elements: self.duplicate_patterns(elements),
                designation,
            },
            PatternKind::Slice(inner) => PatternKind::Slice(self.duplicate_pattern(inner)),
            PatternKind::Relational { op, value } => PatternKind::Relational {
                op,
                value: self.duplicate_expr(value),
            },
            PatternKind::Binary { op, left, right } => PatternKind::Binary {
                op,
                left: self.duplicate_pattern(left),
                right: self.duplicate_pattern(right),
            },
            PatternKind::Not(inner) => PatternKind::Not(self.duplicate_pattern(inner)),
            PatternKind::Parenthesized(inner) => {
                PatternKind::Parenthesized(self.duplicate_pattern(inner))
            }
        };
        self.alloc_pattern(kind, span)
    }

    fn duplicate_patterns(&mut self, range: PatternRange) -> PatternRange {
        let items = self.patterns(range).to_vec();
        let copies: Vec<PatternId> = items
            .into_iter()
            .map(|p| self.duplicate_pattern(p))
            .collect();
        self.alloc_patterns(copies)
    }
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("exprs", &self.exprs.len())
            .field("stmts", &self.stmts.len())
            .field("patterns", &self.patterns.len())
            .field("types", &self.unit.types.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

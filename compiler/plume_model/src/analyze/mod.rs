//! Scoped walk that records types, symbols and constants for one tree.
//!
//! The walk is a light-weight binder, not a type checker: it resolves names
//! through lexical scopes and the type table, propagates expected types
//! downward (locals, assignments, returns, arguments, arms) and records
//! what it learns. Anything it cannot resolve stays `TypeId::UNKNOWN`.

mod expr;
mod fold;
mod pattern;

use rustc_hash::FxHashMap;

use plume_ir::ast::{
    Body, LambdaBody, Member, MemberKind, Modifiers, ParamModifier, StmtKind, SwitchLabel,
    TypeDecl, TypeExpr,
};
use plume_ir::stack::ensure_sufficient_stack;
use plume_ir::{
    ConstValue, ExprId, Name, NodeRef, ParamRange, StmtId, Symbol, SymbolInfo, SymbolKind,
    SyntaxTree, TypeExprId, TypeId, TypeInfo,
};

use crate::table::TypeTable;

/// Everything the walk learned about a tree.
#[derive(Default)]
pub(crate) struct Facts {
    pub(crate) types: Vec<TypeInfo>,
    pub(crate) symbols: FxHashMap<ExprId, SymbolInfo>,
    pub(crate) declared: FxHashMap<NodeRef, Symbol>,
    pub(crate) constants: FxHashMap<ExprId, ConstValue>,
}

/// Where a name is being resolved from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Context {
    /// Field and property initializers, base-call and constructor
    /// initializer arguments: primary parameters shadow members.
    Initializer,
    /// Member bodies: members shadow primary parameters.
    Body,
}

/// Expected and observed result type of the innermost function body.
struct ReturnFrame {
    expected: TypeId,
    observed: Option<TypeId>,
}

pub(crate) struct Analyzer<'a> {
    tree: &'a SyntaxTree,
    table: &'a mut TypeTable,
    facts: Facts,
    scopes: Vec<FxHashMap<Name, Symbol>>,
    current_type: Option<TypeId>,
    context: Context,
    returns: Vec<ReturnFrame>,
    /// Receivers of the enclosing conditional accesses, innermost last.
    receivers: Vec<TypeId>,
    static_imports: Vec<TypeId>,
    const_fields: FxHashMap<(TypeId, Name), ConstValue>,
}

impl<'a> Analyzer<'a> {
    pub(crate) fn run(tree: &'a SyntaxTree, table: &'a mut TypeTable) -> Facts {
        let mut analyzer = Analyzer {
            tree,
            table,
            facts: Facts {
                types: vec![TypeInfo::UNKNOWN; tree.expr_count()],
                ..Facts::default()
            },
            scopes: Vec::new(),
            current_type: None,
            context: Context::Body,
            returns: Vec::new(),
            receivers: Vec::new(),
            static_imports: Vec::new(),
            const_fields: FxHashMap::default(),
        };
        analyzer.collect_imports();
        analyzer.collect_const_fields();
        for decl in &tree.unit.types {
            let ty = analyzer.declared_type(decl);
            analyzer.type_decl(decl, ty);
        }
        analyzer.facts
    }

    fn declared_type(&self, decl: &TypeDecl) -> TypeId {
        if decl.type_params.is_empty() {
            return self.table.lookup(decl.name).unwrap_or(TypeId::UNKNOWN);
        }
        // Generic definitions are analyzed against their open form.
        self.table.generic_definition(decl.name).unwrap_or(TypeId::UNKNOWN)
    }

    fn collect_imports(&mut self) {
        for using in &self.tree.unit.usings {
            if !using.is_static {
                continue;
            }
            if let Some(ty) = self.table.lookup(using.path) {
                self.static_imports.push(ty);
            }
        }
    }

    fn collect_const_fields(&mut self) {
        let tree = self.tree;
        for decl in &tree.unit.types {
            let ty = self.declared_type(decl);
            for member in &decl.members {
                if !member.modifiers.contains(Modifiers::CONST) {
                    continue;
                }
                if let MemberKind::Field { name, init, .. } = member.kind {
                    if let Some(value) = fold::fold(tree, init, &|_| None) {
                        self.const_fields.insert((ty, name), value);
                    }
                }
            }
        }
    }

    // Scopes

    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: Name, kind: SymbolKind, ty: TypeId) -> Symbol {
        let symbol = Symbol {
            name,
            kind,
            ty,
            container: None,
            is_static: false,
        };
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, symbol);
        }
        symbol
    }

    fn declare_params(&mut self, params: ParamRange, kind: SymbolKind) {
        let tree = self.tree;
        for param in tree.params(params) {
            let ty = self.table.bound(param.ty);
            if param.default.is_valid() {
                self.expr(param.default, ty);
            }
            self.declare(param.name, kind, ty);
        }
    }

    fn lookup_local(&self, name: Name) -> Option<Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }

    fn lookup_primary(&self, name: Name) -> Option<Symbol> {
        let ty = self.current_type?;
        let &(_, param_ty) = self
            .table
            .primary_params(ty)
            .iter()
            .find(|(n, _)| *n == name)?;
        Some(Symbol {
            name,
            kind: SymbolKind::PrimaryParameter,
            ty: param_ty,
            container: Some(ty),
            is_static: false,
        })
    }

    /// Members of the current type named `name`.
    fn lookup_own_members(&self, name: Name, arity: Option<usize>) -> SymbolInfo {
        match self.current_type {
            Some(ty) => self.member_symbols(ty, name, arity, None),
            None => SymbolInfo::default(),
        }
    }

    /// Resolve `name` on `ty` to a symbol, choosing between overloads by
    /// argument count when `arity` is known.
    fn member_symbols(
        &self,
        ty: TypeId,
        name: Name,
        arity: Option<usize>,
        statics: Option<bool>,
    ) -> SymbolInfo {
        let candidates: Vec<Symbol> = self
            .table
            .candidates(ty, name)
            .into_iter()
            .filter(|(_, m)| statics.map_or(true, |s| s == m.is_static))
            .filter(|(_, m)| {
                arity.map_or(true, |n| m.kind != SymbolKind::Method || m.params.len() == n)
            })
            .map(|(owner, m)| Symbol {
                name,
                kind: m.kind,
                ty: m.ty,
                container: Some(owner),
                is_static: m.is_static,
            })
            .collect();
        match candidates.as_slice() {
            [] => SymbolInfo::default(),
            [only] => SymbolInfo::resolved(*only),
            _ => SymbolInfo {
                symbol: None,
                candidates,
            },
        }
    }

    /// Simple-name resolution in the current context.
    fn resolve_name(&self, name: Name, arity: Option<usize>) -> SymbolInfo {
        if let Some(local) = self.lookup_local(name) {
            return SymbolInfo::resolved(local);
        }
        if self.context == Context::Initializer {
            if let Some(param) = self.lookup_primary(name) {
                return SymbolInfo::resolved(param);
            }
        }
        let own = self.lookup_own_members(name, arity);
        if own.symbol.is_some() || !own.candidates.is_empty() {
            return own;
        }
        if let Some(param) = self.lookup_primary(name) {
            return SymbolInfo::resolved(param);
        }
        let mut imported: Vec<Symbol> = Vec::new();
        for &ty in &self.static_imports {
            let found = self.member_symbols(ty, name, arity, Some(true));
            imported.extend(found.symbol);
            imported.extend(found.candidates);
        }
        match imported.as_slice() {
            [] => {}
            [only] => return SymbolInfo::resolved(*only),
            _ => {
                return SymbolInfo {
                    symbol: None,
                    candidates: imported,
                }
            }
        }
        if let Some(ty) = self.table.lookup(name).or_else(|| self.table.type_param(name)) {
            return SymbolInfo::resolved(Symbol {
                name,
                kind: SymbolKind::Type,
                ty,
                container: None,
                is_static: true,
            });
        }
        SymbolInfo::default()
    }

    // Declarations

    fn type_decl(&mut self, decl: &'a TypeDecl, ty: TypeId) {
        self.current_type = Some(ty);
        let tree = self.tree;
        self.context = Context::Initializer;
        self.push_scope();
        if let Some(params) = decl.primary_params {
            for param in tree.params(params) {
                if param.default.is_valid() {
                    let expected = self.table.bound(param.ty);
                    self.expr(param.default, expected);
                }
            }
        }
        if let Some(args) = decl.base_args {
            let base = decl.bases.first().map_or(TypeId::UNKNOWN, |&b| self.table.bound(b));
            let expected: Vec<TypeId> = self.table.primary_params(base).iter().map(|p| p.1).collect();
            for (i, &arg) in tree.exprs(args).iter().enumerate() {
                let ty = expected.get(i).copied().unwrap_or(TypeId::UNKNOWN);
                self.expr(arg, ty);
            }
        }
        self.pop_scope();
        for member in &decl.members {
            self.member(member);
        }
        self.current_type = None;
    }

    fn member(&mut self, member: &'a Member) {
        self.scopes.clear();
        self.push_scope();
        match &member.kind {
            MemberKind::Field { ty, init, .. } => {
                if init.is_valid() {
                    self.context = Context::Initializer;
                    let expected = self.table.bound(*ty);
                    self.expr(*init, expected);
                }
            }
            MemberKind::Property {
                ty,
                getter,
                setter,
                init,
                ..
            } => {
                let prop_ty = self.table.bound(*ty);
                if init.is_valid() {
                    self.context = Context::Initializer;
                    self.expr(*init, prop_ty);
                }
                self.context = Context::Body;
                if let Some(body) = getter {
                    self.body(*body, prop_ty);
                }
                if let Some(body) = setter {
                    self.push_scope();
                    let value = self.table.name("value");
                    self.declare(value, SymbolKind::Parameter, prop_ty);
                    self.body(*body, TypeId::VOID);
                    self.pop_scope();
                }
            }
            MemberKind::Method {
                params, ret, body, ..
            }
            | MemberKind::Operator {
                params, ret, body, ..
            } => {
                self.context = Context::Body;
                self.declare_params(*params, SymbolKind::Parameter);
                let ret = self.table.bound(*ret);
                self.body(*body, ret);
            }
            MemberKind::Constructor {
                params,
                initializer,
                body,
            } => {
                self.context = Context::Body;
                self.declare_params(*params, SymbolKind::Parameter);
                if let Some(init) = initializer {
                    self.context = Context::Initializer;
                    let tree = self.tree;
                    for &arg in tree.exprs(init.args) {
                        self.expr(arg, TypeId::UNKNOWN);
                    }
                    self.context = Context::Body;
                }
                self.body(*body, TypeId::VOID);
            }
        }
        self.scopes.clear();
    }

    fn body(&mut self, body: Body, ret: TypeId) {
        self.returns.push(ReturnFrame {
            expected: ret,
            observed: None,
        });
        match body {
            Body::None => {}
            Body::Block(stmt) => self.stmt(stmt),
            Body::Expr(e) => {
                let expected = if ret == TypeId::VOID {
                    TypeId::UNKNOWN
                } else {
                    ret
                };
                self.expr(e, expected);
            }
        }
        self.returns.pop();
    }

    /// Analyze a lambda or local-function body and return the observed
    /// result type when the expected one is unknown.
    fn function_body(&mut self, body: LambdaBody, ret: TypeId) -> TypeId {
        self.returns.push(ReturnFrame {
            expected: ret,
            observed: None,
        });
        let result = match body {
            LambdaBody::Expr(e) => {
                let expected = if ret == TypeId::VOID {
                    TypeId::UNKNOWN
                } else {
                    ret
                };
                let ty = self.expr(e, expected);
                if ret.is_unknown() {
                    ty
                } else {
                    ret
                }
            }
            LambdaBody::Block(s) => {
                self.stmt(s);
                if ret.is_unknown() {
                    self.returns
                        .last()
                        .and_then(|frame| frame.observed)
                        .unwrap_or(TypeId::VOID)
                } else {
                    ret
                }
            }
        };
        self.returns.pop();
        result
    }

    fn bind_or(&self, ty: TypeExprId, fallback: TypeId) -> TypeId {
        if !ty.is_valid() || matches!(self.tree.type_expr(ty), TypeExpr::Var) {
            return fallback;
        }
        self.table.bound(ty)
    }

    // Statements

    fn stmt(&mut self, id: StmtId) {
        ensure_sufficient_stack(|| self.stmt_inner(id));
    }

    fn stmt_inner(&mut self, id: StmtId) {
        let tree = self.tree;
        match tree.stmt_kind(id) {
            StmtKind::Block(stmts) => {
                self.push_scope();
                for &stmt in tree.stmts(stmts) {
                    if let StmtKind::LocalFunction(func) = tree.stmt_kind(stmt) {
                        self.declare_local_fn(stmt, func);
                    }
                }
                for &stmt in tree.stmts(stmts) {
                    self.stmt(stmt);
                }
                self.pop_scope();
            }
            StmtKind::Expr(e) => {
                self.expr(e, TypeId::UNKNOWN);
            }
            StmtKind::Local { ty, name, init } => {
                let declared = self.bind_or(ty, TypeId::UNKNOWN);
                let init_ty = if init.is_valid() {
                    self.expr(init, declared)
                } else {
                    TypeId::UNKNOWN
                };
                let local_ty = if declared.is_unknown() && init_ty != TypeId::NULL {
                    init_ty
                } else {
                    declared
                };
                let symbol = self.declare(name, SymbolKind::Local, local_ty);
                self.facts.declared.insert(NodeRef::Stmt(id), symbol);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond, TypeId::BOOL);
                self.branch(then_branch);
                if else_branch.is_valid() {
                    self.branch(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond, TypeId::BOOL);
                self.branch(body);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.push_scope();
                for &stmt in tree.stmts(init) {
                    self.stmt(stmt);
                }
                if cond.is_valid() {
                    self.expr(cond, TypeId::BOOL);
                }
                for &e in tree.exprs(step) {
                    self.expr(e, TypeId::UNKNOWN);
                }
                self.branch(body);
                self.pop_scope();
            }
            StmtKind::Foreach {
                ty,
                name,
                iterable,
                body,
            } => {
                let iterable_ty = self.expr(iterable, TypeId::UNKNOWN);
                let element = self.table.element_of(iterable_ty);
                let var_ty = self.bind_or(ty, element);
                self.push_scope();
                let symbol = self.declare(name, SymbolKind::Local, var_ty);
                self.facts.declared.insert(NodeRef::Stmt(id), symbol);
                self.branch(body);
                self.pop_scope();
            }
            StmtKind::Return(e) => {
                let expected = self
                    .returns
                    .last()
                    .map_or(TypeId::UNKNOWN, |frame| frame.expected);
                if e.is_valid() {
                    let expected = if expected == TypeId::VOID {
                        TypeId::UNKNOWN
                    } else {
                        expected
                    };
                    let ty = self.expr(e, expected);
                    if let Some(frame) = self.returns.last_mut() {
                        if frame.observed.is_none() && ty != TypeId::NULL {
                            frame.observed = Some(ty);
                        }
                    }
                }
            }
            StmtKind::Throw(e) => {
                if e.is_valid() {
                    self.expr(e, TypeId::UNKNOWN);
                }
            }
            StmtKind::Switch { subject, sections } => {
                let subject_ty = self.expr(subject, TypeId::UNKNOWN);
                for section in tree.sections(sections) {
                    self.push_scope();
                    for label in tree.labels(section.labels) {
                        if let SwitchLabel::Case { pattern, guard } = *label {
                            self.pattern(pattern, subject_ty);
                            if guard.is_valid() {
                                self.expr(guard, TypeId::BOOL);
                            }
                        }
                    }
                    for &stmt in tree.stmts(section.body) {
                        self.stmt(stmt);
                    }
                    self.pop_scope();
                }
            }
            StmtKind::LocalFunction(func) => {
                let func = tree.local_fn(func);
                let ret = self.table.bound(func.ret);
                self.push_scope();
                self.declare_params(func.params, SymbolKind::Parameter);
                match func.body {
                    Body::None => {}
                    Body::Block(s) => {
                        self.function_body(LambdaBody::Block(s), ret);
                    }
                    Body::Expr(e) => {
                        self.function_body(LambdaBody::Expr(e), ret);
                    }
                }
                self.pop_scope();
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    /// Statement in its own scope, such as an `if` branch or loop body.
    fn branch(&mut self, id: StmtId) {
        self.push_scope();
        self.stmt(id);
        self.pop_scope();
    }

    fn declare_local_fn(&mut self, stmt: StmtId, func: plume_ir::LocalFnId) {
        let tree = self.tree;
        let func = tree.local_fn(func);
        let ret = self.table.bound(func.ret);
        let mut signature: Vec<TypeId> = Vec::new();
        for param in tree.params(func.params) {
            let ty = self.table.bound(param.ty);
            signature.push(if param.modifier == ParamModifier::None {
                ty
            } else {
                TypeId::UNKNOWN
            });
        }
        let ty = self.delegate_type(signature, ret);
        let symbol = self.declare(func.name, SymbolKind::LocalFunction, ty);
        self.facts.declared.insert(NodeRef::Stmt(stmt), symbol);
    }

    /// `Func<params.., ret>` or `Action<params..>`.
    fn delegate_type(&mut self, mut params: Vec<TypeId>, ret: TypeId) -> TypeId {
        if ret == TypeId::VOID {
            self.table.instantiate_name("Action", &params)
        } else {
            params.push(ret);
            self.table.instantiate_name("Func", &params)
        }
    }

    // Recording

    fn record(&mut self, id: ExprId, ty: TypeId, expected: TypeId) -> TypeId {
        let converted = if expected.is_unknown()
            || expected == TypeId::VOID
            || !self.table.classify(ty, expected).is_implicit()
        {
            ty
        } else {
            expected
        };
        if let Some(slot) = self.facts.types.get_mut(id.index()) {
            *slot = TypeInfo { ty, converted };
        }
        ty
    }
}

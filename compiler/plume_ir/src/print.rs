//! Syntax printer.
//!
//! Renders a tree back to source text: the text form handed to the
//! downstream emitter and stored in the rewrite cache. Output uses
//! four-space indentation and braces on their own lines. Parentheses are
//! inserted from operator precedence, so synthesized nodes never need
//! explicit `Parenthesized` wrappers.

use crate::ast::{
    Body, CtorTarget, ExprKind, InterpolationPart, LambdaBody, Literal, Member, MemberKind,
    Modifiers, ParamModifier, PatternKind, PatternOp, StmtKind, SwitchLabel, TypeDecl, TypeExpr,
    UnaryOp,
};
use crate::stack::ensure_sufficient_stack;
use crate::{ExprId, ExprRange, ParamRange, PatternId, StmtId, StmtRange, SyntaxTree, TypeExprId};

/// Precedence of primary expressions.
const PRIMARY: u8 = 17;
/// Precedence of prefix unary expressions and casts.
const UNARY: u8 = 16;
const RANGE: u8 = 15;
/// `switch` and `with` expressions.
const SWITCH: u8 = 14;
const RELATIONAL: u8 = 10;
const COALESCE: u8 = 3;
const CONDITIONAL: u8 = 2;
/// Assignment, lambdas and throw expressions.
const LOWEST: u8 = 1;

/// Render a whole compilation unit.
pub fn print_unit(tree: &SyntaxTree) -> String {
    let mut p = Printer::new(tree);
    p.unit();
    p.out
}

/// Render a single expression.
pub fn print_expr(tree: &SyntaxTree, id: ExprId) -> String {
    let mut p = Printer::new(tree);
    p.expr(id, LOWEST);
    p.out
}

/// Render a single statement without trailing newline.
pub fn print_stmt(tree: &SyntaxTree, id: StmtId) -> String {
    let mut p = Printer::new(tree);
    p.stmt(id);
    let trimmed = p.out.trim_end().len();
    p.out.truncate(trimmed);
    p.out
}

pub fn print_pattern(tree: &SyntaxTree, id: PatternId) -> String {
    let mut p = Printer::new(tree);
    p.pattern(id, 0);
    p.out
}

pub fn print_type(tree: &SyntaxTree, id: TypeExprId) -> String {
    let mut p = Printer::new(tree);
    p.ty(id);
    p.out
}

struct Printer<'a> {
    tree: &'a SyntaxTree,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn new(tree: &'a SyntaxTree) -> Self {
        Printer {
            tree,
            out: String::new(),
            indent: 0,
        }
    }

    fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn name(&mut self, name: crate::Name) {
        let s = self.tree.name_str(name);
        self.out.push_str(s);
    }

    // Declarations

    fn unit(&mut self) {
        let tree = self.tree;
        let unit = &tree.unit;
        for using in &unit.usings {
            self.write(if using.is_static {
                "using static "
            } else {
                "using "
            });
            self.name(using.path);
            self.write(";\n");
        }
        if !unit.usings.is_empty() {
            self.write("\n");
        }
        if let Some(ns) = unit.namespace {
            self.write("namespace ");
            self.name(ns);
            self.write(";\n\n");
        }
        for (i, decl) in unit.types.iter().enumerate() {
            if i > 0 {
                self.write("\n");
            }
            self.type_decl(decl);
        }
    }

    fn modifiers(&mut self, modifiers: Modifiers) {
        for (flag, keyword) in Modifiers::KEYWORDS {
            if modifiers.contains(flag) {
                self.write(keyword);
                self.write(" ");
            }
        }
    }

    fn type_params(&mut self, params: &[crate::Name]) {
        if params.is_empty() {
            return;
        }
        self.write("<");
        for (i, &param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.name(param);
        }
        self.write(">");
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.write_indent();
        self.modifiers(decl.modifiers);
        self.write(decl.kind.keyword());
        self.write(" ");
        self.name(decl.name);
        self.type_params(&decl.type_params);
        if let Some(params) = decl.primary_params {
            self.params(params);
        }
        for (i, &base) in decl.bases.iter().enumerate() {
            self.write(if i == 0 { " : " } else { ", " });
            self.ty(base);
            if i == 0 {
                if let Some(args) = decl.base_args {
                    self.write("(");
                    self.expr_list(args);
                    self.write(")");
                }
            }
        }
        self.write("\n");
        self.write_indent();
        self.write("{\n");
        self.indent += 1;
        for (i, member) in decl.members.iter().enumerate() {
            if i > 0 {
                self.write("\n");
            }
            self.member(decl, member);
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}\n");
    }

    fn member(&mut self, decl: &TypeDecl, member: &Member) {
        self.write_indent();
        self.modifiers(member.modifiers);
        match &member.kind {
            MemberKind::Field { ty, name, init } => {
                self.ty(*ty);
                self.write(" ");
                self.name(*name);
                self.initializer(*init);
                self.write(";\n");
            }
            MemberKind::Property {
                ty,
                name,
                getter,
                setter,
                init,
            } => {
                self.ty(*ty);
                self.write(" ");
                self.name(*name);
                self.property_accessors(*getter, *setter);
                if init.is_valid() {
                    self.initializer(*init);
                    self.write(";");
                }
                self.write("\n");
            }
            MemberKind::Method {
                name,
                type_params,
                params,
                ret,
                body,
            } => {
                self.ty(*ret);
                self.write(" ");
                self.name(*name);
                self.type_params(type_params);
                self.params(*params);
                self.body(*body);
            }
            MemberKind::Constructor {
                params,
                initializer,
                body,
            } => {
                self.name(decl.name);
                self.params(*params);
                if let Some(init) = initializer {
                    self.write(match init.target {
                        CtorTarget::Base => " : base(",
                        CtorTarget::This => " : this(",
                    });
                    self.expr_list(init.args);
                    self.write(")");
                }
                self.body(*body);
            }
            MemberKind::Operator {
                op,
                params,
                ret,
                body,
            } => {
                self.ty(*ret);
                self.write(" operator ");
                self.write(op.symbol());
                self.params(*params);
                self.body(*body);
            }
        }
    }

    fn initializer(&mut self, init: ExprId) {
        if init.is_valid() {
            self.write(" = ");
            self.expr(init, LOWEST);
        }
    }

    fn property_accessors(&mut self, getter: Option<Body>, setter: Option<Body>) {
        if let (Some(Body::Expr(e)), None) = (getter, setter) {
            self.write(" => ");
            self.expr(e, LOWEST);
            self.write(";");
            return;
        }
        let simple = |b: Option<Body>| matches!(b, None | Some(Body::None | Body::Expr(_)));
        if simple(getter) && simple(setter) {
            self.write(" {");
            for (keyword, accessor) in [("get", getter), ("set", setter)] {
                match accessor {
                    None => {}
                    Some(Body::Expr(e)) => {
                        self.write(" ");
                        self.write(keyword);
                        self.write(" => ");
                        self.expr(e, LOWEST);
                        self.write(";");
                    }
                    Some(_) => {
                        self.write(" ");
                        self.write(keyword);
                        self.write(";");
                    }
                }
            }
            self.write(" }");
            return;
        }
        self.write("\n");
        self.write_indent();
        self.write("{\n");
        self.indent += 1;
        for (keyword, accessor) in [("get", getter), ("set", setter)] {
            if let Some(body) = accessor {
                self.write_indent();
                self.write(keyword);
                self.body(body);
            }
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn params(&mut self, params: ParamRange) {
        self.write("(");
        let tree = self.tree;
        for (i, param) in tree.params(params).iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(match param.modifier {
                ParamModifier::None => "",
                ParamModifier::Out => "out ",
                ParamModifier::Ref => "ref ",
                ParamModifier::In => "in ",
                ParamModifier::Params => "params ",
            });
            if param.ty.is_valid() {
                self.ty(param.ty);
                self.write(" ");
            }
            self.name(param.name);
            self.initializer(param.default);
        }
        self.write(")");
    }

    /// Member or local-function body, including the trailing newline.
    fn body(&mut self, body: Body) {
        match body {
            Body::None => self.write(";\n"),
            Body::Expr(e) => {
                self.write(" => ");
                self.expr(e, LOWEST);
                self.write(";\n");
            }
            Body::Block(s) => {
                self.write("\n");
                self.write_indent();
                self.block_braces(s);
                self.write("\n");
            }
        }
    }

    // Statements

    /// `{ ... }` for a block statement, ending at the closing brace.
    fn block_braces(&mut self, id: StmtId) {
        self.write("{\n");
        self.indent += 1;
        match self.tree.stmt_kind(id) {
            StmtKind::Block(stmts) => self.stmt_list(stmts),
            _ => self.stmt(id),
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn stmt_list(&mut self, stmts: StmtRange) {
        let tree = self.tree;
        for &stmt in tree.stmts(stmts) {
            self.stmt(stmt);
        }
    }

    /// Statement at the current indentation, ending with a newline.
    fn stmt(&mut self, id: StmtId) {
        ensure_sufficient_stack(|| {
            self.write_indent();
            self.stmt_body(id);
        });
    }

    /// Statement nested under `if`/`while`/`for`: blocks stay at the
    /// current level, single statements are indented.
    fn embedded(&mut self, id: StmtId) {
        if matches!(self.tree.stmt_kind(id), StmtKind::Block(_)) {
            self.stmt(id);
        } else {
            self.indent += 1;
            self.stmt(id);
            self.indent -= 1;
        }
    }

    fn stmt_body(&mut self, id: StmtId) {
        match self.tree.stmt_kind(id) {
            StmtKind::Block(_) => {
                self.block_braces(id);
                self.write("\n");
            }
            StmtKind::Expr(_) | StmtKind::Local { .. } => {
                self.stmt_inline(id);
                self.write(";\n");
            }
            StmtKind::If { .. } => self.if_chain(id),
            StmtKind::While { cond, body } => {
                self.write("while (");
                self.expr(cond, LOWEST);
                self.write(")\n");
                self.embedded(body);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.write("for (");
                let tree = self.tree;
                for (i, &s) in tree.stmts(init).iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.stmt_inline(s);
                }
                self.write(";");
                if cond.is_valid() {
                    self.write(" ");
                    self.expr(cond, LOWEST);
                }
                self.write(";");
                if !step.is_empty() {
                    self.write(" ");
                    self.expr_list(step);
                }
                self.write(")\n");
                self.embedded(body);
            }
            StmtKind::Foreach {
                ty,
                name,
                iterable,
                body,
            } => {
                self.write("foreach (");
                self.ty(ty);
                self.write(" ");
                self.name(name);
                self.write(" in ");
                self.expr(iterable, LOWEST);
                self.write(")\n");
                self.embedded(body);
            }
            StmtKind::Return(value) => {
                self.write("return");
                if value.is_valid() {
                    self.write(" ");
                    self.expr(value, LOWEST);
                }
                self.write(";\n");
            }
            StmtKind::Throw(value) => {
                self.write("throw");
                if value.is_valid() {
                    self.write(" ");
                    self.expr(value, LOWEST);
                }
                self.write(";\n");
            }
            StmtKind::Break => self.write("break;\n"),
            StmtKind::Continue => self.write("continue;\n"),
            StmtKind::Empty => self.write(";\n"),
            StmtKind::Switch { subject, sections } => {
                self.write("switch (");
                self.expr(subject, LOWEST);
                self.write(")\n");
                self.write_indent();
                self.write("{\n");
                self.indent += 1;
                let tree = self.tree;
                for section in tree.sections(sections) {
                    let tree = self.tree;
                    for label in tree.labels(section.labels) {
                        self.write_indent();
                        match *label {
                            SwitchLabel::Default => self.write("default:\n"),
                            SwitchLabel::Case { pattern, guard } => {
                                self.write("case ");
                                self.pattern(pattern, 0);
                                if guard.is_valid() {
                                    self.write(" when ");
                                    self.expr(guard, LOWEST);
                                }
                                self.write(":\n");
                            }
                        }
                    }
                    self.indent += 1;
                    self.stmt_list(section.body);
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}\n");
            }
            StmtKind::LocalFunction(func) => {
                let tree = self.tree;
                let func = tree.local_fn(func);
                self.ty(func.ret);
                self.write(" ");
                self.name(func.name);
                self.type_params(&func.type_params);
                self.params(func.params);
                self.body(func.body);
            }
        }
    }

    /// Expression or local declaration without the trailing `;`.
    fn stmt_inline(&mut self, id: StmtId) {
        match self.tree.stmt_kind(id) {
            StmtKind::Expr(e) => self.expr(e, LOWEST),
            StmtKind::Local { ty, name, init } => {
                self.ty(ty);
                self.write(" ");
                self.name(name);
                self.initializer(init);
            }
            _ => {
                let text = print_stmt(self.tree, id);
                self.write(&text);
            }
        }
    }

    fn if_chain(&mut self, id: StmtId) {
        let StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } = self.tree.stmt_kind(id)
        else {
            return;
        };
        self.write("if (");
        self.expr(cond, LOWEST);
        self.write(")\n");
        self.embedded(then_branch);
        if else_branch.is_valid() {
            self.write_indent();
            if matches!(self.tree.stmt_kind(else_branch), StmtKind::If { .. }) {
                self.write("else ");
                ensure_sufficient_stack(|| self.if_chain(else_branch));
            } else {
                self.write("else\n");
                self.embedded(else_branch);
            }
        }
    }

    // Expressions

    fn precedence(&self, id: ExprId) -> u8 {
        match self.tree.expr_kind(id) {
            ExprKind::Assign { .. } | ExprKind::Lambda(_) | ExprKind::Throw(_) => LOWEST,
            ExprKind::Conditional { .. } => CONDITIONAL,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Is { .. } | ExprKind::TypeTest { .. } => RELATIONAL,
            ExprKind::Switch { .. } | ExprKind::With { .. } => SWITCH,
            ExprKind::Range { .. } => RANGE,
            ExprKind::Unary { .. }
            | ExprKind::Cast { .. }
            | ExprKind::FromEnd(_)
            | ExprKind::Await(_)
            | ExprKind::Spread(_) => UNARY,
            ExprKind::Literal(Literal::Int(n)) if n < 0 => UNARY,
            _ => PRIMARY,
        }
    }

    /// Print `id`, parenthesized if it binds looser than `min`.
    fn expr(&mut self, id: ExprId, min: u8) {
        ensure_sufficient_stack(|| {
            if self.precedence(id) < min {
                self.write("(");
                self.expr_kind(id);
                self.write(")");
            } else {
                self.expr_kind(id);
            }
        });
    }

    fn expr_list(&mut self, list: ExprRange) {
        let tree = self.tree;
        for (i, &e) in tree.exprs(list).iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expr(e, LOWEST);
        }
    }

    fn literal(&mut self, lit: Literal) {
        match lit {
            Literal::Int(n) => self.write(&n.to_string()),
            Literal::Float(bits) => {
                let value = f64::from_bits(bits);
                let mut text = format!("{value}");
                if value.is_finite() && !text.contains(['.', 'e', 'E']) {
                    text.push_str(".0");
                }
                self.write(&text);
            }
            Literal::Bool(b) => self.write(if b { "true" } else { "false" }),
            Literal::Char(c) => {
                self.write("'");
                let escaped = escape_char(c, '\'');
                self.write(&escaped);
                self.write("'");
            }
            Literal::Str(s) => {
                self.write("\"");
                let escaped = escape_str(self.tree.name_str(s), '"');
                self.write(&escaped);
                self.write("\"");
            }
            Literal::Null => self.write("null"),
        }
    }

    fn expr_kind(&mut self, id: ExprId) {
        match self.tree.expr_kind(id) {
            ExprKind::Literal(lit) => self.literal(lit),
            ExprKind::Ident(name) => self.name(name),
            ExprKind::This => self.write("this"),
            ExprKind::Base => self.write("base"),
            ExprKind::TypeRef(ty) => self.ty(ty),
            ExprKind::Member { receiver, name } => {
                self.expr(receiver, PRIMARY);
                self.write(".");
                self.name(name);
            }
            ExprKind::ConditionalAccess { receiver, access } => {
                self.expr(receiver, PRIMARY);
                self.write("?");
                self.expr(access, PRIMARY);
            }
            ExprKind::MemberBinding(name) => {
                self.write(".");
                self.name(name);
            }
            ExprKind::ElementBinding(args) => {
                self.write("[");
                self.expr_list(args);
                self.write("]");
            }
            ExprKind::Invocation { callee, args } => {
                self.expr(callee, PRIMARY);
                self.write("(");
                self.expr_list(args);
                self.write(")");
            }
            ExprKind::Index { receiver, args } => {
                self.expr(receiver, PRIMARY);
                self.write("[");
                self.expr_list(args);
                self.write("]");
            }
            ExprKind::FromEnd(value) => {
                self.write("^");
                self.expr(value, UNARY);
            }
            ExprKind::Range { start, end } => {
                if start.is_valid() {
                    self.expr(start, UNARY);
                }
                self.write("..");
                if end.is_valid() {
                    self.expr(end, UNARY);
                }
            }
            ExprKind::Unary { op, operand } => {
                self.write(op.symbol());
                let nested_minus = op == UnaryOp::Neg
                    && matches!(
                        self.tree.expr_kind(operand),
                        ExprKind::Unary {
                            op: UnaryOp::Neg,
                            ..
                        } | ExprKind::Literal(Literal::Int(i64::MIN..=-1))
                    );
                self.expr(operand, if nested_minus { PRIMARY } else { UNARY });
            }
            ExprKind::Binary { op, left, right } => {
                let p = op.precedence();
                let (lmin, rmin) = if op.is_right_assoc() {
                    (p + 1, p)
                } else {
                    (p, p + 1)
                };
                self.expr(left, lmin);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.expr(right, rmin);
            }
            ExprKind::Assign { op, target, value } => {
                self.expr(target, UNARY);
                self.write(" ");
                if let Some(op) = op {
                    self.write(op.symbol());
                }
                self.write("= ");
                self.expr(value, LOWEST);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expr(cond, COALESCE);
                self.write(" ? ");
                self.expr(then_expr, LOWEST);
                self.write(" : ");
                self.expr(else_expr, LOWEST);
            }
            ExprKind::Is { subject, pattern } => {
                self.expr(subject, RELATIONAL);
                self.write(" is ");
                self.pattern(pattern, 0);
            }
            ExprKind::TypeTest { subject, ty } => {
                self.expr(subject, RELATIONAL);
                self.write(" is ");
                self.ty(ty);
            }
            ExprKind::Cast { ty, operand } => {
                self.write("(");
                self.ty(ty);
                self.write(")");
                self.expr(operand, UNARY);
            }
            ExprKind::Seq { effects, value } => {
                self.write("(");
                let tree = self.tree;
                for &effect in tree.exprs(effects) {
                    self.expr(effect, LOWEST);
                    self.write(", ");
                }
                self.expr(value, LOWEST);
                self.write(")");
            }
            ExprKind::Lambda(lambda) => {
                let lambda = self.tree.lambda(lambda);
                if lambda.is_async {
                    self.write("async ");
                }
                self.params(lambda.params);
                self.write(" =>");
                match lambda.body {
                    LambdaBody::Expr(e) => {
                        self.write(" ");
                        self.expr(e, LOWEST);
                    }
                    LambdaBody::Block(s) => {
                        self.write("\n");
                        self.write_indent();
                        self.block_braces(s);
                    }
                }
            }
            ExprKind::New { ty, args, inits } => {
                self.write("new ");
                self.ty(ty);
                self.write("(");
                self.expr_list(args);
                self.write(")");
                if !inits.is_empty() {
                    self.field_inits(inits);
                }
            }
            ExprKind::With { receiver, inits } => {
                self.expr(receiver, SWITCH + 1);
                self.write(" with");
                self.field_inits(inits);
            }
            ExprKind::Collection(items) => {
                self.write("[");
                self.expr_list(items);
                self.write("]");
            }
            ExprKind::Spread(value) => {
                self.write("..");
                self.expr(value, UNARY);
            }
            ExprKind::Switch { subject, arms } => {
                self.expr(subject, RANGE);
                self.write(" switch\n");
                self.write_indent();
                self.write("{\n");
                self.indent += 1;
                let tree = self.tree;
                for arm in tree.arms(arms) {
                    self.write_indent();
                    self.pattern(arm.pattern, 0);
                    if arm.guard.is_valid() {
                        self.write(" when ");
                        self.expr(arm.guard, LOWEST);
                    }
                    self.write(" => ");
                    self.expr(arm.result, LOWEST);
                    self.write(",\n");
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}");
            }
            ExprKind::Throw(value) => {
                self.write("throw ");
                self.expr(value, LOWEST);
            }
            ExprKind::Default(ty) => {
                self.write("default");
                if ty.is_valid() {
                    self.write("(");
                    self.ty(ty);
                    self.write(")");
                }
            }
            ExprKind::Tuple(items) => {
                self.write("(");
                self.expr_list(items);
                self.write(")");
            }
            ExprKind::Await(value) => {
                self.write("await ");
                self.expr(value, UNARY);
            }
            ExprKind::Interpolated(parts) => {
                self.write("$\"");
                let tree = self.tree;
                for part in tree.interp_parts(parts) {
                    match *part {
                        InterpolationPart::Text(text) => {
                            let escaped = escape_str(self.tree.name_str(text), '"')
                                .replace('{', "{{")
                                .replace('}', "}}");
                            self.write(&escaped);
                        }
                        InterpolationPart::Hole {
                            expr,
                            alignment,
                            format,
                        } => {
                            self.write("{");
                            self.expr(expr, CONDITIONAL + 1);
                            if alignment.is_valid() {
                                self.write(",");
                                self.expr(alignment, LOWEST);
                            }
                            if !format.is_empty() {
                                self.write(":");
                                self.name(format);
                            }
                            self.write("}");
                        }
                    }
                }
                self.write("\"");
            }
            ExprKind::Declaration { ty, name } => {
                self.ty(ty);
                self.write(" ");
                self.name(name);
            }
            ExprKind::Discard => self.write("_"),
            ExprKind::Out(value) => {
                self.write("out ");
                self.expr(value, PRIMARY);
            }
            ExprKind::Parenthesized(inner) => {
                self.write("(");
                self.expr(inner, LOWEST);
                self.write(")");
            }
        }
    }

    fn field_inits(&mut self, inits: crate::FieldInitRange) {
        self.write(" {");
        let tree = self.tree;
        for (i, init) in tree.field_inits(inits).iter().enumerate() {
            self.write(if i == 0 { " " } else { ", " });
            self.name(init.name);
            self.write(" = ");
            self.expr(init.value, LOWEST);
        }
        self.write(" }");
    }

    // Patterns

    fn pattern_precedence(&self, id: PatternId) -> u8 {
        match self.tree.pattern_kind(id) {
            PatternKind::Binary {
                op: PatternOp::Or, ..
            } => 1,
            PatternKind::Binary {
                op: PatternOp::And, ..
            } => 2,
            PatternKind::Not(_) => 3,
            _ => 4,
        }
    }

    fn pattern(&mut self, id: PatternId, min: u8) {
        let wrap = self.pattern_precedence(id) < min;
        if wrap {
            self.write("(");
        }
        match self.tree.pattern_kind(id) {
            PatternKind::Constant(e) => self.expr(e, RELATIONAL + 1),
            PatternKind::Declaration { ty, name } => {
                self.ty(ty);
                self.write(" ");
                self.name(name);
            }
            PatternKind::Var(name) => {
                self.write("var ");
                self.name(name);
            }
            PatternKind::Recursive {
                ty,
                positional,
                properties,
                designation,
            } => {
                if ty.is_valid() {
                    self.ty(ty);
                }
                if !positional.is_empty() {
                    self.write("(");
                    let tree = self.tree;
                    for (i, &p) in tree.patterns(positional).iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.pattern(p, 0);
                    }
                    self.write(")");
                }
                if !properties.is_empty() || positional.is_empty() {
                    if ty.is_valid() || !positional.is_empty() {
                        self.write(" ");
                    }
                    self.write("{");
                    let tree = self.tree;
                    for (i, prop) in tree.prop_pats(properties).iter().enumerate() {
                        self.write(if i == 0 { " " } else { ", " });
                        for (j, &segment) in prop.path.iter().enumerate() {
                            if j > 0 {
                                self.write(".");
                            }
                            self.name(segment);
                        }
                        self.write(": ");
                        self.pattern(prop.pattern, 0);
                    }
                    self.write(" }");
                }
                if !designation.is_empty() {
                    self.write(" ");
                    self.name(designation);
                }
            }
            PatternKind::List {
                elements,
                designation,
            } => {
                self.write("[");
                let tree = self.tree;
                for (i, &p) in tree.patterns(elements).iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.pattern(p, 0);
                }
                self.write("]");
                if !designation.is_empty() {
                    self.write(" ");
                    self.name(designation);
                }
            }
            PatternKind::Slice(inner) => {
                self.write("..");
                if inner.is_valid() {
                    self.write(" ");
                    self.pattern(inner, 4);
                }
            }
            PatternKind::Relational { op, value } => {
                self.write(op.to_binary().symbol());
                self.write(" ");
                self.expr(value, RELATIONAL + 1);
            }
            PatternKind::Type(ty) => self.ty(ty),
            PatternKind::Binary { op, left, right } => {
                let p = self.pattern_precedence(id);
                self.pattern(left, p);
                self.write(" ");
                self.write(op.keyword());
                self.write(" ");
                self.pattern(right, p + 1);
            }
            PatternKind::Not(inner) => {
                self.write("not ");
                self.pattern(inner, 3);
            }
            PatternKind::Discard => self.write("_"),
            PatternKind::Parenthesized(inner) => {
                self.write("(");
                self.pattern(inner, 0);
                self.write(")");
            }
        }
        if wrap {
            self.write(")");
        }
    }

    // Types

    fn ty(&mut self, id: TypeExprId) {
        if !id.is_valid() {
            self.write("var");
            return;
        }
        match self.tree.type_expr(id) {
            TypeExpr::Named { name, args } => {
                self.name(name);
                if !args.is_empty() {
                    self.write("<");
                    let tree = self.tree;
                    for (i, &arg) in tree.types(args).iter().enumerate() {
                        if i > 0 {
                            self.write(", ");
                        }
                        self.ty(arg);
                    }
                    self.write(">");
                }
            }
            TypeExpr::Array(element) => {
                self.ty(element);
                self.write("[]");
            }
            TypeExpr::Nullable(inner) => {
                self.ty(inner);
                self.write("?");
            }
            TypeExpr::Tuple(elements) => {
                self.write("(");
                let tree = self.tree;
                for (i, &element) in tree.types(elements).iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.ty(element);
                }
                self.write(")");
            }
            TypeExpr::Var => self.write("var"),
            TypeExpr::Dynamic => self.write("dynamic"),
            TypeExpr::Void => self.write("void"),
        }
    }
}

fn escape_char(c: char, quote: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\0' => "\\0".to_string(),
        c if c == quote => format!("\\{c}"),
        c => c.to_string(),
    }
}

fn escape_str(s: &str, quote: char) -> String {
    s.chars().map(|c| escape_char(c, quote)).collect()
}

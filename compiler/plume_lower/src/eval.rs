//! Reference interpreter for lowered trees.
//!
//! Tests lower a unit, then run it here to check that the lowered program
//! behaves like the source. Only the target subset is understood: any sugar
//! that survived lowering is a fault, not a silent misevaluation.
//!
//! Integers follow 32-bit wrapping arithmetic. Struct values are copied on
//! every store. The library covers what lowering emits (`List<T>`, `Index`,
//! `Range`, `object.Equals`, `string.Format`, exceptions) plus `Console`
//! and `Math` for test programs.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hasher;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use plume_ir::ast::{
    BinaryOp, Body, CtorInitializer, CtorTarget, ExprKind, LambdaBody, Literal, MemberKind, ParamModifier,
    PatternKind, StmtKind, SwitchLabel, TypeDecl, TypeDeclKind, TypeExpr, UnaryOp,
};
use plume_ir::{ExprId, ExprRange, Name, ParamRange, SectionRange, StmtId, SyntaxTree, TypeExprId};

const MAX_DEPTH: usize = 256;

/// Runtime value.
#[derive(Clone, Debug)]
pub(crate) enum Value {
    Null,
    Int(i64),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(Rc<str>),
    Object(Rc<Object>),
    List(Rc<List>),
    Tuple(Rc<[Value]>),
    Closure(Rc<Closure>),
    /// Static receiver such as `Console` or `string`.
    Type(Name),
}

impl Value {
    pub(crate) fn str(text: &str) -> Self {
        Value::Str(Rc::from(text))
    }

    pub(crate) fn array(items: Vec<Value>) -> Self {
        Value::List(Rc::new(List {
            items: RefCell::new(items),
            is_array: true,
        }))
    }

    fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(List {
            items: RefCell::new(items),
            is_array: false,
        }))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => {
                a.is_array == b.is_array && *a.items.borrow() == *b.items.borrow()
            }
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Object {
    class: Name,
    fields: RefCell<FxHashMap<Name, Value>>,
    is_struct: bool,
    id: u32,
}

#[derive(Debug)]
pub(crate) struct List {
    items: RefCell<Vec<Value>>,
    is_array: bool,
}

pub(crate) struct Closure {
    params: Vec<Name>,
    body: LambdaBody,
    env: Env,
    frame: Frame,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({} params)", self.params.len())
    }
}

type Env = Rc<Scope>;

#[derive(Default)]
struct Scope {
    vars: RefCell<FxHashMap<Name, Value>>,
    parent: Option<Env>,
}

impl Scope {
    fn root() -> Env {
        Rc::new(Scope::default())
    }

    fn child(parent: &Env) -> Env {
        Rc::new(Scope {
            vars: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    fn declare(&self, name: Name, value: Value) {
        self.vars.borrow_mut().insert(name, value);
    }

    fn lookup(&self, name: Name) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(&name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    fn assign(&self, name: Name, value: Value) -> bool {
        if let Some(slot) = self.vars.borrow_mut().get_mut(&name) {
            *slot = value;
            return true;
        }
        self.parent.as_ref().is_some_and(|parent| parent.assign(name, value))
    }
}

/// Receiver and declaring type of the code being run.
#[derive(Clone, Debug)]
struct Frame {
    this: Value,
    class: Option<Name>,
}

/// Non-local exits.
#[derive(Debug)]
enum Flow {
    Return(Value),
    Break,
    Continue,
    Throw(Value),
    /// The tree is outside the subset this interpreter runs.
    Fault(String),
}

type Exec<T> = Result<T, Flow>;

fn fault<T>(message: impl Into<String>) -> Exec<T> {
    Err(Flow::Fault(message.into()))
}

/// Result of a call, with the parameter scope for `out` write-back.
struct Outcome {
    value: Value,
    params: Option<(ParamRange, Env)>,
}

impl Outcome {
    fn returned(value: Value) -> Self {
        Outcome { value, params: None }
    }
}

/// Built-in exception hierarchy.
fn builtin_base(class: &str) -> Option<&'static str> {
    match class {
        "SwitchExpressionException" => Some("InvalidOperationException"),
        "InvalidOperationException"
        | "ArgumentNullException"
        | "NullReferenceException"
        | "InvalidCastException"
        | "IndexOutOfRangeException"
        | "DivideByZeroException" => Some("Exception"),
        _ => None,
    }
}

fn is_builtin_type(name: &str) -> bool {
    matches!(
        name,
        "object"
            | "int"
            | "long"
            | "double"
            | "bool"
            | "char"
            | "string"
            | "List"
            | "IEnumerable"
            | "Func"
            | "Action"
            | "Index"
            | "Range"
            | "Console"
            | "Math"
            | "Exception"
    ) || builtin_base(name).is_some()
}

fn wrap(value: i64) -> i64 {
    i64::from(value as i32)
}

#[derive(Copy, Clone)]
enum Num {
    Int(i64),
    Double(f64),
}

fn number(value: &Value) -> Option<Num> {
    match *value {
        Value::Int(v) => Some(Num::Int(v)),
        Value::Double(v) => Some(Num::Double(v)),
        Value::Char(c) => Some(Num::Int(i64::from(u32::from(c)))),
        _ => None,
    }
}

fn as_double(num: Num) -> f64 {
    match num {
        Num::Int(v) => v as f64,
        Num::Double(v) => v,
    }
}

pub(crate) struct Interpreter<'t> {
    tree: &'t SyntaxTree,
    classes: FxHashMap<Name, &'t TypeDecl>,
    statics: FxHashMap<(Name, Name), Value>,
    initialized: FxHashSet<Name>,
    output: String,
    depth: usize,
    next_id: u32,
}

impl<'t> Interpreter<'t> {
    pub(crate) fn new(tree: &'t SyntaxTree) -> Self {
        let classes = tree.unit.types.iter().map(|decl| (decl.name, decl)).collect();
        Interpreter {
            tree,
            classes,
            statics: FxHashMap::default(),
            initialized: FxHashSet::default(),
            output: String::new(),
            depth: 0,
            next_id: 1,
        }
    }

    /// Text written through `Console`.
    pub(crate) fn output(&self) -> &str {
        &self.output
    }

    /// Run a static method and return its result.
    ///
    /// Uncaught exceptions come back as `uncaught <Type>: <Message>`.
    pub(crate) fn call_static(&mut self, class: &str, method: &str, args: Vec<Value>) -> Result<Value, String> {
        let class = self.tree.intern(class);
        let method = self.tree.intern(method);
        let result = self.call_method(Value::Type(class), method, args, None);
        match result {
            Ok(outcome) => Ok(outcome.value),
            Err(Flow::Throw(value)) => Err(self.describe_exception(&value)),
            Err(Flow::Fault(message)) => Err(message),
            Err(Flow::Return(_) | Flow::Break | Flow::Continue) => Err("control flow escaped a method".to_owned()),
        }
    }

    fn describe_exception(&self, value: &Value) -> String {
        let Value::Object(object) = value else {
            return "uncaught non-object".to_owned();
        };
        let class = self.tree.name_str(object.class);
        let message = self.tree.intern("Message");
        match object.fields.borrow().get(&message) {
            Some(Value::Str(text)) => format!("uncaught {class}: {text}"),
            _ => format!("uncaught {class}"),
        }
    }

    fn name(&self, name: Name) -> &'static str {
        self.tree.name_str(name)
    }

    // Statements

    fn exec(&mut self, id: StmtId, env: &Env, frame: &Frame) -> Exec<()> {
        let tree = self.tree;
        match tree.stmt_kind(id) {
            StmtKind::Block(list) => {
                let inner = Scope::child(env);
                for &stmt in tree.stmts(list) {
                    self.exec(stmt, &inner, frame)?;
                }
                Ok(())
            }
            StmtKind::Expr(expr) => self.eval(expr, env, frame).map(drop),
            StmtKind::Local { ty, name, init } => {
                let value = if init.is_valid() {
                    let value = self.eval(init, env, frame)?;
                    self.convert_to(ty, value)
                } else {
                    self.default_of(ty)
                };
                env.declare(name, self.copy_struct(value));
                Ok(())
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.truthy(cond, env, frame)? {
                    self.exec(then_branch, env, frame)
                } else if else_branch.is_valid() {
                    self.exec(else_branch, env, frame)
                } else {
                    Ok(())
                }
            }
            StmtKind::While { cond, body } => {
                while self.truthy(cond, env, frame)? {
                    match self.exec(body, env, frame) {
                        Err(Flow::Break) => break,
                        Ok(()) | Err(Flow::Continue) => {}
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let inner = Scope::child(env);
                for &stmt in tree.stmts(init) {
                    self.exec(stmt, &inner, frame)?;
                }
                loop {
                    if cond.is_valid() && !self.truthy(cond, &inner, frame)? {
                        break;
                    }
                    match self.exec(body, &inner, frame) {
                        Err(Flow::Break) => break,
                        Ok(()) | Err(Flow::Continue) => {}
                        Err(other) => return Err(other),
                    }
                    for &expr in tree.exprs(step) {
                        self.eval(expr, &inner, frame)?;
                    }
                }
                Ok(())
            }
            StmtKind::Foreach {
                name, iterable, body, ..
            } => {
                let source = self.eval(iterable, env, frame)?;
                for item in self.iterate(&source)? {
                    let inner = Scope::child(env);
                    inner.declare(name, item);
                    match self.exec(body, &inner, frame) {
                        Err(Flow::Break) => break,
                        Ok(()) | Err(Flow::Continue) => {}
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            StmtKind::Return(value) => {
                let value = if value.is_valid() {
                    self.eval(value, env, frame)?
                } else {
                    Value::Null
                };
                Err(Flow::Return(value))
            }
            StmtKind::Break => Err(Flow::Break),
            StmtKind::Continue => Err(Flow::Continue),
            StmtKind::Throw(value) => {
                if !value.is_valid() {
                    return fault("rethrow outside a catch");
                }
                let value = self.eval(value, env, frame)?;
                Err(Flow::Throw(value))
            }
            StmtKind::Switch { subject, sections } => self.exec_switch(subject, sections, env, frame),
            StmtKind::LocalFunction(_) => fault("local function survived lowering"),
            StmtKind::Empty => Ok(()),
        }
    }

    /// Switch over constant labels.
    fn exec_switch(
        &mut self,
        subject: ExprId,
        sections: SectionRange,
        env: &Env,
        frame: &Frame,
    ) -> Exec<()> {
        let tree = self.tree;
        let value = self.eval(subject, env, frame)?;
        let sections = tree.sections(sections);
        let mut chosen = None;
        let mut default = None;
        'sections: for (index, section) in sections.iter().enumerate() {
            for &label in tree.labels(section.labels) {
                match label {
                    SwitchLabel::Default => default = default.or(Some(index)),
                    SwitchLabel::Case { pattern, guard } => {
                        let PatternKind::Constant(constant) = tree.pattern_kind(pattern) else {
                            return fault("pattern label survived lowering");
                        };
                        let constant = self.eval(constant, env, frame)?;
                        if self.raw_eq(&value, &constant)
                            && (!guard.is_valid() || self.truthy(guard, env, frame)?)
                        {
                            chosen = Some(index);
                            break 'sections;
                        }
                    }
                }
            }
        }
        let Some(index) = chosen.or(default) else {
            return Ok(());
        };
        let inner = Scope::child(env);
        for &stmt in tree.stmts(sections[index].body) {
            match self.exec(stmt, &inner, frame) {
                Err(Flow::Break) => return Ok(()),
                other => other?,
            }
        }
        Ok(())
    }

    fn iterate(&mut self, source: &Value) -> Exec<Vec<Value>> {
        match source {
            Value::List(list) => Ok(list.items.borrow().clone()),
            Value::Str(text) => Ok(text.chars().map(Value::Char).collect()),
            Value::Null => self.throw("NullReferenceException", "Object reference not set to an instance of an object."),
            other => fault(format!("cannot iterate over {other:?}")),
        }
    }

    // Expressions

    fn truthy(&mut self, id: ExprId, env: &Env, frame: &Frame) -> Exec<bool> {
        match self.eval(id, env, frame)? {
            Value::Bool(b) => Ok(b),
            other => fault(format!("condition is not a bool: {other:?}")),
        }
    }

    fn eval_list(&mut self, range: ExprRange, env: &Env, frame: &Frame) -> Exec<Vec<Value>> {
        let tree = self.tree;
        tree.exprs(range)
            .iter()
            .map(|&expr| self.eval(expr, env, frame))
            .collect()
    }

    fn eval(&mut self, id: ExprId, env: &Env, frame: &Frame) -> Exec<Value> {
        let tree = self.tree;
        match tree.expr_kind(id) {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Int(v) => Value::Int(v),
                Literal::Float(bits) => Value::Double(f64::from_bits(bits)),
                Literal::Bool(b) => Value::Bool(b),
                Literal::Char(c) => Value::Char(c),
                Literal::Str(text) => Value::str(tree.name_str(text)),
                Literal::Null => Value::Null,
            }),
            ExprKind::Ident(name) => self.read_name(name, env, frame),
            ExprKind::This | ExprKind::Base => Ok(frame.this.clone()),
            ExprKind::TypeRef(ty) => match tree.type_expr(ty) {
                TypeExpr::Named { name, .. } => Ok(Value::Type(name)),
                other => fault(format!("type {other:?} used as a receiver")),
            },
            ExprKind::Member { receiver, name } => {
                let target = self.eval(receiver, env, frame)?;
                self.get_member(target, name)
            }
            ExprKind::Invocation { callee, args } => self.eval_call(callee, args, env, frame),
            ExprKind::Index { receiver, args } => {
                let target = self.eval(receiver, env, frame)?;
                let args = self.eval_list(args, env, frame)?;
                self.get_index(&target, &args)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand, env, frame)?;
                match (op, value) {
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(wrap(v.wrapping_neg()))),
                    (UnaryOp::Neg, Value::Double(v)) => Ok(Value::Double(-v)),
                    (UnaryOp::BitNot, Value::Int(v)) => Ok(Value::Int(wrap(!v))),
                    (op, value) => fault(format!("cannot apply {op:?} to {value:?}")),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let lhs = self.eval(left, env, frame)?;
                match op {
                    BinaryOp::And if matches!(lhs, Value::Bool(false)) => return Ok(lhs),
                    BinaryOp::Or if matches!(lhs, Value::Bool(true)) => return Ok(lhs),
                    BinaryOp::Coalesce if matches!(lhs, Value::Null) => return self.eval(right, env, frame),
                    BinaryOp::Coalesce => return Ok(lhs),
                    _ => {}
                }
                let rhs = self.eval(right, env, frame)?;
                self.binary(op, lhs, rhs)
            }
            ExprKind::Assign { op, target, value } => {
                let value = match op {
                    None => self.eval(value, env, frame)?,
                    Some(op) => {
                        let current = self.eval(target, env, frame)?;
                        let rhs = self.eval(value, env, frame)?;
                        self.binary(op, current, rhs)?
                    }
                };
                self.store(target, value.clone(), env, frame)?;
                Ok(value)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.truthy(cond, env, frame)? {
                    self.eval(then_expr, env, frame)
                } else {
                    self.eval(else_expr, env, frame)
                }
            }
            ExprKind::TypeTest { subject, ty } => {
                let value = self.eval(subject, env, frame)?;
                Ok(Value::Bool(self.is_instance(&value, ty)))
            }
            ExprKind::Cast { ty, operand } => {
                let value = self.eval(operand, env, frame)?;
                self.cast(ty, value)
            }
            ExprKind::Seq { effects, value } => {
                for &effect in tree.exprs(effects) {
                    self.eval(effect, env, frame)?;
                }
                self.eval(value, env, frame)
            }
            ExprKind::Lambda(lambda) => {
                let lambda = tree.lambda(lambda);
                Ok(Value::Closure(Rc::new(Closure {
                    params: tree.params(lambda.params).iter().map(|p| p.name).collect(),
                    body: lambda.body,
                    env: Rc::clone(env),
                    frame: frame.clone(),
                })))
            }
            ExprKind::New { ty, args, inits } => {
                let args = self.eval_list(args, env, frame)?;
                let created = self.construct(ty, args)?;
                for init in tree.field_inits(inits) {
                    let value = self.eval(init.value, env, frame)?;
                    self.set_member(&created, init.name, value)?;
                }
                Ok(created)
            }
            ExprKind::Collection(items) => Ok(Value::array(self.eval_list(items, env, frame)?)),
            ExprKind::Throw(value) => {
                let value = self.eval(value, env, frame)?;
                Err(Flow::Throw(value))
            }
            ExprKind::Default(ty) => Ok(if ty.is_valid() {
                self.default_of(ty)
            } else {
                Value::Null
            }),
            ExprKind::Tuple(items) => Ok(Value::Tuple(self.eval_list(items, env, frame)?.into())),
            ExprKind::Out(inner) | ExprKind::Parenthesized(inner) => self.eval(inner, env, frame),
            other => fault(format!("{other:?} survived lowering")),
        }
    }

    fn read_name(&mut self, name: Name, env: &Env, frame: &Frame) -> Exec<Value> {
        if let Some(value) = env.lookup(name) {
            return Ok(value);
        }
        if let Value::Object(object) = &frame.this {
            if let Some(value) = object.fields.borrow().get(&name) {
                return Ok(value.clone());
            }
        }
        if let Some(class) = frame.class {
            if self.has_static(class, name) {
                return self.get_member(Value::Type(class), name);
            }
        }
        let text = self.name(name);
        if self.classes.contains_key(&name) || is_builtin_type(text) {
            return Ok(Value::Type(name));
        }
        fault(format!("unbound name `{text}`"))
    }

    fn store(&mut self, target: ExprId, value: Value, env: &Env, frame: &Frame) -> Exec<()> {
        let tree = self.tree;
        let value = self.copy_struct(value);
        match tree.expr_kind(target) {
            ExprKind::Ident(name) => {
                if env.assign(name, value.clone()) {
                    return Ok(());
                }
                match (&frame.this, frame.class) {
                    (Value::Object(_), _) => self.set_member(&frame.this, name, value),
                    (_, Some(class)) => self.set_member(&Value::Type(class), name, value),
                    _ => fault(format!("assignment to unbound name `{}`", self.name(name))),
                }
            }
            ExprKind::Member { receiver, name } => {
                let target = self.eval(receiver, env, frame)?;
                self.set_member(&target, name, value)
            }
            ExprKind::Index { receiver, args } => {
                let target = self.eval(receiver, env, frame)?;
                let args = self.eval_list(args, env, frame)?;
                match (&target, args.as_slice()) {
                    (Value::List(list), [Value::Int(i)]) => {
                        let len = list.items.borrow().len();
                        match usize::try_from(*i).ok().filter(|&i| i < len) {
                            Some(i) => {
                                list.items.borrow_mut()[i] = value;
                                Ok(())
                            }
                            None => self.throw("IndexOutOfRangeException", "Index was outside the bounds of the array."),
                        }
                    }
                    _ => fault("unsupported indexed store"),
                }
            }
            ExprKind::Parenthesized(inner) | ExprKind::Out(inner) => self.store(inner, value, env, frame),
            ExprKind::Discard => Ok(()),
            other => fault(format!("cannot assign to {other:?}")),
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Exec<Value> {
        match op {
            BinaryOp::Eq => return self.operator_eq(lhs, rhs, false),
            BinaryOp::NotEq => return self.operator_eq(lhs, rhs, true),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => return Ok(rhs),
            BinaryOp::Add if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) => {
                let mut text = self.display(&lhs)?;
                text.push_str(&self.display(&rhs)?);
                return Ok(Value::str(&text));
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if let (Value::Bool(a), Value::Bool(b)) = (&lhs, &rhs) {
                    return Ok(Value::Bool(match op {
                        BinaryOp::BitAnd => a & b,
                        BinaryOp::BitOr => a | b,
                        _ => a ^ b,
                    }));
                }
            }
            _ => {}
        }
        let (Some(a), Some(b)) = (number(&lhs), number(&rhs)) else {
            return fault(format!("cannot apply {op:?} to {lhs:?} and {rhs:?}"));
        };
        if let (Num::Int(a), Num::Int(b)) = (a, b) {
            let value = match op {
                BinaryOp::Add => Value::Int(wrap(a.wrapping_add(b))),
                BinaryOp::Sub => Value::Int(wrap(a.wrapping_sub(b))),
                BinaryOp::Mul => Value::Int(wrap(a.wrapping_mul(b))),
                BinaryOp::Div | BinaryOp::Mod if b == 0 => {
                    return self.throw("DivideByZeroException", "Attempted to divide by zero.");
                }
                BinaryOp::Div => Value::Int(wrap(a / b)),
                BinaryOp::Mod => Value::Int(wrap(a % b)),
                BinaryOp::Lt => Value::Bool(a < b),
                BinaryOp::LtEq => Value::Bool(a <= b),
                BinaryOp::Gt => Value::Bool(a > b),
                BinaryOp::GtEq => Value::Bool(a >= b),
                BinaryOp::BitAnd => Value::Int(a & b),
                BinaryOp::BitOr => Value::Int(a | b),
                BinaryOp::BitXor => Value::Int(a ^ b),
                _ => return fault(format!("unexpected integer operator {op:?}")),
            };
            return Ok(value);
        }
        let (a, b) = (as_double(a), as_double(b));
        Ok(match op {
            BinaryOp::Add => Value::Double(a + b),
            BinaryOp::Sub => Value::Double(a - b),
            BinaryOp::Mul => Value::Double(a * b),
            BinaryOp::Div => Value::Double(a / b),
            BinaryOp::Mod => Value::Double(a % b),
            BinaryOp::Lt => Value::Bool(a < b),
            BinaryOp::LtEq => Value::Bool(a <= b),
            BinaryOp::Gt => Value::Bool(a > b),
            BinaryOp::GtEq => Value::Bool(a >= b),
            _ => return fault(format!("unexpected floating operator {op:?}")),
        })
    }

    /// `==` and `!=`, through user operators when the operand type has one.
    fn operator_eq(&mut self, lhs: Value, rhs: Value, negate: bool) -> Exec<Value> {
        let wanted = if negate { BinaryOp::NotEq } else { BinaryOp::Eq };
        let class = match (&lhs, &rhs) {
            (Value::Object(o), _) | (_, Value::Object(o)) => Some(o.class),
            _ => None,
        };
        if let Some(class) = class {
            if let Some((owner, params, body)) = self.find_operator(class, wanted) {
                let outcome = self.run_member(owner, params, body, Value::Null, vec![lhs, rhs])?;
                return Ok(outcome.value);
            }
            if negate {
                if let Some((owner, params, body)) = self.find_operator(class, BinaryOp::Eq) {
                    let outcome = self.run_member(owner, params, body, Value::Null, vec![lhs, rhs])?;
                    return match outcome.value {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => fault(format!("operator == returned {other:?}")),
                    };
                }
            }
        }
        Ok(Value::Bool(self.raw_eq(&lhs, &rhs) != negate))
    }

    /// Built-in equality: values by content, objects by identity.
    fn raw_eq(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| self.raw_eq(x, y))
            }
            _ => match (number(lhs), number(rhs)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
                (Some(a), Some(b)) => as_double(a) == as_double(b),
                _ => lhs == rhs,
            },
        }
    }

    /// `object.Equals(a, b)`.
    fn object_equals(&mut self, lhs: Value, rhs: Value) -> Exec<bool> {
        if self.reference_equals(&lhs, &rhs) {
            return Ok(true);
        }
        if matches!(lhs, Value::Null) || matches!(rhs, Value::Null) {
            return Ok(false);
        }
        let equals = self.tree.intern("Equals");
        match self.call_method(lhs, equals, vec![rhs], None)?.value {
            Value::Bool(b) => Ok(b),
            other => fault(format!("Equals returned {other:?}")),
        }
    }

    fn reference_equals(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }

    // Members

    fn get_member(&mut self, target: Value, name: Name) -> Exec<Value> {
        let text = self.name(name);
        match &target {
            Value::Type(class) => {
                let class = *class;
                if self.classes.contains_key(&class) {
                    self.ensure_statics(class)?;
                    if let Some(value) = self.statics.get(&(class, name)) {
                        return Ok(value.clone());
                    }
                    if let Some((owner, body)) = self.find_getter(class, name) {
                        return Ok(self.run_member(owner, ParamRange::EMPTY, body, Value::Null, Vec::new())?.value);
                    }
                }
                fault(format!("no static member `{text}` on `{}`", self.name(class)))
            }
            Value::Null => match text {
                "HasValue" => Ok(Value::Bool(false)),
                _ => self.throw("NullReferenceException", "Object reference not set to an instance of an object."),
            },
            Value::Str(s) if text == "Length" => Ok(Value::Int(s.chars().count() as i64)),
            Value::List(list) if matches!(text, "Count" | "Length") => Ok(Value::Int(list.items.borrow().len() as i64)),
            Value::Tuple(items) => {
                let index = text
                    .strip_prefix("Item")
                    .and_then(|n| n.parse::<usize>().ok())
                    .and_then(|n| n.checked_sub(1));
                match index.and_then(|i| items.get(i)) {
                    Some(value) => Ok(value.clone()),
                    None => fault(format!("tuple has no member `{text}`")),
                }
            }
            Value::Object(object) => {
                if let Some(value) = object.fields.borrow().get(&name) {
                    return Ok(value.clone());
                }
                if let Some((owner, body)) = self.find_getter(object.class, name) {
                    return Ok(self.run_member(owner, ParamRange::EMPTY, body, target.clone(), Vec::new())?.value);
                }
                fault(format!("no member `{text}` on `{}`", self.name(object.class)))
            }
            Value::Int(_) | Value::Double(_) | Value::Bool(_) | Value::Char(_) if text == "Value" => Ok(target.clone()),
            _ if text == "HasValue" => Ok(Value::Bool(true)),
            other => fault(format!("no member `{text}` on {other:?}")),
        }
    }

    fn set_member(&mut self, target: &Value, name: Name, value: Value) -> Exec<()> {
        let value = self.copy_struct(value);
        match target {
            Value::Object(object) => {
                if let Some((owner, body)) = self.find_setter(object.class, name) {
                    let env = Scope::root();
                    env.declare(self.tree.intern("value"), value);
                    self.run_body(owner, body, target.clone(), env)?;
                } else {
                    object.fields.borrow_mut().insert(name, value);
                }
                Ok(())
            }
            Value::Type(class) => {
                self.ensure_statics(*class)?;
                self.statics.insert((*class, name), value);
                Ok(())
            }
            Value::Null => self.throw("NullReferenceException", "Object reference not set to an instance of an object."),
            other => fault(format!("cannot set `{}` on {other:?}", self.name(name))),
        }
    }

    fn get_index(&mut self, target: &Value, args: &[Value]) -> Exec<Value> {
        match (target, args) {
            (Value::List(list), [Value::Int(i)]) => {
                let item = usize::try_from(*i).ok().and_then(|i| list.items.borrow().get(i).cloned());
                match item {
                    Some(item) => Ok(item),
                    None => self.throw("IndexOutOfRangeException", "Index was outside the bounds of the array."),
                }
            }
            (Value::Str(text), [Value::Int(i)]) => {
                match usize::try_from(*i).ok().and_then(|i| text.chars().nth(i)) {
                    Some(c) => Ok(Value::Char(c)),
                    None => self.throw("IndexOutOfRangeException", "Index was outside the bounds of the array."),
                }
            }
            (Value::Null, _) => self.throw("NullReferenceException", "Object reference not set to an instance of an object."),
            _ => fault(format!("unsupported indexer on {target:?}")),
        }
    }

    fn has_static(&self, class: Name, name: Name) -> bool {
        self.classes.get(&class).is_some_and(|decl| {
            decl.members
                .iter()
                .any(|m| m.is_static() && m.kind.name() == Some(name))
        })
    }

    /// Evaluate the static field initializers of `class` once.
    fn ensure_statics(&mut self, class: Name) -> Exec<()> {
        if !self.initialized.insert(class) {
            return Ok(());
        }
        let Some(decl) = self.classes.get(&class).copied() else {
            return Ok(());
        };
        let frame = Frame {
            this: Value::Null,
            class: Some(class),
        };
        for member in decl.members.iter().filter(|m| m.is_static()) {
            let (ty, name, init) = match member.kind {
                MemberKind::Field { ty, name, init } => (ty, name, init),
                MemberKind::Property {
                    ty,
                    name,
                    getter: Some(Body::None),
                    init,
                    ..
                } => (ty, name, init),
                _ => continue,
            };
            let value = if init.is_valid() {
                let value = self.eval(init, &Scope::root(), &frame)?;
                self.convert_to(ty, value)
            } else {
                self.default_of(ty)
            };
            self.statics.insert((class, name), value);
        }
        Ok(())
    }

    // Calls

    fn eval_call(&mut self, callee: ExprId, args: ExprRange, env: &Env, frame: &Frame) -> Exec<Value> {
        let tree = self.tree;
        let values = self.eval_list(args, env, frame)?;
        let outcome = match tree.expr_kind(callee) {
            ExprKind::Member { receiver, name } => {
                let is_base = matches!(tree.expr_kind(receiver), ExprKind::Base);
                let target = self.eval(receiver, env, frame)?;
                let start = if is_base {
                    frame.class.and_then(|class| self.base_class(class))
                } else {
                    None
                };
                if is_base && start.is_none() {
                    Outcome::returned(self.call_builtin(target, name, values)?)
                } else {
                    self.call_method(target, name, values, start)?
                }
            }
            ExprKind::Ident(name) => {
                if let Some(value) = env.lookup(name) {
                    self.call_value(&value, values)?
                } else {
                    let receiver = match (&frame.this, frame.class) {
                        (Value::Object(_), _) => frame.this.clone(),
                        (_, Some(class)) => Value::Type(class),
                        _ => return fault(format!("unbound function `{}`", self.name(name))),
                    };
                    self.call_method(receiver, name, values, None)?
                }
            }
            _ => {
                let function = self.eval(callee, env, frame)?;
                self.call_value(&function, values)?
            }
        };
        if let Some((params, scope)) = &outcome.params {
            let params = tree.params(*params);
            for (&arg, param) in tree.exprs(args).iter().zip(params) {
                let ExprKind::Out(target) = tree.expr_kind(arg) else {
                    continue;
                };
                if let Some(value) = scope.lookup(param.name) {
                    self.store(target, value, env, frame)?;
                }
            }
        }
        Ok(outcome.value)
    }

    /// Invoke `name` on `target`. User members are searched from the
    /// runtime class, or from `start` for `base.` calls.
    fn call_method(&mut self, target: Value, name: Name, args: Vec<Value>, start: Option<Name>) -> Exec<Outcome> {
        let class = match &target {
            Value::Object(object) => Some(start.unwrap_or(object.class)),
            Value::Type(class) if self.classes.contains_key(class) => Some(*class),
            _ => None,
        };
        if let Some(class) = class {
            if let Some((owner, params, body, is_static)) = self.find_method(class, name, &args) {
                let this = if is_static { Value::Null } else { target };
                if is_static {
                    self.ensure_statics(owner)?;
                }
                return self.run_member(owner, params, body, this, args);
            }
        }
        Ok(Outcome::returned(self.call_builtin(target, name, args)?))
    }

    fn call_value(&mut self, function: &Value, args: Vec<Value>) -> Exec<Outcome> {
        let Value::Closure(closure) = function else {
            return fault(format!("{function:?} is not callable"));
        };
        self.enter()?;
        let result = self.run_closure(closure, args);
        self.depth -= 1;
        result.map(Outcome::returned)
    }

    fn run_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Exec<Value> {
        let env = Scope::child(&closure.env);
        for (&name, value) in closure.params.iter().zip(args) {
            env.declare(name, self.copy_struct(value));
        }
        match closure.body {
            LambdaBody::Expr(expr) => self.eval(expr, &env, &closure.frame),
            LambdaBody::Block(stmt) => match self.exec(stmt, &env, &closure.frame) {
                Ok(()) => Ok(Value::Null),
                Err(Flow::Return(value)) => Ok(value),
                Err(other) => Err(other),
            },
        }
    }

    fn enter(&mut self) -> Exec<()> {
        if self.depth >= MAX_DEPTH {
            return fault("call depth exceeded");
        }
        self.depth += 1;
        Ok(())
    }

    fn run_member(
        &mut self,
        owner: Name,
        params: ParamRange,
        body: Body,
        this: Value,
        args: Vec<Value>,
    ) -> Exec<Outcome> {
        let frame = Frame {
            this,
            class: Some(owner),
        };
        let env = self.bind_params(params, args, &frame)?;
        let value = self.run_body(owner, body, frame.this, Rc::clone(&env))?;
        Ok(Outcome {
            value,
            params: Some((params, env)),
        })
    }

    /// Run a member body in `env`, which already holds its parameters.
    fn run_body(&mut self, owner: Name, body: Body, this: Value, env: Env) -> Exec<Value> {
        self.enter()?;
        let frame = Frame {
            this,
            class: Some(owner),
        };
        let result = match body {
            Body::Block(stmt) => match self.exec(stmt, &env, &frame) {
                Ok(()) => Ok(Value::Null),
                Err(Flow::Return(value)) => Ok(value),
                Err(other) => Err(other),
            },
            Body::Expr(expr) => self.eval(expr, &env, &frame),
            Body::None => fault(format!("`{}` member has no body", self.name(owner))),
        };
        self.depth -= 1;
        result
    }

    fn bind_params(&mut self, params: ParamRange, args: Vec<Value>, frame: &Frame) -> Exec<Env> {
        let tree = self.tree;
        let env = Scope::root();
        let mut args = args.into_iter();
        for param in tree.params(params) {
            let value = if param.modifier == ParamModifier::Params {
                Value::array(args.by_ref().collect())
            } else {
                match args.next() {
                    Some(value) => self.convert_to(param.ty, value),
                    None if param.default.is_valid() => self.eval(param.default, &env, frame)?,
                    None if param.modifier == ParamModifier::Out => self.default_of(param.ty),
                    None => Value::Null,
                }
            };
            env.declare(param.name, self.copy_struct(value));
        }
        Ok(env)
    }

    fn find_method(&self, class: Name, name: Name, args: &[Value]) -> Option<(Name, ParamRange, Body, bool)> {
        let mut current = Some(class);
        while let Some(class) = current {
            let decl = self.classes.get(&class)?;
            let mut best: Option<(u32, ParamRange, Body, bool)> = None;
            for member in &decl.members {
                let MemberKind::Method {
                    name: method,
                    params,
                    body,
                    ..
                } = member.kind
                else {
                    continue;
                };
                if method != name || matches!(body, Body::None) {
                    continue;
                }
                let Some(score) = self.overload_score(params, args) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(s, ..)| score > *s) {
                    best = Some((score, params, body, member.is_static()));
                }
            }
            if let Some((_, params, body, is_static)) = best {
                return Some((class, params, body, is_static));
            }
            current = self.base_class(class);
        }
        None
    }

    /// How well `args` fit `params`; `None` when they do not fit at all.
    fn overload_score(&self, params: ParamRange, args: &[Value]) -> Option<u32> {
        let params = self.tree.params(params);
        let variadic = params.last().is_some_and(|p| p.modifier == ParamModifier::Params);
        if args.len() > params.len() && !variadic {
            return None;
        }
        if params
            .iter()
            .skip(args.len())
            .any(|p| !p.default.is_valid() && p.modifier != ParamModifier::Params)
        {
            return None;
        }
        let mut score = 0;
        for (param, arg) in params.iter().zip(args) {
            if param.modifier == ParamModifier::Params {
                break;
            }
            score += self.accepts(param.ty, arg)?;
        }
        Some(score)
    }

    fn accepts(&self, ty: TypeExprId, value: &Value) -> Option<u32> {
        if !ty.is_valid() {
            return Some(0);
        }
        let tree = self.tree;
        match tree.type_expr(ty) {
            TypeExpr::Named { name, .. } => {
                let text = self.name(name);
                if text == "object" || !(self.classes.contains_key(&name) || is_builtin_type(text)) {
                    return Some(0);
                }
                let primitive = matches!(text, "int" | "long" | "double" | "bool" | "char");
                match value {
                    Value::Null if primitive => None,
                    Value::Null => Some(1),
                    Value::Int(_) if text == "double" => Some(1),
                    _ if self.is_instance(value, ty) => Some(1),
                    _ => None,
                }
            }
            TypeExpr::Nullable(inner) => match value {
                Value::Null => Some(1),
                _ => self.accepts(inner, value),
            },
            TypeExpr::Var | TypeExpr::Dynamic => Some(0),
            _ if matches!(value, Value::Null) || self.is_instance(value, ty) => Some(1),
            _ => None,
        }
    }

    fn find_operator(&self, class: Name, op: BinaryOp) -> Option<(Name, ParamRange, Body)> {
        let mut current = Some(class);
        while let Some(class) = current {
            let decl = self.classes.get(&class)?;
            for member in &decl.members {
                if let MemberKind::Operator {
                    op: declared,
                    params,
                    body,
                    ..
                } = member.kind
                {
                    if declared == op {
                        return Some((class, params, body));
                    }
                }
            }
            current = self.base_class(class);
        }
        None
    }

    fn find_getter(&self, class: Name, name: Name) -> Option<(Name, Body)> {
        self.find_property(class, name, |getter, _| getter)
    }

    fn find_setter(&self, class: Name, name: Name) -> Option<(Name, Body)> {
        self.find_property(class, name, |_, setter| setter)
    }

    /// Accessor of property `name` that has a body of its own.
    fn find_property(
        &self,
        class: Name,
        name: Name,
        pick: impl Fn(Option<Body>, Option<Body>) -> Option<Body>,
    ) -> Option<(Name, Body)> {
        let mut current = Some(class);
        while let Some(class) = current {
            let decl = self.classes.get(&class)?;
            for member in &decl.members {
                if let MemberKind::Property {
                    name: declared,
                    getter,
                    setter,
                    ..
                } = member.kind
                {
                    if declared == name {
                        return match pick(getter, setter) {
                            Some(body @ (Body::Block(_) | Body::Expr(_))) => Some((class, body)),
                            _ => None,
                        };
                    }
                }
            }
            current = self.base_class(class);
        }
        None
    }

    /// First base of `class` that is itself a declared class or struct.
    fn base_class(&self, class: Name) -> Option<Name> {
        let tree = self.tree;
        let decl = self.classes.get(&class)?;
        decl.bases.iter().find_map(|&base| match tree.type_expr(base) {
            TypeExpr::Named { name, .. } => self
                .classes
                .get(&name)
                .filter(|d| d.kind != TypeDeclKind::Interface)
                .map(|_| name),
            _ => None,
        })
    }

    // Builtins

    fn call_builtin(&mut self, target: Value, name: Name, args: Vec<Value>) -> Exec<Value> {
        let method = self.name(name);
        match &target {
            Value::Type(class) => return self.call_static_builtin(*class, method, args),
            Value::Null => {
                return self.throw("NullReferenceException", "Object reference not set to an instance of an object.");
            }
            Value::Closure(_) if method == "Invoke" => return Ok(self.call_value(&target, args)?.value),
            _ => {}
        }
        match (method, args.as_slice()) {
            ("Equals", [other]) => {
                let equal = match (&target, other) {
                    (Value::Tuple(a), Value::Tuple(b)) if a.len() == b.len() => {
                        let mut equal = true;
                        for (x, y) in a.iter().zip(b.iter()) {
                            equal &= self.object_equals(x.clone(), y.clone())?;
                        }
                        equal
                    }
                    _ => self.raw_eq(&target, other),
                };
                return Ok(Value::Bool(equal));
            }
            ("GetHashCode", []) => return self.hash_code(&target).map(Value::Int),
            ("ToString", []) => return Ok(Value::str(&self.display(&target)?)),
            _ => {}
        }
        match (&target, method, args.as_slice()) {
            (Value::Object(object), "MemberwiseClone", []) => {
                let copy = self.new_object(object.class, object.is_struct);
                copy.fields.borrow_mut().clone_from(&object.fields.borrow());
                Ok(Value::Object(copy))
            }
            (Value::Object(object), "GetOffset", [Value::Int(length)]) => {
                let (value, from_end) = {
                    let fields = object.fields.borrow();
                    let value = fields.get(&self.tree.intern("Value")).cloned();
                    let from_end = fields.get(&self.tree.intern("IsFromEnd")).cloned();
                    (value, from_end)
                };
                match (value, from_end) {
                    (Some(Value::Int(v)), Some(Value::Bool(true))) => Ok(Value::Int(length - v)),
                    (Some(Value::Int(v)), _) => Ok(Value::Int(v)),
                    _ => fault("GetOffset on a value that is not an Index"),
                }
            }
            (Value::Str(text), "Substring", [Value::Int(start), rest @ ..]) => {
                let chars: Vec<char> = text.chars().collect();
                let start = usize::try_from(*start).ok();
                let count = match rest {
                    [Value::Int(count)] => usize::try_from(*count).ok(),
                    [] => start.map(|s| chars.len().saturating_sub(s)),
                    _ => None,
                };
                match (start, count) {
                    (Some(start), Some(count)) if start + count <= chars.len() => {
                        Ok(Value::str(&chars[start..start + count].iter().collect::<String>()))
                    }
                    _ => self.throw("ArgumentOutOfRangeException", "Index and length must refer to a location within the string."),
                }
            }
            (Value::Str(text), "Contains", [Value::Str(part)]) => Ok(Value::Bool(text.contains(&**part))),
            (Value::Str(text), "StartsWith", [Value::Str(part)]) => Ok(Value::Bool(text.starts_with(&**part))),
            (Value::Str(text), "ToUpper", []) => Ok(Value::str(&text.to_uppercase())),
            (Value::Str(text), "ToLower", []) => Ok(Value::str(&text.to_lowercase())),
            (Value::List(list), "Add", [item]) => {
                list.items.borrow_mut().push(item.clone());
                Ok(Value::Null)
            }
            (Value::List(list), "AddRange", [source]) => {
                let items = self.iterate(source)?;
                list.items.borrow_mut().extend(items);
                Ok(Value::Null)
            }
            (Value::List(list), "ToArray", []) => Ok(Value::array(list.items.borrow().clone())),
            (Value::List(list), "Contains", [item]) => {
                let found = list.items.borrow().iter().any(|x| self.raw_eq(x, item));
                Ok(Value::Bool(found))
            }
            (Value::List(list), "Slice", [Value::Int(start), Value::Int(end)]) => {
                let items = list.items.borrow();
                match (usize::try_from(*start), usize::try_from(*end)) {
                    (Ok(start), Ok(end)) if start <= end && end <= items.len() => {
                        let slice = items[start..end].to_vec();
                        Ok(if list.is_array {
                            Value::array(slice)
                        } else {
                            Value::list(slice)
                        })
                    }
                    _ => {
                        drop(items);
                        self.throw("ArgumentOutOfRangeException", "Specified argument was out of the range of valid values.")
                    }
                }
            }
            _ => fault(format!("no method `{method}` with {} arguments on {target:?}", args.len())),
        }
    }

    fn call_static_builtin(&mut self, class: Name, method: &str, args: Vec<Value>) -> Exec<Value> {
        let class_text = self.name(class);
        match (class_text, method, args.as_slice()) {
            ("object", "Equals", [a, b]) => Ok(Value::Bool(self.object_equals(a.clone(), b.clone())?)),
            ("object", "ReferenceEquals", [a, b]) => Ok(Value::Bool(self.reference_equals(a, b))),
            ("string", "Format", [Value::Str(format), rest @ ..]) => {
                let text = self.format(format, rest)?;
                Ok(Value::str(&text))
            }
            ("string", "IsNullOrEmpty", [value]) => Ok(Value::Bool(match value {
                Value::Null => true,
                Value::Str(s) => s.is_empty(),
                _ => false,
            })),
            ("Console", "WriteLine" | "Write", _) => {
                let mut text = match args.as_slice() {
                    [] => String::new(),
                    [Value::Str(format), rest @ ..] if !rest.is_empty() => self.format(format, rest)?,
                    [value] => self.display(value)?,
                    _ => return fault("unsupported Console arguments"),
                };
                if method == "WriteLine" {
                    text.push('\n');
                }
                self.output.push_str(&text);
                Ok(Value::Null)
            }
            ("Math", "Max" | "Min", [a, b]) => {
                let pick_left = match (number(a), number(b)) {
                    (Some(x), Some(y)) => (as_double(x) >= as_double(y)) == (method == "Max"),
                    _ => return fault("Math on non-numbers"),
                };
                Ok(if pick_left { a.clone() } else { b.clone() })
            }
            ("Math", "Abs", [Value::Int(v)]) => Ok(Value::Int(wrap(v.wrapping_abs()))),
            ("Math", "Abs", [Value::Double(v)]) => Ok(Value::Double(v.abs())),
            _ => fault(format!("no static method `{class_text}.{method}` with {} arguments", args.len())),
        }
    }

    /// Composite formatting: `{index[,alignment][:format]}`.
    fn format(&mut self, format: &str, args: &[Value]) -> Exec<String> {
        let mut out = String::new();
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut hole = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        hole.push(c);
                    }
                    let (head, spec) = hole.split_once(':').unwrap_or((hole.as_str(), ""));
                    let (index, alignment) = head.split_once(',').unwrap_or((head, ""));
                    let Some(arg) = index.trim().parse::<usize>().ok().and_then(|i| args.get(i)) else {
                        return fault(format!("bad format hole `{{{hole}}}`"));
                    };
                    let text = self.format_value(arg, spec)?;
                    let width: i64 = alignment.trim().parse().unwrap_or(0);
                    let pad = usize::try_from(width.unsigned_abs())
                        .unwrap_or(0)
                        .saturating_sub(text.chars().count());
                    if width < 0 {
                        out.push_str(&text);
                        out.extend(std::iter::repeat_n(' ', pad));
                    } else {
                        out.extend(std::iter::repeat_n(' ', pad));
                        out.push_str(&text);
                    }
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn format_value(&mut self, value: &Value, spec: &str) -> Exec<String> {
        let digits = spec.get(1..).and_then(|d| d.parse::<usize>().ok());
        Ok(match (spec.chars().next(), number(value)) {
            (Some('F' | 'f'), Some(num)) => format!("{:.*}", digits.unwrap_or(2), as_double(num)),
            (Some('D' | 'd'), Some(Num::Int(v))) => format!("{v:0width$}", width = digits.unwrap_or(0)),
            (Some('X'), Some(Num::Int(v))) => format!("{v:X}"),
            (Some('x'), Some(Num::Int(v))) => format!("{v:x}"),
            _ => self.display(value)?,
        })
    }

    fn hash_code(&mut self, value: &Value) -> Exec<i64> {
        Ok(match value {
            Value::Null => 0,
            Value::Int(v) => *v,
            Value::Bool(b) => i64::from(*b),
            Value::Char(c) => i64::from(u32::from(*c)),
            Value::Double(v) => wrap(v.to_bits() as i64),
            Value::Str(text) => {
                let mut hasher = FxHasher::default();
                hasher.write(text.as_bytes());
                wrap(hasher.finish() as i64)
            }
            Value::Tuple(items) => {
                let mut hash: i64 = 17;
                for item in items.iter() {
                    let item = self.hash_code(item)?;
                    hash = wrap(hash.wrapping_mul(31).wrapping_add(item));
                }
                hash
            }
            Value::Object(object) => i64::from(object.id),
            Value::List(_) | Value::Closure(_) | Value::Type(_) => 0,
        })
    }

    /// Text of a value as `ToString` and concatenation produce it.
    fn display(&mut self, value: &Value) -> Exec<String> {
        Ok(match value {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Bool(true) => "True".to_owned(),
            Value::Bool(false) => "False".to_owned(),
            Value::Char(c) => c.to_string(),
            Value::Str(text) => text.to_string(),
            Value::Object(object) => {
                let to_string = self.tree.intern("ToString");
                if let Some((owner, params, body, _)) = self.find_method(object.class, to_string, &[]) {
                    let result = self.run_member(owner, params, body, value.clone(), Vec::new())?;
                    return self.display(&result.value);
                }
                self.name(object.class).to_owned()
            }
            Value::List(list) if list.is_array => "Array".to_owned(),
            Value::List(_) => "List".to_owned(),
            Value::Tuple(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items.iter() {
                    parts.push(self.display(item)?);
                }
                format!("({})", parts.join(", "))
            }
            Value::Closure(_) => "Func".to_owned(),
            Value::Type(name) => self.name(*name).to_owned(),
        })
    }

    // Types and objects

    fn new_object(&mut self, class: Name, is_struct: bool) -> Rc<Object> {
        let id = self.next_id;
        self.next_id += 1;
        Rc::new(Object {
            class,
            fields: RefCell::default(),
            is_struct,
            id,
        })
    }

    fn copy_struct(&mut self, value: Value) -> Value {
        match &value {
            Value::Object(object) if object.is_struct => {
                let copy = self.new_object(object.class, true);
                copy.fields.borrow_mut().clone_from(&object.fields.borrow());
                Value::Object(copy)
            }
            _ => value,
        }
    }

    fn throw<T>(&mut self, class: &str, message: &str) -> Exec<T> {
        let class = self.tree.intern(class);
        let exception = self.new_object(class, false);
        exception
            .fields
            .borrow_mut()
            .insert(self.tree.intern("Message"), Value::str(message));
        Err(Flow::Throw(Value::Object(exception)))
    }

    fn construct(&mut self, ty: TypeExprId, args: Vec<Value>) -> Exec<Value> {
        let tree = self.tree;
        let TypeExpr::Named { name, .. } = tree.type_expr(ty) else {
            return fault(format!("cannot instantiate {:?}", tree.type_expr(ty)));
        };
        let text = self.name(name);
        if !self.classes.contains_key(&name) {
            return self.construct_builtin(name, text, args);
        }
        let Some(decl) = self.classes.get(&name).copied() else {
            return fault(format!("unknown type `{text}`"));
        };
        let object = Value::Object(self.new_object(name, decl.kind.is_value_type()));
        self.init_fields(name, &object)?;
        self.run_ctor(name, &object, args)?;
        Ok(object)
    }

    fn construct_builtin(&mut self, name: Name, text: &str, args: Vec<Value>) -> Exec<Value> {
        let fields: Vec<(&str, Value)> = match text {
            "List" => {
                let items = match args.first() {
                    Some(source @ (Value::List(_) | Value::Str(_))) => self.iterate(source)?,
                    _ => Vec::new(),
                };
                return Ok(Value::list(items));
            }
            "object" => Vec::new(),
            "Index" => {
                let mut args = args.into_iter();
                vec![
                    ("Value", args.next().unwrap_or(Value::Int(0))),
                    ("IsFromEnd", args.next().unwrap_or(Value::Bool(false))),
                ]
            }
            "Range" => {
                let mut args = args.into_iter();
                vec![
                    ("Start", args.next().unwrap_or(Value::Null)),
                    ("End", args.next().unwrap_or(Value::Null)),
                ]
            }
            _ if text == "Exception" || builtin_base(text).is_some() => {
                let message = args.into_iter().next().unwrap_or(Value::str("Exception of this type was thrown."));
                vec![("Message", message)]
            }
            _ => return fault(format!("unknown type `{text}`")),
        };
        let object = self.new_object(name, false);
        {
            let mut slots = object.fields.borrow_mut();
            for (field, value) in fields {
                slots.insert(self.tree.intern(field), value);
            }
        }
        Ok(Value::Object(object))
    }

    /// Instance field and auto-property storage, base classes first.
    fn init_fields(&mut self, class: Name, object: &Value) -> Exec<()> {
        if let Some(base) = self.base_class(class) {
            self.init_fields(base, object)?;
        }
        let Some(decl) = self.classes.get(&class).copied() else {
            return Ok(());
        };
        let Value::Object(target) = object else {
            return Ok(());
        };
        let frame = Frame {
            this: object.clone(),
            class: Some(class),
        };
        for member in decl.members.iter().filter(|m| !m.is_static()) {
            let (ty, name, init) = match member.kind {
                MemberKind::Field { ty, name, init } => (ty, name, init),
                MemberKind::Property {
                    ty,
                    name,
                    getter,
                    setter,
                    init,
                } if init.is_valid()
                    || matches!(getter, Some(Body::None))
                    || matches!(setter, Some(Body::None)) =>
                {
                    (ty, name, init)
                }
                _ => continue,
            };
            let value = if init.is_valid() {
                let value = self.eval(init, &Scope::root(), &frame)?;
                self.convert_to(ty, value)
            } else {
                self.default_of(ty)
            };
            target.fields.borrow_mut().insert(name, value);
        }
        Ok(())
    }

    fn run_ctor(&mut self, class: Name, object: &Value, args: Vec<Value>) -> Exec<()> {
        let Some(decl) = self.classes.get(&class).copied() else {
            return Ok(());
        };
        let mut best: Option<(u32, ParamRange, Option<CtorInitializer>, Body)> = None;
        for member in &decl.members {
            if let MemberKind::Constructor {
                params,
                initializer,
                body,
            } = member.kind
            {
                if member.is_static() {
                    continue;
                }
                let Some(score) = self.overload_score(params, &args) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(s, ..)| score > *s) {
                    best = Some((score, params, initializer, body));
                }
            }
        }
        let Some((_, params, initializer, body)) = best else {
            let has_ctor = decl
                .members
                .iter()
                .any(|m| matches!(m.kind, MemberKind::Constructor { .. }) && !m.is_static());
            if has_ctor || !args.is_empty() {
                return fault(format!("no constructor of `{}` takes {} arguments", self.name(class), args.len()));
            }
            if let Some(base) = self.base_class(class) {
                self.run_ctor(base, object, Vec::new())?;
            }
            return Ok(());
        };

        self.enter()?;
        let frame = Frame {
            this: object.clone(),
            class: Some(class),
        };
        let result = self.bind_params(params, args, &frame).and_then(|env| {
            match initializer {
                Some(init) => {
                    let init_args = self.eval_list(init.args, &env, &frame)?;
                    match init.target {
                        CtorTarget::This => self.run_ctor(class, object, init_args)?,
                        CtorTarget::Base => match self.base_class(class) {
                            Some(base) => self.run_ctor(base, object, init_args)?,
                            None => self.init_builtin_base(class, object, init_args),
                        },
                    }
                }
                None => {
                    if let Some(base) = self.base_class(class) {
                        self.run_ctor(base, object, Vec::new())?;
                    }
                }
            }
            match body {
                Body::Block(stmt) => match self.exec(stmt, &env, &frame) {
                    Ok(()) | Err(Flow::Return(_)) => Ok(()),
                    Err(other) => Err(other),
                },
                Body::Expr(expr) => self.eval(expr, &env, &frame).map(drop),
                Body::None => Ok(()),
            }
        });
        self.depth -= 1;
        result
    }

    /// `: base(message)` on a class deriving from a library exception.
    fn init_builtin_base(&self, class: Name, object: &Value, args: Vec<Value>) {
        let derives_exception = self.class_is(class, self.tree.intern("Exception"));
        if let (true, Value::Object(target), Some(message)) = (derives_exception, object, args.into_iter().next()) {
            target.fields.borrow_mut().insert(self.tree.intern("Message"), message);
        }
    }

    fn default_of(&mut self, ty: TypeExprId) -> Value {
        if !ty.is_valid() {
            return Value::Null;
        }
        match self.tree.type_expr(ty) {
            TypeExpr::Named { name, .. } => match self.name(name) {
                "int" | "long" => Value::Int(0),
                "double" => Value::Double(0.0),
                "bool" => Value::Bool(false),
                "char" => Value::Char('\0'),
                _ => self.zeroed_struct(name).unwrap_or(Value::Null),
            },
            _ => Value::Null,
        }
    }

    /// Struct value with every field at its default. Initializers do not
    /// run.
    fn zeroed_struct(&mut self, class: Name) -> Option<Value> {
        let decl = self
            .classes
            .get(&class)
            .copied()
            .filter(|decl| decl.kind.is_value_type())?;
        let object = self.new_object(class, true);
        for member in decl.members.iter().filter(|m| !m.is_static()) {
            if let MemberKind::Field { ty, name, .. } | MemberKind::Property { ty, name, .. } = member.kind {
                let value = self.default_of(ty);
                object.fields.borrow_mut().insert(name, value);
            }
        }
        Some(Value::Object(object))
    }

    fn convert_to(&self, ty: TypeExprId, value: Value) -> Value {
        if !ty.is_valid() {
            return value;
        }
        match (self.tree.type_expr(ty), &value) {
            (TypeExpr::Nullable(inner), _) => self.convert_to(inner, value),
            (TypeExpr::Named { name, .. }, Value::Int(v)) if self.name(name) == "double" => Value::Double(*v as f64),
            _ => value,
        }
    }

    fn cast(&mut self, ty: TypeExprId, value: Value) -> Exec<Value> {
        let tree = self.tree;
        let target = match tree.type_expr(ty) {
            TypeExpr::Nullable(inner) => {
                if matches!(value, Value::Null) {
                    return Ok(value);
                }
                return self.cast(inner, value);
            }
            TypeExpr::Named { name, .. } => self.name(name),
            _ => return Ok(value),
        };
        let converted = match (target, &value) {
            ("int" | "long", Value::Double(v)) => Value::Int(wrap(*v as i64)),
            ("int" | "long", Value::Char(c)) => Value::Int(i64::from(u32::from(*c))),
            ("double", Value::Int(v)) => Value::Double(*v as f64),
            ("char", Value::Int(v)) => match u32::try_from(*v).ok().and_then(char::from_u32) {
                Some(c) => Value::Char(c),
                None => return self.throw("InvalidCastException", "Specified cast is not valid."),
            },
            (_, Value::Null) => Value::Null,
            _ => {
                let known = self.classes.contains_key(&tree.intern(target)) || is_builtin_type(target);
                if known && !self.is_instance(&value, ty) {
                    return self.throw("InvalidCastException", "Specified cast is not valid.");
                }
                value
            }
        };
        Ok(converted)
    }

    /// Runtime type test, `null` never matches.
    fn is_instance(&self, value: &Value, ty: TypeExprId) -> bool {
        let tree = self.tree;
        if matches!(value, Value::Null) {
            return false;
        }
        match tree.type_expr(ty) {
            TypeExpr::Nullable(inner) => self.is_instance(value, inner),
            TypeExpr::Array(_) => matches!(value, Value::List(list) if list.is_array),
            TypeExpr::Tuple(items) => {
                matches!(value, Value::Tuple(t) if t.len() == tree.types(items).len())
            }
            TypeExpr::Var | TypeExpr::Dynamic => true,
            TypeExpr::Void => false,
            TypeExpr::Named { name, .. } => match (self.name(name), value) {
                ("object", _)
                | ("int" | "long", Value::Int(_))
                | ("double", Value::Double(_))
                | ("bool", Value::Bool(_))
                | ("char", Value::Char(_))
                | ("string", Value::Str(_))
                | ("IEnumerable", Value::List(_) | Value::Str(_))
                | ("Func" | "Action", Value::Closure(_)) => true,
                ("List", Value::List(list)) => !list.is_array,
                (_, Value::Object(object)) => self.class_is(object.class, name),
                _ => false,
            },
        }
    }

    /// Whether `class` is `target` or derives from or implements it.
    fn class_is(&self, class: Name, target: Name) -> bool {
        if class == target {
            return true;
        }
        let tree = self.tree;
        if let Some(decl) = self.classes.get(&class) {
            return decl.bases.iter().any(|&base| match tree.type_expr(base) {
                TypeExpr::Named { name, .. } => self.class_is(name, target),
                _ => false,
            });
        }
        match builtin_base(self.name(class)) {
            Some(base) => self.class_is(tree.intern(base), target),
            None => false,
        }
    }
}

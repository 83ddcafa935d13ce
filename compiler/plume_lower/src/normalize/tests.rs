use pretty_assertions::assert_eq;

use plume_ir::ast::{
    BinaryOp, Body, ExprKind, Member, MemberKind, Modifiers, Param, ParamModifier, StmtKind,
};
use plume_ir::{print_unit, ExprId, ParamRange, StmtId, SyntaxTree};
use plume_model::TableModel;

use crate::eval::{Interpreter, Value};
use crate::test_support::{class, lower, method, params, run, run_pass, static_method, S};
use crate::{LowerError, PassKind};

fn expr_method(tree: &mut SyntaxTree, name: &str, ret: &str, params: ParamRange, body: ExprId) -> Member {
    let ret = tree.type_str(ret);
    Member::new(
        MemberKind::Method {
            name: tree.intern(name),
            type_params: Vec::new(),
            params,
            ret,
            body: Body::Expr(body),
        },
        Modifiers::PUBLIC | Modifiers::STATIC,
        S,
    )
}

fn tuple(tree: &mut SyntaxTree, items: &[ExprId]) -> ExprId {
    let items = tree.alloc_exprs(items.iter().copied());
    tree.alloc_expr(ExprKind::Tuple(items), S)
}

fn var_decl(tree: &mut SyntaxTree, name: &str) -> ExprId {
    let ty = tree.var_type();
    let name = tree.intern(name);
    tree.alloc_expr(ExprKind::Declaration { ty, name }, S)
}

#[test]
fn expression_bodies_become_blocks() {
    let model = TableModel::default();
    let mut tree = model.new_tree();
    let int = tree.type_str("int");
    let list = params(&mut tree, &[(int, "x")]);
    let x = tree.ident_str("x", S);
    let two = tree.int(2, S);
    let doubled = tree.binary(BinaryOp::Mul, x, two, S);
    let twice = expr_method(&mut tree, "Twice", "int", list, doubled);

    let console = tree.ident_str("Console", S);
    let text = tree.str_lit("hi", S);
    let write = tree.method_call(console, "WriteLine", &[text], S);
    let log = expr_method(&mut tree, "Log", "void", ParamRange::EMPTY, write);
    class(&mut tree, "Program", vec![twice, log]);

    let (normalized, _) = run_pass(&model, &tree, PassKind::ExpressionBodies).unwrap();
    let text = print_unit(&normalized);
    assert!(text.contains("public static int Twice(int x)\n    {\n        return x * 2;\n    }"), "{text}");
    assert!(text.contains("public static void Log()\n    {\n        Console.WriteLine(\"hi\");\n    }"), "{text}");

    let lowered = lower(&model, tree).unwrap();
    let mut interpreter = Interpreter::new(&lowered);
    assert_eq!(interpreter.call_static("Program", "Twice", vec![Value::Int(21)]), Ok(Value::Int(42)));
    assert_eq!(interpreter.call_static("Program", "Log", Vec::new()), Ok(Value::Null));
    assert_eq!(interpreter.output(), "hi\n");
}

#[test]
fn member_names_gain_explicit_receivers() {
    let model = TableModel::default();
    let mut tree = model.new_tree();
    let int = tree.type_str("int");
    let count = tree.intern("count");
    let three = tree.int(3, S);
    let field = Member::new(
        MemberKind::Field {
            ty: int,
            name: count,
            init: three,
        },
        Modifiers::PRIVATE,
        S,
    );
    let limit = tree.intern("Limit");
    let ten = tree.int(10, S);
    let constant = Member::new(
        MemberKind::Field {
            ty: int,
            name: limit,
            init: ten,
        },
        Modifiers::PUBLIC | Modifiers::STATIC,
        S,
    );
    let read_count = tree.ident(count, S);
    let read_limit = tree.ident(limit, S);
    let sum = tree.binary(BinaryOp::Add, read_count, read_limit, S);
    let ret = tree.return_stmt(sum, S);
    let total = method(&mut tree, "Total", int, ParamRange::EMPTY, &[ret]);

    // A local shadows the field of the same name.
    let shadow = tree.local(int, count, ExprId::INVALID, S);
    let read_local = tree.ident(count, S);
    let ret_local = tree.return_stmt(read_local, S);
    let local = method(&mut tree, "Local", int, ParamRange::EMPTY, &[shadow, ret_local]);
    class(&mut tree, "Counter", vec![field, constant, total, local]);

    let (normalized, _) = run_pass(&model, &tree, PassKind::Names).unwrap();
    let text = print_unit(&normalized);
    assert!(text.contains("return this.count + Counter.Limit;"), "{text}");
    assert!(text.contains("return count;"), "{text}");
}

#[test]
fn deconstruction_reads_components_of_one_temporary() {
    let model = TableModel::default();
    let mut tree = model.new_tree();
    let a = var_decl(&mut tree, "a");
    let b = var_decl(&mut tree, "b");
    let targets = tuple(&mut tree, &[a, b]);
    let three = tree.int(3, S);
    let four = tree.int(4, S);
    let source = tuple(&mut tree, &[three, four]);
    let assign = tree.assign(targets, source, S);
    let split = tree.expr_stmt(assign, S);

    let read_a = tree.ident_str("a", S);
    let ten = tree.int(10, S);
    let tens = tree.binary(BinaryOp::Mul, read_a, ten, S);
    let read_b = tree.ident_str("b", S);
    let sum = tree.binary(BinaryOp::Add, tens, read_b, S);
    let ret = tree.return_stmt(sum, S);
    let int = tree.type_str("int");
    let run_method = static_method(&mut tree, "Run", int, ParamRange::EMPTY, &[split, ret]);
    class(&mut tree, "Program", vec![run_method]);

    let (normalized, _) = run_pass(&model, &tree, PassKind::Deconstruction).unwrap();
    let text = print_unit(&normalized);
    assert!(text.contains("var a = __t0.Item1;"), "{text}");
    assert!(text.contains("var b = __t0.Item2;"), "{text}");

    let lowered = lower(&model, tree).unwrap();
    assert_eq!(run(&lowered, "Program", "Run").result, Ok(Value::Int(34)));
}

#[test]
fn out_declarations_are_hoisted_and_written_back() {
    let model = TableModel::default();
    let mut tree = model.new_tree();
    let int = tree.type_str("int");
    let string = tree.type_str("string");
    let bool_ty = tree.type_str("bool");

    // static bool TryMeasure(string s, out int length) { length = s.Length; return true; }
    let value = tree.intern("length");
    let list = tree.alloc_params([
        tree.param(string, "s"),
        Param {
            modifier: ParamModifier::Out,
            ..Param::new(int, value)
        },
    ]);
    let target = tree.ident(value, S);
    let s = tree.ident_str("s", S);
    let len = tree.member_str(s, "Length", S);
    let store = tree.assign(target, len, S);
    let store = tree.expr_stmt(store, S);
    let yes = tree.bool_lit(true, S);
    let ret_yes = tree.return_stmt(yes, S);
    let measure = static_method(&mut tree, "TryMeasure", bool_ty, list, &[store, ret_yes]);

    // if (TryMeasure("plume", out var n)) return n; return -1;
    let callee = tree.ident_str("TryMeasure", S);
    let text = tree.str_lit("plume", S);
    let n = var_decl(&mut tree, "n");
    let out = tree.alloc_expr(ExprKind::Out(n), S);
    let call = tree.call(callee, &[text, out], S);
    let read_n = tree.ident_str("n", S);
    let ret_n = tree.return_stmt(read_n, S);
    let check = tree.if_stmt(call, ret_n, StmtId::INVALID, S);
    let minus_one = tree.int(-1, S);
    let ret_none = tree.return_stmt(minus_one, S);
    let run_method = static_method(&mut tree, "Run", int, ParamRange::EMPTY, &[check, ret_none]);
    class(&mut tree, "Program", vec![measure, run_method]);

    let lowered = lower(&model, tree).unwrap();
    let text = print_unit(&lowered);
    assert!(text.contains("int n;"), "{text}");
    assert!(text.contains("out n)"), "{text}");
    assert_eq!(run(&lowered, "Program", "Run").result, Ok(Value::Int(5)));
}

#[test]
fn discard_assignment_keeps_the_value() {
    let model = TableModel::default();
    let mut tree = model.new_tree();
    let discard = tree.alloc_expr(ExprKind::Discard, S);
    let console = tree.ident_str("Console", S);
    let text = tree.str_lit("side effect", S);
    let write = tree.method_call(console, "WriteLine", &[text], S);
    let assign = tree.assign(discard, write, S);
    let stmt = tree.expr_stmt(assign, S);
    let void = tree.void_type();
    let main = static_method(&mut tree, "Run", void, ParamRange::EMPTY, &[stmt]);
    class(&mut tree, "Program", vec![main]);

    let (normalized, _) = run_pass(&model, &tree, PassKind::Deconstruction).unwrap();
    let body = normalized.unit.types[0].members[0].kind.clone();
    let MemberKind::Method {
        body: Body::Block(block),
        ..
    } = body
    else {
        panic!("expected a block body");
    };
    let StmtKind::Block(list) = normalized.stmt_kind(block) else {
        panic!("expected a block");
    };
    let first = normalized.stmts(list)[0];
    assert_eq!(normalized.stmt_kind(first), StmtKind::Expr(write));

    let lowered = lower(&model, tree).unwrap();
    assert_eq!(run(&lowered, "Program", "Run").output, "side effect\n");
}

#[test]
fn deconstruction_inside_an_expression_is_rejected() {
    let model = TableModel::default();
    let mut tree = model.new_tree();
    let int = tree.type_str("int");
    let a = tree.intern("a");
    let b = tree.intern("b");
    let decl_a = tree.local(int, a, ExprId::INVALID, S);
    let decl_b = tree.local(int, b, ExprId::INVALID, S);
    let read_a = tree.ident(a, S);
    let read_b = tree.ident(b, S);
    let targets = tuple(&mut tree, &[read_a, read_b]);
    let one = tree.int(1, S);
    let two = tree.int(2, S);
    let source = tuple(&mut tree, &[one, two]);
    let assign = tree.assign(targets, source, S);
    let var = tree.var_type();
    let r = tree.intern("r");
    let decl_r = tree.local(var, r, assign, S);
    let void = tree.void_type();
    let main = static_method(&mut tree, "Run", void, ParamRange::EMPTY, &[decl_a, decl_b, decl_r]);
    class(&mut tree, "Program", vec![main]);

    let err = run_pass(&model, &tree, PassKind::Deconstruction).err();
    let Some(err @ LowerError::Unsupported { .. }) = err else {
        panic!("expected an unsupported construct, got {err:?}");
    };
    assert_eq!(err.pass(), Some("deconstruction"));
}

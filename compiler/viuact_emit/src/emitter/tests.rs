use pretty_assertions::assert_eq;
use viuact_diagnostic::ErrorCode;
use viuact_ir::{CallKind, FormBuilder, Operator, SourceModule, StringInterner};

use super::*;
use crate::NoInterfaces;

fn compile_with(
    interner: &StringInterner,
    module: &SourceModule,
    function: &str,
    options: EmitOptions,
) -> Result<CompiledFunction, EmitError> {
    let view = ModuleView::build(module, interner, true, &NoInterfaces)?;
    let ctx = EmitContext::new(interner, &view, &module.arena).with_options(options);
    let name = interner.intern(function);
    let Some(def) = module.functions().find(|def| def.name == name) else {
        panic!("no function `{function}` in the test module");
    };
    compile_function(&ctx, def)
}

fn compile(
    interner: &StringInterner,
    module: &SourceModule,
    function: &str,
) -> Result<CompiledFunction, EmitError> {
    compile_with(interner, module, function, EmitOptions::default())
}

fn compiled(result: Result<CompiledFunction, EmitError>) -> CompiledFunction {
    match result {
        Ok(compiled) => compiled,
        Err(err) => panic!("compilation failed: {err}"),
    }
}

fn error_code(result: Result<CompiledFunction, EmitError>) -> ErrorCode {
    match result {
        Ok(compiled) => panic!("expected an error, compiled:\n{}", compiled.code),
        Err(err) => err.code(),
    }
}

/// Non-blank instruction lines, without indentation.
fn lines(code: &FunctionCode) -> Vec<String> {
    code.to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn position(lines: &[String], needle: &str) -> usize {
    match lines.iter().position(|line| line == needle) {
        Some(index) => index,
        None => panic!("`{needle}` not found in {lines:#?}"),
    }
}

/// `(enum Opt ('a) (Some 'a) None)`
fn declare_opt(b: &mut FormBuilder<'_>) {
    let payload = b.ty("'a");
    b.enum_decl("Opt", &["'a"], vec![("Some", Some(payload)), ("None", None)]);
}

fn opt_of_i64(b: &FormBuilder<'_>) -> viuact_ir::ParsedType {
    b.ty_app("Opt", vec![b.ty("i64")])
}

// ── Basics ──────────────────────────────────────────────────────────

#[test]
fn void_main_prints_a_literal() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let void = b.ty("void");
    b.val("main", &[], vec![], void);
    let hi = b.string("hi");
    let body = b.call("print", vec![hi]);
    b.function("main", &[], body);
    let module = b.finish();

    let out = compiled(compile(&interner, &module, "main"));
    assert_eq!(
        out.code.to_string(),
        ".function: main/0\n    allocate_registers %2 local\n\n    text %1 local \"hi\"\n    print %1 local\n\n    return\n.end"
    );
    assert!(out.nested.is_empty());
}

#[test]
fn arithmetic_reads_parameters_in_place() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("add", &[], vec![i64_ty.clone(), i64_ty.clone()], i64_ty);
    let a = b.var("a");
    let c = b.var("b");
    let body = b.op(Operator::Add, vec![a, c]);
    b.function("add", &["a", "b"], body);
    let module = b.finish();

    let out = compiled(compile(&interner, &module, "add"));
    assert_eq!(
        out.code.to_string(),
        ".function: add/2\n    allocate_registers %4 local\n\n    \
         move %1 local %0 parameters\n    move %2 local %1 parameters\n\n    \
         add %0 local %1 local %2 local\n    return\n.end"
    );
}

#[test]
fn arithmetic_rejects_mixed_operands() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![i64_ty.clone()], i64_ty);
    let x = b.var("x");
    let text = b.string("a");
    let body = b.op(Operator::Add, vec![x, text]);
    b.function("f", &["x"], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "f")), ErrorCode::E2001);
}

#[test]
fn arithmetic_rejects_a_template_bound_to_text() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let string_ty = b.ty("string");
    b.val("main", &[], vec![], string_ty);
    let x = b.var("x");
    let text = b.string("a");
    let sum = b.op(Operator::Add, vec![x, text]);
    let def = b.nested_fn("f", &["x"], sum);
    let arg = b.string("b");
    let call = b.call("f", vec![arg]);
    let body = b.compound(vec![def, call]);
    b.function("main", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "main")), ErrorCode::E2007);
}

#[test]
fn arithmetic_needs_two_operands() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![], i64_ty);
    let one = b.int(1);
    let body = b.op(Operator::Mul, vec![one]);
    b.function("f", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "f")), ErrorCode::E2105);
}

#[test]
fn concatenation_stringifies_non_text_operands() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let string = b.ty("string");
    b.val("f", &[], vec![], string);
    let prefix = b.string("n=");
    let n = b.int(1);
    let body = b.op(Operator::Concat, vec![prefix, n]);
    b.function("f", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "f")).code);
    assert!(out.iter().any(|l| l.starts_with("textconcat %0 local")), "{out:#?}");
    assert!(out.iter().any(|l| l.starts_with("integer") && l.ends_with(" 1")));
}

#[test]
fn unbound_name_is_reported() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![], i64_ty);
    let body = b.var("nowhere");
    b.function("f", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "f")), ErrorCode::E2201);
}

#[test]
fn declared_return_type_is_enforced() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![], i64_ty);
    let body = b.string("not a number");
    b.function("f", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "f")), ErrorCode::E2006);
}

#[test]
fn annotations_describe_bindings() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![], i64_ty);
    let value = b.int(42);
    let bind = b.let_("x", value);
    let read = b.var("x");
    let body = b.compound(vec![bind, read]);
    b.function("f", &[], body);
    let module = b.finish();

    let options = EmitOptions { annotate: true };
    let out = lines(&compiled(compile_with(&interner, &module, "f", options)).code);
    assert!(out.contains(&"; let x = ...".to_string()), "{out:#?}");
    assert!(out.contains(&"integer %1 local 42".to_string()));
    assert!(out.contains(&"move %0 local %1 local".to_string()));
}

#[test]
fn vector_elements_must_agree() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let void = b.ty("void");
    b.val("main", &[], vec![], void);
    let one = b.int(1);
    let two = b.string("two");
    let vector = b.vector(vec![one, two]);
    let body = b.let_("v", vector);
    b.function("main", &[], body);
    let module = b.finish();

    let result = compile(&interner, &module, "main");
    match result {
        Err(EmitError::TypeMismatch { notes, .. }) => {
            assert_eq!(notes, vec!["in element 2 of a vector".to_string()]);
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

// ── Control flow ────────────────────────────────────────────────────

#[test]
fn if_branches_on_the_guard_variable() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let bool_ty = b.ty("bool");
    let i64_ty = b.ty("i64");
    b.val("pick", &[], vec![bool_ty], i64_ty);
    let guard = b.var("c");
    let one = b.int(1);
    let two = b.int(2);
    let body = b.if_(guard, one, two);
    b.function("pick", &["c"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "pick")).code);
    let branch = position(&out, "if %1 local if_true_0 if_false_0");
    let then = position(&out, "integer %0 local 1");
    let jump = position(&out, "jump if_end_0");
    let otherwise = position(&out, "integer %0 local 2");
    let end = position(&out, ".mark: if_end_0");
    assert!(branch < then && then < jump && jump < otherwise && otherwise < end);
}

#[test]
fn if_arms_may_read_the_same_binding() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let bool_ty = b.ty("bool");
    let i64_ty = b.ty("i64");
    b.val("pick", &[], vec![bool_ty], i64_ty);
    let one = b.int(1);
    let bind_x = b.let_("x", one);
    let guard = b.var("c");
    let then_x = b.var("x");
    let else_x = b.var("x");
    let choice = b.if_(guard, then_x, else_x);
    let bind_y = b.let_("y", choice);
    let y = b.var("y");
    let body = b.compound(vec![bind_x, bind_y, y]);
    b.function("pick", &["c"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "pick")).code);
    let Some(x) = out
        .iter()
        .find_map(|l| l.strip_prefix("integer ").and_then(|l| l.strip_suffix(" 1")))
    else {
        panic!("no literal for `x` in {out:#?}");
    };
    let reads = out
        .iter()
        .filter(|l| l.starts_with("move ") && l.ends_with(&format!(" {x}")))
        .count();
    assert_eq!(reads, 2, "{out:#?}");
    position(&out, ".mark: if_end_0");
}

#[test]
fn match_arms_may_read_the_same_binding() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    declare_opt(&mut b);
    let opt = opt_of_i64(&b);
    let i64_ty = b.ty("i64");
    b.val("or_default", &[], vec![opt, i64_ty.clone()], i64_ty);
    let guard = b.var("o");
    let x = b.var("x");
    let some = b.arm("Some", None, x);
    let x = b.var("x");
    let other = b.arm("_", None, x);
    let body = b.match_(guard, vec![some, other]);
    b.function("or_default", &["o", "x"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "or_default")).code);
    let reads = out.iter().filter(|l| *l == "move %0 local %2 local").count();
    assert_eq!(reads, 2, "{out:#?}");
}

#[test]
fn if_arms_must_agree() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let bool_ty = b.ty("bool");
    let i64_ty = b.ty("i64");
    b.val("pick", &[], vec![bool_ty], i64_ty);
    let guard = b.var("c");
    let one = b.int(1);
    let text = b.string("a");
    let body = b.if_(guard, one, text);
    b.function("pick", &["c"], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "pick")), ErrorCode::E2003);
}

#[test]
fn repeated_forms_get_distinct_labels() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let bool_ty = b.ty("bool");
    let void = b.ty("void");
    b.val("twice", &[], vec![bool_ty], void);
    let mut forms = Vec::new();
    for _ in 0..2 {
        let guard = b.boolean(true);
        let yes = b.string("yes");
        let yes = b.call("print", vec![yes]);
        let no = b.string("no");
        let no = b.call("print", vec![no]);
        forms.push(b.if_(guard, yes, no));
    }
    let body = b.compound(forms);
    b.function("twice", &["c"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "twice")).code);
    position(&out, ".mark: if_end_0");
    position(&out, ".mark: if_end_1");
}

#[test]
fn match_with_catch_all_extracts_the_payload() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    declare_opt(&mut b);
    let opt = opt_of_i64(&b);
    let i64_ty = b.ty("i64");
    b.val("unwrap_or_zero", &[], vec![opt], i64_ty);
    let guard = b.var("o");
    let x = b.var("x");
    let some = b.arm("Some", Some("x"), x);
    let zero = b.int(0);
    let other = b.arm("_", None, zero);
    let body = b.match_(guard, vec![some, other]);
    b.function("unwrap_or_zero", &["o"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "unwrap_or_zero")).code);
    assert!(out.iter().any(|l| l.starts_with("structremove")), "{out:#?}");
    assert!(out.iter().any(|l| l.starts_with("structat")));
    assert!(!out.iter().any(|l| l.contains("Match_failed")));
    position(&out, ".mark: match_done_0");
}

#[test]
fn exhaustive_match_without_catch_all_keeps_failure_path() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    declare_opt(&mut b);
    let opt = opt_of_i64(&b);
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![opt], i64_ty);
    let guard = b.var("o");
    let one = b.int(1);
    let some = b.arm("Some", None, one);
    let zero = b.int(0);
    let none = b.arm("None", None, zero);
    let body = b.match_(guard, vec![some, none]);
    b.function("f", &["o"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "f")).code);
    assert!(out.iter().any(|l| l.ends_with("'Match_failed'")), "{out:#?}");
}

#[test]
fn match_without_every_field_is_rejected() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    declare_opt(&mut b);
    let opt = opt_of_i64(&b);
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![opt], i64_ty);
    let guard = b.var("o");
    let x = b.var("x");
    let some = b.arm("Some", Some("x"), x);
    let body = b.match_(guard, vec![some]);
    b.function("f", &["o"], body);
    let module = b.finish();

    match compile(&interner, &module, "f") {
        Err(EmitError::MissingWithClause { field, .. }) => assert_eq!(field, "None"),
        other => panic!("expected a missing with-clause, got {other:?}"),
    }
}

#[test]
fn match_clause_errors() {
    fn arms_error(build: impl FnOnce(&mut FormBuilder<'_>) -> Vec<viuact_ir::MatchArm>) -> ErrorCode {
        let interner = StringInterner::new();
        let mut b = FormBuilder::new(&interner, "main");
        declare_opt(&mut b);
        let opt = opt_of_i64(&b);
        let i64_ty = b.ty("i64");
        b.val("f", &[], vec![opt], i64_ty);
        let guard = b.var("o");
        let arms = build(&mut b);
        let body = b.match_(guard, arms);
        b.function("f", &["o"], body);
        let module = b.finish();
        error_code(compile(&interner, &module, "f"))
    }

    let catch_all_first = arms_error(|b| {
        let zero = b.int(0);
        let one = b.int(1);
        vec![b.arm("_", None, zero), b.arm("None", None, one)]
    });
    assert_eq!(catch_all_first, ErrorCode::E3004);

    let duplicated = arms_error(|b| {
        let zero = b.int(0);
        let one = b.int(1);
        let two = b.int(2);
        vec![
            b.arm("None", None, zero),
            b.arm("None", None, one),
            b.arm("_", None, two),
        ]
    });
    assert_eq!(duplicated, ErrorCode::E3002);

    let foreign = arms_error(|b| {
        let zero = b.int(0);
        let one = b.int(1);
        vec![b.arm("Nope", None, zero), b.arm("_", None, one)]
    });
    assert_eq!(foreign, ErrorCode::E3003);

    let bare = arms_error(|b| {
        let zero = b.int(0);
        let one = b.int(1);
        vec![b.arm("None", Some("x"), zero), b.arm("_", None, one)]
    });
    assert_eq!(bare, ErrorCode::E3006);

    assert_eq!(arms_error(|_| Vec::new()), ErrorCode::E3005);
}

#[test]
fn match_over_a_non_enum_is_rejected() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("f", &[], vec![i64_ty.clone()], i64_ty);
    let guard = b.var("n");
    let zero = b.int(0);
    let other = b.arm("_", None, zero);
    let body = b.match_(guard, vec![other]);
    b.function("f", &["n"], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "f")), ErrorCode::E3007);
}

#[test]
fn try_lays_out_catch_blocks_before_the_guarded_block() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.exception("Oops", Some(i64_ty));
    let void = b.ty("void");
    b.val("main", &[], vec![], void);
    let payload = b.int(1);
    let guard = b.throw("Oops", Some(payload));
    let v = b.var("v");
    let handler = b.call("print", vec![v]);
    let arm = b.catch("Oops", Some("v"), handler);
    let body = b.try_(guard, vec![arm]);
    b.function("main", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "main")).code);
    let try_line = position(&out, "try");
    let catch = position(&out, "catch 'Oops' .block: catch_arm_0");
    let draw = position(&out, "draw %1 local");
    let value = position(&out, "exception_value %1 local %1 local");
    let print = position(&out, "print %1 local");
    let enter = position(&out, "enter .block: try_arm_1");
    assert!(try_line < catch && catch < draw && draw < value && value < print && print < enter);
    assert!(out.iter().skip(enter).any(|l| l.starts_with("throw")));
    assert_eq!(out.iter().filter(|l| *l == "leave").count(), 2);
}

#[test]
fn exception_payloads_are_checked() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.exception("Oops", Some(i64_ty));
    b.exception("Bare", None);
    let void = b.ty("void");
    b.val("wrong", &[], vec![], void.clone());
    b.val("missing", &[], vec![], void.clone());
    b.val("unknown", &[], vec![], void);
    let text = b.string("x");
    let wrong = b.throw("Oops", Some(text));
    b.function("wrong", &[], wrong);
    let missing = b.throw("Oops", None);
    b.function("missing", &[], missing);
    let unknown = b.throw("Nope", None);
    b.function("unknown", &[], unknown);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "wrong")), ErrorCode::E2009);
    assert_eq!(error_code(compile(&interner, &module, "missing")), ErrorCode::E2106);
    assert_eq!(error_code(compile(&interner, &module, "unknown")), ErrorCode::E2207);
}

// ── Records and enums ───────────────────────────────────────────────

#[test]
fn records_are_built_and_read_by_field() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.record_decl("Point", vec![("x", i64_ty.clone()), ("y", i64_ty.clone())]);
    b.val("getx", &[], vec![], i64_ty);
    let one = b.int(1);
    let two = b.int(2);
    let point = b.record("Point", vec![("x", one), ("y", two)]);
    let bind = b.let_("p", point);
    let p = b.var("p");
    let read = b.field(p, "x");
    let body = b.compound(vec![bind, read]);
    b.function("getx", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "getx")).code);
    assert_eq!(out.iter().filter(|l| l.starts_with("structinsert")).count(), 2);
    assert!(out.iter().any(|l| l.starts_with("structat %0 local")), "{out:#?}");
    assert!(out.iter().any(|l| l.starts_with("atom") && l.ends_with("'x'")));
}

#[test]
fn record_errors() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.record_decl("Point", vec![("x", i64_ty.clone())]);
    b.val("bad_field", &[], vec![], i64_ty.clone());
    b.val("bad_type", &[], vec![], i64_ty.clone());
    b.val("bad_record", &[], vec![], i64_ty);
    let one = b.int(1);
    let point = b.record("Point", vec![("x", one)]);
    let read = b.field(point, "z");
    b.function("bad_field", &[], read);
    let text = b.string("one");
    let point = b.record("Point", vec![("x", text)]);
    let read = b.field(point, "x");
    b.function("bad_type", &[], read);
    let one = b.int(1);
    let body = b.record("Nowhere", vec![("x", one)]);
    b.function("bad_record", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "bad_field")), ErrorCode::E2204);
    assert_eq!(error_code(compile(&interner, &module, "bad_type")), ErrorCode::E2002);
    assert_eq!(error_code(compile(&interner, &module, "bad_record")), ErrorCode::E2203);
}

#[test]
fn enum_constructors_store_tag_and_payload() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    declare_opt(&mut b);
    let opt = opt_of_i64(&b);
    b.val("some", &[], vec![], opt);
    let five = b.int(5);
    let body = b.enum_ctor("Opt::Some", Some(five));
    b.function("some", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "some")).code);
    let tag = position(&out, "atom %1 local 'tag'");
    let index = position(&out, "integer %2 local 0");
    let value = position(&out, "atom %1 local 'value'");
    assert!(tag < index && index < value);
    assert!(out.contains(&"integer %2 local 5".to_string()));
}

#[test]
fn enum_constructor_errors() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.enum_decl("Shape", &[], vec![("Circle", Some(i64_ty)), ("Empty", None)]);
    let shape = b.ty("Shape");
    for name in ["wrong", "extra", "field", "enum"] {
        b.val(name, &[], vec![], shape.clone());
    }
    let text = b.string("r");
    let wrong = b.enum_ctor("Shape::Circle", Some(text));
    b.function("wrong", &[], wrong);
    let one = b.int(1);
    let extra = b.enum_ctor("Shape::Empty", Some(one));
    b.function("extra", &[], extra);
    let field = b.enum_ctor("Shape::Square", None);
    b.function("field", &[], field);
    let unknown = b.enum_ctor("Colour::Red", None);
    b.function("enum", &[], unknown);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "wrong")), ErrorCode::E2009);
    assert_eq!(error_code(compile(&interner, &module, "extra")), ErrorCode::E2106);
    assert_eq!(error_code(compile(&interner, &module, "field")), ErrorCode::E2205);
    assert_eq!(error_code(compile(&interner, &module, "enum")), ErrorCode::E2205);
}

// ── Calls ───────────────────────────────────────────────────────────

#[test]
fn tail_call_produces_no_value() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("spin", &[], vec![i64_ty.clone()], i64_ty);
    let n = b.var("n");
    let body = b.call_kind("spin", vec![n], CallKind::Tail);
    b.function("spin", &["n"], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "spin")).code);
    let frame = position(&out, "frame %1 arguments");
    let pass = position(&out, "move %0 arguments %2 local");
    let tail = position(&out, "tailcall spin/1");
    assert!(frame < pass && pass < tail);
    assert!(!out.iter().any(|l| l.starts_with("call ")));
    assert_eq!(out.last().map(String::as_str), Some(".end"));
}

#[test]
fn labelled_arguments_follow_parameter_order() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("sub", &[], vec![i64_ty.clone(), i64_ty.clone()], i64_ty.clone());
    b.val("main", &[], vec![], i64_ty);
    let x = b.var("x");
    let y = b.var("y");
    let diff = b.op(Operator::Sub, vec![x, y]);
    b.function("sub", &["x", "~y"], diff);
    let two = b.int(2);
    let one = b.int(1);
    let args = vec![b.labelled("y", two), b.arg(one)];
    let body = b.call_with("sub", args, CallKind::Synchronous);
    b.function("main", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "main")).code);
    let first = position(&out, "integer %1 local 1");
    let second = position(&out, "integer %1 local 2");
    assert!(first < second);
    position(&out, "move %1 arguments %1 local");
    position(&out, "call %0 local sub/2");
}

#[test]
fn call_resolution_errors() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("sub", &[], vec![i64_ty.clone(), i64_ty.clone()], i64_ty.clone());
    b.val("declared", &[], vec![], i64_ty.clone());
    for name in ["unknown", "arity", "labels", "undefined", "argument"] {
        b.val(name, &[], vec![], i64_ty.clone());
    }
    let x = b.var("x");
    let y = b.var("y");
    let diff = b.op(Operator::Sub, vec![x, y]);
    b.function("sub", &["x", "~y"], diff);

    let body = b.call("nothing", vec![]);
    b.function("unknown", &[], body);
    let one = b.int(1);
    let body = b.call("sub", vec![one]);
    b.function("arity", &[], body);
    let one = b.int(1);
    let two = b.int(2);
    let body = b.call("sub", vec![one, two]);
    b.function("labels", &[], body);
    let body = b.call("declared", vec![]);
    b.function("undefined", &[], body);
    let text = b.string("1");
    let two = b.int(2);
    let args = vec![b.arg(text), b.labelled("y", two)];
    let body = b.call_with("sub", args, CallKind::Synchronous);
    b.function("argument", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "unknown")), ErrorCode::E2101);
    assert_eq!(error_code(compile(&interner, &module, "arity")), ErrorCode::E2102);
    assert_eq!(error_code(compile(&interner, &module, "labels")), ErrorCode::E2104);
    assert_eq!(error_code(compile(&interner, &module, "undefined")), ErrorCode::E2107);
    assert_eq!(error_code(compile(&interner, &module, "argument")), ErrorCode::E2005);
}

#[test]
fn builtins_accept_only_plain_single_argument_calls() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let void = b.ty("void");
    b.val("deferred", &[], vec![], void.clone());
    b.val("pair", &[], vec![], void);
    let hi = b.string("hi");
    let body = b.call_kind("print", vec![hi], CallKind::Deferred);
    b.function("deferred", &[], body);
    let a = b.string("a");
    let c = b.string("b");
    let body = b.call("echo", vec![a, c]);
    b.function("pair", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "deferred")), ErrorCode::E2109);
    assert_eq!(error_code(compile(&interner, &module, "pair")), ErrorCode::E2102);
}

#[test]
fn actor_call_yields_a_pid() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let void = b.ty("void");
    let pid = b.ty("pid");
    b.val("worker", &[], vec![], void);
    b.val("spawn", &[], vec![], pid);
    let hi = b.string("working");
    let work = b.call("print", vec![hi]);
    b.function("worker", &[], work);
    let body = b.call_kind("worker", vec![], CallKind::Actor);
    b.function("spawn", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "spawn")).code);
    position(&out, "frame %0 arguments");
    position(&out, "process %0 local worker/0");
}

#[test]
fn function_value_is_passed_by_name() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    let unary = b.fn_ty(vec![i64_ty.clone()], i64_ty.clone());
    b.val("inc", &[], vec![i64_ty.clone()], i64_ty.clone());
    b.val("apply", &[], vec![unary, i64_ty.clone()], i64_ty.clone());
    b.val("main", &[], vec![], i64_ty);
    let n = b.var("n");
    let one = b.int(1);
    let next = b.op(Operator::Add, vec![n, one]);
    b.function("inc", &["n"], next);
    let x = b.var("x");
    let call = b.call("f", vec![x]);
    b.function("apply", &["f", "x"], call);
    let inc = b.var("inc");
    let answer = b.int(41);
    let body = b.call("apply", vec![inc, answer]);
    b.function("main", &[], body);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "main")).code);
    assert_eq!(
        out[2..],
        [
            "frame %2 arguments",
            "function %1 local inc/1",
            "move %0 arguments %1 local",
            "integer %1 local 41",
            "move %1 arguments %1 local",
            "call %0 local apply/2",
            "return",
            ".end",
        ]
    );

    let apply = lines(&compiled(compile(&interner, &module, "apply")).code);
    let frame = position(&apply, "frame %1 arguments");
    let call = position(&apply, "call %0 local %1 local");
    assert!(frame < call);
    assert!(!apply.iter().any(|l| l.starts_with("function ")));
}

#[test]
fn deferred_call_of_a_user_function() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let string_ty = b.ty("string");
    let void = b.ty("void");
    b.val("note", &[], vec![string_ty], void.clone());
    b.val("main", &[], vec![], void);
    let s = b.var("s");
    let show = b.call("print", vec![s]);
    b.function("note", &["s"], show);
    let bye = b.string("bye");
    let body = b.call_kind("note", vec![bye], CallKind::Deferred);
    b.function("main", &[], body);
    let module = b.finish();

    let out = compiled(compile(&interner, &module, "main"));
    assert_eq!(
        out.code.to_string(),
        ".function: main/0\n    allocate_registers %2 local\n\n    \
         frame %1 arguments\n    text %1 local \"bye\"\n    \
         move %0 arguments %1 local\n    defer note/1\n\n    return\n.end"
    );
}

// ── Nested functions ────────────────────────────────────────────────

#[test]
fn nested_function_without_captures_is_called_directly() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("main", &[], vec![], i64_ty);
    let n = b.var("n");
    let m = b.var("n");
    let square = b.op(Operator::Mul, vec![n, m]);
    let def = b.nested_fn("sq", &["n"], square);
    let three = b.int(3);
    let call = b.call("sq", vec![three]);
    let body = b.compound(vec![def, call]);
    b.function("main", &[], body);
    let module = b.finish();

    let out = compiled(compile(&interner, &module, "main"));
    let main = lines(&out.code);
    position(&main, "call %0 local main::sq_0/1");
    assert!(!main.iter().any(|l| l.starts_with("closure")));

    assert_eq!(out.nested.len(), 1);
    let sq = &out.nested[0];
    assert_eq!(sq.symbol(), "main::sq_0/1");
    assert!(!sq.closure);
    assert_eq!(sq.signature.templates.len(), 1);
}

#[test]
fn nested_function_capturing_a_binding_becomes_a_closure() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let void = b.ty("void");
    b.val("main", &[], vec![], void);
    let answer = b.int(42);
    let bind = b.let_("x", answer);
    let x = b.var("x");
    let show = b.call("print", vec![x]);
    let def = b.nested_fn("g", &[], show);
    let call = b.call("g", vec![]);
    let body = b.compound(vec![bind, def, call]);
    b.function("main", &[], body);
    let module = b.finish();

    let out = compiled(compile(&interner, &module, "main"));
    let main = lines(&out.code);
    let create = position(&main, "closure %2 local main::g_0/0");
    let copy = position(&main, "capturecopy %2 local %1 %1 local");
    let call = position(&main, "call void %2 local");
    assert!(create < copy && copy < call);
    assert_eq!(main.iter().filter(|l| l.starts_with("capturecopy")).count(), 1);

    assert_eq!(out.nested.len(), 1);
    let g = &out.nested[0];
    assert!(g.closure);
    assert!(g.to_string().starts_with(".closure: main::g_0/0"));
    let inner = lines(g);
    position(&inner, "print %0 local");
}

#[test]
fn function_value_arity_is_checked() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let void = b.ty("void");
    b.val("main", &[], vec![], void);
    let answer = b.int(42);
    let bind = b.let_("x", answer);
    let x = b.var("x");
    let show = b.call("print", vec![x]);
    let def = b.nested_fn("g", &[], show);
    let extra = b.int(1);
    let call = b.call("g", vec![extra]);
    let body = b.compound(vec![bind, def, call]);
    b.function("main", &[], body);
    let module = b.finish();

    assert_eq!(error_code(compile(&interner, &module, "main")), ErrorCode::E2110);
}

#[test]
fn deeply_nested_compounds_compile() {
    let interner = StringInterner::new();
    let mut b = FormBuilder::new(&interner, "main");
    let i64_ty = b.ty("i64");
    b.val("deep", &[], vec![], i64_ty);
    let mut form = b.int(7);
    for _ in 0..5_000 {
        form = b.compound(vec![form]);
    }
    b.function("deep", &[], form);
    let module = b.finish();

    let out = lines(&compiled(compile(&interner, &module, "deep")).code);
    position(&out, "integer %0 local 7");
}

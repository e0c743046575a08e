//! Sandbox boundary tests: forbidden constructs and attribute probes

use sandcalc::*;

fn run(src: &str) -> std::result::Result<Evaluation, EvalError> {
    evaluate_source(src, false)
}

fn security_message(src: &str) -> String {
    match run(src) {
        Err(e) if e.is_security() => e.to_string(),
        Err(e) => panic!("{:?} failed with {}: {}", src, e.category(), e),
        Ok(eval) => panic!("{:?} was allowed: {:?}", src, eval.result),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Forbidden constructs
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_forbidden_statements() {
    let cases = [
        "def f(): pass",
        "async def f(): pass",
        "class X: pass",
        "import os",
        "from os import path",
        "try:\n  pass\nexcept: pass",
        "global x",
        "nonlocal x",
        "with x: pass",
        "raise ValueError",
        "assert False",
        "return 1",
        "x: int = 1",
    ];
    for src in cases {
        security_message(src);
    }
}

#[test]
fn test_forbidden_expressions() {
    let cases = [
        "lambda: 1",
        "(x for x in range(3))",
        "yield 1",
        "sorted([3, 1], key=lambda v: -v)",
    ];
    for src in cases {
        security_message(src);
    }
}

#[test]
fn test_forbidden_messages() {
    assert_eq!(
        security_message("def f(): pass"),
        "Defining new function via def syntax is not allowed"
    );
    assert_eq!(
        security_message("lambda: 1"),
        "Defining new function via lambda syntax is not allowed"
    );
    assert_eq!(security_message("import os"), "You can not import anything");
}

#[test]
fn test_forbidden_body_never_runs() {
    // The list would be mutated if anything before the rejection ran
    let program = parse_program("l = [1]\nl.append(2)\nfor i in l:\n    def f(): pass").unwrap();
    let err = evaluate(&program, &EvalContext::new()).unwrap_err();
    assert!(err.is_security());
}

#[test]
fn test_forbidden_inside_dead_branch() {
    security_message("if False:\n    import os");
    security_message("x = 1 if True else (lambda: 2)");
}

// ═══════════════════════════════════════════════════════════════════════
// Attribute probes
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_reflection_probes() {
    let probes = [
        "().__class__",
        "().__class__.__bases__[0].__subclasses__()",
        "str.__subclasses__",
        "''.__class__.__mro__",
        "[].__class__",
        "{}.__class__",
        "(1).__class__",
        "len.__self__",
        "len.__call__",
        "abs.__module__",
        "int.__dict__",
        "''.format.__globals__",
        "'abc'.upper.__self__",
        "range(3).__iter__",
        "datetime.date.__init__",
    ];
    for src in probes {
        security_message(src);
    }
}

#[test]
fn test_module_probes() {
    let probes = [
        "random._os",
        "random._inst",
        "datetime.sys",
        "math.__loader__",
        "math.__spec__",
        "json.__builtins__",
        "functools.sys",
        "itertools.__name__",
        "html.entities",
        "statistics.sys",
        "operator.attrgetter",
        "operator.methodcaller",
    ];
    for src in probes {
        security_message(src);
    }
}

#[test]
fn test_probe_through_binding() {
    security_message("m = math\nm.__dict__");
    security_message("t = (1, 2)\ngetter = t.__getitem__");
}

#[test]
fn test_format_field_probes() {
    security_message("'{0.__class__}'.format(1)");
    security_message("'{x.real}'.format(x=1)");
    security_message("'{0[0]}'.format([1])");
}

#[test]
fn test_attribute_assignment_and_deletion() {
    assert_eq!(security_message("math.pi = 3"), "This assign method is not allowed");
    assert_eq!(security_message("del math.pi"), "This delete method is not allowed");
    assert_eq!(security_message("l = [1]\nl[0:1] += [2]"), "This assign method is not allowed");
}

#[test]
fn test_denied_attribute_names_the_attribute() {
    assert_eq!(
        security_message("math.system"),
        "You can not access `system` attribute"
    );
}

#[test]
fn test_unknown_module_is_a_name_error() {
    let err = run("os.system('ls')").unwrap_err();
    assert!(matches!(err, EvalError::UndefinedName { ref name } if name == "os"));
}

#[test]
fn test_allowed_attributes_still_work() {
    let eval = run("math.floor(math.pi * 100) / 100").unwrap();
    assert_eq!(eval.result.unwrap().repr(), "3.14");
    let eval = run("'a-b'.replace('-', '+').upper()").unwrap();
    assert_eq!(eval.result.unwrap().repr(), "'A+B'");
}

// ═══════════════════════════════════════════════════════════════════════
// Resource limits
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_huge_power_overflows() {
    let err = run("9 ** 9 ** 9").unwrap_err();
    assert_eq!(err.category(), "OverflowError");
}

#[test]
fn test_huge_collection_is_memory_error() {
    let err = run("[0] * 10 ** 8").unwrap_err();
    assert_eq!(err.category(), "MemoryError");
    let err = run("list(range(10 ** 9))").unwrap_err();
    assert_eq!(err.category(), "MemoryError");
}

#[test]
fn test_deep_nesting_is_recursion_error() {
    let src = format!("{}1{}", "(".repeat(150), ")".repeat(150));
    assert!(run(&src).is_ok());
    let src = format!("{}1{}", "-".repeat(500), "");
    let err = run(&src).unwrap_err();
    assert_eq!(err.category(), "RecursionError");
}

#[test]
fn test_oversized_source_rejected_before_parsing() {
    let src = format!("{}1", "-".repeat(5_000));
    let err = run(&src).unwrap_err();
    assert_eq!(err.category(), "RecursionError");
    let src = format!("{}1", "-".repeat(300_000));
    let err = run(&src).unwrap_err();
    assert_eq!(err.category(), "MemoryError");
    let src = format!("{}1{}", "[".repeat(2_000), "]".repeat(2_000));
    assert_eq!(run(&src).unwrap_err().category(), "RecursionError");
}

#[test]
fn test_self_referencing_list_renders() {
    let eval = run("l = [1]\nl.append(l)\nl").unwrap();
    assert_eq!(eval.result.unwrap().repr(), "[1, [...]]");
}

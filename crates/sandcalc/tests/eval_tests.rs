//! End-to-end evaluation tests through the program entry point

use pretty_assertions::assert_eq;
use sandcalc::*;

fn eval(src: &str, precision: bool) -> std::result::Result<Evaluation, EvalError> {
    evaluate_source(src, precision)
}

/// repr() of the result, `-` when there is none, or `Category: message`.
fn show(src: &str) -> String {
    show_mode(src, false)
}

fn show_decimal(src: &str) -> String {
    show_mode(src, true)
}

fn show_mode(src: &str, precision: bool) -> String {
    match eval(src, precision) {
        Ok(Evaluation {
            result: Some(v), ..
        }) => v.repr(),
        Ok(_) => "-".to_string(),
        Err(e) => format!("{}: {}", e.category(), e),
    }
}

fn locals(src: &str) -> Vec<(String, String)> {
    eval(src, false)
        .unwrap()
        .locals
        .into_iter()
        .map(|(k, v)| (k, v.repr()))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Precision mode
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_decimal_literals() {
    assert_eq!(show_decimal("0.1 + 0.2"), "Decimal('0.3')");
    assert_eq!(show_decimal("0.1 + 0.2 == 0.3"), "True");
    assert_eq!(show_decimal("1 / 3"), "Decimal('0.3333333333333333333333333333')");
    assert_eq!(show_decimal("2 ** 0.5"), "Decimal('1.414213562373095048801688724')");
    assert_eq!(show_decimal("1.10 * 3"), "Decimal('3.3')");
    assert_eq!(show_decimal("Decimal('1.10') * 3"), "Decimal('3.30')");
    assert_eq!(show_decimal("7 // 2"), "Decimal('3')");
    assert_eq!(show_decimal("-7 % 3"), "Decimal('-1')");
}

#[test]
fn test_decimal_indexing_stays_usable() {
    assert_eq!(show_decimal("[10, 20, 30][1]"), "Decimal('20')");
    assert_eq!(show_decimal("list(range(3))"), "[0, 1, 2]");
    assert_eq!(show_decimal("'ab' * 2"), "'abab'");
}

#[test]
fn test_native_literals() {
    assert_eq!(show("0.1 + 0.2"), "0.30000000000000004");
    assert_eq!(show("7 / 2"), "3.5");
    assert_eq!(show("2 ** 100"), "1267650600228229401496703205376");
    assert_eq!(show("(1 + 2j) * 1j"), "(-2+1j)");
}

#[test]
fn test_decimal_absorbs_float() {
    assert_eq!(show_decimal("0.5 + float('1')"), "Decimal('1.5')");
    assert_eq!(
        show_decimal("0.5 + 1j"),
        "TypeError: unsupported operand type(s) for +: 'Decimal' and 'complex'"
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Failure paths
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_division_by_zero_path() {
    assert!(eval("1/0", false).unwrap_err().is_zero_division());
    assert!(eval("1/0", true).unwrap_err().is_zero_division());
    assert!(eval("5 % 0", false).unwrap_err().is_zero_division());
    assert!(eval("divmod(1, 0)", false).unwrap_err().is_zero_division());
}

#[test]
fn test_decimal_remainder_by_zero_is_invalid_operation() {
    assert_eq!(
        show_decimal("1 % 0"),
        "InvalidOperation: [<class 'decimal.InvalidOperation'>]"
    );
    assert_eq!(
        show_decimal("divmod(5, 0)"),
        "InvalidOperation: [<class 'decimal.InvalidOperation'>]"
    );
    assert!(eval("1 // 0", true).unwrap_err().is_zero_division());
}

#[test]
fn test_syntax_error() {
    let err = eval("1 +", false).unwrap_err();
    assert_eq!(err.category(), "SyntaxError");
    assert!(matches!(err, EvalError::Syntax(ParseError { location: Some(_), .. })));
}

#[test]
fn test_loop_jump_outside_loop() {
    assert_eq!(show("break"), "SyntaxError: 'break' outside loop");
    assert_eq!(show("if True:\n    continue"), "SyntaxError: 'continue' not properly in loop");
}

#[test]
fn test_unsupported_kinds() {
    assert_eq!(
        show("(y := 1)"),
        "NotImplementedError: assignment expression is not supported"
    );
    assert_eq!(show("[*range(2)]").split(':').next(), Some("NotImplementedError"));
}

// ═══════════════════════════════════════════════════════════════════════
// Bindings
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_assign_then_read() {
    assert_eq!(show("x = 5\nx + 1"), "6");
    assert_eq!(show("x = 5\ndel x\nx"), "NameError: name 'x' is not defined");
}

#[test]
fn test_comprehension_variable_does_not_leak() {
    assert_eq!(show("[i for i in range(3)]\ni"), "NameError: name 'i' is not defined");
    assert_eq!(show("{k: 1 for k in 'ab'}\nk"), "NameError: name 'k' is not defined");
}

#[test]
fn test_comprehension_deletes_same_named_local() {
    assert_eq!(show("i = 10\n[i for i in range(3)]\ni"), "NameError: name 'i' is not defined");
    assert_eq!(show("i = 10\n[i for i in []]\ni"), "10");
}

#[test]
fn test_destructuring_arity() {
    let err = eval("a, b = (1, 2, 3)", false).unwrap_err();
    assert!(matches!(err, EvalError::TooManyValues { expected: 2 }));
    assert_eq!(err.to_string(), "too many values to unpack (expected 2)");
    let err = eval("a, b, c = (1, 2)", false).unwrap_err();
    assert!(matches!(err, EvalError::NotEnoughValues { expected: 3, got: 2 }));
}

#[test]
fn test_break_skips_loop_else() {
    let bindings = locals("for i in range(5):\n  if i == 2:\n    break\nelse:\n  x = 1");
    assert_eq!(bindings, vec![("i".to_string(), "2".to_string())]);
}

#[test]
fn test_loop_else_runs_without_break() {
    let bindings = locals("for i in range(2):\n  pass\nelse:\n  x = 1");
    assert_eq!(
        bindings,
        vec![
            ("i".to_string(), "1".to_string()),
            ("x".to_string(), "1".to_string())
        ]
    );
}

#[test]
fn test_chained_assignment_shares_value() {
    assert_eq!(show("a = b = []\na.append(1)\nb"), "[1]");
}

#[test]
fn test_locals_report_order() {
    assert_eq!(
        locals("z = 1\na = 2\nz = 3"),
        vec![
            ("z".to_string(), "3".to_string()),
            ("a".to_string(), "2".to_string())
        ]
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Operators
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_boolean_operators_return_operands() {
    assert_eq!(show("0 or '' or []"), "[]");
    assert_eq!(show("1 and 'x' and 3"), "3");
    assert_eq!(show("1 and 0 and 3"), "0");
    assert_eq!(show("None or 'default'"), "'default'");
}

#[test]
fn test_comparison_chains() {
    assert_eq!(show("1 < 2 < 3 < 4"), "True");
    assert_eq!(show("1 < 2 > 3"), "False");
    assert_eq!(show("x = 5\n0 <= x < 10"), "True");
}

#[test]
fn test_mixed_numeric_equality() {
    assert_eq!(show("1 == 1.0 == True"), "True");
    assert_eq!(show("{1: 'a', 1.0: 'b'}"), "{1: 'b'}");
}

// ═══════════════════════════════════════════════════════════════════════
// Programs
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_fibonacci_program() {
    let src = "a, b = 0, 1\nfor _ in range(10):\n    a, b = b, a + b\na";
    assert_eq!(show(src), "55");
}

#[test]
fn test_primes_program() {
    let src = "\
primes = []
n = 2
while len(primes) < 8:
    if all([n % p for p in primes]):
        primes.append(n)
    n += 1
primes";
    assert_eq!(show(src), "[2, 3, 5, 7, 11, 13, 17, 19]");
}

#[test]
fn test_word_count_program() {
    let src = "\
counts = {}
for w in 'a b a c b a'.split():
    counts[w] = counts.get(w, 0) + 1
sorted(counts.items(), key=operator.itemgetter(1), reverse=True)";
    assert_eq!(show(src), "[('a', 3), ('b', 2), ('c', 1)]");
}

#[test]
fn test_fstring_program() {
    let src = "total = 1234.5\nf'{total:,.2f} ({total:.1e})'";
    assert_eq!(show(src), "'1,234.50 (1.2e+03)'");
}

#[test]
fn test_datetime_program() {
    let src = "d = datetime.date(2024, 2, 28) + datetime.timedelta(days=2)\nd.isoformat()";
    assert_eq!(show(src), "'2024-03-01'");
}

#[test]
fn test_statistics_program() {
    assert_eq!(show("statistics.mean([1, 2, 3, 4])"), "2.5");
    assert_eq!(show_decimal("statistics.mean([1, 2, 3, 4])"), "Decimal('2.5')");
    assert_eq!(show("statistics.median([3, 1, 2])"), "2");
}

#[test]
fn test_json_program() {
    assert_eq!(show("json.dumps({'a': [1, 2.5, None, True]})"), "'{\"a\":[1,2.5,null,true]}'");
    assert_eq!(show("json.loads('[1, {\"b\": false}]')"), "[1, {'b': False}]");
}

#[test]
fn test_none_result_reports_as_value() {
    let eval = eval("[].append(1)", false).unwrap();
    assert!(matches!(eval.result, Some(Value::None)));
}

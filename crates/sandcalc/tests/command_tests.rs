//! Command layer tests: triggers, deadlines and reply rendering

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use sandcalc::*;

fn message(text: &str) -> Message {
    Message {
        channel: "C024BE91L".to_string(),
        text: text.to_string(),
        ts: Some("1355517523.000005".to_string()),
        edited: false,
    }
}

async fn reply(calculator: &Calculator, text: &str) -> String {
    calculator
        .handle(&message(text))
        .await
        .map(|r| r.text)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_precision_and_native_triggers() {
    let c = Calculator::default();
    assert_eq!(reply(&c, ".= 0.1 + 0.2").await, "`0.1 + 0.2` == `0.3`");
    assert_eq!(reply(&c, ".calc 0.1 + 0.2").await, "`0.1 + 0.2` == `0.3`");
    assert_eq!(
        reply(&c, ".== 0.1 + 0.2").await,
        "`0.1 + 0.2` == `0.30000000000000004`"
    );
}

#[tokio::test]
async fn test_custom_prefix() {
    let c = Calculator::new(CalcConfig {
        prefix: "!".to_string(),
        ..CalcConfig::default()
    });
    assert_eq!(reply(&c, "!= 2 * 3").await, "`2 * 3` == `6`");
    assert_eq!(reply(&c, ".= 2 * 3").await, "");
    assert_eq!(reply(&c, "!=").await, "Usage: `!= <expression>`");
}

#[tokio::test]
async fn test_timeout_does_not_block() {
    let c = Calculator::new(CalcConfig {
        timeout_ms: 200,
        ..CalcConfig::default()
    });
    let started = Instant::now();
    let text = reply(&c, ".== while True: pass").await;
    assert_eq!(text, "`while True: pass` takes too long to run!");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_runaway_comprehension_times_out() {
    let c = Calculator::new(CalcConfig {
        timeout_ms: 200,
        ..CalcConfig::default()
    });
    let text = reply(&c, ".== [x for x in range(10 ** 9) if x < 0]").await;
    assert!(text.ends_with("takes too long to run!"), "{}", text);
}

#[tokio::test]
async fn test_evaluations_are_independent() {
    let c = Calculator::default();
    assert_eq!(
        reply(&c, ".== x = 41").await,
        "*Expr*: `x = 41`\n*Local*\n```x = 41```"
    );
    assert_eq!(
        reply(&c, ".== x + 1").await,
        "An error occurred! NameError: name 'x' is not defined"
    );
}

#[tokio::test]
async fn test_multiline_block() {
    let c = Calculator::default();
    let text = reply(&c, ".== total = 0\nfor i in range(4):\n    total += i\ntotal").await;
    assert_eq!(text, "*Expr*\n```total = 0\nfor i in range(4):\n    total += i\ntotal```\n*Result*: `6`");
}

#[tokio::test]
async fn test_decimal_remainder_by_zero_is_generic_error() {
    let c = Calculator::default();
    assert_eq!(
        reply(&c, ".= 1 % 0").await,
        "An error occurred! InvalidOperation: [<class 'decimal.InvalidOperation'>]"
    );
    assert_eq!(
        reply(&c, ".= 1 // 0").await,
        "`1 // 0` divides by zero. Dividing by zero is not allowed!"
    );
}

#[tokio::test]
async fn test_security_reply() {
    let c = Calculator::default();
    assert_eq!(
        reply(&c, ".== ().__class__").await,
        "An error occurred! SyntaxSecurityError: You can not access `__class__` attribute"
    );
}

#[tokio::test]
async fn test_deeply_nested_input_is_refused() {
    let c = Calculator::default();
    let text = reply(&c, &format!(".== {}1", "-".repeat(200_000))).await;
    assert_eq!(text, "An error occurred! MemoryError: source text is too long");
    let text = reply(&c, &format!(".== {}1", "~".repeat(50_000))).await;
    assert_eq!(
        text,
        "An error occurred! RecursionError: maximum nesting depth exceeded (1000)"
    );
}

#[tokio::test]
async fn test_empty_string_result() {
    let c = Calculator::default();
    assert_eq!(reply(&c, ".== ''").await, "`''` == Empty string");
    assert_eq!(reply(&c, ".== '  '").await, "`'  '` == Empty string");
}

#[tokio::test]
async fn test_concurrent_commands() {
    let c = Calculator::default();
    let (a, b) = tokio::join!(reply(&c, ".== 2 ** 10"), reply(&c, ".= 1 / 4"));
    assert_eq!(a, "`2 ** 10` == `1024`");
    assert_eq!(b, "`1 / 4` == `0.25`");
}

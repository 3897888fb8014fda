//! End-to-end scripts: text in, values out.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use brierc::{
    init_tracing, load_script, load_script_with, run_script, EvalError, LineIndex, LineStatus, OperatorRegistry, Rank,
    Scalar, ScriptConfig, Value,
};
use pretty_assertions::assert_eq;

fn line(n: usize) -> LineIndex {
    LineIndex::new(n).unwrap()
}

fn strs(items: &[&str]) -> Value {
    Value::list(items.iter().map(|&s| Scalar::from(s)).collect())
}

const PEOPLE: &str = r#"[{name: "ada", dept: "eng", age: 36}, {name: "bob", dept: "ops", age: 41}, {name: "cy", dept: "eng", age: 29}]"#;

#[test]
fn test_join_on_list_and_table() {
    let text = format!(
        "{PEOPLE}\n\
         [\"a\", \"b\", \"c\"]\n\
         !join\n\
         $1 |> !keys |> !len"
    );
    let script = load_script(&text).unwrap();
    assert_eq!(script.evaluate(line(3)).unwrap(), Value::str("a b c"));

    // `keys` is row-ranked: one key list per row, recombined as a box.
    assert_eq!(
        script.evaluate(line(4)).unwrap(),
        Value::list(vec![Scalar::Int(3), Scalar::Int(3), Scalar::Int(3)])
    );
}

#[test]
fn test_join_on_table_goes_by_column() {
    let text = format!("{PEOPLE}\n$1 |> join \"/\"");
    let results = run_script(&text).unwrap();
    assert_eq!(
        results[1],
        Ok(Value::dict_from([
            ("age", "36/41/29"),
            ("dept", "eng/ops/eng"),
            ("name", "ada/bob/cy"),
        ]))
    );
}

#[test]
fn test_row_map_and_whole_table() {
    let text = format!(
        "{PEOPLE}\n\
         $1 | get \"name\" |> upper\n\
         $1 || sortby \"age\" | get \"name\"\n\
         $1 || count\n\
         $2 |> join \", \""
    );
    let results = run_script(&text).unwrap();
    assert_eq!(results[1], Ok(strs(&["ADA", "BOB", "CY"])));
    assert_eq!(results[2], Ok(strs(&["cy", "ada", "bob"])));
    assert_eq!(results[3], Ok(Value::int(3)));
    assert_eq!(results[4], Ok(Value::str("ADA, BOB, CY")));
}

#[test]
fn test_implicit_previous_line() {
    let results = run_script("a-b-c\n!split \"-\"\n!upper\n\n# the blank line above passes through\n!join").unwrap();
    assert_eq!(results[1], Ok(strs(&["a", "b", "c"])));
    assert_eq!(results[2], Ok(strs(&["A", "B", "C"])));
    assert_eq!(results[3], Ok(strs(&["A", "B", "C"])));
    assert_eq!(results[5], Ok(Value::str("A B C")));
}

#[test]
fn test_split_broadcasts_into_a_box() {
    let results = run_script("[\"a b\", \"c\"]\n$1 |> split |> len").unwrap();
    assert_eq!(
        results[1],
        Ok(Value::list(vec![Scalar::Int(2), Scalar::Int(1)]))
    );
}

#[test]
fn test_line_continuation() {
    let script = load_script("[1, 2, 3] \\\n  |> sum\n$1 + 1").unwrap();
    assert_eq!(script.len(), 2);
    assert_eq!(script.evaluate(line(2)).unwrap(), Value::int(7));
}

#[test]
fn test_forward_reference_evaluates_target_once() {
    let script = load_script("$5 + 1\n$5 + 2\n$1 + $2\n\n10").unwrap();
    assert_eq!(script.evaluate(line(3)).unwrap(), Value::int(23));
    assert_eq!(script.evaluations(line(5)), Some(1));
}

#[test]
fn test_cycle_and_dependents() {
    let results = run_script("$2 + 1\n$1 + 1\n$2 |> upper\nok").unwrap();
    let cycle = EvalError::CyclicReference {
        cycle: vec![line(1), line(2)],
    };
    assert_eq!(results[0], Err(cycle.clone()));
    assert_eq!(results[1], Err(cycle));
    assert_eq!(results[2], Err(EvalError::DependencyFailed { line: line(2) }));
    assert_eq!(results[3], Ok(Value::str("ok")));
}

#[test]
fn test_edit_then_reevaluate() {
    let script = load_script("1\n2\n$5 + 1\nx\n10").unwrap();
    assert_eq!(script.evaluate(line(3)).unwrap(), Value::int(11));
    script.edit(line(5), "41").unwrap();
    assert_eq!(script.status(line(3)), Some(LineStatus::Unparsed));
    assert_eq!(script.evaluate(line(3)).unwrap(), Value::int(42));
}

#[test]
fn test_partial_application_and_chain() {
    let results = run_script(
        "[1, 2, 3]\n\
         $1 |> map (+ 10) |> sum\n\
         !chain v=$1 (map (+ 1)) (sum)\n\
         $1 |> format \"<{}>\" |> join \"\"",
    )
    .unwrap();
    assert_eq!(results[1], Ok(Value::int(36)));
    assert_eq!(results[2], Ok(Value::int(9)));
    assert_eq!(results[3], Ok(Value::str("<1><2><3>")));
}

#[test]
fn test_error_kinds_surface_per_line() {
    let results = run_script(
        "!nosuch v=1\n\
         [1, 2] |> sortby \"x\"\n\
         \"a\" |> sum\n\
         {a: 1} |> get \"b\"\n\
         \"x\" |> int\n\
         $9",
    )
    .unwrap();
    assert!(matches!(results[0], Err(EvalError::UnknownOperator { .. })));
    assert!(matches!(results[1], Err(EvalError::RankMismatch { .. })));
    assert!(matches!(results[2], Err(EvalError::RankMismatch { .. })));
    assert!(matches!(results[3], Err(EvalError::MissingKey { .. })));
    assert!(matches!(results[4], Err(EvalError::TypeMismatch { .. })));
    assert_eq!(results[5], Err(EvalError::UndefinedLineReference { line: 9 }));
}

#[test]
fn test_query_sigil_is_rejected() {
    let results = run_script("? select name").unwrap();
    assert!(matches!(results[0], Err(EvalError::Parse { .. })));
}

#[test]
fn test_parallel_lines_match_sequential() {
    let text = format!(
        "{PEOPLE}\n\
         & $1 | get \"age\"\n\
         & $1 | get \"name\" |> &upper\n\
         & $2 |> sum\n\
         $4 + 1\n\
         & $3 |> join \"+\""
    );
    let sequential =
        load_script_with(&text, ScriptConfig::single_threaded(), brierc::global_registry()).unwrap();
    let expected = sequential.evaluate_all();
    assert_eq!(expected[4], Ok(Value::int(107)));
    assert_eq!(expected[5], Ok(Value::str("ADA+BOB+CY")));
    for _ in 0..10 {
        let parallel = load_script_with(&text, ScriptConfig::with_threads(4), brierc::global_registry()).unwrap();
        assert_eq!(parallel.evaluate_all(), expected);
    }
}

#[test]
fn test_custom_operator() {
    let mut registry = OperatorRegistry::with_builtins();
    registry
        .register("initial", Rank::Scalar, Rank::Scalar, 0, |value: &Value, _| {
            let first = value.as_scalar().and_then(Scalar::as_str).and_then(|s| s.chars().next());
            Ok(Value::str(first.map(String::from).unwrap_or_default()))
        })
        .unwrap();
    let err = registry
        .register("sum", Rank::Column, Rank::Scalar, 0, |value: &Value, _| Ok(value.clone()))
        .unwrap_err();
    assert_eq!(err, EvalError::DuplicateOperatorName { name: "sum".into() });

    let script = load_script_with(
        &format!("{PEOPLE}\n$1 | get \"name\" |> initial |> join \"\""),
        ScriptConfig::default(),
        registry.into_shared(),
    )
    .unwrap();
    assert_eq!(script.evaluate(line(2)).unwrap(), Value::str("abc"));
}

#[test]
fn test_named_operands() {
    let results = run_script(
        "[\"a\", \"b\"]\n\
         $1 |> join sep=\"-\"\n\
         $1 |> join bogus=\"-\"\n\
         $1 |> upper sep=\"-\"\n\
         $1 |> (upper |> format) fmt=\"<{}>\"",
    )
    .unwrap();
    assert_eq!(results[1], Ok(Value::str("a-b")));
    assert_eq!(
        results[2],
        Err(EvalError::UnknownOperandName {
            op: "join".into(),
            name: "bogus".into(),
        })
    );
    assert!(matches!(results[3], Err(EvalError::UnknownOperandName { .. })));
    // a derived operator takes the name of its open slot's operand
    assert_eq!(results[4], Ok(strs(&["<A>", "<B>"])));
}

#[test]
fn test_inspect_operators_from_a_script() {
    let results = run_script("[\"join\", \"sum\"]\n$1 |> inspect\n$2 | get \"operand\"\n\"len\" |> inspect").unwrap();
    assert_eq!(results[2], Ok(strs(&["sep", ""])));
    assert_eq!(
        results[3],
        Ok(Value::dict_from([
            ("arity", Scalar::Int(0)),
            ("name", Scalar::str("len")),
            ("operand", Scalar::str("")),
            ("rankin", Scalar::Float(1.0)),
            ("rankout", Scalar::Float(0.0)),
        ]))
    );
}

#[test]
fn test_tracing_init_is_idempotent() {
    init_tracing();
    init_tracing();
}

use brier_ir::{Expr, LineAst, LineIndex, ParseError, Rank, Scalar, Value};
use brier_ops::{EvalError, EvalResult, OperatorRegistry};
use brier_parse::BrierParser;
use pretty_assertions::assert_eq;

use super::Script;
use crate::config::ScriptConfig;
use crate::line::{LineStatus, Phase};

fn line(n: usize) -> LineIndex {
    LineIndex::new(n).unwrap()
}

fn script(lines: &[&str]) -> Script {
    Script::new(lines.iter().copied(), BrierParser).unwrap()
}

fn script_with(lines: &[&str], config: ScriptConfig) -> Script {
    Script::builder(lines.iter().copied(), BrierParser)
        .config(config)
        .build()
        .unwrap()
}

#[test]
fn test_every_line_is_parsed_up_front() {
    let s = script(&["1", "$1 + 1"]);
    assert_eq!(s.len(), 2);
    assert_eq!(s.status(line(1)), Some(LineStatus::Parsed));
    assert_eq!(s.status(line(2)), Some(LineStatus::Parsed));
    assert_eq!(s.value(line(2)), None);
    assert_eq!(s.status(line(3)), None);
}

#[test]
fn test_forward_reference() {
    let s = script(&["$5 + 1", "b", "c", "d", "10"]);
    assert_eq!(s.evaluate(line(1)).unwrap(), Value::int(11));
    assert_eq!(s.status(line(5)), Some(LineStatus::Evaluated));
    assert_eq!(s.evaluations(line(5)), Some(1));
    // Lines nobody asked for stay unevaluated.
    assert_eq!(s.status(line(2)), Some(LineStatus::Parsed));
}

#[test]
fn test_shared_dependency_is_evaluated_once() {
    let s = script(&["$5 + 1", "$5 + 2", "$5 |> !+ 3", "$1 + $2", "10"]);
    let results: Vec<Value> = s.evaluate_all().into_iter().map(Result::unwrap).collect();
    assert_eq!(
        results,
        vec![
            Value::int(11),
            Value::int(12),
            Value::int(13),
            Value::int(23),
            Value::int(10),
        ]
    );
    assert_eq!(s.evaluations(line(5)), Some(1));
    assert_eq!(s.evaluations(line(1)), Some(1));
}

#[test]
fn test_cycle_fails_every_member() {
    let s = script(&["$2", "$1 + 1", "$1 |> !+ 1", "7"]);
    let cycle = EvalError::CyclicReference {
        cycle: vec![line(1), line(2)],
    };
    assert_eq!(s.evaluate(line(2)).unwrap_err(), cycle);
    assert_eq!(s.evaluate(line(1)).unwrap_err(), cycle);
    assert_eq!(
        s.evaluate(line(3)).unwrap_err(),
        EvalError::DependencyFailed { line: line(1) }
    );
    assert_eq!(s.evaluate(line(4)).unwrap(), Value::int(7));
    assert_eq!(s.status(line(1)), Some(LineStatus::Error));
}

#[test]
fn test_self_reference() {
    let s = script(&["$1 + 1"]);
    assert_eq!(
        s.evaluate(line(1)).unwrap_err(),
        EvalError::CyclicReference { cycle: vec![line(1)] }
    );
}

#[test]
fn test_cycle_error_does_not_depend_on_entry_point() {
    let lines = ["$3", "$1", "$2", "$2 + 1"];
    let forward = script(&lines);
    let backward = script(&lines);
    let forward: Vec<_> = (1..=4).map(|n| forward.evaluate(line(n))).collect();
    let mut backward: Vec<_> = (1..=4).rev().map(|n| backward.evaluate(line(n))).collect();
    backward.reverse();
    assert_eq!(forward, backward);
    assert_eq!(
        forward[0],
        Err(EvalError::CyclicReference {
            cycle: vec![line(1), line(2), line(3)],
        })
    );
    assert_eq!(forward[3], Err(EvalError::DependencyFailed { line: line(2) }));
}

#[test]
fn test_failed_dependency_short_circuits() {
    let s = script(&["!nosuch v=1", "$1 + 1", "$2 + 1"]);
    assert_eq!(
        s.evaluate(line(1)).unwrap_err(),
        EvalError::UnknownOperator {
            name: "nosuch".into()
        }
    );
    assert_eq!(
        s.evaluate(line(3)).unwrap_err(),
        EvalError::DependencyFailed { line: line(2) }
    );
    assert_eq!(
        s.error(line(2)),
        Some(EvalError::DependencyFailed { line: line(1) })
    );
}

#[test]
fn test_undefined_line_reference() {
    let s = script(&["$9 + 1"]);
    assert_eq!(
        s.evaluate(line(1)).unwrap_err(),
        EvalError::UndefinedLineReference { line: 9 }
    );
    assert_eq!(
        s.evaluate(line(2)).unwrap_err(),
        EvalError::UndefinedLineReference { line: 2 }
    );
}

#[test]
fn test_parse_error_is_line_local() {
    let s = script(&["$1 +", "2", "$1"]);
    assert!(matches!(
        s.evaluate(line(1)),
        Err(EvalError::Parse { line: l, .. }) if l == line(1)
    ));
    assert_eq!(s.status(line(1)), Some(LineStatus::Error));
    assert_eq!(s.evaluations(line(1)), Some(0));
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::int(2));
    assert_eq!(
        s.evaluate(line(3)).unwrap_err(),
        EvalError::DependencyFailed { line: line(1) }
    );
}

#[test]
fn test_edit_invalidates_dependents() {
    let s = script(&["1", "2", "$5 + 1", "$3 + 1", "10"]);
    assert_eq!(s.evaluate(line(4)).unwrap(), Value::int(12));

    let invalidated = s.edit(line(5), "20").unwrap();
    assert_eq!(invalidated, vec![line(3), line(4), line(5)]);
    assert_eq!(s.status(line(3)), Some(LineStatus::Unparsed));
    assert_eq!(s.value(line(3)), None);
    assert_eq!(s.status(line(1)), Some(LineStatus::Parsed));

    assert_eq!(s.evaluate(line(4)).unwrap(), Value::int(22));
    assert_eq!(s.evaluations(line(3)), Some(2));
    assert_eq!(s.source(line(5)).as_deref(), Some("20"));
}

#[test]
fn test_edit_to_same_text_is_a_no_op() {
    let s = script(&["10", "$1 + 1"]);
    s.evaluate(line(2)).unwrap();
    assert!(s.edit(line(1), "10").unwrap().is_empty());
    assert_eq!(s.status(line(2)), Some(LineStatus::Evaluated));
    assert_eq!(s.evaluations(line(2)), Some(1));
}

#[test]
fn test_edit_can_create_and_break_cycles() {
    let s = script(&["1", "$1 + 1"]);
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::int(2));
    s.edit(line(1), "$2").unwrap();
    assert!(matches!(s.evaluate(line(2)), Err(EvalError::CyclicReference { .. })));
    s.edit(line(1), "5").unwrap();
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::int(6));
}

#[test]
fn test_edit_out_of_range() {
    let s = script(&["1"]);
    assert_eq!(
        s.edit(line(3), "x").unwrap_err(),
        EvalError::UndefinedLineReference { line: 3 }
    );
}

#[test]
fn test_edit_intrinsic() {
    let s = script(&["3", r#"!edit 1 "7""#, "$1 + 1"]);
    assert_eq!(s.evaluate(line(3)).unwrap(), Value::int(4));
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::str("7"));
    assert_eq!(s.status(line(3)), Some(LineStatus::Unparsed));
    assert_eq!(s.evaluate(line(3)).unwrap(), Value::int(8));
}

#[test]
fn test_line_editing_itself_is_recomputed() {
    let s = script(&[r#"!edit 1 "5""#]);
    assert_eq!(s.evaluate(line(1)).unwrap(), Value::int(5));
    assert_eq!(s.source(line(1)).as_deref(), Some("5"));
    assert_eq!(s.evaluations(line(1)), Some(1));
}

#[test]
fn test_lines_intrinsic() {
    let s = script(&["a", "!lines", "!lines 1", "!lines 9"]);
    assert_eq!(
        s.evaluate(line(2)).unwrap(),
        Value::list(vec![
            Scalar::from("a"),
            Scalar::from("!lines"),
            Scalar::from("!lines 1"),
            Scalar::from("!lines 9"),
        ])
    );
    assert_eq!(s.evaluate(line(3)).unwrap(), Value::str("a"));
    assert_eq!(
        s.evaluate(line(4)).unwrap_err(),
        EvalError::UndefinedLineReference { line: 9 }
    );
}

#[test]
fn test_linesobj_parses_without_evaluating() {
    let s = script(&["& $2 + 1", "5", "!linesobj 1"]);
    assert_eq!(
        s.evaluate(line(3)).unwrap(),
        Value::dict_from([
            ("deps", Scalar::from("$2")),
            ("expr", Scalar::from("$2 |> !+ 1")),
            ("line", Scalar::Int(1)),
            ("parallel", Scalar::Int(1)),
        ])
    );
    assert_eq!(s.status(line(1)), Some(LineStatus::Parsed));
    assert_eq!(s.status(line(2)), Some(LineStatus::Parsed));

    let ast = s.lines_obj(line(1)).unwrap();
    assert!(ast.parallel);
    assert_eq!(s.dependencies(line(1)).unwrap(), vec![line(2)]);
}

#[test]
fn test_missing_argument() {
    let s = script(&["!upper"]);
    assert_eq!(
        s.evaluate(line(1)).unwrap_err(),
        EvalError::MissingArgument { op: "upper".into() }
    );
}

#[test]
fn test_pipeline_modes() {
    let s = script(&[
        r#"[{name: "b", n: 2}, {name: "a", n: 1}]"#,
        "$1 | get key=\"name\"",
        "$1 || sortby key=\"n\" | get \"name\"",
        "$1 || count",
        r#"$2 |> join ",""#,
    ]);
    assert_eq!(
        s.evaluate(line(2)).unwrap(),
        Value::list(vec![Scalar::from("b"), Scalar::from("a")])
    );
    assert_eq!(
        s.evaluate(line(3)).unwrap(),
        Value::list(vec![Scalar::from("a"), Scalar::from("b")])
    );
    assert_eq!(s.evaluate(line(4)).unwrap(), Value::int(2));
    assert_eq!(s.evaluate(line(5)).unwrap(), Value::str("b,a"));
}

#[test]
fn test_chain_and_operator_operands() {
    let s = script(&[
        "[1, 2, 3]",
        "$1 |> map (+ 10)",
        "$1 |> (+ 1 |> + 1)",
        r#"!chain v=1.23456 (format "{:.2f}") (+ "!")"#,
    ]);
    assert_eq!(
        s.evaluate(line(2)).unwrap(),
        Value::list(vec![Scalar::Int(11), Scalar::Int(12), Scalar::Int(13)])
    );
    assert_eq!(
        s.evaluate(line(3)).unwrap(),
        Value::list(vec![Scalar::Int(3), Scalar::Int(4), Scalar::Int(5)])
    );
    assert_eq!(s.evaluate(line(4)).unwrap(), Value::str("1.23!"));
}

#[test]
fn test_custom_registry() {
    let mut registry = OperatorRegistry::with_builtins();
    registry
        .register("double", Rank::Scalar, Rank::Scalar, 0, |value: &Value, _| {
            match value.as_scalar() {
                Some(Scalar::Int(n)) => Ok(Value::int(n * 2)),
                _ => Ok(value.clone()),
            }
        })
        .unwrap();
    let s = Script::builder(["[1, 2]", "$1 |> double |> sum"], BrierParser)
        .registry(registry.into_shared())
        .build()
        .unwrap();
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::int(6));
}

#[test]
fn test_custom_parser() {
    let parser = |index: LineIndex, source: &str| -> Result<LineAst, ParseError> {
        let len = i64::try_from(source.len()).unwrap();
        Ok(LineAst::new(index, Expr::Literal(Value::int(len)), false))
    };
    let s = Script::new(["abc", ""], parser).unwrap();
    let results: Vec<_> = s.evaluate_all().into_iter().map(Result::unwrap).collect();
    assert_eq!(results, vec![Value::int(3), Value::int(0)]);
}

const PARALLEL_SCRIPT: &[&str] = &[
    "[1, 2, 3, 4]",
    "& $1 |> !+ 10",
    "& $1 |> &!+ 20",
    "& $2 |> !sum",
    "& $3 |> !sum",
    "$4 + $5",
    r#"$6 |> !format "total {}""#,
    "& $8 + 1",
    "$8 + 1",
    "& $7",
];

#[test]
fn test_parallel_lines() {
    let s = script_with(PARALLEL_SCRIPT, ScriptConfig::with_threads(4));
    let results = s.evaluate_all();
    assert_eq!(results[5], Ok(Value::int(140)));
    assert_eq!(results[6], Ok(Value::str("total 140")));
    assert_eq!(results[9], Ok(Value::str("total 140")));
    assert_eq!(
        results[7],
        Err(EvalError::CyclicReference { cycle: vec![line(8)] })
    );
    assert_eq!(results[8], Err(EvalError::DependencyFailed { line: line(8) }));
    for n in 1..=PARALLEL_SCRIPT.len() {
        assert_eq!(s.evaluations(line(n)), Some(1), "line {n}");
    }
}

#[test]
fn test_determinism_under_concurrency() {
    let sequential = script_with(PARALLEL_SCRIPT, ScriptConfig::single_threaded()).evaluate_all();
    for _ in 0..20 {
        let parallel = script_with(PARALLEL_SCRIPT, ScriptConfig::with_threads(4)).evaluate_all();
        assert_eq!(parallel, sequential);
    }
}

#[test]
fn test_concurrent_requesters_share_one_evaluation() {
    let lines: Vec<String> = std::iter::once("0".to_string())
        .chain((2..=200).map(|n| format!("${} + 1", n - 1)))
        .collect();
    let s = Script::new(lines.iter().map(String::as_str), BrierParser).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                assert_eq!(s.evaluate(line(200)).unwrap(), Value::int(199));
            });
        }
    });
    for n in 1..=200 {
        assert_eq!(s.evaluations(line(n)), Some(1), "line {n}");
    }
}

#[test]
fn test_deep_reference_chain() {
    let lines: Vec<String> = std::iter::once("0".to_string())
        .chain((2..=10_000).map(|n| format!("${} + 1", n - 1)))
        .collect();
    let s = Script::new(lines, BrierParser).unwrap();
    assert_eq!(s.evaluate(line(10_000)).unwrap(), Value::int(9_999));
}

#[test]
fn test_panicking_operator_fails_the_line() {
    let mut registry = OperatorRegistry::with_builtins();
    registry
        .register("boom", Rank::Scalar, Rank::Scalar, 0, |_: &Value, _| -> EvalResult {
            panic!("operator blew up")
        })
        .unwrap();
    let s = Script::builder(["1.5", "$1 |> boom", "$2"], BrierParser)
        .registry(registry.into_shared())
        .build()
        .unwrap();

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| s.evaluate(line(2))));
    assert!(unwound.is_err());
    assert_eq!(s.status(line(2)), Some(LineStatus::Error));
    assert_eq!(s.error(line(2)), Some(EvalError::Panicked { line: line(2) }));

    // Another thread asking for a dependent gets an answer instead of waiting.
    let dependent = std::thread::scope(|scope| scope.spawn(|| s.evaluate(line(3))).join().unwrap());
    assert_eq!(dependent, Err(EvalError::DependencyFailed { line: line(2) }));
}

#[test]
fn test_oversized_format_precision_is_a_line_error() {
    let s = script(&["1.5", r#"$1 |> format "{:.70000}""#, "$2"]);
    assert!(matches!(
        s.evaluate(line(2)),
        Err(EvalError::TypeMismatch { .. })
    ));
    assert_eq!(s.status(line(2)), Some(LineStatus::Error));
    assert_eq!(
        s.evaluate(line(3)),
        Err(EvalError::DependencyFailed { line: line(2) })
    );
}

/// Mark a line as being evaluated further down this thread's stack.
fn own_line(s: &Script, n: usize) {
    let ast = s.lines_obj(line(n)).unwrap();
    s.lines.read()[n - 1].state.lock().phase = Phase::Evaluating {
        ast,
        owner: std::thread::current().id(),
    };
}

#[test]
fn test_reentered_line_runs_inline_without_commit() {
    let s = script(&["1", "$1 + 1"]);
    own_line(&s, 1);
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::int(2));
    assert_eq!(s.status(line(1)), Some(LineStatus::Evaluating));
    assert_eq!(s.evaluations(line(1)), Some(0));
    assert_eq!(s.evaluations(line(2)), Some(1));
}

#[test]
fn test_reentered_edit_is_idempotent() {
    let s = script(&["a", r#"!edit 1 "b""#, "$2"]);
    own_line(&s, 2);
    assert_eq!(s.evaluate(line(3)).unwrap(), Value::str("b"));
    assert_eq!(s.evaluate(line(1)).unwrap(), Value::str("b"));

    // Running the edit again leaves line 1 evaluated.
    assert_eq!(s.evaluate(line(2)).unwrap(), Value::str("b"));
    assert_eq!(s.status(line(1)), Some(LineStatus::Evaluated));
    assert_eq!(s.evaluations(line(1)), Some(1));
}

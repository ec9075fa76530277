// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use cspta::ir::builder::ProgramBuilder;
use cspta::ir::program::{Program, VarType};
use cspta::util::options::AnalysisOptions;
use cspta::{analyze_program, PtaError};

const TRIVIAL_CALL: &str = include_str!("fixtures/trivial_call.json");

#[test_log::test]
fn unknown_callee_names_the_call() {
    let mut pb = ProgramBuilder::new();
    let p = pb.global("p", VarType::POINTER);
    {
        let mut fb = pb.function("main");
        let a = fb.local("a", VarType::Scalar);
        fb.addr_of(p, a);
        fb.call("missing", &[p], None);
    }
    let program = pb.build().unwrap();
    match analyze_program(&program, AnalysisOptions::default()) {
        Err(PtaError::UnresolvedCallee { callee, caller, index }) => {
            assert_eq!(callee, "missing");
            assert_eq!(caller, "main");
            assert_eq!(index, 1);
        }
        other => panic!("expected an unresolved callee, got {:?}", other),
    }
}

#[test_log::test]
fn ill_typed_statement_is_reported_with_its_position() {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let p = pb.global("p", VarType::POINTER);
    let q = pb.global("q", VarType::POINTER);
    // `q = *a` dereferences a scalar.
    pb.function("bad").addr_of(p, a).load(q, a);
    let program = pb.build().unwrap();
    match analyze_program(&program, AnalysisOptions::default()) {
        Err(PtaError::MalformedStatement { function, index, .. }) => {
            assert_eq!(function, "bad");
            assert_eq!(index, 1);
        }
        other => panic!("expected a malformed statement, got {:?}", other),
    }
}

#[test_log::test]
fn foreign_locals_are_not_visible() {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let l = {
        let mut fb = pb.function("owner");
        fb.local("l", VarType::POINTER)
    };
    pb.function("thief").addr_of(l, a);
    let program = pb.build().unwrap();
    let err = analyze_program(&program, AnalysisOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        PtaError::MalformedStatement { ref function, index: 0, .. } if function == "thief"
    ));
    assert!(err.to_string().contains("not visible"), "{}", err);
}

#[test_log::test]
fn malformed_functions_can_be_isolated() {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let p = pb.global("p", VarType::POINTER);
    let q = pb.global("q", VarType::POINTER);
    pb.function("good").addr_of(p, a);
    pb.function("bad").addr_of(q, a).copy(q, a);
    let program = pb.build().unwrap();

    let options = AnalysisOptions {
        isolate_malformed_functions: true,
        ..AnalysisOptions::default()
    };
    let results = analyze_program(&program, options).unwrap();
    assert_eq!(results.points_to(p, None).len(), 1);
    // None of `bad` is analysed, including its well-formed first statement.
    assert!(results.points_to(q, None).is_empty());

    assert!(analyze_program(&program, AnalysisOptions::default()).is_err());
}

#[test_log::test]
fn call_arity_is_checked() {
    let mut pb = ProgramBuilder::new();
    let p = pb.global("p", VarType::POINTER);
    {
        let mut fb = pb.function("callee");
        fb.param("x", VarType::POINTER);
        fb.param("y", VarType::POINTER);
    }
    pb.function("caller").call("callee", &[p], None);
    let program = pb.build().unwrap();
    let err = analyze_program(&program, AnalysisOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        PtaError::MalformedStatement { ref function, index: 0, .. } if function == "caller"
    ));
}

#[test_log::test]
fn callers_with_unbindable_calls_can_be_isolated() {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let p = pb.global("p", VarType::POINTER);
    let q = pb.global("q", VarType::POINTER);
    {
        let mut fb = pb.function("callee");
        fb.param("x", VarType::POINTER);
        fb.param("y", VarType::POINTER);
    }
    // `callee(q)` is one argument short.
    pb.function("bad_caller").addr_of(q, a).call("callee", &[q], None);
    pb.function("good").addr_of(p, a);
    let program = pb.build().unwrap();

    let options = AnalysisOptions {
        isolate_malformed_functions: true,
        ..AnalysisOptions::default()
    };
    let results = analyze_program(&program, options).unwrap();
    assert_eq!(results.points_to(p, None).len(), 1);
    assert!(results.points_to(q, None).is_empty());
    let bad_caller = program.function_by_name("bad_caller").unwrap();
    assert!(results.contexts_of(bad_caller).is_empty());
    // Without its only caller, `callee` is analysed as a root.
    let callee = program.function_by_name("callee").unwrap();
    assert_eq!(results.contexts_of(callee).len(), 1);

    let err = analyze_program(&program, AnalysisOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        PtaError::MalformedStatement { ref function, index: 1, .. } if function == "bad_caller"
    ));
}

#[test_log::test]
fn result_of_a_void_call_cannot_be_bound() {
    let mut pb = ProgramBuilder::new();
    let p = pb.global("p", VarType::POINTER);
    pb.function("void_fn");
    pb.function("caller").call("void_fn", &[], Some(p));
    let program = pb.build().unwrap();
    let err = analyze_program(&program, AnalysisOptions::default()).unwrap_err();
    assert!(err.to_string().contains("does not return a value"), "{}", err);
}

#[test_log::test]
fn iteration_budget_is_enforced() {
    let program = Program::from_json(TRIVIAL_CALL).unwrap();
    let options = AnalysisOptions {
        max_iterations: Some(0),
        ..AnalysisOptions::default()
    };
    let err = analyze_program(&program, options).unwrap_err();
    assert!(matches!(err, PtaError::InternalInvariantViolation(_)), "{:?}", err);

    let options = AnalysisOptions {
        max_iterations: Some(1000),
        ..AnalysisOptions::default()
    };
    assert!(analyze_program(&program, options).is_ok());
}

#[test_log::test]
fn unknown_entry_function_is_rejected() {
    let program = Program::from_json(TRIVIAL_CALL).unwrap();
    let options = AnalysisOptions {
        entry_func: Some("main".to_string()),
        ..AnalysisOptions::default()
    };
    let err = analyze_program(&program, options).unwrap_err();
    assert!(matches!(err, PtaError::InvalidProgram(_)), "{:?}", err);
}

#[test_log::test]
fn entry_function_limits_what_is_reached() {
    let program = Program::from_json(TRIVIAL_CALL).unwrap();
    let q = program.variable_by_name(None, "q").unwrap();
    let callee = program.function_by_name("callee").unwrap();

    // From `caller` only `callee` is reached; `setup` never runs.
    let options = AnalysisOptions {
        entry_func: Some("caller".to_string()),
        ..AnalysisOptions::default()
    };
    let results = analyze_program(&program, options).unwrap();
    assert!(results.points_to(q, None).is_empty());
    assert_eq!(results.contexts_of(callee).len(), 1);

    let options = AnalysisOptions {
        entry_func: Some("setup".to_string()),
        ..AnalysisOptions::default()
    };
    let results = analyze_program(&program, options).unwrap();
    assert_eq!(results.points_to(q, None).len(), 1);
    assert!(results.contexts_of(callee).is_empty());
}

#[test_log::test]
fn options_come_from_flags() {
    let mut options = AnalysisOptions::default();
    let args: Vec<String> = ["--entry-func", "setup", "--context-depth", "2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    options.parse_from_args(&args).unwrap();
    assert_eq!(options.context_depth, 2);

    let program = Program::from_json(TRIVIAL_CALL).unwrap();
    let results = analyze_program(&program, options).unwrap();
    assert_eq!(results.num_contexts(), 1);
}

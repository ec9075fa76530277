// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! `trivial-call.c`: `p` picks up two edges from `q` at the same step of
//! the algorithm, which used to be lost to context clobbering at the call.

use std::collections::BTreeSet;

use cspta::analyze_program;
use cspta::ir::builder::ProgramBuilder;
use cspta::ir::context::GLOBAL;
use cspta::ir::program::{Program, VarId, VarType};
use cspta::pta::results::{Location, PTAResults};
use cspta::pta::PTAType;
use cspta::util::options::AnalysisOptions;

const TRIVIAL_CALL: &str = include_str!("fixtures/trivial_call.json");

fn var(program: &Program, func: Option<&str>, name: &str) -> VarId {
    let func = func.map(|f| program.function_by_name(f).unwrap());
    program.variable_by_name(func, name).unwrap()
}

fn names<'p>(program: &'p Program, results: &PTAResults, locs: &BTreeSet<Location>) -> Vec<&'p str> {
    locs.iter().map(|loc| results.location_name(program, *loc)).collect()
}

#[test_log::test]
fn fixture_q_points_to_a() {
    let program = Program::from_json(TRIVIAL_CALL).unwrap();
    let results = analyze_program(&program, AnalysisOptions::default()).unwrap();

    let q = var(&program, None, "q");
    assert_eq!(names(&program, &results, &results.points_to(q, None)), vec!["a"]);
    assert_eq!(results.points_to(q, Some(GLOBAL)), results.points_to(q, None));
}

#[test_log::test]
fn fixture_callee_runs_under_the_call_site_context() {
    let program = Program::from_json(TRIVIAL_CALL).unwrap();
    let results = analyze_program(&program, AnalysisOptions::default()).unwrap();

    let caller = program.function_by_name("caller").unwrap();
    let callee = program.function_by_name("callee").unwrap();
    let (site, ..) = program
        .call_sites()
        .map(|s| (s.call_site().unwrap(), s.func))
        .find(|(_, func)| *func == caller)
        .unwrap();

    let contexts = results.callee_contexts(site);
    assert_eq!(contexts.len(), 1);
    let ctx = *contexts.iter().next().unwrap();
    assert_ne!(ctx, GLOBAL);
    assert_eq!(results.contexts_of(callee), contexts);
    let elems = results.context_elements(ctx).unwrap();
    assert_eq!(elems.len(), 1);
    assert_eq!((elems[0].func, elems[0].site), (caller, site));

    // `p` is never assigned, so `ptr` receives exactly what `p` has: nothing.
    let p = var(&program, None, "p");
    let ptr = var(&program, Some("callee"), "ptr");
    assert_eq!(results.points_to(ptr, Some(ctx)), results.points_to(p, None));
    assert!(results.points_to(ptr, None).is_empty());
}

#[test_log::test]
fn binding_receives_what_the_actual_points_to() {
    // trivial-call.c with `p = &b` added to setup.
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let b = pb.global("b", VarType::Scalar);
    let p = pb.global("p", VarType::POINTER);
    let q = pb.global("q", VarType::POINTER);
    let ptr = {
        let mut fb = pb.function("callee");
        let ptr = fb.param("ptr", VarType::POINTER);
        let tmp = fb.local("tmp", VarType::Scalar);
        fb.load(tmp, q).store(ptr, tmp);
        ptr
    };
    let site = pb.function("caller").call("callee", &[p], None);
    pb.function("setup").addr_of(q, a).addr_of(p, b);
    let program = pb.build().unwrap();

    let results = analyze_program(&program, AnalysisOptions::default()).unwrap();
    let ctx = *results.callee_contexts(site).iter().next().unwrap();
    assert_eq!(names(&program, &results, &results.points_to(ptr, Some(ctx))), vec!["b"]);
    assert_eq!(names(&program, &results, &results.points_to(q, None)), vec!["a"]);
}

/// The pointer-to-pointer reading of the fixture: `callee(int **ptr) { *ptr = q; }`
/// called as `callee(pp)` and `callee(pq)`, so that both `p` and `r` pick up
/// the edge from `q` while the two bindings of `ptr` are live together.
fn double_indirection(pta_type: PTAType) -> (Program, PTAResults) {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let p = pb.global("p", VarType::POINTER);
    let q = pb.global("q", VarType::POINTER);
    let r = pb.global("r", VarType::POINTER);
    let pq = pb.global("pq", VarType::POINTER_TO_POINTER);
    let pp = pb.global("pp", VarType::POINTER_TO_POINTER);
    {
        let mut fb = pb.function("callee");
        let ptr = fb.param("ptr", VarType::POINTER_TO_POINTER);
        fb.store(ptr, q);
    }
    {
        let mut fb = pb.function("caller");
        fb.call("callee", &[pp], None);
        fb.call("callee", &[pq], None);
    }
    pb.function("setup").addr_of(q, a).addr_of(pp, p).addr_of(pq, r);
    let program = pb.build().unwrap();
    let options = AnalysisOptions {
        pta_type,
        ..AnalysisOptions::default()
    };
    let results = analyze_program(&program, options).unwrap();
    (program, results)
}

#[test_log::test]
fn both_stores_through_the_parameter_survive() {
    for pta_type in [PTAType::CallSiteSensitive, PTAType::Andersen] {
        let (program, results) = double_indirection(pta_type);
        let p = var(&program, None, "p");
        let r = var(&program, None, "r");
        assert_eq!(names(&program, &results, &results.points_to(p, None)), vec!["a"], "{:?}", pta_type);
        assert_eq!(names(&program, &results, &results.points_to(r, None)), vec!["a"], "{:?}", pta_type);
    }
}

#[test_log::test]
fn parameter_bindings_stay_apart_per_context() {
    let (program, results) = double_indirection(PTAType::CallSiteSensitive);
    let ptr = var(&program, Some("callee"), "ptr");
    let callee = program.function_by_name("callee").unwrap();
    let contexts = results.contexts_of(callee);
    assert_eq!(contexts.len(), 2);

    let per_context: BTreeSet<Vec<&str>> = contexts
        .iter()
        .map(|ctx| names(&program, &results, &results.points_to(ptr, Some(*ctx))))
        .collect();
    let expected: BTreeSet<Vec<&str>> = [vec!["p"], vec!["r"]].into_iter().collect();
    assert_eq!(per_context, expected);
    assert_eq!(names(&program, &results, &results.points_to(ptr, None)), vec!["p", "r"]);
}

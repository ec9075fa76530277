// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeSet;

use cspta::analyze_program;
use cspta::ir::builder::ProgramBuilder;
use cspta::ir::context::GLOBAL;
use cspta::ir::program::{CallSiteId, Program, VarId, VarType};
use cspta::pta::results::{Location, PTAResults};
use cspta::pta::PTAType;
use cspta::util::options::AnalysisOptions;

fn options(pta_type: PTAType, context_depth: u32) -> AnalysisOptions {
    AnalysisOptions {
        pta_type,
        context_depth,
        ..AnalysisOptions::default()
    }
}

fn locs(vars: &[VarId]) -> BTreeSet<Location> {
    vars.iter().map(|v| Location::new(*v)).collect()
}

fn only_context(results: &PTAResults, site: CallSiteId) -> cspta::ir::context::ContextId {
    let contexts = results.callee_contexts(site);
    assert_eq!(contexts.len(), 1, "{:?} induced {:?}", site, contexts);
    *contexts.iter().next().unwrap()
}

/// `id(x) { return x; }` called from two sites with pointers to different globals.
struct Identity {
    program: Program,
    a: VarId,
    b: VarId,
    x: VarId,
    r1: VarId,
    r2: VarId,
    site1: CallSiteId,
    site2: CallSiteId,
}

fn identity_program() -> Identity {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let b = pb.global("b", VarType::Scalar);
    let r1 = pb.global("r1", VarType::POINTER);
    let r2 = pb.global("r2", VarType::POINTER);
    let x = {
        let mut fb = pb.function("id");
        let x = fb.param("x", VarType::POINTER);
        fb.returns(VarType::POINTER).ret(x);
        x
    };
    let (site1, site2) = {
        let mut fb = pb.function("main");
        let pa = fb.local("pa", VarType::POINTER);
        let pb_ = fb.local("pb", VarType::POINTER);
        fb.addr_of(pa, a).addr_of(pb_, b);
        let site1 = fb.call("id", &[pa], Some(r1));
        let site2 = fb.call("id", &[pb_], Some(r2));
        (site1, site2)
    };
    Identity {
        program: pb.build().unwrap(),
        a,
        b,
        x,
        r1,
        r2,
        site1,
        site2,
    }
}

#[test_log::test]
fn two_call_sites_do_not_clobber_each_other() {
    let id = identity_program();
    let results = analyze_program(&id.program, options(PTAType::CallSiteSensitive, 1)).unwrap();

    let ctx1 = only_context(&results, id.site1);
    let ctx2 = only_context(&results, id.site2);
    assert_ne!(ctx1, ctx2);

    // Each binding is visible under its own context...
    assert_eq!(results.points_to(id.x, Some(ctx1)), locs(&[id.a]));
    assert_eq!(results.points_to(id.x, Some(ctx2)), locs(&[id.b]));
    // ...and both show up in the context-insensitive view.
    assert_eq!(results.points_to(id.x, None), locs(&[id.a, id.b]));

    // Returns flow back to their own call site only.
    assert_eq!(results.points_to(id.r1, None), locs(&[id.a]));
    assert_eq!(results.points_to(id.r2, None), locs(&[id.b]));
}

#[test_log::test]
fn andersen_merges_the_call_sites() {
    let id = identity_program();
    let results = analyze_program(&id.program, options(PTAType::Andersen, 1)).unwrap();

    assert_eq!(results.callee_contexts(id.site1), [GLOBAL].into_iter().collect());
    assert_eq!(results.points_to(id.x, Some(GLOBAL)), locs(&[id.a, id.b]));
    assert_eq!(results.points_to(id.r1, None), locs(&[id.a, id.b]));
    assert_eq!(results.points_to(id.r2, None), locs(&[id.a, id.b]));
    assert_eq!(results.num_contexts(), 1);
}

#[test_log::test]
fn zero_depth_behaves_like_andersen() {
    let id = identity_program();
    let insensitive = analyze_program(&id.program, options(PTAType::Andersen, 1)).unwrap();
    let zero = analyze_program(&id.program, options(PTAType::CallSiteSensitive, 0)).unwrap();
    for (var, _) in id.program.variables() {
        assert_eq!(zero.points_to(var, None), insensitive.points_to(var, None));
    }
}

/// `main -> w1 -> id` and `main -> w2 -> id`: one level of call string
/// cannot tell the two `id` activations apart, two levels can.
fn wrapped_identity() -> (Program, VarId, VarId, VarId, VarId) {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let b = pb.global("b", VarType::Scalar);
    let g1 = pb.global("g1", VarType::POINTER);
    let g2 = pb.global("g2", VarType::POINTER);
    {
        let mut fb = pb.function("id");
        let x = fb.param("x", VarType::POINTER);
        fb.returns(VarType::POINTER).ret(x);
    }
    for wrapper in ["w1", "w2"] {
        let mut fb = pb.function(wrapper);
        let y = fb.param("y", VarType::POINTER);
        let t = fb.local("t", VarType::POINTER);
        fb.call("id", &[y], Some(t));
        fb.returns(VarType::POINTER).ret(t);
    }
    {
        let mut fb = pb.function("main");
        let pa = fb.local("pa", VarType::POINTER);
        let pb_ = fb.local("pb", VarType::POINTER);
        fb.addr_of(pa, a).addr_of(pb_, b);
        fb.call("w1", &[pa], Some(g1));
        fb.call("w2", &[pb_], Some(g2));
    }
    (pb.build().unwrap(), a, b, g1, g2)
}

#[test_log::test]
fn deeper_call_strings_separate_wrapped_calls() {
    let (program, a, b, g1, g2) = wrapped_identity();

    // With one call site of context, `id` is reached from two different
    // sites in w1 and w2, which already keeps the flows apart.
    let k1 = analyze_program(&program, options(PTAType::CallSiteSensitive, 1)).unwrap();
    assert_eq!(k1.points_to(g1, None), locs(&[a]));
    assert_eq!(k1.points_to(g2, None), locs(&[b]));

    let k2 = analyze_program(&program, options(PTAType::CallSiteSensitive, 2)).unwrap();
    assert_eq!(k2.points_to(g1, None), locs(&[a]));
    assert_eq!(k2.points_to(g2, None), locs(&[b]));
    let id = program.function_by_name("id").unwrap();
    for ctx in k2.contexts_of(id) {
        assert_eq!(k2.context_elements(ctx).unwrap().len(), 2);
    }

    let ci = analyze_program(&program, options(PTAType::Andersen, 1)).unwrap();
    assert_eq!(ci.points_to(g1, None), locs(&[a, b]));
}

/// Two sites in the same wrapper: k = 1 merges the flows through `id`,
/// k = 2 keeps them apart.
#[test_log::test]
fn shared_wrapper_needs_two_levels() {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let b = pb.global("b", VarType::Scalar);
    let g1 = pb.global("g1", VarType::POINTER);
    let g2 = pb.global("g2", VarType::POINTER);
    {
        let mut fb = pb.function("id");
        let x = fb.param("x", VarType::POINTER);
        fb.returns(VarType::POINTER).ret(x);
    }
    {
        let mut fb = pb.function("wrap");
        let y = fb.param("y", VarType::POINTER);
        let t = fb.local("t", VarType::POINTER);
        fb.call("id", &[y], Some(t));
        fb.returns(VarType::POINTER).ret(t);
    }
    {
        let mut fb = pb.function("main");
        let pa = fb.local("pa", VarType::POINTER);
        let pb_ = fb.local("pb", VarType::POINTER);
        fb.addr_of(pa, a).addr_of(pb_, b);
        fb.call("wrap", &[pa], Some(g1));
        fb.call("wrap", &[pb_], Some(g2));
    }
    let program = pb.build().unwrap();

    let k1 = analyze_program(&program, options(PTAType::CallSiteSensitive, 1)).unwrap();
    assert_eq!(k1.points_to(g1, None), locs(&[a, b]));

    let k2 = analyze_program(&program, options(PTAType::CallSiteSensitive, 2)).unwrap();
    assert_eq!(k2.points_to(g1, None), locs(&[a]));
    assert_eq!(k2.points_to(g2, None), locs(&[b]));
}

#[test_log::test]
fn recursion_terminates_under_k_limiting() {
    let mut pb = ProgramBuilder::new();
    let a = pb.global("a", VarType::Scalar);
    let g = pb.global("g", VarType::POINTER);
    let x = {
        let mut fb = pb.function("rec");
        let x = fb.param("x", VarType::POINTER);
        fb.copy(g, x);
        fb.call("rec", &[x], None);
        x
    };
    {
        let mut fb = pb.function("main");
        let l = fb.local("l", VarType::POINTER);
        fb.addr_of(l, a);
        fb.call("rec", &[l], None);
    }
    let program = pb.build().unwrap();
    let results = analyze_program(&program, options(PTAType::CallSiteSensitive, 3)).unwrap();
    assert_eq!(results.points_to(g, None), locs(&[a]));
    assert_eq!(results.points_to(x, None), locs(&[a]));
    let rec = program.function_by_name("rec").unwrap();
    // [m], [r, m], [r, r, m] and the saturated [r, r, r].
    assert_eq!(results.contexts_of(rec).len(), 4);
}

#[test_log::test]
fn locals_of_a_callee_are_qualified_by_context() {
    let id = identity_program();
    let results = analyze_program(&id.program, options(PTAType::CallSiteSensitive, 1)).unwrap();
    let main = id.program.function_by_name("main").unwrap();
    let pa = id.program.variable_by_name(Some(main), "pa").unwrap();
    // main is a root, so its locals live under GLOBAL.
    assert_eq!(results.points_to(pa, Some(GLOBAL)), locs(&[id.a]));
    assert_eq!(results.contexts_of(main), [GLOBAL].into_iter().collect());
}

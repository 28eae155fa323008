mod common;

use common::{positional, shape, Fixture};
use cpa_common::util::tvl::Tvl;
use cpa_context::calling::{call_stack_to_params_info, CallError, ExceptionKind};
use cpa_context::CpaType;
use cpa_storegraph::program::mock::FunctionShape;
use cpa_storegraph::program::{CodeId, CodeParameters, FieldKind, LocalId, Param};
use std::collections::BTreeSet;

#[test]
fn test_trailing_default_is_bound() {
    let (mut f, (code, ten)) = Fixture::new(|program, _| {
        let ten = program.int(10);
        let shape = FunctionShape {
            defaults: vec![ten],
            ..shape(&["a", "b", "c"])
        };
        (program.add_function("f", shape), ten)
    });
    let (x, x_type) = f.arg();
    let (y, _) = f.arg();
    let ctx = f.callee(code, vec![CpaType::Any, CpaType::Any]);

    assert!(ctx.invocation_may_succeed(&mut f.sys));
    let info = ctx.invocation_info(&mut f.sys);
    assert_eq!(info.will_succeed, Tvl::True);
    assert_eq!(info.defaults, BTreeSet::from([2]));

    ctx.bind_parameters(&mut f.sys, &positional(vec![x, y], None));
    f.sys.propagate();

    let a = ctx.local(&mut f.sys, LocalId(0));
    let c = ctx.local(&mut f.sys, LocalId(2));
    assert_eq!(f.refs(a), BTreeSet::from([x_type]));
    let store = f.sys.store();
    let ten_type = store.canonical().existing_type(store.extractor(), ten);
    assert_eq!(f.refs(c), BTreeSet::from([ten_type]));
}

#[test]
fn test_too_many_args_never_succeed() {
    let (mut f, code) = Fixture::new(|program, _| program.add_function("f", shape(&["a", "b"])));
    let ctx = f.callee(code, vec![CpaType::Any; 3]);

    assert!(!ctx.invocation_may_succeed(&mut f.sys));
    let info = ctx.invocation_info(&mut f.sys);
    assert_eq!(info.will_succeed, Tvl::False);
    assert_eq!(info.exceptions, BTreeSet::from([ExceptionKind::TypeError]));
    assert_eq!(
        info.errors,
        vec![CallError::TooManyPositional { params: 2, args: 3 }]
    );
}

#[test]
fn test_overflow_builds_vparam_tuple() {
    let (mut f, code) = Fixture::new(|program, _| {
        let shape = FunctionShape {
            vparam: true,
            ..shape(&["a"])
        };
        program.add_function("f", shape)
    });
    let args: Vec<_> = (0..5).map(|_| f.arg()).collect();
    let mut params = vec![CpaType::Any; 5];
    params[2] = CpaType::Type(args[2].1.clone());
    let ctx = f.callee(code, params);

    assert!(ctx.invocation_may_succeed(&mut f.sys));
    let info = ctx.invocation_info(&mut f.sys);
    assert_eq!(info.will_succeed, Tvl::True);
    assert_eq!(info.arg_vparam.count, 4);

    let caller = positional(args.iter().map(|(slot, _)| *slot).collect(), None);
    ctx.bind_parameters(&mut f.sys, &caller);
    f.sys.propagate();

    let rest = ctx.local(&mut f.sys, LocalId(1));
    let vparam_type = ctx.vparam_type(&mut f.sys);
    assert_eq!(f.refs(rest), BTreeSet::from([vparam_type]));
    let tuples = f.sys.store_mut().slot_objects(rest);
    assert_eq!(tuples.len(), 1);
    let tuple = tuples[0];

    let store = f.sys.store_mut();
    let length_name = store.length_slot_name().clone();
    let length = store
        .known_field(tuple, &length_name)
        .expect("the tuple length is recorded");
    let four = store.extractor_mut().int(4);
    let four_type = store.canonical().existing_type(store.extractor(), four);
    assert_eq!(f.refs(length), BTreeSet::from([four_type]));

    for (index, (_, xtype)) in args[1..].iter().enumerate() {
        let store = f.sys.store_mut();
        let key = store.extractor_mut().int(index as i64);
        let name = store.canonical().field_name(FieldKind::Array, key);
        let field = store
            .known_field(tuple, &name)
            .expect("every overflow argument gets a tuple slot");
        assert_eq!(f.refs(field), BTreeSet::from([xtype.clone()]));
    }

    assert_eq!(f.sys.allocations().len(), 1);
    assert_eq!(f.sys.modifications().len(), 5);

    // Binding the same context again changes nothing.
    let num_constraints = f.sys.constraints().len();
    ctx.bind_parameters(&mut f.sys, &caller);
    assert_eq!(f.sys.propagate(), 0);
    assert_eq!(f.sys.constraints().len(), num_constraints);
    assert_eq!(f.sys.allocations().len(), 1);
    assert_eq!(f.sys.modifications().len(), 5);
}

#[test]
fn test_keyword_repeating_positional_fails() {
    let (mut f, code) = Fixture::new(|program, _| program.add_function("f", shape(&["a", "b"])));
    let ctx = f.callee(code, vec![CpaType::Any; 2]);
    let callee = ctx.callee_slots(&mut f.sys);

    let info = call_stack_to_params_info(&callee, false, 2, false, &["b"], false);
    assert_eq!(info.will_succeed, Tvl::False);
    assert!(info.exceptions.contains(&ExceptionKind::TypeError));
    assert_eq!(info.errors, vec![CallError::MultipleValues("b".to_owned())]);
    assert!(info.certain_keywords.is_empty());
}

#[test]
#[should_panic(expected = "Temporary limitation")]
fn test_keyword_into_kwargs_is_unsupported() {
    let (mut f, code) = Fixture::new(|program, _| {
        let shape = FunctionShape {
            kparam: true,
            ..shape(&["a"])
        };
        program.add_function("f", shape)
    });
    let ctx = f.callee(code, vec![CpaType::Any]);
    let callee = ctx.callee_slots(&mut f.sys);

    call_stack_to_params_info(&callee, false, 1, false, &["extra"], false);
}

fn kwargs_callee() -> (Fixture, CodeId) {
    Fixture::new(|program, _| {
        let shape = FunctionShape {
            kparam: true,
            ..shape(&["a"])
        };
        program.add_function("f", shape)
    })
}

#[test]
fn test_kwargs_callee_is_infeasible() {
    let (mut f, code) = kwargs_callee();
    let ctx = f.callee(code, vec![CpaType::Any]);

    assert!(!ctx.invocation_may_succeed(&mut f.sys));
    let info = ctx.invocation_info(&mut f.sys);
    assert_eq!(info.will_succeed, Tvl::False);
    assert_eq!(info.errors, vec![CallError::UnsupportedKwargs]);
    assert_eq!(info.exceptions, BTreeSet::from([ExceptionKind::TypeError]));
    assert_eq!(info.arg_param.count, 0);
}

#[test]
#[should_panic(expected = "Temporary limitation")]
fn test_binding_kwargs_is_unsupported() {
    let (mut f, code) = kwargs_callee();
    let (x, _) = f.arg();
    let ctx = f.callee(code, vec![CpaType::Any]);

    ctx.bind_parameters(&mut f.sys, &positional(vec![x], None));
}

#[test]
fn test_return_arity_mismatch_binds_prefix() {
    let (mut f, code) = Fixture::new(|program, _| {
        let shape = FunctionShape {
            returns: 2,
            ..shape(&["a"])
        };
        program.add_function("f", shape)
    });
    let (x, _) = f.arg();
    let ctx = f.callee(code, vec![CpaType::Any]);

    let first = ctx.local(&mut f.sys, LocalId(1));
    let second = ctx.local(&mut f.sys, LocalId(2));
    let (t, u) = (f.instance(), f.instance());
    f.sys.store_mut().initialize_type(first, &t);
    f.sys.store_mut().initialize_type(second, &u);

    let short = f.empty_local();
    ctx.bind_parameters(&mut f.sys, &positional(vec![x], Some(vec![short])));
    f.sys.propagate();
    assert_eq!(f.refs(short), BTreeSet::from([t.clone()]));

    let long: Vec<_> = (0..3).map(|_| f.empty_local()).collect();
    ctx.bind_parameters(&mut f.sys, &positional(vec![x], Some(long.clone())));
    f.sys.propagate();
    assert_eq!(f.refs(long[0]), BTreeSet::from([t]));
    assert_eq!(f.refs(long[1]), BTreeSet::from([u]));
    assert!(f.refs(long[2]).is_empty());
}

#[test]
fn test_self_binding() {
    let (mut f, (method, function)) = Fixture::new(|program, _| {
        let shape_with_self = FunctionShape {
            self_param: true,
            ..shape(&["a"])
        };
        (
            program.add_function("method", shape_with_self),
            program.add_function("function", shape(&["a"])),
        )
    });
    let (inst, inst_type) = f.arg();
    let (x, _) = f.arg();

    let sig = f
        .sys
        .signature(method, Some(CpaType::Type(inst_type.clone())), vec![CpaType::Any]);
    let ctx = f.sys.context(&sig, None);
    assert!(ctx.invocation_may_succeed(&mut f.sys));

    let mut caller = positional(vec![x], None);
    caller.self_arg = Some(inst);
    ctx.bind_parameters(&mut f.sys, &caller);
    let self_slot = ctx.local(&mut f.sys, LocalId(0));
    assert_eq!(f.refs(self_slot), BTreeSet::from([inst_type.clone()]));

    let unbound = f.callee(method, vec![CpaType::Any]);
    assert!(!unbound.invocation_may_succeed(&mut f.sys));

    let sig = f
        .sys
        .signature(function, Some(CpaType::Type(inst_type)), vec![CpaType::Any]);
    let bound = f.sys.context(&sig, None);
    let info = bound.invocation_info(&mut f.sys);
    assert_eq!(info.will_succeed, Tvl::False);
    assert_eq!(info.errors, vec![CallError::SelfMismatch { expected: false }]);
}

#[test]
fn test_do_not_care_params_are_skipped() {
    let (mut f, code) = Fixture::new(|program, _| {
        let params = CodeParameters {
            self_param: None,
            params: vec![Param::Local(LocalId(0)), Param::DoNotCare],
            param_names: vec!["a".to_owned(), "b".to_owned()],
            defaults: Vec::new(),
            vparam: Some(Param::DoNotCare),
            kparam: None,
            return_params: Vec::new(),
        };
        program.add_code("g", params)
    });
    let args: Vec<_> = (0..3).map(|_| f.arg()).collect();
    let ctx = f.callee(code, vec![CpaType::Any; 3]);

    assert!(ctx.invocation_may_succeed(&mut f.sys));
    let caller = positional(args.iter().map(|(slot, _)| *slot).collect(), None);
    ctx.bind_parameters(&mut f.sys, &caller);
    f.sys.propagate();

    let a = ctx.local(&mut f.sys, LocalId(0));
    assert_eq!(f.refs(a), BTreeSet::from([args[0].1.clone()]));
    assert!(f.sys.allocations().is_empty());
}

#[test]
fn test_contexts_are_canonical() {
    let (mut f, code) = Fixture::new(|program, _| program.add_function("f", shape(&["a"])));
    let t = f.instance();

    let first = f.callee(code, vec![CpaType::Type(t.clone())]);
    let again = f.callee(code, vec![CpaType::Type(t)]);
    let other = f.callee(code, vec![CpaType::Any]);
    assert_eq!(first.id(), again.id());
    assert_ne!(first.id(), other.id());
    assert_eq!(f.sys.contexts().len(), 3);
}

#[test]
#[should_panic(expected = "diverging")]
fn test_oversized_signatures_are_rejected() {
    let (f, code) = Fixture::new(|program, _| program.add_function("f", shape(&[])));
    f.sys.signature(code, None, vec![CpaType::Any; 30]);
}

#[test]
#[should_panic(expected = "is not code")]
fn test_signatures_need_known_code() {
    let (f, code) = Fixture::new(|program, _| program.add_function("f", shape(&["a"])));
    f.sys.signature(CodeId(code.0 + 1), None, vec![CpaType::Any]);
}

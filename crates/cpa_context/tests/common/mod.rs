#![allow(dead_code)]

use cpa_common::config::AnalysisOptions;
use cpa_context::calling::CallerArgs;
use cpa_context::{AnalysisContext, CpaType, System};
use cpa_storegraph::program::mock::{FunctionShape, MockProgram};
use cpa_storegraph::program::{AbstractObj, CodeId, LocalId};
use cpa_storegraph::{SlotId, XType};
use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A caller context for `main` plus a program to add callees to.
pub struct Fixture {
    pub sys: System<MockProgram>,
    pub class: AbstractObj,
    pub caller: AnalysisContext,
    next_local: usize,
}

impl Fixture {
    pub fn new<T>(build: impl FnOnce(&mut MockProgram, AbstractObj) -> T) -> (Self, T) {
        init_tracing();

        let mut program = MockProgram::new();
        let class = program.new_class();
        let main = program.add_function("main", FunctionShape::default());
        let built = build(&mut program, class);

        let mut sys = System::new(program, AnalysisOptions::default());
        let sig = sys.signature(main, None, Vec::new());
        let caller = sys.context(&sig, None);
        let fixture = Fixture {
            sys,
            class,
            caller,
            next_local: 0,
        };
        (fixture, built)
    }

    pub fn instance(&mut self) -> XType {
        let class = self.class;
        let store = self.sys.store_mut();
        let obj = store.extractor_mut().new_instance(class);
        store.canonical().external_type(obj)
    }

    /// A fresh local of `main` holding one fresh instance.
    pub fn arg(&mut self) -> (SlotId, XType) {
        let slot = self.empty_local();
        let xtype = self.instance();
        self.sys.store_mut().initialize_type(slot, &xtype);
        (slot, xtype)
    }

    pub fn empty_local(&mut self) -> SlotId {
        let local = LocalId(self.next_local);
        self.next_local += 1;
        self.caller.local(&mut self.sys, local)
    }

    pub fn callee(&mut self, code: CodeId, params: Vec<CpaType>) -> AnalysisContext {
        let sig = self.sys.signature(code, None, params);
        self.sys.context(&sig, None)
    }

    pub fn refs(&self, slot: SlotId) -> BTreeSet<XType> {
        self.sys.store().slot(slot).refs().iter().cloned().collect()
    }
}

pub fn positional(args: Vec<SlotId>, return_args: Option<Vec<SlotId>>) -> CallerArgs<SlotId> {
    CallerArgs {
        self_arg: None,
        args,
        kwds: Vec::new(),
        vargs: None,
        kargs: None,
        return_args,
    }
}

pub fn shape(params: &[&'static str]) -> FunctionShape {
    FunctionShape {
        params: params.to_vec(),
        returns: 1,
        ..FunctionShape::default()
    }
}

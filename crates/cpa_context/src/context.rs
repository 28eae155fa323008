use crate::calling::{call_stack_to_params_info, CallError, CallInfo, CallerArgs};
use crate::signature::{CpaSignature, CpaType};
use crate::system::System;
use cpa_storegraph::names::OpContext;
use cpa_storegraph::program::{
    Code, CodeParameters, Constant, Extractor, FieldKind, LocalId, Param, PathId,
};
use cpa_storegraph::{ContextId, ObjectId, RegionId, SlotId, XType};
use id_collections::IdVec;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One specialization of a callee: its signature, the allocation path it was reached along, and
/// the region its locals are created in.
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    id: ContextId,
    signature: CpaSignature,
    op_path: Option<PathId>,
    group: RegionId,
}

pub struct ContextTable {
    contexts: IdVec<ContextId, AnalysisContext>,
    index: BTreeMap<(CpaSignature, Option<PathId>), ContextId>,
}

impl ContextTable {
    pub fn new() -> Self {
        ContextTable {
            contexts: IdVec::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn get_or_insert(
        &mut self,
        signature: &CpaSignature,
        op_path: Option<PathId>,
        group: RegionId,
    ) -> &AnalysisContext {
        let key = (signature.clone(), op_path);
        let id = match self.index.get(&key) {
            Some(&id) => id,
            None => {
                let id = ContextId(self.contexts.len());
                let pushed = self.contexts.push(AnalysisContext {
                    id,
                    signature: signature.clone(),
                    op_path,
                    group,
                });
                debug_assert_eq!(id, pushed);
                self.index.insert(key, id);
                id
            }
        };
        &self.contexts[id]
    }

    pub fn get(&self, id: ContextId) -> &AnalysisContext {
        &self.contexts[id]
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContextTable {
    fn default() -> Self {
        ContextTable::new()
    }
}

impl AnalysisContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn signature(&self) -> &CpaSignature {
        &self.signature
    }

    pub fn op_path(&self) -> Option<PathId> {
        self.op_path
    }

    pub fn group(&self) -> RegionId {
        self.group
    }

    /// The slot holding `local` of this context's code.
    pub fn local<E: Extractor + Code>(&self, sys: &mut System<E>, local: LocalId) -> SlotId {
        let store = sys.store_mut();
        let name = store
            .canonical()
            .local_name(self.signature.code, local, self.id);
        store.root_in(&name, Some(self.group))
    }

    /// The callee's parameter list with every local replaced by its slot in this context.
    /// Defaults stay objects: they are bound through slots of their own in `bind_parameters`.
    pub fn callee_slots<E: Extractor + Code>(
        &self,
        sys: &mut System<E>,
    ) -> CodeParameters<SlotId> {
        let params = sys
            .store()
            .extractor()
            .code_parameters(self.signature.code)
            .clone();
        params.map_locals(|&local| self.local(sys, local))
    }

    pub fn invocation_info<E: Extractor + Code>(&self, sys: &mut System<E>) -> CallInfo {
        let callee = self.callee_slots(sys);
        let info = call_stack_to_params_info(
            &callee,
            self.signature.self_param.is_some(),
            self.signature.num_params(),
            false,
            &[],
            false,
        );
        if callee.kparam.is_some() && info.will_succeed.maybe_true() {
            return info.must_fail_with(CallError::UnsupportedKwargs);
        }
        info
    }

    /// Cheap arity-only check used to skip contexts that can never be entered.
    pub fn invocation_may_succeed<E: Extractor + Code>(&self, sys: &mut System<E>) -> bool {
        let info = self.invocation_info(sys);

        if info.will_succeed.maybe_false() && sys.options().report_infeasible_calls {
            let code = sys.store().extractor().code_name(self.signature.code);
            if info.will_succeed.must_be_false() {
                warn!(
                    errors = ?info.errors,
                    "call to {} {:?} will always fail", code, self.signature
                );
            } else {
                debug!(
                    errors = ?info.errors,
                    "call to {} {:?} may fail", code, self.signature
                );
            }
        }

        info.will_succeed.maybe_true()
    }

    fn bind_obj_to_slot<E: Extractor + Code>(
        &self,
        sys: &mut System<E>,
        obj: Option<&XType>,
        slot: Option<SlotId>,
    ) {
        match (obj, slot) {
            (Some(obj), Some(slot)) => {
                sys.store_mut().initialize_type(slot, obj);
            }
            (None, None) => {}
            (obj, slot) => panic!("cannot bind {:?} to {:?}", obj, slot),
        }
    }

    /// `*args` tuples are named by the context they appear in.
    pub fn vparam_type<E: Extractor + Code>(&self, sys: &mut System<E>) -> XType {
        let store = sys.store_mut();
        let tuple = store.extractor_mut().tuple_instance();
        store.canonical().context_type(self.id, tuple, None)
    }

    fn vparam_slot<E: Extractor + Code>(
        &self,
        sys: &mut System<E>,
        vparam_obj: ObjectId,
        index: usize,
    ) -> SlotId {
        let store = sys.store_mut();
        let key = store
            .extractor_mut()
            .get_object(Constant::Int(index as i64));
        let name = store.canonical().field_name(FieldKind::Array, key);
        store.field(vparam_obj, &name, self.group)
    }

    /// Allocates the `*args` tuple into `vparam_slot` and records its length.
    pub fn initialize_vparam<E: Extractor + Code>(
        &self,
        sys: &mut System<E>,
        op: &OpContext,
        vparam_slot: SlotId,
        length: usize,
    ) -> ObjectId {
        let vparam_type = self.vparam_type(sys);
        let vparam_obj = sys.store_mut().initialize_type(vparam_slot, &vparam_type);
        sys.log_allocation(op, vparam_obj);

        let store = sys.store_mut();
        let length_obj = store
            .extractor_mut()
            .get_object(Constant::Int(length as i64));
        let length_type = store.canonical().existing_type(store.extractor(), length_obj);
        let length_name = store.length_slot_name().clone();
        let length_slot = store.field(vparam_obj, &length_name, self.group);
        self.bind_obj_to_slot(sys, Some(&length_type), Some(length_slot));
        sys.log_modify(op, length_slot);

        sys.store_mut().resolve_object(vparam_obj)
    }

    pub fn initialize_parameter<E: Extractor + Code>(
        &self,
        sys: &mut System<E>,
        param: Option<Param<SlotId>>,
        cpa_type: Option<&CpaType>,
        arg: Option<SlotId>,
    ) {
        match param {
            None => {
                assert!(cpa_type.is_none(), "{:?} bound to a missing parameter", cpa_type);
                assert!(arg.is_none(), "{:?} bound to a missing parameter", arg);
            }
            Some(Param::DoNotCare) => {}
            Some(Param::Local(param)) => match cpa_type {
                None => panic!("parameter {:?} of {:?} has no type", param, self.signature),
                Some(CpaType::Any) => match arg {
                    Some(arg) => {
                        sys.create_assign(arg, param);
                    }
                    None => panic!("parameter {:?} typed Any has no argument", param),
                },
                Some(CpaType::Type(xtype)) => {
                    sys.store_mut().initialize_type(param, xtype);
                }
            },
        }
    }

    /// Wires the caller's argument and return slots to this context's parameters. Only called for
    /// contexts `invocation_may_succeed` accepted, which excludes callees taking `**kwargs`;
    /// re-binding is idempotent.
    pub fn bind_parameters<E: Extractor + Code>(
        &self,
        sys: &mut System<E>,
        caller: &CallerArgs<SlotId>,
    ) {
        let sig = self.signature.clone();
        let callee = self.callee_slots(sys);

        assert!(
            caller.kwds.is_empty(),
            "keyword arguments must be resolved to positions before binding"
        );
        assert_eq!(caller.args.len(), sig.num_params());

        self.initialize_parameter(
            sys,
            callee.self_param,
            sig.self_param.as_ref(),
            caller.self_arg,
        );

        let num_args = sig.num_params();
        let num_params = callee.params.len();
        let positional = caller.args.iter().zip(&sig.params).zip(&callee.params);
        for ((&arg, cpa_type), &param) in positional {
            self.initialize_parameter(sys, Some(param), Some(cpa_type), Some(arg));
        }

        if num_args < num_params {
            let offset = num_params - callee.defaults.len();
            assert!(num_args >= offset, "{:?} is missing arguments", sig);

            for i in num_args..num_params {
                let obj = callee.defaults[i - offset];
                let store = sys.store_mut();
                let name = store.canonical().existing_name(sig.code, obj, self.id);
                let slot = store.root_in(&name, Some(self.group));
                let xtype = store.canonical().existing_type(store.extractor(), obj);
                store.initialize_type(slot, &xtype);

                if let Param::Local(param) = callee.params[i] {
                    sys.create_assign(slot, param);
                }
            }
        }

        // Implicit allocations, like the `*args` tuple, belong to no operation.
        let op = sys
            .store()
            .canonical()
            .op_context(sig.code, None, self.id);

        match callee.vparam {
            Some(Param::Local(vparam)) => {
                let extra = num_args.saturating_sub(num_params);
                let vparam_obj = self.initialize_vparam(sys, &op, vparam, extra);
                for i in num_params..num_args {
                    let slot = self.vparam_slot(sys, vparam_obj, i - num_params);
                    self.initialize_parameter(
                        sys,
                        Some(Param::Local(slot)),
                        Some(&sig.params[i]),
                        Some(caller.args[i]),
                    );
                    sys.log_modify(&op, slot);
                }
            }
            Some(Param::DoNotCare) => {}
            None => assert!(num_args <= num_params, "{:?} has no *args parameter", sig),
        }

        assert!(
            callee.kparam.is_none(),
            "Temporary limitation: cannot bind **kwargs parameters"
        );

        if let Some(return_args) = &caller.return_args {
            if callee.return_params.len() != return_args.len() {
                // Call targets found by dynamic analysis can disagree with the callee.
                debug!(
                    "{:?} returns {} values but the caller expects {}",
                    sig,
                    callee.return_params.len(),
                    return_args.len()
                );
            }
            for (param, &arg) in callee.return_params.iter().zip(return_args) {
                if let Param::Local(param) = *param {
                    sys.create_assign(param, arg);
                }
            }
        }
    }
}

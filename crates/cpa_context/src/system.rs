use crate::constraints::Constraints;
use crate::context::{AnalysisContext, ContextTable};
use crate::signature::{CpaSignature, CpaSignatureData, CpaType};
use cpa_common::config::AnalysisOptions;
use cpa_common::util::intern::Interner;
use cpa_storegraph::names::OpContext;
use cpa_storegraph::program::{Code, CodeId, Extractor, PathId};
use cpa_storegraph::{Canonical, ObjectId, ObserverId, SlotId, StoreGraph};
use std::collections::BTreeSet;

/// State shared by every context of one analysis run.
pub struct System<E> {
    store: StoreGraph<E>,
    signatures: Interner<CpaSignatureData>,
    contexts: ContextTable,
    constraints: Constraints,

    allocations: BTreeSet<(OpContext, ObjectId)>,
    modifications: BTreeSet<(OpContext, SlotId)>,

    options: AnalysisOptions,
}

impl<E: Extractor + Code> System<E> {
    pub fn new(extractor: E, options: AnalysisOptions) -> Self {
        let canonical = Canonical::new(options.primitive_policy);
        System {
            store: StoreGraph::new(extractor, canonical),
            signatures: Interner::empty(),
            contexts: ContextTable::new(),
            constraints: Constraints::new(),
            allocations: BTreeSet::new(),
            modifications: BTreeSet::new(),
            options,
        }
    }

    pub fn store(&self) -> &StoreGraph<E> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StoreGraph<E> {
        &mut self.store
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.contexts
    }

    pub fn signature(
        &self,
        code: CodeId,
        self_param: Option<CpaType>,
        params: Vec<CpaType>,
    ) -> CpaSignature {
        assert!(self.store.extractor().is_code(code), "{:?} is not code", code);
        assert!(
            params.len() < self.options.max_signature_params,
            "signature for {} has {} parameters; the analysis is probably diverging",
            self.store.extractor().code_name(code),
            params.len(),
        );
        self.signatures.intern(CpaSignatureData {
            code,
            self_param,
            params,
        })
    }

    /// The canonical context for a signature along an allocation path.
    pub fn context(
        &mut self,
        signature: &CpaSignature,
        op_path: Option<PathId>,
    ) -> AnalysisContext {
        let group = self.store.region_hint();
        self.contexts
            .get_or_insert(signature, op_path, group)
            .clone()
    }

    pub fn create_assign(&mut self, src: SlotId, dst: SlotId) -> ObserverId {
        self.constraints.create_assign(&mut self.store, src, dst)
    }

    pub fn propagate(&mut self) -> usize {
        self.constraints.propagate(&mut self.store)
    }

    pub fn log_allocation(&mut self, op: &OpContext, object: ObjectId) {
        let object = self.store.resolve_object(object);
        self.allocations.insert((op.clone(), object));
    }

    pub fn log_modify(&mut self, op: &OpContext, slot: SlotId) {
        let slot = self.store.resolve_slot(slot);
        self.modifications.insert((op.clone(), slot));
    }

    pub fn allocations(&self) -> &BTreeSet<(OpContext, ObjectId)> {
        &self.allocations
    }

    pub fn modifications(&self) -> &BTreeSet<(OpContext, SlotId)> {
        &self.modifications
    }
}

use cpa_storegraph::program::Extractor;
use cpa_storegraph::{ObserverId, SlotId, StoreGraph};
use id_collections::IdVec;
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

/// `dst = src`. Constraints are the store graph's observers: a constraint's id is its
/// `ObserverId`.
#[derive(Clone, Copy, Debug)]
pub struct AssignConstraint {
    pub src: SlotId,
    pub dst: SlotId,
    dirty: bool,
}

impl AssignConstraint {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Clone, Debug)]
pub struct Constraints {
    assigns: IdVec<ObserverId, AssignConstraint>,
    existing: BTreeMap<(SlotId, SlotId), ObserverId>,
    dirty: VecDeque<ObserverId>,
}

impl Constraints {
    pub fn new() -> Self {
        Constraints {
            assigns: IdVec::new(),
            existing: BTreeMap::new(),
            dirty: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.assigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: ObserverId) -> &AssignConstraint {
        &self.assigns[id]
    }

    pub fn num_dirty(&self) -> usize {
        self.dirty.len()
    }

    pub fn create_assign<E: Extractor>(
        &mut self,
        store: &mut StoreGraph<E>,
        src: SlotId,
        dst: SlotId,
    ) -> ObserverId {
        let src = store.resolve_slot(src);
        let dst = store.resolve_slot(dst);
        if let Some(&id) = self.existing.get(&(src, dst)) {
            return id;
        }

        let id = self.assigns.push(AssignConstraint {
            src,
            dst,
            dirty: false,
        });
        self.existing.insert((src, dst), id);

        store.depends_read(src, id);
        store.depends_write(dst, id);
        self.collect_marks(store);
        id
    }

    pub fn mark(&mut self, id: ObserverId) {
        let constraint = &mut self.assigns[id];
        if !constraint.dirty {
            constraint.dirty = true;
            self.dirty.push_back(id);
        }
    }

    fn collect_marks<E: Extractor>(&mut self, store: &mut StoreGraph<E>) {
        for id in store.take_marks() {
            self.mark(id);
        }
    }

    /// Runs dirty constraints until none are left. Returns how many were processed.
    pub fn propagate<E: Extractor>(&mut self, store: &mut StoreGraph<E>) -> usize {
        self.collect_marks(store);

        let mut processed = 0;
        while let Some(id) = self.dirty.pop_front() {
            let constraint = &mut self.assigns[id];
            assert!(constraint.dirty);
            constraint.dirty = false;
            let (src, dst) = (constraint.src, constraint.dst);

            trace!("processing {:?}: {:?} -> {:?}", id, src, dst);
            store.update(dst, src);
            processed += 1;
            self.collect_marks(store);
        }
        processed
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints::new()
    }
}

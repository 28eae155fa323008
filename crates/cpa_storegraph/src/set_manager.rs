use crate::xtype::XType;
use cpa_common::util::intern::{Interned, Interner};
use std::collections::BTreeSet;

/// A frozen points-to set. Sets are interned, so a slot's refs can be compared and shared by
/// identity and "grow" means "replace with a bigger canonical set".
pub type RefSet = Interned<BTreeSet<XType>>;

pub struct SetManager {
    sets: Interner<BTreeSet<XType>>,
    empty: RefSet,
}

impl SetManager {
    pub fn new() -> Self {
        let sets = Interner::empty();
        let empty = sets.intern(BTreeSet::new());
        SetManager { sets, empty }
    }

    pub fn empty(&self) -> RefSet {
        self.empty.clone()
    }

    pub fn coerce(&self, values: impl IntoIterator<Item = XType>) -> RefSet {
        self.sets.intern(values.into_iter().collect())
    }

    pub fn inplace_union(&self, a: &RefSet, b: &RefSet) -> RefSet {
        if Interned::ptr_eq(a, b) || b.is_empty() {
            a.clone()
        } else if a.is_empty() {
            b.clone()
        } else {
            self.sets.intern(a.union(b).cloned().collect())
        }
    }

    /// `a - b`, canonicalized.
    pub fn diff(&self, a: &RefSet, b: &RefSet) -> RefSet {
        if Interned::ptr_eq(a, b) {
            self.empty()
        } else if b.is_empty() {
            a.clone()
        } else {
            self.sets.intern(a.difference(b).cloned().collect())
        }
    }

    /// `a - b` without interning the result, for differences that are only inspected.
    pub fn temp_diff(&self, a: &RefSet, b: &RefSet) -> BTreeSet<XType> {
        if Interned::ptr_eq(a, b) {
            BTreeSet::new()
        } else {
            a.difference(b).cloned().collect()
        }
    }

    pub fn iter<'a>(&self, set: &'a RefSet) -> impl Iterator<Item = &'a XType> + 'a {
        set.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl Default for SetManager {
    fn default() -> Self {
        SetManager::new()
    }
}

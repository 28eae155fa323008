use hashbrown::hash_map::RawEntryMut;
use hashbrown::HashMap;
use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

pub trait Internable: Hash + Eq {}
impl<T: Hash + Eq> Internable for T {}

/// A canonical handle. Two handles produced by the same `Interner` from structurally equal values
/// share one allocation, so identity can be checked with `ptr_eq`.
#[derive(Clone, PartialOrd, Ord)]
pub struct Interned<T> {
    data: Rc<T>,
    // Extended types and slot names nest other interned values, so we cache the hash rather than
    // rehashing whole substructures on every lookup.
    hash: u64,
}

impl<T> Interned<T> {
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.data, &b.data)
    }
}

impl<T> Deref for Interned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.data
    }
}

impl<T> Hash for Interned<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl<T: PartialEq> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        // Note that `Rc::eq` tries `Rc::ptr_eq` before performing a deep comparison.
        self.data == other.data
    }
}

impl<T: Eq> Eq for Interned<T> {}

impl<T: fmt::Debug> fmt::Debug for Interned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data.fmt(f)
    }
}

/// Intern table for one analysis run.
///
/// Entries are never evicted implicitly. The driver may call `gc` between phases to drop values
/// that nothing outside the table refers to anymore.
pub struct Interner<T> {
    store: RefCell<HashMap<Rc<T>, (), BuildHasherDefault<FxHasher>>>,
}

impl<T: Internable> Interner<T> {
    pub fn empty() -> Self {
        Interner {
            store: RefCell::new(HashMap::default()),
        }
    }

    /// Returns the number of entries evicted.
    pub fn gc(&self) -> usize {
        let mut store = self.store.borrow_mut();
        let before = store.len();
        store.retain(|rc, _| Rc::strong_count(rc) > 1);
        before - store.len()
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `obj` is fully built before the table is borrowed, so building a value out of other
    /// interned values (an indexed type wrapping another type, say) never re-enters the table
    /// while it is locked.
    pub fn intern(&self, obj: T) -> Interned<T> {
        let mut store = self.store.borrow_mut();
        let hash = {
            let mut hasher = BuildHasher::build_hasher(store.hasher());
            obj.hash(&mut hasher);
            hasher.finish()
        };
        match store.raw_entry_mut().from_key_hashed_nocheck(hash, &obj) {
            RawEntryMut::Occupied(occ) => Interned {
                data: occ.key().clone(),
                hash,
            },
            RawEntryMut::Vacant(vac) => Interned {
                data: vac.insert_hashed_nocheck(hash, Rc::new(obj), ()).0.clone(),
                hash,
            },
        }
    }
}

impl<T: Internable> Default for Interner<T> {
    fn default() -> Self {
        Interner::empty()
    }
}

//! The abstract heap: regions own objects, objects own field slots, and root slots (locals and
//! references to pre-existing objects) hang off the graph itself.
//!
//! Every node lives in an arena and is addressed by id. Aliasing is resolved by merging nodes
//! union-find style, so an id handed out earlier may now be forwarded to a representative. All
//! public entry points resolve their arguments, and the ids they return are representatives at
//! the time of return.

mod union_find;


use self::union_find::{find, find_readonly, set_forward, Mergable};
use crate::annotations::{FieldAnnotation, ObjectAnnotation};
use crate::names::{Canonical, SlotName, SlotNameData};
use crate::program::{Constant, Extractor, FieldKind};
use crate::set_manager::{RefSet, SetManager};
use crate::xtype::XType;
use id_collections::{id_type, IdVec};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use tracing::{debug, trace};

#[id_type]
pub struct RegionId(pub usize);

#[id_type]
pub struct ObjectId(pub usize);

#[id_type]
pub struct SlotId(pub usize);

/// Opaque handle for a consumer outside the store graph (typically a constraint) that wants to
/// hear about changes to a slot.
#[id_type]
pub struct ObserverId(pub usize);

#[derive(Clone, Debug)]
pub struct RegionNode {
    forward: Option<RegionId>,
    objects: BTreeMap<XType, ObjectId>,
}

impl RegionNode {
    fn new() -> Self {
        RegionNode {
            forward: None,
            objects: BTreeMap::new(),
        }
    }

    /// Object ids may be stale; resolve them through the graph.
    pub fn objects(&self) -> impl Iterator<Item = (&XType, ObjectId)> + '_ {
        self.objects.iter().map(|(xtype, &obj)| (xtype, obj))
    }
}

impl Mergable<RegionId> for RegionNode {
    fn forward(&self) -> Option<RegionId> {
        self.forward
    }

    fn forward_mut(&mut self) -> &mut Option<RegionId> {
        &mut self.forward
    }
}

#[derive(Clone, Debug)]
pub struct ObjectNode {
    forward: Option<ObjectId>,
    region: RegionId,
    xtype: XType,
    fields: BTreeMap<SlotName, SlotId>,
    pub leaks: bool,
    annotation: ObjectAnnotation,
}

impl ObjectNode {
    fn new(region: RegionId, xtype: XType) -> Self {
        ObjectNode {
            forward: None,
            region,
            xtype,
            fields: BTreeMap::new(),
            leaks: true,
            annotation: ObjectAnnotation::default(),
        }
    }

    pub fn xtype(&self) -> &XType {
        &self.xtype
    }

    pub fn annotation(&self) -> &ObjectAnnotation {
        &self.annotation
    }

    /// Slot ids may be stale; resolve them through the graph.
    pub fn fields(&self) -> impl Iterator<Item = (&SlotName, SlotId)> + '_ {
        self.fields.iter().map(|(name, &slot)| (name, slot))
    }
}

impl Mergable<ObjectId> for ObjectNode {
    fn forward(&self) -> Option<ObjectId> {
        self.forward
    }

    fn forward_mut(&mut self) -> &mut Option<ObjectId> {
        &mut self.forward
    }
}

#[derive(Clone, Debug)]
pub struct SlotNode {
    forward: Option<SlotId>,
    object: Option<ObjectId>,
    name: SlotName,
    // Every object this slot refers to lives in this region.
    region: RegionId,
    refs: RefSet,
    null: bool,
    observers: Vec<ObserverId>,
    annotation: FieldAnnotation,
}

impl SlotNode {
    fn new(object: Option<ObjectId>, name: SlotName, region: RegionId, refs: RefSet) -> Self {
        SlotNode {
            forward: None,
            object,
            name,
            region,
            refs,
            null: true,
            observers: Vec::new(),
            annotation: FieldAnnotation::default(),
        }
    }

    pub fn name(&self) -> &SlotName {
        &self.name
    }

    pub fn refs(&self) -> &RefSet {
        &self.refs
    }

    /// True until the slot receives its first type directly.
    pub fn null(&self) -> bool {
        self.null
    }

    pub fn observers(&self) -> &[ObserverId] {
        &self.observers
    }

    pub fn annotation(&self) -> &FieldAnnotation {
        &self.annotation
    }
}

impl Mergable<SlotId> for SlotNode {
    fn forward(&self) -> Option<SlotId> {
        self.forward
    }

    fn forward_mut(&mut self) -> &mut Option<SlotId> {
        &mut self.forward
    }
}

// Merging cascades (slots merge their regions, regions merge objects of the same type, objects
// merge fields of the same name), so pending merges go on an explicit stack instead of the call
// stack.
#[derive(Clone, Copy, Debug)]
enum MergeTask {
    Region(RegionId, RegionId),
    Object(ObjectId, ObjectId),
    Slot(SlotId, SlotId),
}

pub struct StoreGraph<E> {
    extractor: E,
    canonical: Canonical,
    set_manager: SetManager,

    // Locals and references to "existing" objects.
    roots: FxHashMap<SlotName, SlotId>,

    regions: IdVec<RegionId, RegionNode>,
    objects: IdVec<ObjectId, ObjectNode>,
    slots: IdVec<SlotId, SlotNode>,

    region_hint: RegionId,
    type_slot_name: SlotName,
    length_slot_name: SlotName,

    marked: Vec<ObserverId>,
}

impl<E: Extractor> StoreGraph<E> {
    pub fn new(mut extractor: E, canonical: Canonical) -> Self {
        let type_key = extractor.get_object(Constant::Str("type".to_owned()));
        let length_key = extractor.get_object(Constant::Str("length".to_owned()));
        let type_slot_name = canonical.field_name(FieldKind::LowLevel, type_key);
        let length_slot_name = canonical.field_name(FieldKind::LowLevel, length_key);

        let mut regions = IdVec::new();
        let region_hint = regions.push(RegionNode::new());

        StoreGraph {
            extractor,
            canonical,
            set_manager: SetManager::new(),
            roots: FxHashMap::default(),
            regions,
            objects: IdVec::new(),
            slots: IdVec::new(),
            region_hint,
            type_slot_name,
            length_slot_name,
            marked: Vec::new(),
        }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut E {
        &mut self.extractor
    }

    pub fn canonical(&self) -> &Canonical {
        &self.canonical
    }

    pub fn canonical_mut(&mut self) -> &mut Canonical {
        &mut self.canonical
    }

    pub fn set_manager(&self) -> &SetManager {
        &self.set_manager
    }

    pub fn type_slot_name(&self) -> &SlotName {
        &self.type_slot_name
    }

    pub fn length_slot_name(&self) -> &SlotName {
        &self.length_slot_name
    }

    pub fn region_hint(&self) -> RegionId {
        find_readonly(&self.regions, self.region_hint)
    }

    pub fn new_region(&mut self) -> RegionId {
        self.regions.push(RegionNode::new())
    }

    // === Union-find ===

    pub fn resolve_region(&mut self, region: RegionId) -> RegionId {
        find(&mut self.regions, region)
    }

    pub fn resolve_object(&mut self, object: ObjectId) -> ObjectId {
        find(&mut self.objects, object)
    }

    pub fn resolve_slot(&mut self, slot: SlotId) -> SlotId {
        find(&mut self.slots, slot)
    }

    pub fn region(&self, region: RegionId) -> &RegionNode {
        &self.regions[find_readonly(&self.regions, region)]
    }

    pub fn object(&self, object: ObjectId) -> &ObjectNode {
        &self.objects[find_readonly(&self.objects, object)]
    }

    pub fn slot(&self, slot: SlotId) -> &SlotNode {
        &self.slots[find_readonly(&self.slots, slot)]
    }

    pub fn object_region(&self, object: ObjectId) -> RegionId {
        find_readonly(&self.regions, self.object(object).region)
    }

    pub fn slot_region(&self, slot: SlotId) -> RegionId {
        find_readonly(&self.regions, self.slot(slot).region)
    }

    /// The object owning a field slot; `None` for roots.
    pub fn slot_object(&self, slot: SlotId) -> Option<ObjectId> {
        self.slot(slot)
            .object
            .map(|object| find_readonly(&self.objects, object))
    }

    // === Lazy construction ===

    pub fn root(&mut self, name: &SlotName) -> SlotId {
        self.root_in(name, None)
    }

    pub fn root_in(&mut self, name: &SlotName, region_hint: Option<RegionId>) -> SlotId {
        if let Some(&slot) = self.roots.get(name) {
            return self.resolve_slot(slot);
        }

        assert!(name.is_root(), "{:?} does not name a root slot", name);
        let region = self.resolve_region(region_hint.unwrap_or(self.region_hint));
        let empty = self.set_manager.empty();
        let slot = self
            .slots
            .push(SlotNode::new(None, name.clone(), region, empty));
        self.roots.insert(name.clone(), slot);
        slot
    }

    pub fn roots(&self) -> impl Iterator<Item = (&SlotName, SlotId)> + '_ {
        self.roots
            .iter()
            .map(|(name, &slot)| (name, find_readonly(&self.slots, slot)))
    }

    pub fn region_object(&mut self, region: RegionId, xtype: &XType) -> ObjectId {
        let region = self.resolve_region(region);
        if let Some(&object) = self.regions[region].objects.get(xtype) {
            return self.resolve_object(object);
        }

        let object = self.objects.push(ObjectNode::new(region, xtype.clone()));
        // The object must be reachable from the region before its type pointer is set: setting it
        // can come back here looking for the same object.
        self.regions[region].objects.insert(xtype.clone(), object);
        self.set_type_pointer(object);
        self.resolve_object(object)
    }

    /// Gives every object allocated by the program a low-level "type" field pointing at its class,
    /// so type checks can be handled like any other field load.
    pub fn set_type_pointer(&mut self, object: ObjectId) {
        let object = self.resolve_object(object);
        let xtype = self.objects[object].xtype.clone();
        if xtype.is_existing() {
            return;
        }

        let obj = xtype.obj();
        self.extractor.ensure_loaded(obj);
        let class = self.extractor.type_of(obj);
        let class_xtype = self.canonical.existing_type(&self.extractor, class);

        let name = self.type_slot_name.clone();
        let field = self.field(object, &name, self.region_hint);
        self.initialize_type(field, &class_xtype);
    }

    pub fn field(&mut self, object: ObjectId, name: &SlotName, region_hint: RegionId) -> SlotId {
        let object = self.resolve_object(object);
        if let Some(&slot) = self.objects[object].fields.get(name) {
            return self.resolve_slot(slot);
        }

        assert!(!name.is_root(), "{:?} names a root slot, not a field", name);
        let region = self.resolve_region(region_hint);
        let empty = self.set_manager.empty();
        let slot = self
            .slots
            .push(SlotNode::new(Some(object), name.clone(), region, empty));
        self.objects[object].fields.insert(name.clone(), slot);

        let xtype = self.objects[object].xtype.clone();
        if xtype.is_existing() {
            if let Some(refs) = self.existing_slot_ref(&xtype, name) {
                self.initialize_types(slot, &refs);
            }
        }
        self.resolve_slot(slot)
    }

    pub fn known_field(&self, object: ObjectId, name: &SlotName) -> Option<SlotId> {
        self.object(object)
            .fields
            .get(name)
            .map(|&slot| find_readonly(&self.slots, slot))
    }

    /// Initial contents of a field of a pre-existing object, as recorded by the extractor.
    pub fn existing_slot_ref(&mut self, xtype: &XType, name: &SlotName) -> Option<Vec<XType>> {
        assert!(xtype.is_existing(), "{:?} is not an existing object", xtype);

        let (kind, key) = match &**name {
            SlotNameData::Field { kind, key } => (*kind, *key),
            _ => panic!("{:?} names a root slot, not a field", name),
        };

        let obj = xtype.obj();
        self.extractor.ensure_loaded(obj);
        let contents = self.extractor.existing_field(obj, kind, key)?;
        Some(
            contents
                .into_iter()
                .map(|value| self.canonical.existing_type(&self.extractor, value))
                .collect(),
        )
    }

    // === Type flow ===

    pub fn initialize_types(&mut self, slot: SlotId, xtypes: &[XType]) {
        for xtype in xtypes {
            self.initialize_type(slot, xtype);
        }
    }

    /// Adds `xtype` to the slot's refs and returns the object it names, creating it if this slot is
    /// the first to discover it.
    pub fn initialize_type(&mut self, slot: SlotId, xtype: &XType) -> ObjectId {
        let slot = self.resolve_slot(slot);

        if !self.slots[slot].refs.contains(xtype) {
            let diff = self.set_manager.coerce([xtype.clone()]);
            self.grow_refs(slot, &diff);
            self.slots[slot].null = false;
        }

        let region = self.slots[slot].region;
        self.region_object(region, xtype)
    }

    /// Assignment: whatever flows into `src` also flows into `dst`. Returns the representative of
    /// `dst`.
    pub fn update(&mut self, dst: SlotId, src: SlotId) -> SlotId {
        let dst = self.resolve_slot(dst);
        let src = self.resolve_slot(src);

        let dst_region = self.resolve_region(self.slots[dst].region);
        let src_region = self.resolve_region(self.slots[src].region);
        if dst_region != src_region {
            self.run_merges(MergeTask::Region(dst_region, src_region));
        }

        let dst = self.resolve_slot(dst);
        let src = self.resolve_slot(src);
        let region = self.resolve_region(self.slots[dst].region);
        self.slots[dst].region = region;
        let src_region = self.resolve_region(self.slots[src].region);
        self.slots[src].region = src_region;
        assert_eq!(region, src_region);

        let diff = self
            .set_manager
            .diff(&self.slots[src].refs, &self.slots[dst].refs);
        if !diff.is_empty() {
            self.grow_refs(dst, &diff);
        }
        dst
    }

    fn grow_refs(&mut self, slot: SlotId, diff: &RefSet) {
        let node = &mut self.slots[slot];
        node.refs = self.set_manager.inplace_union(&node.refs, diff);
        self.marked.extend(node.observers.iter().copied());
    }

    // === Merging ===

    pub fn merge_regions(&mut self, a: RegionId, b: RegionId) -> RegionId {
        self.run_merges(MergeTask::Region(a, b));
        self.resolve_region(a)
    }

    pub fn merge_objects(&mut self, a: ObjectId, b: ObjectId) -> ObjectId {
        self.run_merges(MergeTask::Object(a, b));
        self.resolve_object(a)
    }

    pub fn merge_slots(&mut self, a: SlotId, b: SlotId) -> SlotId {
        self.run_merges(MergeTask::Slot(a, b));
        self.resolve_slot(a)
    }

    fn run_merges(&mut self, first: MergeTask) {
        let mut pending = vec![first];
        while let Some(task) = pending.pop() {
            match task {
                MergeTask::Region(a, b) => self.merge_region_step(a, b, &mut pending),
                MergeTask::Object(a, b) => self.merge_object_step(a, b, &mut pending),
                MergeTask::Slot(a, b) => self.merge_slot_step(a, b, &mut pending),
            }
        }
    }

    fn merge_region_step(&mut self, a: RegionId, b: RegionId, pending: &mut Vec<MergeTask>) {
        let a = self.resolve_region(a);
        let b = self.resolve_region(b);
        if a == b {
            return;
        }
        set_forward(&mut self.regions, b, a);

        let objects = mem::take(&mut self.regions[b].objects);
        debug!(
            "merging region {:?} into {:?} ({} objects)",
            b,
            a,
            objects.len()
        );
        for (xtype, object) in objects {
            match self.regions[a].objects.get(&xtype) {
                Some(&existing) => pending.push(MergeTask::Object(existing, object)),
                None => {
                    self.regions[a].objects.insert(xtype, object);
                }
            }
        }
    }

    fn merge_object_step(&mut self, a: ObjectId, b: ObjectId, pending: &mut Vec<MergeTask>) {
        let a = self.resolve_object(a);
        let b = self.resolve_object(b);
        if a == b {
            return;
        }
        trace!("merging object {:?} into {:?}", b, a);
        set_forward(&mut self.objects, b, a);

        let fields = mem::take(&mut self.objects[b].fields);
        for (name, slot) in fields {
            match self.objects[a].fields.get(&name) {
                Some(&existing) => pending.push(MergeTask::Slot(existing, slot)),
                None => {
                    self.objects[a].fields.insert(name, slot);
                }
            }
        }

        let region = self.resolve_region(self.objects[a].region);
        self.objects[a].region = region;
    }

    fn merge_slot_step(&mut self, a: SlotId, b: SlotId, pending: &mut Vec<MergeTask>) {
        let a = self.resolve_slot(a);
        let b = self.resolve_slot(b);
        if a == b {
            return;
        }
        trace!("merging slot {:?} into {:?}", b, a);
        set_forward(&mut self.slots, b, a);

        let empty = self.set_manager.empty();
        let loser = &mut self.slots[b];
        let other_refs = mem::replace(&mut loser.refs, empty);
        let other_observers = mem::take(&mut loser.observers);
        let other_null = loser.null;
        let other_region = loser.region;

        pending.push(MergeTask::Region(self.slots[a].region, other_region));

        let own_refs = self.slots[a].refs.clone();
        let own_null = self.slots[a].null;
        let gained = self.set_manager.diff(&other_refs, &own_refs);
        let lost = self.set_manager.diff(&own_refs, &other_refs);

        // Each side's observers hear about whatever the other side brings in.
        if !gained.is_empty() || (!own_null && other_null) {
            self.grow_refs(a, &gained);
        }
        if !lost.is_empty() || (own_null && !other_null) {
            self.marked.extend(other_observers.iter().copied());
        }

        let survivor = &mut self.slots[a];
        survivor.observers.extend(other_observers);
        survivor.null |= other_null;
    }

    // === Propagation protocol ===

    pub fn depends_read(&mut self, slot: SlotId, observer: ObserverId) {
        self.depends(slot, observer);
    }

    pub fn depends_write(&mut self, slot: SlotId, observer: ObserverId) {
        self.depends(slot, observer);
    }

    fn depends(&mut self, slot: SlotId, observer: ObserverId) {
        let slot = self.resolve_slot(slot);
        let node = &mut self.slots[slot];
        node.observers.push(observer);
        // Catch up on data that flowed before the observer registered.
        if !node.refs.is_empty() {
            self.marked.push(observer);
        }
    }

    /// Observers marked since the last call, in marking order.
    pub fn take_marks(&mut self) -> Vec<ObserverId> {
        mem::take(&mut self.marked)
    }

    pub fn remove_observers(&mut self) {
        let mut processed_slots = BTreeSet::new();
        let mut processed_objects = BTreeSet::new();
        let mut stack: Vec<SlotId> = self.roots.values().copied().collect();

        while let Some(slot) = stack.pop() {
            let slot = self.resolve_slot(slot);
            if !processed_slots.insert(slot) {
                continue;
            }
            self.slots[slot].observers.clear();

            for object in self.slot_objects(slot) {
                if processed_objects.insert(object) {
                    stack.extend(self.objects[object].fields.values().copied());
                }
            }
        }
    }

    // === Read-only views for consumers ===

    /// The objects a slot may refer to. Objects are created on demand, as for any other access.
    pub fn slot_objects(&mut self, slot: SlotId) -> Vec<ObjectId> {
        let slot = self.resolve_slot(slot);
        let refs = self.slots[slot].refs.clone();
        let region = self.slots[slot].region;
        refs.iter()
            .map(|xtype| self.region_object(region, xtype))
            .collect()
    }

    pub fn object_fields(&self, object: ObjectId) -> Vec<SlotId> {
        self.object(object)
            .fields
            .values()
            .map(|&slot| find_readonly(&self.slots, slot))
            .collect()
    }

    pub fn set_leaks(&mut self, object: ObjectId, leaks: bool) {
        let object = self.resolve_object(object);
        self.objects[object].leaks = leaks;
    }

    pub fn rewrite_object_annotation(
        &mut self,
        object: ObjectId,
        rewrite: impl FnOnce(ObjectAnnotation) -> ObjectAnnotation,
    ) {
        let object = self.resolve_object(object);
        let node = &mut self.objects[object];
        node.annotation = rewrite(node.annotation);
    }

    pub fn rewrite_slot_annotation(
        &mut self,
        slot: SlotId,
        rewrite: impl FnOnce(FieldAnnotation) -> FieldAnnotation,
    ) {
        let slot = self.resolve_slot(slot);
        let node = &mut self.slots[slot];
        node.annotation = rewrite(node.annotation);
    }
}

use crate::program::{AbstractObj, CodeId, Extractor, FieldKind, LocalId, OpId, PathId};
use crate::xtype::{ExtendedType, SplitIndex, XType};
use cpa_common::config::PrimitivePolicy;
use cpa_common::util::id_gen::IdGen;
use cpa_common::util::intern::{Interned, Interner};
use id_collections::id_type;

/// Identity of an analysis context. Contexts themselves live in the context table of the
/// analysis; the store graph only needs to tell them apart.
#[id_type]
pub struct ContextId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotNameData {
    Local {
        code: CodeId,
        local: LocalId,
        context: ContextId,
    },
    Existing {
        code: CodeId,
        object: AbstractObj,
        context: ContextId,
    },
    Field {
        kind: FieldKind,
        key: AbstractObj,
    },
}

pub type SlotName = Interned<SlotNameData>;

impl SlotNameData {
    pub fn is_root(&self) -> bool {
        !self.is_field()
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SlotNameData::Local { .. })
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, SlotNameData::Existing { .. })
    }

    pub fn is_field(&self) -> bool {
        matches!(self, SlotNameData::Field { .. })
    }

    pub fn context(&self) -> Option<ContextId> {
        match self {
            SlotNameData::Local { context, .. } | SlotNameData::Existing { context, .. } => {
                Some(*context)
            }
            SlotNameData::Field { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpContextData {
    pub code: CodeId,
    // `None` for operations the analysis performs implicitly, like building a `*args` tuple.
    pub op: Option<OpId>,
    pub context: ContextId,
}

pub type OpContext = Interned<OpContextData>;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeContextData {
    pub code: CodeId,
    pub context: ContextId,
}

pub type CodeContext = Interned<CodeContextData>;

impl CodeContextData {
    pub fn decontextualize(&self) -> CodeId {
        self.code
    }
}

/// Factory for every canonical name the analysis hands out.
pub struct Canonical {
    xtypes: Interner<ExtendedType>,
    slot_names: Interner<SlotNameData>,
    op_contexts: Interner<OpContextData>,
    code_contexts: Interner<CodeContextData>,
    splits: IdGen<SplitIndex>,
    primitive_policy: PrimitivePolicy,
}

impl Canonical {
    pub fn new(primitive_policy: PrimitivePolicy) -> Self {
        Canonical {
            xtypes: Interner::empty(),
            slot_names: Interner::empty(),
            op_contexts: Interner::empty(),
            code_contexts: Interner::empty(),
            splits: IdGen::new(),
            primitive_policy,
        }
    }

    fn collapses(&self, extractor: &impl Extractor, obj: AbstractObj) -> bool {
        self.primitive_policy == PrimitivePolicy::Collapse && extractor.is_primitive(obj)
    }

    pub fn local_name(&self, code: CodeId, local: LocalId, context: ContextId) -> SlotName {
        self.slot_names.intern(SlotNameData::Local {
            code,
            local,
            context,
        })
    }

    pub fn existing_name(&self, code: CodeId, object: AbstractObj, context: ContextId) -> SlotName {
        self.slot_names.intern(SlotNameData::Existing {
            code,
            object,
            context,
        })
    }

    pub fn field_name(&self, kind: FieldKind, key: AbstractObj) -> SlotName {
        self.slot_names.intern(SlotNameData::Field { kind, key })
    }

    pub fn op_context(&self, code: CodeId, op: Option<OpId>, context: ContextId) -> OpContext {
        self.op_contexts.intern(OpContextData { code, op, context })
    }

    pub fn code_context(&self, code: CodeId, context: ContextId) -> CodeContext {
        self.code_contexts.intern(CodeContextData { code, context })
    }

    pub fn external_type(&self, obj: AbstractObj) -> XType {
        self.xtypes.intern(ExtendedType::External { obj })
    }

    pub fn existing_type(&self, extractor: &impl Extractor, obj: AbstractObj) -> XType {
        self.xtypes.intern(ExtendedType::Existing {
            obj,
            unique: extractor.is_unique(obj),
        })
    }

    pub fn path_type(
        &self,
        extractor: &impl Extractor,
        path: Option<PathId>,
        obj: AbstractObj,
        op: Option<OpId>,
    ) -> XType {
        let (path, op) = if self.collapses(extractor, obj) {
            (None, None)
        } else {
            (path, op)
        };
        self.xtypes.intern(ExtendedType::Path { path, obj, op })
    }

    pub fn method_type(
        &self,
        func: XType,
        inst: XType,
        obj: AbstractObj,
        op: Option<OpId>,
    ) -> XType {
        self.xtypes.intern(ExtendedType::Method {
            func,
            inst,
            obj,
            op,
        })
    }

    pub fn context_type(&self, context: ContextId, obj: AbstractObj, op: Option<OpId>) -> XType {
        self.xtypes.intern(ExtendedType::Context { context, obj, op })
    }

    /// Wraps the underlying type (never another wrapper) with a fresh split index, so every call
    /// yields a new type. Primitives are returned unsplit under every policy.
    pub fn indexed_type(&mut self, extractor: &impl Extractor, xtype: &XType) -> XType {
        let base = ExtendedType::unindexed(xtype).clone();
        if extractor.is_primitive(base.obj()) {
            return base;
        }
        let index = self.splits.fresh();
        self.xtypes
            .intern(ExtendedType::Indexed { xtype: base, index })
    }

    /// Evicts canonical values nothing else refers to. Only safe between driver phases.
    pub fn gc(&self) -> usize {
        self.xtypes.gc() + self.slot_names.gc() + self.op_contexts.gc() + self.code_contexts.gc()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::program::mock::MockProgram;

    #[test]
    fn test_independent_construction_shares_identity() {
        let mut program = MockProgram::new();
        let canonical = Canonical::new(PrimitivePolicy::Collapse);
        let class = program.new_class();
        let obj = program.new_instance(class);

        let a = canonical.path_type(&program, None, obj, Some(OpId(3)));
        let b = canonical.path_type(&program, None, obj, Some(OpId(3)));
        assert!(Interned::ptr_eq(&a, &b));

        let m1 = canonical.method_type(a.clone(), b.clone(), class, None);
        let m2 = canonical.method_type(b, a, class, None);
        assert!(Interned::ptr_eq(&m1, &m2));

        let n1 = canonical.field_name(FieldKind::Attribute, obj);
        let n2 = canonical.field_name(FieldKind::Attribute, obj);
        assert!(Interned::ptr_eq(&n1, &n2));
        assert!(n1.is_field() && !n1.is_root());
    }

    #[test]
    fn test_variants_are_distinct() {
        let mut program = MockProgram::new();
        let canonical = Canonical::new(PrimitivePolicy::Collapse);
        let class = program.new_class();
        let obj = program.new_instance(class);

        let external = canonical.external_type(obj);
        let existing = canonical.existing_type(&program, obj);
        assert_ne!(external, existing);
        assert!(external.is_external() && !external.is_existing());
        assert!(existing.is_existing() && !existing.is_external());
        assert_eq!(external.group(), existing.group());
    }

    #[test]
    fn test_primitives_collapse() {
        let mut program = MockProgram::new();
        let mut canonical = Canonical::new(PrimitivePolicy::Collapse);
        let one = program.int(1);

        let a = canonical.path_type(&program, Some(PathId(0)), one, Some(OpId(1)));
        let b = canonical.path_type(&program, Some(PathId(1)), one, Some(OpId(2)));
        assert!(Interned::ptr_eq(&a, &b));
        assert_eq!(a.op(), None);

        let indexed = canonical.indexed_type(&program, &a);
        assert!(Interned::ptr_eq(&indexed, &a));
    }

    #[test]
    fn test_precise_keeps_paths_but_never_splits_primitives() {
        let mut program = MockProgram::new();
        let mut canonical = Canonical::new(PrimitivePolicy::Precise);
        let one = program.int(1);

        let a = canonical.path_type(&program, Some(PathId(0)), one, Some(OpId(1)));
        let b = canonical.path_type(&program, Some(PathId(1)), one, Some(OpId(2)));
        assert_ne!(a, b);
        assert_eq!(a.op(), Some(OpId(1)));

        let indexed = canonical.indexed_type(&program, &a);
        assert!(Interned::ptr_eq(&indexed, &a));
    }

    #[test]
    fn test_code_contexts_share_identity() {
        let canonical = Canonical::new(PrimitivePolicy::Collapse);

        let a = canonical.code_context(CodeId(2), ContextId(5));
        let b = canonical.code_context(CodeId(2), ContextId(5));
        let other = canonical.code_context(CodeId(2), ContextId(6));
        assert!(Interned::ptr_eq(&a, &b));
        assert_ne!(a, other);
        assert_eq!(a.decontextualize(), CodeId(2));
        assert_eq!(other.decontextualize(), CodeId(2));
    }

    #[test]
    fn test_indexed_types_split_and_unwrap() {
        let mut program = MockProgram::new();
        let mut canonical = Canonical::new(PrimitivePolicy::Collapse);
        let class = program.new_class();
        let obj = program.new_instance(class);
        program.set_unique(obj, true);

        let base = canonical.existing_type(&program, obj);
        let first = canonical.indexed_type(&program, &base);
        let second = canonical.indexed_type(&program, &first);

        assert_ne!(first, second);
        assert!(first.is_existing() && first.is_unique());
        assert_eq!(first.obj(), obj);
        match &*second {
            ExtendedType::Indexed { xtype, .. } => assert!(Interned::ptr_eq(xtype, &base)),
            other => panic!("expected an indexed type, got {:?}", other),
        }
    }
}

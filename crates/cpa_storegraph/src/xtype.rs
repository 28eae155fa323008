//! Extended types name the abstract objects the analysis must keep apart. An object's extended
//! type never changes, so every variant carries the underlying abstract object.

use crate::names::ContextId;
use crate::program::{AbstractObj, OpId, PathId};
use cpa_common::util::intern::Interned;
use id_collections::id_type;

/// Fresh index used to split one extended type into several.
#[id_type]
pub struct SplitIndex(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtendedType {
    /// Passed in as an argument from outside the analyzed program.
    External { obj: AbstractObj },

    /// Found in memory by the decompiler (constants, globals, classes).
    Existing { obj: AbstractObj, unique: bool },

    /// Allocated by `op`. `path` is `None` when the analysis is not path sensitive.
    Path {
        path: Option<PathId>,
        obj: AbstractObj,
        op: Option<OpId>,
    },

    /// A bound method, typed by the function and the instance it is bound to.
    Method {
        func: XType,
        inst: XType,
        obj: AbstractObj,
        op: Option<OpId>,
    },

    /// Kept distinct per calling context, e.g. the tuple behind `*args`.
    Context {
        context: ContextId,
        obj: AbstractObj,
        op: Option<OpId>,
    },

    Indexed { xtype: XType, index: SplitIndex },
}

pub type XType = Interned<ExtendedType>;

impl ExtendedType {
    pub fn obj(&self) -> AbstractObj {
        match self {
            ExtendedType::External { obj }
            | ExtendedType::Existing { obj, .. }
            | ExtendedType::Path { obj, .. }
            | ExtendedType::Method { obj, .. }
            | ExtendedType::Context { obj, .. } => *obj,
            ExtendedType::Indexed { xtype, .. } => xtype.obj(),
        }
    }

    pub fn op(&self) -> Option<OpId> {
        match self {
            ExtendedType::External { .. } | ExtendedType::Existing { .. } => None,
            ExtendedType::Path { op, .. }
            | ExtendedType::Method { op, .. }
            | ExtendedType::Context { op, .. } => *op,
            ExtendedType::Indexed { xtype, .. } => xtype.op(),
        }
    }

    pub fn is_existing(&self) -> bool {
        match self {
            ExtendedType::Existing { .. } => true,
            ExtendedType::Indexed { xtype, .. } => xtype.is_existing(),
            _ => false,
        }
    }

    pub fn is_external(&self) -> bool {
        match self {
            ExtendedType::External { .. } => true,
            ExtendedType::Indexed { xtype, .. } => xtype.is_external(),
            _ => false,
        }
    }

    pub fn is_unique(&self) -> bool {
        match self {
            ExtendedType::Existing { unique, .. } => *unique,
            ExtendedType::Indexed { xtype, .. } => xtype.is_unique(),
            _ => false,
        }
    }

    /// Key used to partition objects into regions.
    pub fn group(&self) -> AbstractObj {
        self.obj()
    }

    /// Strips any number of `Indexed` wrappers.
    pub fn unindexed(xtype: &XType) -> &XType {
        let mut current = xtype;
        while let ExtendedType::Indexed { xtype, .. } = &**current {
            current = xtype;
        }
        current
    }
}

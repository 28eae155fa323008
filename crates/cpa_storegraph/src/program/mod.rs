//! What the analysis needs from the frontend: identities for abstract objects, code, locals and
//! operations, a view of each code's parameter list, and structural access to objects that
//! already exist before the analyzed program runs.

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use id_collections::id_type;

#[id_type]
pub struct AbstractObj(pub usize);

#[id_type]
pub struct CodeId(pub usize);

#[id_type]
pub struct LocalId(pub usize);

#[id_type]
pub struct OpId(pub usize);

/// Opaque token distinguishing allocation paths in path-sensitive analyses.
#[id_type]
pub struct PathId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
    Str(String),
    Int(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKind {
    Attribute,
    Array,
    LowLevel,
    Dictionary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param<L> {
    Local(L),
    // The parameter exists but nothing ever reads it.
    DoNotCare,
}

impl<L> Param<L> {
    pub fn is_do_not_care(&self) -> bool {
        matches!(self, Param::DoNotCare)
    }

    pub fn local(&self) -> Option<&L> {
        match self {
            Param::Local(l) => Some(l),
            Param::DoNotCare => None,
        }
    }

    pub fn map<M>(&self, f: impl FnOnce(&L) -> M) -> Param<M> {
        match self {
            Param::Local(l) => Param::Local(f(l)),
            Param::DoNotCare => Param::DoNotCare,
        }
    }
}

/// A parameter list. The frontend describes it in terms of locals; the binder maps the locals to
/// store graph slots for a particular context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeParameters<L = LocalId> {
    pub self_param: Option<Param<L>>,
    pub params: Vec<Param<L>>,
    pub param_names: Vec<String>,
    // Defaults are already-evaluated objects, not locals.
    pub defaults: Vec<AbstractObj>,
    pub vparam: Option<Param<L>>,
    pub kparam: Option<Param<L>>,
    pub return_params: Vec<Param<L>>,
}

impl<L> CodeParameters<L> {
    pub fn map_locals<M>(&self, mut f: impl FnMut(&L) -> M) -> CodeParameters<M> {
        CodeParameters {
            self_param: self.self_param.as_ref().map(|p| p.map(&mut f)),
            params: self.params.iter().map(|p| p.map(&mut f)).collect(),
            param_names: self.param_names.clone(),
            defaults: self.defaults.clone(),
            vparam: self.vparam.as_ref().map(|p| p.map(&mut f)),
            kparam: self.kparam.as_ref().map(|p| p.map(&mut f)),
            return_params: self.return_params.iter().map(|p| p.map(&mut f)).collect(),
        }
    }
}

pub trait Code {
    /// Whether `code` names a body of code the frontend knows about.
    fn is_code(&self, code: CodeId) -> bool;

    fn code_parameters(&self, code: CodeId) -> &CodeParameters;

    fn code_name(&self, code: CodeId) -> &str;
}

pub trait Extractor {
    /// Make sure the object's contents have been decompiled. Idempotent.
    fn ensure_loaded(&mut self, obj: AbstractObj);

    fn get_object(&mut self, value: Constant) -> AbstractObj;

    /// The class of `obj`.
    fn type_of(&self, obj: AbstractObj) -> AbstractObj;

    fn is_unique(&self, obj: AbstractObj) -> bool;

    /// Whether `obj` is a number, bool or string.
    fn is_primitive(&self, obj: AbstractObj) -> bool;

    /// The abstract instance standing in for every tuple.
    fn tuple_instance(&mut self) -> AbstractObj;

    /// Contents of a pre-existing object's field. List-like objects answer every array lookup
    /// with all of their elements, since the index is not tracked. `None` when there is no such
    /// field.
    fn existing_field(
        &self,
        obj: AbstractObj,
        kind: FieldKind,
        key: AbstractObj,
    ) -> Option<Vec<AbstractObj>>;
}

use cpa_common::util::intern::Interned;
use cpa_storegraph::program::CodeId;
use cpa_storegraph::XType;

/// What a context knows about one argument.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CpaType {
    /// Megamorphic: the argument flows in through an assignment constraint.
    Any,
    Type(XType),
}

impl CpaType {
    pub fn is_any(&self) -> bool {
        matches!(self, CpaType::Any)
    }
}

/// A callee together with the argument types one of its contexts is specialized for.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpaSignatureData {
    pub code: CodeId,
    pub self_param: Option<CpaType>,
    pub params: Vec<CpaType>,
}

pub type CpaSignature = Interned<CpaSignatureData>;

impl CpaSignatureData {
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn classification(&self) -> (CodeId, usize) {
        (self.code, self.num_params())
    }

    /// Strictly more general: the same shape, agreeing wherever `self` is precise, and `Any`
    /// somewhere `other` is precise.
    pub fn subsumes(&self, other: &CpaSignatureData) -> bool {
        if self.classification() != other.classification() {
            return false;
        }

        let mut subsume = false;
        for (mine, theirs) in self.params.iter().zip(&other.params) {
            if mine.is_any() && !theirs.is_any() {
                subsume = true;
            } else if mine != theirs {
                return false;
            }
        }
        subsume
    }
}

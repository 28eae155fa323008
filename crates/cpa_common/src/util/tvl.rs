use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Three-valued logic. There is no conversion to `bool`; use `maybe_true` for the optimistic
/// reading and `must_be_true` for the pessimistic one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tvl {
    False,
    Maybe,
    True,
}

impl Tvl {
    pub fn maybe_true(self) -> bool {
        self != Tvl::False
    }

    pub fn maybe_false(self) -> bool {
        self != Tvl::True
    }

    pub fn must_be_true(self) -> bool {
        self == Tvl::True
    }

    pub fn must_be_false(self) -> bool {
        self == Tvl::False
    }

    pub fn certain(self) -> bool {
        self != Tvl::Maybe
    }

    pub fn uncertain(self) -> bool {
        self == Tvl::Maybe
    }
}

impl From<bool> for Tvl {
    fn from(value: bool) -> Self {
        if value {
            Tvl::True
        } else {
            Tvl::False
        }
    }
}

impl Not for Tvl {
    type Output = Tvl;

    fn not(self) -> Tvl {
        match self {
            Tvl::True => Tvl::False,
            Tvl::False => Tvl::True,
            Tvl::Maybe => Tvl::Maybe,
        }
    }
}

impl BitAnd for Tvl {
    type Output = Tvl;

    fn bitand(self, other: Tvl) -> Tvl {
        match (self, other) {
            (Tvl::False, _) | (_, Tvl::False) => Tvl::False,
            (Tvl::True, Tvl::True) => Tvl::True,
            _ => Tvl::Maybe,
        }
    }
}

impl BitOr for Tvl {
    type Output = Tvl;

    fn bitor(self, other: Tvl) -> Tvl {
        match (self, other) {
            (Tvl::True, _) | (_, Tvl::True) => Tvl::True,
            (Tvl::False, Tvl::False) => Tvl::False,
            _ => Tvl::Maybe,
        }
    }
}

impl BitAndAssign for Tvl {
    fn bitand_assign(&mut self, other: Tvl) {
        *self = *self & other;
    }
}

impl BitOrAssign for Tvl {
    fn bitor_assign(&mut self, other: Tvl) {
        *self = *self | other;
    }
}

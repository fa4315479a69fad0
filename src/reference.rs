use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// Handle to a BDD node.
///
/// The absolute value is the index of the node in the unique table,
/// the sign is the complement flag: `-f` is the negation of `f`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Ref(i32);

impl Ref {
    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn negative(index: u32) -> Self {
        Self(-(index as i32))
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Return the same node with the complement flag cleared.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

//! Join-semilattice trait underpinning delta merges.
//!
//! A join-semilattice (S, ⊔) satisfies commutativity, associativity and
//! idempotence. Those three laws are exactly what makes out-of-order,
//! at-least-once update delivery safe to apply blindly.

/// State that merges by least upper bound.
pub trait Lattice: Clone + PartialEq {
    /// The identity element for join.
    fn bottom() -> Self;

    /// Least upper bound.
    /// Must be commutative, associative and idempotent.
    fn join(&self, other: &Self) -> Self;

    /// `self = self ⊔ other`
    fn join_assign(&mut self, other: &Self) {
        *self = self.join(other);
    }
}

//! Merge algebra traits
//!
//! Every configuration fragment (meta, skip, retry, context, parallel, and the
//! engine-level registries and hook lists) combines through [`Join`]. A join
//! never fails and never mutates either operand.
//!
//! General rules:
//! - scalars are overridden only when the incoming value is present
//! - lists append incoming after base, keeping duplicates
//! - maps merge shallowly, incoming wins per key
//! - opt-in booleans are OR'd
//! - registries merge, caches never do

/// Combine a base fragment with an incoming one
pub trait Join {
    /// Produce a new fragment with `other` layered on top of `self`
    fn join(&self, other: &Self) -> Self;
}

/// Fill defaults once a fragment has been fully merged
pub trait Normalize {
    /// Apply defaults in place
    fn normalize(&mut self);

    /// Consume and return the normalized fragment
    fn normalized(mut self) -> Self
    where
        Self: Sized,
    {
        self.normalize();
        self
    }
}

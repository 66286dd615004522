use std::fmt::Debug;

use num_traits::{Bounded, Float, NumCast, ToPrimitive};

/// A trait for types that can be used for indexed coordinates.
///
/// This trait is sealed and cannot be implemented for external types. Distances are
/// accumulated in the coordinate type itself, and pruning relies on IEEE infinity as the
/// "no bound yet" value, so only floating point types are supported.
pub trait IndexableNum:
    private::Sealed
    + Float
    + NumCast
    + ToPrimitive
    + PartialOrd
    + Debug
    + Default
    + Send
    + Sync
    + bytemuck::Pod
    + Bounded
{
}

impl IndexableNum for f32 {}

impl IndexableNum for f64 {}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

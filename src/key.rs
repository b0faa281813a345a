/// Fixed-width integer key that can be routed by range.
///
/// Keys are widened to `i128` for bucket arithmetic, which holds the
/// difference of any two 64-bit keys times any `u32` participant count
/// without overflow.
pub trait RangeKey: Copy + Ord + Default + Send + Sync + std::fmt::Debug + 'static {
    fn widen(self) -> i128;
}

macro_rules! impl_range_key {
    ($($ty:ty),*) => {
        $(
            impl RangeKey for $ty {
                #[inline]
                fn widen(self) -> i128 {
                    self as i128
                }
            }
        )*
    };
}

impl_range_key!(i32, i64, u32, u64);

/// Payload carried alongside each key. Moved, never inspected.
pub trait Payload: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Payload for T {}

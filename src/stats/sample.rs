//! Numeric values that can be aggregated

use std::time::Duration;

/// A metric value: ordered, summable and convertible to `f64` for averages.
pub trait Sample: Copy + PartialOrd + Send + 'static {
    /// Additive identity
    fn zero() -> Self;

    /// Sum of two samples
    fn add(self, other: Self) -> Self;

    /// Floating point view used for means and medians
    fn to_f64(self) -> f64;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                #[inline]
                fn zero() -> Self { 0 as $t }
                #[inline]
                fn add(self, other: Self) -> Self { self + other }
                #[inline]
                fn to_f64(self) -> f64 { self as f64 }
            }
        )*
    };
}

impl_sample!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Durations aggregate in seconds.
impl Sample for Duration {
    #[inline]
    fn zero() -> Self {
        Duration::ZERO
    }

    #[inline]
    fn add(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self.as_secs_f64()
    }
}

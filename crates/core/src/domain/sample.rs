//! Numeric sample representations
//!
//! Every supported [`SampleFormat`] maps to one type implementing [`Sample`].
//! Filter state and coefficients are stored in that type, so a stage bound
//! to a fixed-point format computes with the same precision and saturation
//! as the stream it filters.

use crate::domain::audio::SampleFormat;
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

/// Arithmetic required by a biquad stage
pub trait Sample:
    Copy
    + Default
    + PartialEq
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
    /// Stream format this representation processes natively
    const FORMAT: SampleFormat;

    /// Convert from a real value, saturating to the representable range
    fn from_f64(value: f64) -> Self;

    /// Real value of this sample
    fn to_f64(self) -> f64;
}

impl Sample for f32 {
    const FORMAT: SampleFormat = SampleFormat::Float;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Sample for f64 {
    const FORMAT: SampleFormat = SampleFormat::Double;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

macro_rules! fixed_point_sample {
    (
        $(#[$meta:meta])*
        $name:ident,
        storage = $storage:ty,
        wide = $wide:ty,
        fraction = $frac:expr,
        format = $format:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name($storage);

        impl $name {
            /// Number of fractional bits
            pub const FRACTION_BITS: u32 = $frac;

            const SCALE: f64 = (1u64 << $frac) as f64;

            pub const fn from_raw(raw: $storage) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> $storage {
                self.0
            }
        }

        impl Add for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self(self.0.saturating_add(rhs.0))
            }
        }

        impl Sub for $name {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self(self.0.saturating_sub(rhs.0))
            }
        }

        impl Mul for $name {
            type Output = Self;

            #[inline]
            fn mul(self, rhs: Self) -> Self {
                let product = (<$wide>::from(self.0) * <$wide>::from(rhs.0)) >> $frac;
                let clamped =
                    product.clamp(<$wide>::from(<$storage>::MIN), <$wide>::from(<$storage>::MAX));
                Self(clamped as $storage)
            }
        }

        impl Sample for $name {
            const FORMAT: SampleFormat = $format;

            #[inline]
            fn from_f64(value: f64) -> Self {
                // float -> int `as` saturates and maps NaN to zero
                Self((value * Self::SCALE).round() as $storage)
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self.0 as f64 / Self::SCALE
            }
        }
    };
}

fixed_point_sample! {
    /// 8-bit sample, Q7 in an `i8` (range [-1, 1))
    Int8Sample, storage = i8, wide = i16, fraction = 7, format = SampleFormat::Int8
}

fixed_point_sample! {
    /// 8-bit sample, Q7 in an `i16` container (range [-256, 256))
    Int8On16Sample, storage = i16, wide = i32, fraction = 7, format = SampleFormat::Int8On16
}

fixed_point_sample! {
    /// 16-bit sample, Q15 in an `i16` (range [-1, 1))
    Int16Sample, storage = i16, wide = i32, fraction = 15, format = SampleFormat::Int16
}

fixed_point_sample! {
    /// 16-bit sample, Q15 in an `i32` container (range [-65536, 65536))
    Int16On32Sample, storage = i32, wide = i64, fraction = 15, format = SampleFormat::Int16On32
}

fixed_point_sample! {
    /// 24-bit sample, Q23 in an `i32` container (range [-256, 256))
    Int24On32Sample, storage = i32, wide = i64, fraction = 23, format = SampleFormat::Int24On32
}

fixed_point_sample! {
    /// 32-bit sample, Q31 in an `i32` (range [-1, 1))
    Int32Sample, storage = i32, wide = i64, fraction = 31, format = SampleFormat::Int32
}

fixed_point_sample! {
    /// 32-bit sample, Q31 in an `i64` container. Also backs the `int64`
    /// stream format.
    Int32On64Sample, storage = i64, wide = i128, fraction = 31, format = SampleFormat::Int32On64
}

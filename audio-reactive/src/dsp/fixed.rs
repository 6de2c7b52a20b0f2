//! Q15.16 fixed-point arithmetic.
//!
//! [`Q16`] wraps an `i32` with 16 fractional bits, the format the analysis
//! core runs in. Every operation is total over the representable range:
//! results that do not fit saturate to [`Q16::MIN`] / [`Q16::MAX`] instead of
//! wrapping. Floating point only appears in the `f32` conversions used to
//! derive filter coefficients at construction time.

use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// Signed Q15.16 fixed-point number.
///
/// Multiplication truncates (arithmetic shift, rounds toward −∞). The
/// operators `+`, `-`, `*` and unary `-` all saturate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Q16(i32);

impl Q16 {
    /// 0.0
    pub const ZERO: Q16 = Q16(0);
    /// 1.0
    pub const ONE: Q16 = Q16(1 << FRAC_BITS);
    /// 0.5
    pub const HALF: Q16 = Q16(1 << (FRAC_BITS - 1));
    /// Largest representable value (≈ 32767.99998).
    pub const MAX: Q16 = Q16(i32::MAX);
    /// Most negative representable value (−32768.0).
    pub const MIN: Q16 = Q16(i32::MIN);
    /// Smallest positive step (2⁻¹⁶).
    pub const EPSILON: Q16 = Q16(1);

    /// Wrap a raw Q15.16 bit pattern.
    #[inline(always)]
    pub const fn from_bits(bits: i32) -> Self {
        Q16(bits)
    }

    /// Raw Q15.16 bit pattern.
    #[inline(always)]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Convert an integer, saturating outside −32768..=32767.
    #[inline(always)]
    pub const fn from_int(value: i32) -> Self {
        saturate32((value as i64) << FRAC_BITS)
    }

    /// Integer part, rounded toward −∞.
    #[inline(always)]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    /// Convert from `f32`, truncating toward zero. Out-of-range values
    /// saturate and NaN maps to zero.
    pub fn from_f32(value: f32) -> Self {
        Q16((value * (1u32 << FRAC_BITS) as f32) as i32)
    }

    /// Convert to `f32`.
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / (1u32 << FRAC_BITS) as f32
    }

    /// Convert to Q1.15 (the PWM duty-cycle format), saturating to ±1.0.
    #[inline(always)]
    pub fn to_q15(self) -> i16 {
        saturate16(self.0 >> 1)
    }

    /// Convert from Q1.15.
    #[inline(always)]
    pub const fn from_q15(value: i16) -> Self {
        Q16((value as i32) << 1)
    }

    /// Saturating addition.
    #[inline(always)]
    pub const fn saturating_add(self, rhs: Q16) -> Self {
        Q16(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline(always)]
    pub const fn saturating_sub(self, rhs: Q16) -> Self {
        Q16(self.0.saturating_sub(rhs.0))
    }

    /// Saturating multiplication: `(a * b) >> 16` computed in 64 bits.
    #[inline(always)]
    pub const fn saturating_mul(self, rhs: Q16) -> Self {
        saturate32((self.0 as i64 * rhs.0 as i64) >> FRAC_BITS)
    }

    /// Absolute value. `Q16::MIN.abs()` saturates to `Q16::MAX`.
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Q16(self.0.saturating_abs())
    }

    /// Reciprocal `1 / self`, truncated toward zero. The reciprocal of zero
    /// saturates to `Q16::MAX`.
    pub const fn recip(self) -> Self {
        if self.0 == 0 {
            return Q16::MAX;
        }
        saturate32((1i64 << (2 * FRAC_BITS)) / self.0 as i64)
    }

    /// Square root, i.e. `self` raised to the power ½.
    ///
    /// Exact (floor of the true root) for every non-negative input; negative
    /// inputs clamp to zero.
    pub fn sqrt(self) -> Self {
        wide_sqrt((self.0 as i128) << FRAC_BITS)
    }

    /// `true` if the value is strictly below zero.
    #[inline(always)]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Q16 {
    type Output = Q16;

    #[inline(always)]
    fn add(self, rhs: Q16) -> Q16 {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Q16 {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Q16) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for Q16 {
    type Output = Q16;

    #[inline(always)]
    fn sub(self, rhs: Q16) -> Q16 {
        self.saturating_sub(rhs)
    }
}

impl SubAssign for Q16 {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Q16) {
        *self = self.saturating_sub(rhs);
    }
}

impl Mul for Q16 {
    type Output = Q16;

    #[inline(always)]
    fn mul(self, rhs: Q16) -> Q16 {
        self.saturating_mul(rhs)
    }
}

impl Neg for Q16 {
    type Output = Q16;

    #[inline(always)]
    fn neg(self) -> Q16 {
        Q16(self.0.saturating_neg())
    }
}

/// Square root of a Q32 value (32 fractional bits) held in an `i128`,
/// returned as Q16.
///
/// Used for Goertzel powers, whose register products overflow 64 bits on
/// long blocks. Negative powers (fixed-point rounding) clamp to zero.
pub fn wide_sqrt(power_q32: i128) -> Q16 {
    if power_q32 <= 0 {
        return Q16::ZERO;
    }
    let root = isqrt(power_q32 as u128);
    if root > i32::MAX as u128 {
        Q16::MAX
    } else {
        Q16(root as i32)
    }
}

/// Integer square root (floor), digit-by-digit.
fn isqrt(n: u128) -> u128 {
    let mut rem = n;
    let mut root = 0u128;
    let mut bit = 1u128 << 126;
    while bit > rem {
        bit >>= 2;
    }
    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

/// Clamp a 64-bit intermediate into a `Q16`.
#[inline(always)]
const fn saturate32(val: i64) -> Q16 {
    if val > i32::MAX as i64 {
        Q16::MAX
    } else if val < i32::MIN as i64 {
        Q16::MIN
    } else {
        Q16(val as i32)
    }
}

/// Saturate an `i32` to `i16` range (`-32768..=32767`).
///
/// Maps to ARM `SSAT #16`.
#[inline(always)]
pub fn saturate16(val: i32) -> i16 {
    #[cfg(all(target_arch = "arm", target_feature = "dsp"))]
    {
        let out: i32;
        unsafe {
            core::arch::asm!(
                "ssat {out}, #16, {val}",
                out = out(reg) out,
                val = in(reg) val,
            );
        }
        out as i16
    }
    #[cfg(not(all(target_arch = "arm", target_feature = "dsp")))]
    {
        val.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

//! Magnitude-scaled arithmetic.
//!
//! A determinant divided by dozens of deflation factors quickly leaves the range
//! of `f64`. Values are therefore carried as a mantissa and a power-of-two
//! exponent, and the mantissa is renormalized into `[0.5, 1.0)` after every
//! operation.
//!
//! `ScaledReal` and `ScaledComplex` only convert to and from
//! `num_complex::Complex64` explicitly.

use num_complex::Complex64;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Div, Mul, Neg};

/// Operands whose exponents differ by more than this many binary orders are
/// dropped from a sum.
pub const DEFAULT_DISCARD_ORDERS: i32 = 50;

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const LDEXP_CHUNK: i32 = 1000;

/// Multiplies `x` by `2^exp` without overflowing the intermediate power.
pub fn ldexp(mut x: f64, mut exp: i32) -> f64 {
    while exp > LDEXP_CHUNK {
        x *= 2f64.powi(LDEXP_CHUNK);
        exp -= LDEXP_CHUNK;
        if !x.is_finite() {
            return x;
        }
    }
    while exp < -LDEXP_CHUNK {
        x *= 2f64.powi(-LDEXP_CHUNK);
        exp += LDEXP_CHUNK;
        if x == 0.0 {
            return x;
        }
    }
    x * 2f64.powi(exp)
}

/// Splits `x` into `(m, e)` with `x = m * 2^e` and `|m|` in `[0.5, 1.0)`.
///
/// Zero and non-finite inputs come back unchanged with a zero exponent.
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let (x, bias) = if x.abs() < f64::MIN_POSITIVE {
        (x * TWO_POW_64, -64)
    } else {
        (x, 0)
    };
    let bits = x.to_bits();
    let raw = ((bits >> 52) & 0x7ff) as i32;
    let mantissa = f64::from_bits((bits & !(0x7ff_u64 << 52)) | (1022_u64 << 52));
    (mantissa, raw - 1022 + bias)
}

/// Renormalizes `value * 2^exponent` so the returned mantissa lies in `[0.5, 1.0)`.
pub fn normalize(value: f64, exponent: i32) -> (f64, i32) {
    if value == 0.0 {
        return (0.0, 0);
    }
    let (mantissa, shift) = frexp(value);
    (mantissa, exponent.saturating_add(shift))
}

/// Renormalizes a complex value on its larger component.
///
/// A NaN or infinite component leaves the value untouched.
pub fn normalize_complex(value: Complex64, exponent: i32) -> (Complex64, i32) {
    if !value.re.is_finite() || !value.im.is_finite() {
        return (value, exponent);
    }
    let lead = value.re.abs().max(value.im.abs());
    if lead == 0.0 {
        return (Complex64::zero(), 0);
    }
    let (_, shift) = frexp(lead);
    let mantissa = Complex64::new(ldexp(value.re, -shift), ldexp(value.im, -shift));
    (mantissa, exponent.saturating_add(shift))
}

/// Aligns two scaled reals and adds them.
///
/// The operand with the smaller exponent is shifted down to the larger one; it
/// is discarded outright when the exponents differ by more than
/// `discard_orders`.
pub fn scaled_add(a: ScaledReal, b: ScaledReal, discard_orders: i32) -> ScaledReal {
    if a.is_zero() {
        return b;
    }
    if b.is_zero() {
        return a;
    }
    let (hi, lo) = if a.exponent >= b.exponent { (a, b) } else { (b, a) };
    let gap = hi.exponent - lo.exponent;
    if gap > discard_orders {
        return hi;
    }
    ScaledReal::from_parts(hi.mantissa + ldexp(lo.mantissa, -gap), hi.exponent)
}

/// A real value stored as `mantissa * 2^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledReal {
    pub mantissa: f64,
    pub exponent: i32,
}

impl ScaledReal {
    pub fn new(value: f64) -> Self {
        Self::from_parts(value, 0)
    }

    pub fn from_parts(mantissa: f64, exponent: i32) -> Self {
        let (mantissa, exponent) = normalize(mantissa, exponent);
        Self { mantissa, exponent }
    }

    pub fn to_f64(self) -> f64 {
        ldexp(self.mantissa, self.exponent)
    }

    /// The value expressed relative to `2^reference`.
    pub fn to_f64_at(self, reference: i32) -> f64 {
        ldexp(self.mantissa, self.exponent.saturating_sub(reference))
    }

    /// -1, 0 or 1.
    pub fn signum(self) -> i32 {
        if self.mantissa > 0.0 {
            1
        } else if self.mantissa < 0.0 {
            -1
        } else {
            0
        }
    }

    pub fn is_finite(self) -> bool {
        self.mantissa.is_finite()
    }

    pub fn abs(self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }

    /// True when `self` is more than `orders` binary orders below `reference`.
    pub fn is_negligible_against(self, reference: ScaledReal, orders: i32) -> bool {
        self.is_zero() || (!reference.is_zero() && self.exponent + orders < reference.exponent)
    }

    pub fn cmp_magnitude(&self, other: &Self) -> Ordering {
        compare_magnitudes(
            self.mantissa.abs(),
            self.exponent,
            other.mantissa.abs(),
            other.exponent,
        )
    }
}

impl Zero for ScaledReal {
    fn zero() -> Self {
        Self {
            mantissa: 0.0,
            exponent: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.mantissa == 0.0
    }
}

impl std::ops::Add for ScaledReal {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        scaled_add(self, rhs, DEFAULT_DISCARD_ORDERS)
    }
}

impl Neg for ScaledReal {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl Mul for ScaledReal {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::from_parts(
            self.mantissa * rhs.mantissa,
            self.exponent.saturating_add(rhs.exponent),
        )
    }
}

/// A complex value stored as `mantissa * 2^exponent`, normalized on its larger component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledComplex {
    pub mantissa: Complex64,
    pub exponent: i32,
}

impl ScaledComplex {
    pub fn new(value: Complex64) -> Self {
        Self::from_parts(value, 0)
    }

    pub fn from_parts(mantissa: Complex64, exponent: i32) -> Self {
        let (mantissa, exponent) = normalize_complex(mantissa, exponent);
        Self { mantissa, exponent }
    }

    pub fn to_complex(self) -> Complex64 {
        self.to_complex_at(0)
    }

    /// The value expressed relative to `2^reference`.
    pub fn to_complex_at(self, reference: i32) -> Complex64 {
        let shift = self.exponent.saturating_sub(reference);
        Complex64::new(ldexp(self.mantissa.re, shift), ldexp(self.mantissa.im, shift))
    }

    /// The real part, renormalized on its own.
    pub fn re(self) -> ScaledReal {
        ScaledReal::from_parts(self.mantissa.re, self.exponent)
    }

    pub fn is_finite(self) -> bool {
        self.mantissa.re.is_finite() && self.mantissa.im.is_finite()
    }

    pub fn conj(self) -> Self {
        Self {
            mantissa: self.mantissa.conj(),
            exponent: self.exponent,
        }
    }

    /// Raises to a small non-negative integer power by repeated multiplication.
    pub fn powu(self, power: usize) -> Self {
        (0..power).fold(Self::one(), |acc, _| acc * self)
    }

    /// Division that refuses a zero divisor instead of producing infinities.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.is_zero() {
            None
        } else {
            Some(self / rhs)
        }
    }

    /// Orders by modulus.
    ///
    /// Mantissa moduli span `[0.5, sqrt(2))`, so exponents alone do not decide
    /// the order; both sides are compared at the larger exponent.
    pub fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let reference = self.exponent.max(other.exponent);
        let a = self.to_complex_at(reference).norm();
        let b = other.to_complex_at(reference).norm();
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

impl From<ScaledReal> for ScaledComplex {
    fn from(value: ScaledReal) -> Self {
        Self {
            mantissa: Complex64::new(value.mantissa, 0.0),
            exponent: value.exponent,
        }
    }
}

impl Zero for ScaledComplex {
    fn zero() -> Self {
        Self {
            mantissa: Complex64::zero(),
            exponent: 0,
        }
    }

    fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }
}

impl std::ops::Add for ScaledComplex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }
        let (hi, lo) = if self.exponent >= rhs.exponent {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let gap = hi.exponent - lo.exponent;
        if gap > DEFAULT_DISCARD_ORDERS {
            return hi;
        }
        Self::from_parts(hi.mantissa + lo.to_complex_at(hi.exponent), hi.exponent)
    }
}

impl One for ScaledComplex {
    fn one() -> Self {
        Self::new(Complex64::one())
    }
}

impl Mul for ScaledComplex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::from_parts(
            self.mantissa * rhs.mantissa,
            self.exponent.saturating_add(rhs.exponent),
        )
    }
}

impl Div for ScaledComplex {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Self::from_parts(
            self.mantissa / rhs.mantissa,
            self.exponent.saturating_sub(rhs.exponent),
        )
    }
}

impl Neg for ScaledComplex {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

fn compare_magnitudes(a: f64, a_exp: i32, b: f64, b_exp: i32) -> Ordering {
    match (a == 0.0, b == 0.0) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a_exp
            .cmp(&b_exp)
            .then_with(|| a.partial_cmp(&b).unwrap_or(Ordering::Equal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_reconstructs_ordinary_values() {
        for &x in &[1.0, -3.75, 0.1, 1234.5678, -1e-7, 0.5, 0.999_999] {
            let (m, e) = normalize(x, 0);
            assert!((0.5..1.0).contains(&m.abs()), "mantissa {m} out of range");
            assert!((ldexp(m, e) - x).abs() <= x.abs() * 1e-15);
        }
    }

    #[test]
    fn normalize_survives_extreme_magnitudes() {
        for &x in &[1e308, -1e305, 1e-300, 5e-324, -2.2e-310] {
            let (m, e) = normalize(x, 0);
            assert!(m.is_finite());
            assert!((0.5..1.0).contains(&m.abs()));
            let rebuilt = ldexp(m, e);
            assert!(((rebuilt - x) / x).abs() < 1e-12, "{x} rebuilt as {rebuilt}");
        }
    }

    #[test]
    fn normalize_keeps_zero() {
        assert_eq!(normalize(0.0, 17), (0.0, 0));
        assert!(ScaledReal::new(0.0).is_zero());
    }

    #[test]
    fn complex_normalizes_on_larger_component() {
        let value = ScaledComplex::new(Complex64::new(3.0, -40.0));
        let lead = value.mantissa.re.abs().max(value.mantissa.im.abs());
        assert!((0.5..1.0).contains(&lead));
        let back = value.to_complex();
        assert!((back - Complex64::new(3.0, -40.0)).norm() < 1e-12);
    }

    #[test]
    fn scaled_add_discards_far_smaller_operand() {
        let big = ScaledReal::from_parts(0.75, 100);
        let tiny = ScaledReal::from_parts(0.75, 20);
        assert_eq!(scaled_add(big, tiny, DEFAULT_DISCARD_ORDERS), big);
        assert_eq!(scaled_add(tiny, big, DEFAULT_DISCARD_ORDERS), big);
    }

    #[test]
    fn scaled_add_aligns_exponents() {
        let a = ScaledReal::new(1000.0);
        let b = ScaledReal::new(-0.5);
        let sum = scaled_add(a, b, DEFAULT_DISCARD_ORDERS);
        assert!((sum.to_f64() - 999.5).abs() < 1e-12);
        assert!((0.5..1.0).contains(&sum.mantissa.abs()));
    }

    #[test]
    fn scaled_add_cancels_to_zero() {
        let a = ScaledReal::new(2.5);
        assert!(scaled_add(a, -a, DEFAULT_DISCARD_ORDERS).is_zero());
    }

    #[test]
    fn products_stay_finite_where_f64_overflows() {
        let factor = ScaledComplex::new(Complex64::new(1e200, 0.0));
        let product = factor * factor * factor;
        assert!(product.is_finite());
        assert_eq!(product.cmp_magnitude(&factor), Ordering::Greater);
        let back = product / factor / factor;
        assert!((back.to_complex().re / 1e200 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn checked_div_rejects_zero() {
        let one = ScaledComplex::one();
        assert!(one.checked_div(ScaledComplex::zero()).is_none());
        assert!(one.checked_div(one).is_some());
    }

    #[test]
    fn magnitude_ordering_compares_exponent_first() {
        let small = ScaledReal::new(0.9);
        let large = ScaledReal::new(-1.1);
        assert_eq!(small.cmp_magnitude(&large), Ordering::Less);
        assert_eq!(ScaledReal::zero().cmp_magnitude(&small), Ordering::Less);
    }

    #[test]
    fn complex_magnitude_ordering_uses_the_modulus() {
        let diagonal = ScaledComplex::new(Complex64::new(0.9, 0.9));
        let unit = ScaledComplex::new(Complex64::new(1.0, 0.0));
        assert!(diagonal.exponent < unit.exponent);
        assert_eq!(diagonal.cmp_magnitude(&unit), Ordering::Greater);
        assert_eq!(unit.cmp_magnitude(&diagonal), Ordering::Less);
        assert_eq!(unit.cmp_magnitude(&unit), Ordering::Equal);
        assert_eq!(ScaledComplex::zero().cmp_magnitude(&unit), Ordering::Less);

        let far = ScaledComplex::from_parts(Complex64::new(0.5, 0.0), 2000);
        assert_eq!(far.cmp_magnitude(&diagonal), Ordering::Greater);
        assert_eq!(diagonal.cmp_magnitude(&far), Ordering::Less);
    }

    #[test]
    fn nan_component_stays_non_finite() {
        let value = ScaledComplex::new(Complex64::new(f64::NAN, 0.0));
        assert!(!value.is_finite());
        assert!(!value.is_zero());
        let mixed = ScaledComplex::new(Complex64::new(2.0, f64::NAN));
        assert!(!mixed.is_finite());
        let infinite = ScaledComplex::new(Complex64::new(0.0, f64::INFINITY));
        assert!(!infinite.is_finite());
    }

    #[test]
    fn negligible_detects_flat_differences() {
        let value = ScaledReal::new(1.0);
        assert!(ScaledReal::new(1e-6).is_negligible_against(value, 10));
        assert!(!ScaledReal::new(0.1).is_negligible_against(value, 10));
        assert!(ScaledReal::zero().is_negligible_against(value, 10));
    }
}

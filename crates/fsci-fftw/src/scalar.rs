//! Precision and element-type abstraction.
//!
//! Every transform is generic over a real [`Scalar`] (`f32` or `f64`) and over
//! the [`Element`] types stored in caller buffers (`T` or `Complex<T>`). Both
//! traits are sealed: the engine only knows how to plan for these four element
//! types, so downstream crates cannot add new ones.

use std::fmt::{Debug, Display};
use std::iter::Sum;

use bytemuck::Pod;
use num_complex::Complex;
use num_traits::{Float, FloatConst, NumAssign};
use serde::{Deserialize, Serialize};

use crate::engine::ReferenceEngine;

mod private {
    use num_complex::Complex;

    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for Complex<f32> {}
    impl Sealed for Complex<f64> {}
}

/// Single-precision complex element.
pub type Complex32 = Complex<f32>;

/// Double-precision complex element.
pub type Complex64 = Complex<f64>;

/// Numeric precision of a plan, fixed by its element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }
}

/// Whether an element type stores real or complex values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Real,
    Complex,
}

/// Real floating-point type a transform is computed in.
///
/// Only `f32` and `f64` implement this trait. The engine for a precision is
/// reached through [`Scalar::reference_engine`], so picking the element type
/// picks the engine backend at compile time.
pub trait Scalar:
    private::Sealed
    + Float
    + FloatConst
    + NumAssign
    + Pod
    + Default
    + Debug
    + Display
    + Send
    + Sync
    + Sum
    + 'static
{
    const PRECISION: Precision;

    /// Machine epsilon.
    const EPSILON: Self;

    /// Lossy conversion from an `f64` constant or twiddle factor.
    fn cast(value: f64) -> Self;

    fn as_f64(self) -> f64;

    /// Bundled engine for this precision.
    fn reference_engine() -> &'static ReferenceEngine<Self>;
}

static REFERENCE_F32: ReferenceEngine<f32> = ReferenceEngine::new();
static REFERENCE_F64: ReferenceEngine<f64> = ReferenceEngine::new();

impl Scalar for f32 {
    const PRECISION: Precision = Precision::Single;
    const EPSILON: Self = f32::EPSILON;

    #[inline]
    fn cast(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        f64::from(self)
    }

    fn reference_engine() -> &'static ReferenceEngine<Self> {
        &REFERENCE_F32
    }
}

impl Scalar for f64 {
    const PRECISION: Precision = Precision::Double;
    const EPSILON: Self = f64::EPSILON;

    #[inline]
    fn cast(value: f64) -> Self {
        value
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }

    fn reference_engine() -> &'static ReferenceEngine<Self> {
        &REFERENCE_F64
    }
}

/// A value that can live in a transform buffer.
///
/// `Complex<T>` is bit-compatible with `[T; 2]`, which is what lets a view
/// hand the engine a flat slice of real scalars for either domain.
pub trait Element: private::Sealed + Pod + Default + Debug + PartialEq + Send + Sync + 'static {
    type Real: Scalar;

    const DOMAIN: Domain;

    fn scale(self, factor: Self::Real) -> Self;

    fn is_finite(self) -> bool;
}

impl Element for f32 {
    type Real = f32;
    const DOMAIN: Domain = Domain::Real;

    #[inline]
    fn scale(self, factor: f32) -> Self {
        self * factor
    }

    #[inline]
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }
}

impl Element for f64 {
    type Real = f64;
    const DOMAIN: Domain = Domain::Real;

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

impl Element for Complex<f32> {
    type Real = f32;
    const DOMAIN: Domain = Domain::Complex;

    #[inline]
    fn scale(self, factor: f32) -> Self {
        self * factor
    }

    #[inline]
    fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl Element for Complex<f64> {
    type Real = f64;
    const DOMAIN: Domain = Domain::Complex;

    #[inline]
    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

/// Number of real scalars one element occupies in engine storage.
#[must_use]
pub const fn scalars_per_element(domain: Domain) -> usize {
    match domain {
        Domain::Real => 1,
        Domain::Complex => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::{Complex32, Complex64, Domain, Element, Precision, Scalar, scalars_per_element};

    #[test]
    fn precision_is_fixed_by_real_type() {
        assert_eq!(<f32 as Scalar>::PRECISION, Precision::Single);
        assert_eq!(<f64 as Scalar>::PRECISION, Precision::Double);
        assert_eq!(
            <<Complex32 as Element>::Real as Scalar>::PRECISION,
            Precision::Single
        );
    }

    #[test]
    fn complex_elements_occupy_two_scalars() {
        assert_eq!(<Complex64 as Element>::DOMAIN, Domain::Complex);
        assert_eq!(scalars_per_element(Domain::Complex), 2);
        assert_eq!(
            std::mem::size_of::<Complex64>(),
            2 * std::mem::size_of::<f64>()
        );
    }

    #[test]
    fn complex_scale_touches_both_parts() {
        let z = Element::scale(Complex64::new(2.0, -4.0), 0.5);
        assert_eq!(z, Complex64::new(1.0, -2.0));
        assert!(!Element::is_finite(Complex32::new(f32::NAN, 0.0)));
    }
}

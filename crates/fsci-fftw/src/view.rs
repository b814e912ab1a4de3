//! A [`Layout`] bound to caller-owned storage.

use crate::layout::Layout;
use crate::scalar::{Domain, Element};

/// Exclusive borrow of a caller buffer interpreted through a [`Layout`].
///
/// The view never owns the data; dropping it hands the buffer back.
#[derive(Debug)]
pub struct View<'a, T: Element> {
    layout: Layout,
    data: &'a mut [T],
}

impl<'a, T: Element> View<'a, T> {
    /// # Panics
    ///
    /// Panics if `data.len() != layout.size()`.
    #[must_use]
    pub fn new(data: &'a mut [T], layout: Layout) -> Self {
        assert_eq!(
            data.len(),
            layout.size(),
            "buffer length does not match layout size"
        );
        Self { layout, data }
    }

    /// Rank-1, single-transform, unit-stride view over the whole buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data` is empty.
    #[must_use]
    pub fn from_slice(data: &'a mut [T]) -> Self {
        let layout = Layout::contiguous(&[data.len()]);
        Self::new(data, layout)
    }

    /// Row-major, unpadded view with one entry of `dims` per axis.
    ///
    /// # Panics
    ///
    /// Panics if `dims` is empty, contains a zero, or does not multiply out to
    /// `data.len()`.
    #[must_use]
    pub fn with_dims(data: &'a mut [T], dims: &[usize]) -> Self {
        Self::new(data, Layout::contiguous(dims))
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    #[must_use]
    pub fn n(&self) -> &[usize] {
        self.layout.n()
    }

    #[must_use]
    pub fn how_many(&self) -> usize {
        self.layout.how_many()
    }

    #[must_use]
    pub fn embed(&self) -> &[usize] {
        self.layout.embed()
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    #[must_use]
    pub fn dist(&self) -> usize {
        self.layout.dist()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &*self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Engine-facing storage: element 0 onward as real scalars, complex
    /// values interleaved `re, im`.
    #[must_use]
    pub fn engine_data(&self) -> &[T::Real] {
        bytemuck::cast_slice(&*self.data)
    }

    pub fn engine_data_mut(&mut self) -> &mut [T::Real] {
        bytemuck::cast_slice_mut(&mut *self.data)
    }

    /// Same layout, so the view can stand in for this one when replaying a plan.
    #[must_use]
    pub fn equal_storage<U: Element>(&self, other: &View<'_, U>) -> bool {
        self.layout == other.layout
    }

    /// Whether a transform from `self` into `other` has consistent shapes.
    ///
    /// Rank and batch count must agree. When exactly one side is complex, its
    /// trailing logical size must be `real / 2 + 1` and every other axis must
    /// match; otherwise all axes must match.
    #[must_use]
    pub fn transformable<U: Element>(&self, other: &View<'_, U>) -> bool {
        shapes_transformable(&self.layout, T::DOMAIN, &other.layout, U::DOMAIN)
    }

    /// Multiply every addressed element by `factor`; padding is untouched.
    pub fn scale(&mut self, factor: T::Real) {
        for offset in self.layout.offsets() {
            self.data[offset] = self.data[offset].scale(factor);
        }
    }

    /// Whether every addressed element is finite.
    #[must_use]
    pub fn all_finite(&self) -> bool {
        self.layout
            .offsets()
            .into_iter()
            .all(|offset| self.data[offset].is_finite())
    }

    /// Give the borrowed buffer back.
    #[must_use]
    pub fn into_inner(self) -> &'a mut [T] {
        self.data
    }
}

pub(crate) fn shapes_transformable(a: &Layout, a_domain: Domain, b: &Layout, b_domain: Domain) -> bool {
    if a.rank() != b.rank() || a.how_many() != b.how_many() {
        return false;
    }
    let (real, complex) = match (a_domain, b_domain) {
        (Domain::Real, Domain::Complex) => (a, b),
        (Domain::Complex, Domain::Real) => (b, a),
        _ => return a.n() == b.n(),
    };
    let rank = real.rank();
    real.n()[..rank - 1] == complex.n()[..rank - 1]
        && complex.n()[rank - 1] == real.n()[rank - 1] / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::View;
    use crate::layout::Layout;
    use crate::scalar::Complex64;

    #[test]
    fn convenience_constructors_infer_layouts() {
        let mut data = vec![0.0f64; 12];
        let view = View::with_dims(&mut data, &[3, 4]);
        assert_eq!(view.n(), &[3, 4]);
        assert_eq!(view.how_many(), 1);
        assert_eq!(view.stride(), 1);
        drop(view);
        let view = View::from_slice(&mut data);
        assert_eq!(view.rank(), 1);
        assert_eq!(view.n(), &[12]);
    }

    #[test]
    #[should_panic(expected = "does not match layout size")]
    fn buffer_must_match_layout() {
        let mut data = vec![0.0f64; 10];
        let _ = View::new(&mut data, Layout::contiguous(&[3, 4]));
    }

    #[test]
    fn real_to_complex_halves_trailing_axis() {
        let mut real = vec![0.0f64; 6 * 8];
        let mut half = vec![Complex64::default(); 6 * 5];
        let mut full = vec![Complex64::default(); 6 * 8];
        let real = View::with_dims(&mut real, &[6, 8]);
        let half = View::with_dims(&mut half, &[6, 5]);
        let full = View::with_dims(&mut full, &[6, 8]);
        assert!(real.transformable(&half));
        assert!(half.transformable(&real));
        assert!(!real.transformable(&full));
        assert!(full.transformable(&full));
    }

    #[test]
    fn batch_mismatch_is_not_transformable() {
        let mut a = vec![0.0f64; 8];
        let mut b = vec![0.0f64; 8];
        let a = View::new(&mut a, Layout::batched(&[4], 2));
        let b = View::from_slice(&mut b);
        assert!(!a.transformable(&b));
        assert!(!a.equal_storage(&b));
    }

    #[test]
    fn engine_data_interleaves_complex_parts() {
        let mut data = vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)];
        let view = View::from_slice(&mut data);
        assert_eq!(view.engine_data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn scale_leaves_padding_alone() {
        let mut data = vec![1.0f64; 8];
        let mut view = View::new(&mut data, Layout::new(1, &[3], 2, &[4], 1, 4));
        view.scale(2.0);
        assert_eq!(view.as_slice(), &[2.0, 2.0, 2.0, 1.0, 2.0, 2.0, 2.0, 1.0]);
    }
}

//! SIMD-aligned transform storage.
//!
//! The engine's fastest code paths assume 16-byte aligned buffers. A plain
//! `Vec<f64>` only guarantees 8. `AlignedVec` stores its elements inside
//! 16-byte aligned blocks and reinterprets them with `bytemuck`, so no
//! allocator code or `unsafe` is needed.

use std::ops::{Deref, DerefMut};

use bytemuck::{Pod, Zeroable};

use crate::scalar::Element;

/// Alignment the engine expects for its vectorized kernels, in bytes.
pub const SIMD_ALIGNMENT: usize = 16;

#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
#[repr(C, align(16))]
struct Block {
    lanes: [u64; 2],
}

/// Zero-initialized, fixed-length buffer aligned to [`SIMD_ALIGNMENT`].
#[derive(Debug, Clone)]
pub struct AlignedVec<T: Element> {
    blocks: Vec<Block>,
    len: usize,
    _element: std::marker::PhantomData<T>,
}

impl<T: Element> AlignedVec<T> {
    /// Buffer of `len` zero elements.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        let bytes = len * std::mem::size_of::<T>();
        let blocks = bytes.div_ceil(std::mem::size_of::<Block>());
        Self {
            blocks: vec![Block::default(); blocks],
            len,
            _element: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn from_slice(values: &[T]) -> Self {
        let mut out = Self::zeros(values.len());
        out.copy_from_slice(values);
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &bytemuck::cast_slice::<Block, T>(&self.blocks)[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len;
        &mut bytemuck::cast_slice_mut::<Block, T>(&mut self.blocks)[..len]
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<T: Element> Deref for AlignedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for AlignedVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

/// Misalignment of a buffer's first element, in bytes modulo [`SIMD_ALIGNMENT`].
///
/// Two buffers with the same value can share a plan without `Unaligned`.
#[must_use]
pub fn alignment_of<T: Pod>(data: &[T]) -> usize {
    data.as_ptr() as usize % SIMD_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::{AlignedVec, alignment_of};
    use crate::scalar::Complex64;

    #[test]
    fn storage_is_sixteen_byte_aligned() {
        let real = AlignedVec::<f32>::zeros(7);
        let complex = AlignedVec::<Complex64>::zeros(3);
        assert_eq!(alignment_of(&real), 0);
        assert_eq!(alignment_of(&complex), 0);
        assert_eq!(real.len(), 7);
        assert!(real.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn offset_subslice_is_misaligned() {
        let data = AlignedVec::<f64>::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(alignment_of(&data[1..]), 8);
        assert_eq!(data.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_buffer_is_allowed() {
        let data = AlignedVec::<f64>::zeros(0);
        assert!(data.is_empty());
        assert!(data.as_slice().is_empty());
    }
}

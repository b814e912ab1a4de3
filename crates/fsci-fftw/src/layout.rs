//! Shape description of a batched, strided, possibly padded array.

use serde::{Deserialize, Serialize};

/// How a batch of 1-D transforms is interleaved in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageOrder {
    /// Each transform is contiguous; transforms follow one another.
    RowMajor,
    /// Element `i` of every transform is stored together.
    ColumnMajor,
}

/// Shape of an array for transform purposes, independent of any buffer.
///
/// Element `idx` (row-major over `n`) of batch `b` lives at
/// `b * dist + stride * linear(idx, embed)`, where `linear` flattens the index
/// row-major over the storage sizes in `embed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawLayout")]
pub struct Layout {
    n: Vec<usize>,
    how_many: usize,
    embed: Vec<usize>,
    stride: usize,
    dist: usize,
}

/// Unchecked wire form; deserialized layouts are validated like `Layout::new`.
#[derive(Deserialize)]
struct RawLayout {
    n: Vec<usize>,
    how_many: usize,
    embed: Vec<usize>,
    stride: usize,
    dist: usize,
}

impl TryFrom<RawLayout> for Layout {
    type Error = String;

    fn try_from(raw: RawLayout) -> Result<Self, String> {
        let layout = Self {
            n: raw.n,
            how_many: raw.how_many,
            embed: raw.embed,
            stride: raw.stride,
            dist: raw.dist,
        };
        layout.validate()?;
        Ok(layout)
    }
}

impl Layout {
    /// # Panics
    ///
    /// Panics if any argument is zero, if `n` or `embed` does not have `rank`
    /// entries, if an embed size is smaller than the logical size, or if the
    /// strides address storage past [`Layout::size`].
    #[must_use]
    pub fn new(
        rank: usize,
        n: &[usize],
        how_many: usize,
        embed: &[usize],
        stride: usize,
        dist: usize,
    ) -> Self {
        assert!(rank >= 1, "layout rank must be positive");
        assert_eq!(n.len(), rank, "layout needs one logical size per axis");
        let layout = Self {
            n: n.to_vec(),
            how_many,
            embed: embed.to_vec(),
            stride,
            dist,
        };
        if let Err(reason) = layout.validate() {
            panic!("{reason}");
        }
        layout
    }

    fn validate(&self) -> Result<(), String> {
        let (n, embed) = (&self.n, &self.embed);
        if n.is_empty() {
            return Err("layout rank must be positive".to_string());
        }
        if embed.len() != n.len() {
            return Err("layout needs one embed size per axis".to_string());
        }
        if n.iter().chain(embed).any(|&v| v == 0) {
            return Err(format!("layout sizes must be positive: n={n:?} embed={embed:?}"));
        }
        if self.how_many == 0 || self.stride == 0 || self.dist == 0 {
            return Err("how_many, stride and dist must be positive".to_string());
        }
        if n.iter().zip(embed).any(|(n, e)| e < n) {
            return Err(format!("embed {embed:?} is smaller than logical size {n:?}"));
        }
        let size = embed
            .iter()
            .try_fold(self.how_many, |acc, &e| acc.checked_mul(e))
            .ok_or_else(|| format!("layout storage size overflows: embed={embed:?}"))?;
        let last = self
            .checked_max_offset()
            .ok_or_else(|| "layout offsets overflow".to_string())?;
        if last >= size {
            return Err(format!(
                "layout addresses offset {last} outside storage of {size} elements"
            ));
        }
        Ok(())
    }

    /// Unbatched, unpadded, unit-stride row-major layout.
    #[must_use]
    pub fn contiguous(dims: &[usize]) -> Self {
        Self::batched(dims, 1)
    }

    /// `how_many` back-to-back unpadded row-major arrays.
    #[must_use]
    pub fn batched(dims: &[usize], how_many: usize) -> Self {
        let dist = dims.iter().product();
        Self::new(dims.len(), dims, how_many, dims, 1, dist)
    }

    /// `how_many` 1-D transforms of length `n` in the given storage order.
    #[must_use]
    pub fn many_1d(n: usize, how_many: usize, order: StorageOrder) -> Self {
        match order {
            StorageOrder::RowMajor => Self::new(1, &[n], how_many, &[n], 1, n),
            StorageOrder::ColumnMajor => Self::new(1, &[n], how_many, &[n], how_many, 1),
        }
    }

    /// Complex-side layout of a real-to-complex transform over this layout.
    ///
    /// The trailing axis shrinks to `n/2 + 1`; batching is kept, padding and
    /// strides are not.
    #[must_use]
    pub fn complex_half(&self) -> Self {
        let mut dims = self.n.clone();
        if let Some(last) = dims.last_mut() {
            *last = *last / 2 + 1;
        }
        Self::batched(&dims, self.how_many)
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.n.len()
    }

    #[must_use]
    pub fn n(&self) -> &[usize] {
        &self.n
    }

    #[must_use]
    pub fn how_many(&self) -> usize {
        self.how_many
    }

    #[must_use]
    pub fn embed(&self) -> &[usize] {
        &self.embed
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn dist(&self) -> usize {
        self.dist
    }

    /// Required buffer length: `how_many * product(embed)`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.how_many * self.embed.iter().product::<usize>()
    }

    /// Logical elements in one transform.
    #[must_use]
    pub fn logical_len(&self) -> usize {
        self.n.iter().product()
    }

    /// Storage offset of every logical element, batch-major then row-major.
    #[must_use]
    pub fn offsets(&self) -> Vec<usize> {
        let per_batch = self.batch_offsets();
        let mut offsets = Vec::with_capacity(per_batch.len() * self.how_many);
        for batch in 0..self.how_many {
            let base = batch * self.dist;
            offsets.extend(per_batch.iter().map(|offset| base + offset));
        }
        offsets
    }

    /// Offsets of one transform relative to its batch start.
    #[must_use]
    pub fn batch_offsets(&self) -> Vec<usize> {
        let rank = self.rank();
        // Storage strides (in elements) for each axis, row-major over `embed`.
        let mut axis_stride = vec![self.stride; rank];
        for axis in (0..rank.saturating_sub(1)).rev() {
            axis_stride[axis] = axis_stride[axis + 1] * self.embed[axis + 1];
        }
        let mut offsets = Vec::with_capacity(self.logical_len());
        let mut index = vec![0usize; rank];
        loop {
            offsets.push(
                index
                    .iter()
                    .zip(&axis_stride)
                    .map(|(i, s)| i * s)
                    .sum::<usize>(),
            );
            let mut axis = rank;
            loop {
                if axis == 0 {
                    return offsets;
                }
                axis -= 1;
                index[axis] += 1;
                if index[axis] < self.n[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
    }

    fn checked_max_offset(&self) -> Option<usize> {
        let mut within = 0usize;
        for (axis, &n) in self.n.iter().enumerate() {
            let tail = self.embed[axis + 1..]
                .iter()
                .try_fold(self.stride, |acc, &e| acc.checked_mul(e))?;
            within = within.checked_add((n - 1).checked_mul(tail)?)?;
        }
        (self.how_many - 1).checked_mul(self.dist)?.checked_add(within)
    }
}

#[cfg(test)]
mod tests {
    use super::{Layout, StorageOrder};

    #[test]
    fn size_is_batch_times_embed_product() {
        let layout = Layout::new(2, &[3, 4], 2, &[3, 6], 1, 18);
        assert_eq!(layout.size(), 36);
        assert_eq!(layout.logical_len(), 12);
        assert_eq!(layout.rank(), 2);
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Layout::contiguous(&[4, 5]), Layout::new(2, &[4, 5], 1, &[4, 5], 1, 20));
        assert_ne!(Layout::contiguous(&[4, 5]), Layout::contiguous(&[5, 4]));
    }

    #[test]
    fn padded_offsets_skip_embed_padding() {
        let layout = Layout::new(2, &[2, 3], 1, &[2, 4], 1, 8);
        assert_eq!(layout.offsets(), vec![0, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn column_major_batches_interleave() {
        let layout = Layout::many_1d(3, 2, StorageOrder::ColumnMajor);
        assert_eq!(layout.offsets(), vec![0, 2, 4, 1, 3, 5]);
        let rows = Layout::many_1d(3, 2, StorageOrder::RowMajor);
        assert_eq!(rows.offsets(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn complex_half_shrinks_trailing_axis() {
        let real = Layout::batched(&[4, 9], 3);
        let half = real.complex_half();
        assert_eq!(half.n(), &[4, 5]);
        assert_eq!(half.how_many(), 3);
        assert_eq!(half.size(), 60);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn zero_dimension_is_a_contract_violation() {
        let _ = Layout::contiguous(&[4, 0]);
    }

    #[test]
    #[should_panic(expected = "one logical size per axis")]
    fn rank_mismatch_is_a_contract_violation() {
        let _ = Layout::new(2, &[4], 1, &[4, 4], 1, 16);
    }

    #[test]
    #[should_panic(expected = "outside storage")]
    fn overlapping_batches_past_storage_are_rejected() {
        let _ = Layout::new(1, &[4], 2, &[4], 1, 6);
    }
}

//! Partitioning of an image into the pixels to synthesize and the pixels that
//! can be copied from.

use crate::grid::{check_flat_len, CoordFlat, PixelGrid};
use crate::{Dims, Error};

/// Marks a flat index that isn't part of the mask
const NOT_MASKED: u32 = u32::MAX;

/// The masked and source pixels of an image, both in row-major order.
pub(crate) struct Mask {
    /// Pixels that need to be synthesized
    masked: Vec<CoordFlat>,
    /// Pixels with known values, far enough from the border to have a full
    /// 8-neighborhood
    source: Vec<CoordFlat>,
    /// For every flat index, its position in `masked`, or `NOT_MASKED`
    slots: Vec<u32>,
    /// Source membership for every flat index, used to filter codebook windows
    is_source: Vec<bool>,
    dims: Dims,
}

impl Mask {
    /// Classifies every pixel of `image`. Pixels equal to `sentinel` are
    /// masked, everything else within `margin` of an edge is left out of the
    /// source set.
    pub(crate) fn build(image: &PixelGrid, sentinel: f32, margin: u32) -> Result<Self, Error> {
        let dims = image.dims();
        check_flat_len(dims)?;
        let len = dims.width as usize * dims.height as usize;

        let mut masked = Vec::new();
        let mut source = Vec::new();
        let mut slots = vec![NOT_MASKED; len];
        let mut is_source = vec![false; len];

        let inner = |v: u32, extent: u32| v >= margin && v < extent.saturating_sub(margin);

        for y in 0..dims.height {
            for x in 0..dims.width {
                let flat = CoordFlat(y * dims.width + x);

                #[allow(clippy::float_cmp)]
                let is_masked = image.at(flat) == sentinel;

                if is_masked {
                    slots[flat.index()] = masked.len() as u32;
                    masked.push(flat);
                } else if inner(x, dims.width) && inner(y, dims.height) {
                    is_source[flat.index()] = true;
                    source.push(flat);
                }
            }
        }

        if source.is_empty() {
            return Err(Error::InvalidMask);
        }

        Ok(Self {
            masked,
            source,
            slots,
            is_source,
            dims,
        })
    }

    #[inline]
    pub(crate) fn masked(&self) -> &[CoordFlat] {
        &self.masked
    }

    #[inline]
    pub(crate) fn source(&self) -> &[CoordFlat] {
        &self.source
    }

    /// The position of `coord` in the masked list, if it is masked
    #[inline]
    pub(crate) fn slot_of(&self, coord: CoordFlat) -> Option<usize> {
        match self.slots[coord.index()] {
            NOT_MASKED => None,
            slot => Some(slot as usize),
        }
    }

    #[inline]
    pub(crate) fn is_source(&self, coord: CoordFlat) -> bool {
        self.is_source[coord.index()]
    }

    /// Number of pixels that are neither masked nor usable as a source
    pub(crate) fn excluded_count(&self) -> usize {
        self.slots.len() - self.masked.len() - self.source.len()
    }

    #[inline]
    pub(crate) fn dims(&self) -> Dims {
        self.dims
    }
}

//! The candidate sets searched for every masked pixel.

use crate::grid::CoordFlat;
use crate::mask::Mask;
use crate::{EmptyWindowPolicy, Error};

/// Which source pixels are compared against each masked pixel. Built once
/// before the first pass and never updated afterwards.
pub(crate) enum CandidateIndex {
    /// Every masked pixel searches the whole source set
    Unrestricted,
    /// Every masked pixel searches only the source pixels in a square window
    /// around it, in row-major order. `None` marks a pixel that fell back to
    /// the whole source set.
    Codebook(Vec<Option<Vec<CoordFlat>>>),
}

impl CandidateIndex {
    /// Builds a window of half-width `neighborhood_size` around every masked
    /// pixel, costing `O(|mask| * neighborhood_size^2)`
    pub(crate) fn codebook(
        mask: &Mask,
        neighborhood_size: u32,
        policy: EmptyWindowPolicy,
    ) -> Result<Self, Error> {
        let dims = mask.dims();
        let mut windows = Vec::with_capacity(mask.masked().len());

        for pixel in mask.masked() {
            let center = pixel.to_2d(dims);

            let begin_x = center.x.saturating_sub(neighborhood_size);
            let end_x = center.x.saturating_add(neighborhood_size).min(dims.width - 1);
            let begin_y = center.y.saturating_sub(neighborhood_size);
            let end_y = center.y.saturating_add(neighborhood_size).min(dims.height - 1);

            let mut neighbors = Vec::new();
            for y in begin_y..=end_y {
                for x in begin_x..=end_x {
                    let candidate = CoordFlat(y * dims.width + x);
                    // the center is masked, so it is never a source pixel
                    if mask.is_source(candidate) {
                        neighbors.push(candidate);
                    }
                }
            }

            if neighbors.is_empty() {
                match policy {
                    EmptyWindowPolicy::Fail => {
                        return Err(Error::NoCandidate {
                            x: center.x,
                            y: center.y,
                        });
                    }
                    EmptyWindowPolicy::GlobalFallback => {
                        tracing::warn!(
                            x = center.x,
                            y = center.y,
                            "candidate window is empty, searching the whole source set"
                        );
                        windows.push(None);
                    }
                }
            } else {
                windows.push(Some(neighbors));
            }
        }

        Ok(Self::Codebook(windows))
    }

    /// The candidates of the masked pixel stored at `slot`
    #[inline]
    pub(crate) fn candidates<'a>(&'a self, slot: usize, mask: &'a Mask) -> &'a [CoordFlat] {
        match self {
            Self::Unrestricted => mask.source(),
            Self::Codebook(windows) => match &windows[slot] {
                Some(window) => window,
                None => mask.source(),
            },
        }
    }
}

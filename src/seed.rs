use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::grid::{CoordFlat, PixelGrid};
use crate::mask::Mask;

/// For every masked pixel (by its position in the mask), the pixel it
/// currently copies its value from.
pub(crate) struct AssignmentMap(Vec<CoordFlat>);

impl AssignmentMap {
    #[cfg(test)]
    pub(crate) fn get(&self, slot: usize) -> CoordFlat {
        self.0[slot]
    }

    #[inline]
    pub(crate) fn assign(&mut self, slot: usize, coord: CoordFlat) {
        self.0[slot] = coord;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn as_slice(&self) -> &[CoordFlat] {
        &self.0
    }
}

/// Owns the only random generator of a relaxation. It is seeded once and
/// consumed in mask order, so the same seed always yields the same initial
/// image.
pub(crate) struct RandomSeeder {
    rng: Pcg32,
}

impl RandomSeeder {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Copies a uniformly picked source pixel into every masked pixel and
    /// records which one was picked
    pub(crate) fn seed(mut self, image: &mut PixelGrid, mask: &Mask) -> AssignmentMap {
        let source = mask.source();

        let assignments = mask
            .masked()
            .iter()
            .map(|&pixel| {
                let picked = source[self.rng.gen_range(0..source.len())];
                image.assign(pixel, image.at(picked));
                picked
            })
            .collect();

        AssignmentMap(assignments)
    }
}

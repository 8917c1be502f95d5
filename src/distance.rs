//! Patch dissimilarity between a masked pixel and a candidate source pixel.

use crate::grid::{CoordFlat, PixelGrid, NEIGHBOR_OFFSETS};
use crate::mask::Mask;
use crate::seed::AssignmentMap;
use crate::DistanceMode;

/// Sum of squared differences between the 8-neighborhoods of `target` and
/// `candidate`.
///
/// `candidate` is always a source pixel, so its whole neighborhood is inside
/// the image. Neighbors of `target` that fall outside the image are skipped.
#[inline]
pub(crate) fn causal(image: &PixelGrid, target: CoordFlat, candidate: CoordFlat) -> f64 {
    let dims = image.dims();
    let target = target.to_2d(dims).to_signed();
    let candidate = candidate.to_2d(dims).to_signed();

    let mut distance = 0.0;
    for &offset in &NEIGHBOR_OFFSETS {
        let a = target.offset(offset);
        if !image.is_in_bounds(a) {
            continue;
        }

        let b = candidate.offset(offset);
        let diff = f64::from(image.at_signed(a)) - f64::from(image.at_signed(b));
        distance += diff * diff;
    }

    distance
}

/// Correction for neighbors of `target` that are themselves being
/// synthesized.
///
/// Every masked neighbor `target + d` is re-assigned to its reflection
/// through `target`, `target - d`, and the value of that reflection is
/// compared to the value of `candidate`. Unmasked neighbors, and masked ones
/// whose reflection is outside the image, contribute nothing.
///
/// This writes to `assignments` while scoring, so results depend on the order
/// pixels and candidates are visited in.
#[inline]
pub(crate) fn non_causal(
    image: &PixelGrid,
    mask: &Mask,
    assignments: &mut AssignmentMap,
    target: CoordFlat,
    candidate: CoordFlat,
) -> f64 {
    let dims = image.dims();
    let value = f64::from(image.at(candidate));
    let target = target.to_2d(dims).to_signed();

    let mut distance = 0.0;
    for &(dx, dy) in &NEIGHBOR_OFFSETS {
        let neighbor = target.offset((dx, dy));
        if !image.is_in_bounds(neighbor) {
            continue;
        }

        let slot = match mask.slot_of(neighbor.to_unsigned().to_flat(dims)) {
            Some(slot) => slot,
            None => continue,
        };

        let reflected = target.offset((-dx, -dy));
        if !image.is_in_bounds(reflected) {
            continue;
        }

        assignments.assign(slot, reflected.to_unsigned().to_flat(dims));

        let diff = value - f64::from(image.at_signed(reflected));
        distance += diff * diff;
    }

    distance
}

/// The full distance used by a variant
#[inline]
pub(crate) fn patch_distance(
    mode: DistanceMode,
    image: &PixelGrid,
    mask: &Mask,
    assignments: &mut AssignmentMap,
    target: CoordFlat,
    candidate: CoordFlat,
) -> f64 {
    match mode {
        DistanceMode::Causal => causal(image, target, candidate),
        DistanceMode::NonCausal => {
            causal(image, target, candidate)
                + non_causal(image, mask, assignments, target, candidate)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Coord2D;
    use crate::seed::RandomSeeder;
    use crate::Dims;

    fn flat(x: u32, y: u32, dims: Dims) -> CoordFlat {
        Coord2D::from(x, y).to_flat(dims)
    }

    #[test]
    fn causal_skips_the_center() {
        let dims = Dims::new(5, 3);
        #[rustfmt::skip]
        let img = PixelGrid::from_vec(5, 3, vec![
            1.0, 2.0, 3.0, 4.0, 5.0,
            6.0, 100.0, 8.0, -50.0, 10.0,
            11.0, 12.0, 13.0, 14.0, 15.0,
        ]).unwrap();

        // every neighbor of (3, 1) is exactly 2 more than the matching
        // neighbor of (1, 1)
        let d = causal(&img, flat(1, 1, dims), flat(3, 1, dims));
        assert!((d - 32.0).abs() < f64::EPSILON);

        assert_eq!(causal(&img, flat(1, 1, dims), flat(1, 1, dims)), 0.0);
    }

    #[test]
    fn causal_ignores_out_of_bounds_target_neighbors() {
        let dims = Dims::new(4, 4);
        let mut img = PixelGrid::filled(dims, 1.0);
        img.set(2, 2, 3.0);

        // (0, 0) only has three neighbors inside the image: (1, 0), (0, 1), (1, 1)
        // matched against (2, 1), (1, 2) and (2, 2)
        let d = causal(&img, flat(0, 0, dims), flat(1, 1, dims));
        assert!((d - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_causal_reassigns_masked_neighbors() {
        let dims = Dims::new(6, 6);
        let mut img = PixelGrid::filled(dims, 0.0);
        for y in 0..6 {
            for x in 0..6 {
                img.set(x, y, (x * 10 + y) as f32);
            }
        }
        img.set(2, 2, 255.0);
        img.set(3, 2, 255.0);

        let mask = Mask::build(&img, 255.0, 1).unwrap();
        let mut assignments = RandomSeeder::new(1).seed(&mut img, &mask);

        let target = flat(2, 2, dims);
        let candidate = flat(4, 4, dims);

        let d = non_causal(&img, &mask, &mut assignments, target, candidate);

        // only (3, 2) is a masked neighbor of (2, 2), its reflection is (1, 2)
        assert_eq!(assignments.get(1), flat(1, 2, dims));
        let diff = f64::from(img.get(4, 4)) - f64::from(img.get(1, 2));
        assert!((d - diff * diff).abs() < 1e-9);

        // (2, 2) itself is untouched when scoring (2, 2)
        let seeded = assignments.get(0);
        non_causal(&img, &mask, &mut assignments, target, candidate);
        assert_eq!(assignments.get(0), seeded);
    }

    #[test]
    fn non_causal_without_masked_neighbors_is_zero() {
        let dims = Dims::new(5, 5);
        let mut img = PixelGrid::filled(dims, 2.0);
        img.set(2, 2, 255.0);

        let mask = Mask::build(&img, 255.0, 1).unwrap();
        let mut assignments = RandomSeeder::new(0).seed(&mut img, &mask);
        let before = assignments.as_slice().to_vec();

        let d = non_causal(&img, &mask, &mut assignments, flat(2, 2, dims), flat(1, 1, dims));
        assert_eq!(d, 0.0);
        assert_eq!(assignments.as_slice(), before.as_slice());

        let total = patch_distance(
            DistanceMode::NonCausal,
            &img,
            &mask,
            &mut assignments,
            flat(2, 2, dims),
            flat(1, 1, dims),
        );
        assert_eq!(total, causal(&img, flat(2, 2, dims), flat(1, 1, dims)));
    }
}

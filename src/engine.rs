use std::path::PathBuf;

use crate::codebook::CandidateIndex;
use crate::distance::patch_distance;
use crate::mask::Mask;
use crate::premature_stop::PrematureStopMonitor;
use crate::seed::{AssignmentMap, RandomSeeder};
use crate::stats::StatsWriter;
use crate::{
    Coord2D, DistanceMode, EmptyWindowPolicy, Error, InpaintedImage, IterationRecord, Outcome,
    PixelGrid, SearchMode,
};

#[derive(Debug)]
pub(crate) struct EngineParams {
    /// Value marking the pixels to synthesize
    pub(crate) sentinel: f32,
    /// Distance from the edges under which pixels are never used as a source
    pub(crate) border_margin: u32,
    /// Seed of the generator picking the initial values
    pub(crate) seed: u64,
    pub(crate) search: SearchMode,
    /// Half-width of the codebook windows
    pub(crate) neighborhood_size: u32,
    pub(crate) empty_window_policy: EmptyWindowPolicy,
    pub(crate) distance: DistanceMode,
    /// Upper bound on the number of passes
    pub(crate) nb_iterations: u32,
    /// Window size and gap percentage of the convergence monitor, if any
    pub(crate) premature_stop: Option<(u32, f64)>,
    /// Where per-pass statistics files go, if they are produced at all
    pub(crate) stats_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Iterating,
    Converged,
    Exhausted,
    Failed { iteration: u32 },
}

/// Owns the image being relaxed and every structure derived from it.
///
/// Construction runs the mask, seeding and candidate steps; afterwards every
/// call to `step` runs one relaxation pass until the iteration budget is used
/// up or the energy has settled.
pub(crate) struct Engine {
    image: PixelGrid,
    mask: Mask,
    assignments: AssignmentMap,
    candidates: CandidateIndex,
    distance: DistanceMode,
    monitor: Option<PrematureStopMonitor>,
    stats: Option<StatsWriter>,
    nb_iterations: u32,
    iteration: u32,
    last_energy: f64,
    records: Vec<IterationRecord>,
    state: State,
}

impl Engine {
    pub(crate) fn new(mut image: PixelGrid, params: &EngineParams) -> Result<Self, Error> {
        let mask = Mask::build(&image, params.sentinel, params.border_margin)?;

        // the non-causal distance reads assignments, so every masked pixel
        // must have one before the first pass
        let assignments = RandomSeeder::new(params.seed).seed(&mut image, &mask);

        let candidates = match params.search {
            SearchMode::Unrestricted => CandidateIndex::Unrestricted,
            SearchMode::Codebook => CandidateIndex::codebook(
                &mask,
                params.neighborhood_size,
                params.empty_window_policy,
            )?,
        };

        tracing::info!(
            masked = mask.masked().len(),
            source = mask.source().len(),
            excluded = mask.excluded_count(),
            "relaxation initialized"
        );

        Ok(Self {
            image,
            mask,
            assignments,
            candidates,
            distance: params.distance,
            monitor: params
                .premature_stop
                .map(|(window_size, gap)| PrematureStopMonitor::new(window_size, gap)),
            stats: params.stats_dir.clone().map(StatsWriter::new),
            nb_iterations: params.nb_iterations,
            iteration: 0,
            last_energy: f64::INFINITY,
            records: Vec::new(),
            state: State::Iterating,
        })
    }

    /// Runs the next pass, or returns `None` once the relaxation is over
    pub(crate) fn step(&mut self) -> Option<Result<IterationRecord, Error>> {
        if self.state != State::Iterating {
            return None;
        }

        if self.iteration >= self.nb_iterations {
            self.exhaust();
            return None;
        }

        let energy = match self.relax() {
            Ok(energy) => energy,
            Err(err) => {
                self.state = State::Failed {
                    iteration: self.iteration,
                };
                return Some(Err(err));
            }
        };

        let ratio = energy_ratio(self.last_energy, energy);
        let converged = match &mut self.monitor {
            Some(monitor) => monitor.observe(energy),
            None => false,
        };

        let record = IterationRecord {
            index: self.iteration,
            previous_energy: self.last_energy,
            energy,
            ratio,
            converged,
        };

        tracing::debug!(
            iteration = record.index,
            last_energy = record.previous_energy,
            energy = record.energy,
            ratio = record.ratio,
            "relaxation pass"
        );

        if let Some(stats) = &self.stats {
            stats.write(&record);
        }

        self.last_energy = energy;
        self.iteration += 1;
        self.records.push(record);

        if converged {
            tracing::info!(iteration = record.index, "relaxation stopped prematurely");
            self.state = State::Converged;
        } else if self.iteration >= self.nb_iterations {
            self.exhaust();
        }

        Some(Ok(record))
    }

    fn exhaust(&mut self) {
        tracing::info!(passes = self.iteration, "iteration budget exhausted");
        self.state = State::Exhausted;
    }

    /// One sweep over the mask in row-major order. Every pixel is written
    /// back as soon as its best match is known, so later pixels of the same
    /// pass already see it.
    fn relax(&mut self) -> Result<f64, Error> {
        let mut energy = 0.0;

        for (slot, &pixel) in self.mask.masked().iter().enumerate() {
            let mut best_match = None;
            let mut lowest_distance = f64::INFINITY;

            for &candidate in self.candidates.candidates(slot, &self.mask) {
                let distance = patch_distance(
                    self.distance,
                    &self.image,
                    &self.mask,
                    &mut self.assignments,
                    pixel,
                    candidate,
                );

                // ties keep the first candidate found
                if distance < lowest_distance {
                    lowest_distance = distance;
                    best_match = Some(candidate);
                }
            }

            let best_match = best_match.ok_or(Error::DegenerateEnergy {
                iteration: self.iteration,
            })?;

            energy += lowest_distance;

            self.image.assign(pixel, self.image.at(best_match));
            self.assignments.assign(slot, best_match);
        }

        if !energy.is_finite() {
            return Err(Error::DegenerateEnergy {
                iteration: self.iteration,
            });
        }

        Ok(energy)
    }

    #[inline]
    pub(crate) fn image(&self) -> &PixelGrid {
        &self.image
    }

    pub(crate) fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub(crate) fn masked_len(&self) -> usize {
        self.mask.masked().len()
    }

    pub(crate) fn source_len(&self) -> usize {
        self.mask.source().len()
    }

    /// Every masked pixel paired with the pixel it currently copies
    pub(crate) fn assignments(&self) -> Vec<(Coord2D, Coord2D)> {
        let dims = self.image.dims();
        self.mask
            .masked()
            .iter()
            .zip(self.assignments.as_slice())
            .map(|(pixel, assigned)| (pixel.to_2d(dims), assigned.to_2d(dims)))
            .collect()
    }

    pub(crate) fn outcome(&self) -> Option<Outcome> {
        match self.state {
            State::Converged => Some(Outcome::Converged {
                passes: self.iteration,
            }),
            State::Exhausted => Some(Outcome::Exhausted {
                passes: self.iteration,
            }),
            State::Iterating | State::Failed { .. } => None,
        }
    }

    /// Runs whatever passes remain and hands over the result
    pub(crate) fn finish(mut self) -> Result<InpaintedImage, Error> {
        while let Some(record) = self.step() {
            record?;
        }

        match (self.outcome(), self.state) {
            (Some(outcome), _) => Ok(InpaintedImage {
                pixels: self.image,
                outcome,
                records: self.records,
            }),
            (None, State::Failed { iteration }) => Err(Error::DegenerateEnergy { iteration }),
            // `step` only returns `None` once the state left `Iterating`
            (None, _) => Err(Error::DegenerateEnergy {
                iteration: self.iteration,
            }),
        }
    }
}

/// Relative change between two energies. The first pass compares against an
/// infinite energy and always reports 1, a previous energy of 0 reports 0.
fn energy_ratio(last_energy: f64, energy: f64) -> f64 {
    if last_energy.is_infinite() {
        1.0
    } else if last_energy == 0.0 {
        0.0
    } else {
        ((last_energy - energy) / last_energy).abs()
    }
}

/// The passes of a relaxation, computed lazily. Each item is the record of a
/// pass that has just been applied to the image; the sequence ends when the
/// relaxation converges, exhausts its budget or fails, and can't be restarted.
pub struct Passes<'a> {
    pub(crate) engine: &'a mut Engine,
}

impl Iterator for Passes<'_> {
    type Item = Result<IterationRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.engine.step()
    }
}

impl std::iter::FusedIterator for Passes<'_> {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::CoordFlat;
    use crate::Dims;

    fn params(search: SearchMode, distance: DistanceMode, nb_iterations: u32) -> EngineParams {
        EngineParams {
            sentinel: 255.0,
            border_margin: 1,
            seed: 7,
            search,
            neighborhood_size: 3,
            empty_window_policy: EmptyWindowPolicy::Fail,
            distance,
            nb_iterations,
            premature_stop: None,
            stats_dir: None,
        }
    }

    fn checker(dims: Dims) -> PixelGrid {
        let mut img = PixelGrid::filled(dims, 0.0);
        for y in 0..dims.height {
            for x in 0..dims.width {
                img.set(x, y, if (x + y) % 2 == 0 { 10.0 } else { 200.0 });
            }
        }
        img
    }

    /// Lowest causal distance over the whole source set, first found on ties
    fn best_causal(image: &PixelGrid, mask: &Mask, target: CoordFlat) -> (CoordFlat, f64) {
        let mut best = (mask.source()[0], f64::INFINITY);
        for &candidate in mask.source() {
            let distance = crate::distance::causal(image, target, candidate);
            if distance < best.1 {
                best = (candidate, distance);
            }
        }
        best
    }

    #[test]
    fn ratio() {
        assert_eq!(energy_ratio(f64::INFINITY, 12.0), 1.0);
        assert_eq!(energy_ratio(0.0, 0.0), 0.0);
        assert_eq!(energy_ratio(0.0, 5.0), 0.0);
        assert_eq!(energy_ratio(10.0, 5.0), 0.5);
        assert_eq!(energy_ratio(10.0, 15.0), 0.5);
    }

    #[test]
    fn steps_until_exhausted() {
        let mut img = checker(Dims::new(8, 8));
        img.set(3, 3, 255.0);
        img.set(4, 3, 255.0);

        let mut engine = Engine::new(
            img,
            &params(SearchMode::Unrestricted, DistanceMode::Causal, 3),
        )
        .unwrap();

        for i in 0..3 {
            let record = engine.step().unwrap().unwrap();
            assert_eq!(record.index, i);
            assert!(!record.converged);
        }

        assert_eq!(engine.outcome(), Some(Outcome::Exhausted { passes: 3 }));
        assert!(engine.step().is_none());
        assert_eq!(engine.records().len(), 3);
    }

    #[test]
    fn checkerboard_hole_is_restored() {
        let original = checker(Dims::new(8, 8));
        let mut img = original.clone();
        img.set(3, 3, 255.0);
        img.set(4, 3, 255.0);

        for &distance in &[DistanceMode::Causal, DistanceMode::NonCausal] {
            let result = Engine::new(
                img.clone(),
                &params(SearchMode::Codebook, distance, 2),
            )
            .unwrap()
            .finish()
            .unwrap();

            if distance == DistanceMode::Causal {
                // after the first pass both pixels match their patterns exactly
                assert_eq!(result.records[1].energy, 0.0);
                assert_eq!(result.pixels, original);
            }
            assert!(result.records.iter().all(|r| r.energy >= 0.0));
        }
    }

    #[test]
    fn nan_pixels_are_degenerate() {
        let mut img = checker(Dims::new(6, 6));
        img.set(2, 2, 255.0);
        for x in 0..6 {
            img.set(x, 0, f32::NAN);
        }
        img.set(1, 1, f32::NAN);

        let mut engine = Engine::new(
            img,
            &params(SearchMode::Codebook, DistanceMode::Causal, 4),
        )
        .unwrap();

        // (2, 2) sees the NaN at (1, 1) through every candidate
        assert!(matches!(
            engine.step(),
            Some(Err(Error::DegenerateEnergy { iteration: 0 }))
        ));
        assert!(engine.step().is_none());
        assert!(engine.outcome().is_none());
        assert!(matches!(
            engine.finish(),
            Err(Error::DegenerateEnergy { iteration: 0 })
        ));
    }

    #[test]
    fn no_mask_means_no_energy() {
        let img = checker(Dims::new(5, 5));
        let result = Engine::new(
            img.clone(),
            &params(SearchMode::Unrestricted, DistanceMode::NonCausal, 2),
        )
        .unwrap()
        .finish()
        .unwrap();

        assert_eq!(result.pixels, img);
        assert_eq!(result.records[0].ratio, 1.0);
        assert_eq!(result.records[1].ratio, 0.0);
        assert!(result.records.iter().all(|r| r.energy == 0.0));
    }

    #[test]
    fn zero_iterations() {
        let mut img = checker(Dims::new(5, 5));
        img.set(2, 2, 255.0);

        let result = Engine::new(
            img,
            &params(SearchMode::Unrestricted, DistanceMode::Causal, 0),
        )
        .unwrap()
        .finish()
        .unwrap();

        assert_eq!(result.outcome, Outcome::Exhausted { passes: 0 });
        assert!(result.records.is_empty());
    }

    #[test]
    fn writes_are_visible_within_a_pass() {
        let mut img = checker(Dims::new(8, 8));
        img.set(3, 3, 255.0);
        img.set(4, 3, 255.0);

        let mut engine = Engine::new(
            img,
            &params(SearchMode::Unrestricted, DistanceMode::Causal, 1),
        )
        .unwrap();

        let dims = engine.image.dims();
        let first = Coord2D::from(3, 3).to_flat(dims);
        let second = Coord2D::from(4, 3).to_flat(dims);

        // both start out with the wrong color of the pattern
        engine.image.assign(first, 200.0);
        engine.image.assign(second, 10.0);
        let before = engine.image.clone();

        let (first_match, first_distance) = best_causal(&before, &engine.mask, first);
        let mut after_first = before.clone();
        after_first.assign(first, before.at(first_match));
        let (second_match, second_distance) = best_causal(&after_first, &engine.mask, second);
        let (_, stale_distance) = best_causal(&before, &engine.mask, second);

        // the first pixel only mismatches on its wrong right neighbor, the
        // second one is exact once the first is fixed
        assert_eq!(first_distance, 190.0 * 190.0);
        assert_eq!(second_distance, 0.0);
        assert_eq!(stale_distance, 190.0 * 190.0);

        let record = engine.step().unwrap().unwrap();

        assert_eq!(record.energy, first_distance + second_distance);
        assert_ne!(record.energy, first_distance + stale_distance);
        assert_eq!(engine.assignments.as_slice(), &[first_match, second_match]);
        assert_eq!(engine.image.at(first), 10.0);
        assert_eq!(engine.image.at(second), 200.0);
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let mut img = PixelGrid::filled(Dims::new(7, 7), 50.0);
        img.set(3, 3, 255.0);

        // every candidate patch is identical, so every distance is 0
        let cases = [
            (SearchMode::Unrestricted, 1, Coord2D::from(1, 1)),
            (SearchMode::Codebook, 1, Coord2D::from(2, 2)),
            (SearchMode::Codebook, 2, Coord2D::from(1, 1)),
        ];

        for &(search, neighborhood_size, expected) in &cases {
            for &distance in &[DistanceMode::Causal, DistanceMode::NonCausal] {
                let mut tied = params(search, distance, 1);
                tied.neighborhood_size = neighborhood_size;

                let mut engine = Engine::new(img.clone(), &tied).unwrap();
                let record = engine.step().unwrap().unwrap();

                assert_eq!(record.energy, 0.0);
                assert_eq!(
                    engine.assignments(),
                    vec![(Coord2D::from(3, 3), expected)],
                    "{:?} {:?} {}",
                    search,
                    distance,
                    neighborhood_size
                );
            }
        }
    }
}

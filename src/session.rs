use std::path::PathBuf;

use crate::engine::{Engine, Passes};
use crate::*;

/// Patch relaxation session.
///
/// The image has already been partitioned and seeded when a session exists.
/// Calling `run()` relaxes it and returns the result, consuming the session
/// in the process. You can provide a `RelaxationProgress` implementation to
/// get an update with the current image after every pass.
///
/// # Example
/// ```no_run
/// let session = patch_relax::Session::builder()
///     .image(&"imgs/hole.png")
///     .seed(10)
///     .build().expect("failed to build session");
///
/// let inpainted = session.run(None).expect("relaxation failed");
/// inpainted.save("filled.png").expect("failed to save image");
/// ```
pub struct Session {
    engine: Engine,
    params: Parameters,
}

impl Session {
    /// Creates a new session builder with default parameters.
    pub fn builder<'a>() -> SessionBuilder<'a> {
        SessionBuilder::default()
    }

    /// Runs every remaining pass and outputs the relaxed image.
    pub fn run(
        mut self,
        mut progress: Option<Box<dyn RelaxationProgress>>,
    ) -> Result<InpaintedImage> {
        let span = tracing::info_span!(
            "relax",
            variant = ?self.params.variant,
            masked = self.engine.masked_len(),
            nb_iterations = self.params.nb_iterations,
        );
        let _enter = span.enter();

        let total = self.params.nb_iterations as usize;

        while let Some(record) = self.engine.step() {
            let record = record?;

            if let Some(ref mut progress) = progress {
                progress.update(ProgressUpdate {
                    image: self.engine.image(),
                    record: &record,
                    passes: ProgressStat {
                        current: record.index as usize + 1,
                        total,
                    },
                });
            }
        }

        self.engine.finish()
    }

    /// The passes of the relaxation, computed as they are pulled.
    ///
    /// Passes consumed here are not run again by `run()`, which only runs the
    /// ones that remain.
    ///
    /// ```no_run
    /// let mut session = patch_relax::Session::builder()
    ///     .image(&"imgs/hole.png")
    ///     .build().expect("failed to build session");
    ///
    /// for pass in session.passes() {
    ///     let pass = pass.expect("relaxation failed");
    ///     println!("pass {} energy {}", pass.index, pass.energy);
    /// }
    /// ```
    pub fn passes(&mut self) -> Passes<'_> {
        Passes {
            engine: &mut self.engine,
        }
    }

    /// The image in its current state: seeded before the first pass, then
    /// relaxed in place by every pass
    pub fn result(&self) -> &PixelGrid {
        self.engine.image()
    }

    /// How the relaxation ended, `None` while passes remain or after a failure
    pub fn outcome(&self) -> Option<Outcome> {
        self.engine.outcome()
    }

    /// Records of the passes executed so far
    pub fn records(&self) -> &[IterationRecord] {
        self.engine.records()
    }

    /// Every hole pixel, in the order passes visit them, paired with the
    /// pixel it currently copies
    pub fn assignments(&self) -> Vec<(Coord2D, Coord2D)> {
        self.engine.assignments()
    }

    /// Number of pixels being synthesized
    pub fn masked_count(&self) -> usize {
        self.engine.masked_len()
    }

    /// Number of pixels that can be copied from
    pub fn source_count(&self) -> usize {
        self.engine.source_len()
    }

    pub fn variant(&self) -> Variant {
        self.params.variant
    }

    pub fn neighborhood_size(&self) -> u32 {
        self.params.neighborhood_size
    }

    pub fn nb_iterations(&self) -> u32 {
        self.params.nb_iterations
    }

    pub fn premature_stop(&self) -> bool {
        self.params.premature_stop
    }

    pub fn window_size(&self) -> u32 {
        self.params.window_size
    }

    pub fn gap_percentage(&self) -> f64 {
        self.params.gap_percentage
    }

    pub fn produce_stats(&self) -> bool {
        self.params.produce_stats
    }

    pub fn seed(&self) -> u64 {
        self.params.seed
    }
}

enum Input<'a> {
    Source(ImageSource<'a>),
    Pixels(PixelGrid),
}

/// Builds a session by setting parameters and adding the input image, calling
/// `build` will check all of the provided inputs and prepare the relaxation
#[derive(Default)]
pub struct SessionBuilder<'a> {
    input: Option<Input<'a>>,
    params: Parameters,
}

impl<'a> SessionBuilder<'a> {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// The image to fill, converted to 8-bit luma.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let session = patch_relax::Session::builder()
    ///     .image(&"imgs/hole.png")
    ///     .build().expect("failed to build session");
    /// ```
    pub fn image<I: Into<ImageSource<'a>>>(mut self, image: I) -> Self {
        self.input = Some(Input::Source(image.into()));
        self
    }

    /// The image to fill, as raw values.
    pub fn pixels(mut self, pixels: PixelGrid) -> Self {
        self.input = Some(Input::Pixels(pixels));
        self
    }

    /// Selects the search strategy and distance.
    ///
    /// Default: `Variant::CODEBOOK_DETERMINISTIC`
    pub fn variant(mut self, variant: Variant) -> Self {
        self.params.variant = variant;
        self
    }

    /// Half-width of the square window searched around each hole pixel by the
    /// codebook variants. Larger windows find better matches for a higher
    /// cost per pass.
    ///
    /// Default: 5
    pub fn neighborhood_size(mut self, size: u32) -> Self {
        self.params.neighborhood_size = size;
        self
    }

    /// The maximum number of relaxation passes.
    ///
    /// Default: 5
    pub fn nb_iterations(mut self, count: u32) -> Self {
        self.params.nb_iterations = count;
        self
    }

    /// Stops the relaxation once the energy falls within a band around the
    /// median of the last `window_size` energies.
    ///
    /// Default: true
    pub fn premature_stop(mut self, enabled: bool) -> Self {
        self.params.premature_stop = enabled;
        self
    }

    /// How many energies the premature stop median is computed over.
    ///
    /// Default: 10
    pub fn window_size(mut self, size: u32) -> Self {
        self.params.window_size = size;
        self
    }

    /// Half-width of the premature stop band, as a fraction of the median.
    /// Range [0,1].
    ///
    /// Default: 0.01
    pub fn gap_percentage(mut self, value: f64) -> Self {
        self.params.gap_percentage = value;
        self
    }

    /// Writes a `loop<n>` statistics file for every pass.
    ///
    /// Default: false
    pub fn produce_stats(mut self, enabled: bool) -> Self {
        self.params.produce_stats = enabled;
        self
    }

    /// Directory the statistics files are written to.
    ///
    /// Default: the current directory
    pub fn stats_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.params.stats_dir = dir.into();
        self
    }

    /// Seed of the generator picking the initial hole values. The same seed,
    /// image and parameters always produce the same output.
    ///
    /// Default: 0
    pub fn seed(mut self, value: u64) -> Self {
        self.params.seed = value;
        self
    }

    /// The value marking pixels to synthesize.
    ///
    /// Default: 255
    pub fn sentinel(mut self, value: f32) -> Self {
        self.params.sentinel = value;
        self
    }

    /// Pixels closer than this to an edge are never copied from, so that
    /// every source pixel has a full neighborhood. Must be at least 1.
    ///
    /// Default: 1
    pub fn border_margin(mut self, margin: u32) -> Self {
        self.params.border_margin = margin;
        self
    }

    /// What to do when a codebook window contains no source pixel.
    ///
    /// Default: `EmptyWindowPolicy::Fail`
    pub fn empty_window_policy(mut self, policy: EmptyWindowPolicy) -> Self {
        self.params.empty_window_policy = policy;
        self
    }

    /// Creates a `Session`, or returns an error if invalid parameters or an
    /// unusable image were specified.
    pub fn build(self) -> Result<Session> {
        self.check_parameters_validity()?;

        let pixels = match self.input {
            Some(Input::Source(src)) => utils::load_pixels(src)?,
            Some(Input::Pixels(pixels)) => pixels,
            None => return Err(Error::MissingInput),
        };

        let engine = Engine::new(pixels, &self.params.to_engine_params())?;

        Ok(Session {
            engine,
            params: self.params,
        })
    }

    fn check_parameters_validity(&self) -> Result<()> {
        if self.params.variant.search == SearchMode::Codebook && self.params.neighborhood_size == 0
        {
            return Err(Error::InvalidRange(InvalidRange {
                min: 1.0,
                max: f64::from(u32::MAX),
                value: 0.0,
                name: "neighborhood-size",
            }));
        }

        if self.params.premature_stop && self.params.window_size == 0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 1.0,
                max: f64::from(u32::MAX),
                value: 0.0,
                name: "window-size",
            }));
        }

        if !(0.0..=1.0).contains(&self.params.gap_percentage) {
            return Err(Error::InvalidRange(InvalidRange {
                min: 0.0,
                max: 1.0,
                value: self.params.gap_percentage,
                name: "gap-percentage",
            }));
        }

        if self.params.border_margin == 0 {
            return Err(Error::InvalidRange(InvalidRange {
                min: 1.0,
                max: f64::from(u32::MAX),
                value: 0.0,
                name: "border-margin",
            }));
        }

        Ok(())
    }
}

/// Helper struct for passing progress information to external callers
pub struct ProgressStat {
    /// The current amount of work that has been done
    pub current: usize,
    /// The total amount of work to do
    pub total: usize,
}

/// The state of the relaxation after a pass
pub struct ProgressUpdate<'a> {
    /// The image as relaxed so far
    pub image: &'a PixelGrid,
    /// The pass that just ran
    pub record: &'a IterationRecord,
    /// Passes run out of the iteration budget
    pub passes: ProgressStat,
}

/// Allows the session to update external callers with the current
/// progress of the relaxation
pub trait RelaxationProgress {
    fn update(&mut self, info: ProgressUpdate<'_>);
}

impl<G> RelaxationProgress for G
where
    G: FnMut(ProgressUpdate<'_>) + Send,
{
    fn update(&mut self, info: ProgressUpdate<'_>) {
        self(info)
    }
}

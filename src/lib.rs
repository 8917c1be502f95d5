// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `patch-relax` fills the holes of a single channel image by iterative
//! patch relaxation.
//!
//! Every pixel carrying the sentinel value (255 by default) is first seeded
//! with the value of a random known pixel. Each following pass then replaces
//! every hole pixel with the value of the known pixel whose 8-neighborhood
//! best matches its own, lowering the total patch dissimilarity (the
//! *energy*) of the image until the iteration budget runs out or the energy
//! settles.
//!
//! First, you build a `Session` via a `SessionBuilder`, which follows the
//! builder pattern. Calling `build` loads the input image, partitions it and
//! seeds the holes, which is where invalid inputs are reported.
//!
//! `Session` has a `run()` method that relaxes the image and returns an
//! `InpaintedImage`, or a `passes()` method that yields the passes one at a
//! time.
//!
//! ## Variants
//!
//! 1. Deterministic: searches every known pixel, causal distance only
//! 2. Probabilistic: searches every known pixel, adds the non-causal term
//! 3. Codebook deterministic: searches a window around each hole pixel
//! 4. Codebook probabilistic: windowed search with the non-causal term
//!
//! ## Usage
//!
//! ```no_run
//! let session = patch_relax::Session::builder()
//!     .image(&"imgs/hole.png")
//!     .variant(patch_relax::Variant::CODEBOOK_DETERMINISTIC)
//!     .neighborhood_size(8)
//!     .nb_iterations(20)
//!     .build()
//!     .expect("failed to build session");
//!
//! let inpainted = session.run(None).expect("relaxation failed");
//!
//! inpainted.save("filled.png").expect("failed to save image");
//! ```
mod codebook;
mod distance;
mod engine;
mod errors;
mod grid;
mod mask;
mod premature_stop;
mod seed;
pub mod session;
mod stats;
mod utils;

pub use image;
use std::path::{Path, PathBuf};

pub use engine::Passes;
pub use errors::{Error, InvalidRange, Result};
pub use grid::{Coord2D, PixelGrid};
pub use session::{
    ProgressStat, ProgressUpdate, RelaxationProgress, Session, SessionBuilder,
};
pub use utils::{load_dynamic_image, ImageSource};

/// Simple dimensions struct
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Which source pixels are compared against a hole pixel
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Every source pixel of the image
    Unrestricted,
    /// Only the source pixels in a square window around the hole pixel,
    /// see `SessionBuilder::neighborhood_size`
    Codebook,
}

/// How two patches are compared
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DistanceMode {
    /// Sum of squared differences of the 8 neighbors
    Causal,
    /// The causal distance, plus a term comparing the candidate to the
    /// reflections of the hole pixel's masked neighbors
    NonCausal,
}

/// One of the four algorithms, as a search strategy paired with a distance
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub search: SearchMode,
    pub distance: DistanceMode,
}

impl Variant {
    pub const DETERMINISTIC: Self = Self::new(SearchMode::Unrestricted, DistanceMode::Causal);
    pub const PROBABILISTIC: Self = Self::new(SearchMode::Unrestricted, DistanceMode::NonCausal);
    pub const CODEBOOK_DETERMINISTIC: Self = Self::new(SearchMode::Codebook, DistanceMode::Causal);
    pub const CODEBOOK_PROBABILISTIC: Self =
        Self::new(SearchMode::Codebook, DistanceMode::NonCausal);

    pub const fn new(search: SearchMode, distance: DistanceMode) -> Self {
        Self { search, distance }
    }
}

/// What to do with a hole pixel whose codebook window holds no source pixel
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmptyWindowPolicy {
    /// Fail to build the session with `Error::NoCandidate`
    Fail,
    /// Search the whole source set for that pixel instead
    GlobalFallback,
}

/// The record of a single relaxation pass
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IterationRecord {
    /// Zero based index of the pass
    pub index: u32,
    /// Energy of the previous pass, infinite for the first one
    pub previous_energy: f64,
    /// Sum over every hole pixel of its lowest patch distance in this pass
    pub energy: f64,
    /// `|previous_energy - energy| / previous_energy`
    pub ratio: f64,
    /// Whether the convergence monitor stopped the relaxation after this pass
    pub converged: bool,
}

/// How a relaxation ended
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The energy settled before the iteration budget was used up
    Converged { passes: u32 },
    /// Every one of the requested passes ran
    Exhausted { passes: u32 },
}

impl Outcome {
    pub fn passes(self) -> u32 {
        match self {
            Self::Converged { passes } | Self::Exhausted { passes } => passes,
        }
    }
}

struct Parameters {
    variant: Variant,
    neighborhood_size: u32,
    nb_iterations: u32,
    premature_stop: bool,
    window_size: u32,
    gap_percentage: f64,
    produce_stats: bool,
    stats_dir: PathBuf,
    seed: u64,
    sentinel: f32,
    border_margin: u32,
    empty_window_policy: EmptyWindowPolicy,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            variant: Variant::CODEBOOK_DETERMINISTIC,
            neighborhood_size: 5,
            nb_iterations: 5,
            premature_stop: true,
            window_size: 10,
            gap_percentage: 0.01,
            produce_stats: false,
            stats_dir: PathBuf::from("."),
            seed: 0,
            sentinel: 255.0,
            border_margin: 1,
            empty_window_policy: EmptyWindowPolicy::Fail,
        }
    }
}

impl Parameters {
    fn to_engine_params(&self) -> engine::EngineParams {
        engine::EngineParams {
            sentinel: self.sentinel,
            border_margin: self.border_margin,
            seed: self.seed,
            search: self.variant.search,
            neighborhood_size: self.neighborhood_size,
            empty_window_policy: self.empty_window_policy,
            distance: self.variant.distance,
            nb_iterations: self.nb_iterations,
            premature_stop: if self.premature_stop {
                Some((self.window_size, self.gap_percentage))
            } else {
                None
            },
            stats_dir: if self.produce_stats {
                Some(self.stats_dir.clone())
            } else {
                None
            },
        }
    }
}

/// An image relaxed by `Session::run()`
pub struct InpaintedImage {
    pub(crate) pixels: PixelGrid,
    pub(crate) outcome: Outcome,
    pub(crate) records: Vec<IterationRecord>,
}

impl InpaintedImage {
    /// The relaxed values, with the same dimensions as the input
    pub fn pixels(&self) -> &PixelGrid {
        &self.pixels
    }

    pub fn into_pixels(self) -> PixelGrid {
        self.pixels
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// One record per executed pass
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    /// The relaxed values rounded and clamped to 8-bit luma
    pub fn to_luma(&self) -> image::GrayImage {
        utils::to_luma(&self.pixels)
    }

    /// Saves the image to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent_path) = path.parent() {
            std::fs::create_dir_all(parent_path)?;
        }

        self.to_luma().save(path)?;
        Ok(())
    }

    /// Writes the image to the specified stream
    pub fn write<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        fmt: image::ImageOutputFormat,
    ) -> Result<()> {
        Ok(self.to_image().write_to(writer, fmt)?)
    }

    /// The relaxed values as an 8-bit luma `DynamicImage`
    pub fn to_image(&self) -> image::DynamicImage {
        image::DynamicImage::ImageLuma8(self.to_luma())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn variants_compose() {
        assert_eq!(Variant::DETERMINISTIC.search, SearchMode::Unrestricted);
        assert_eq!(Variant::PROBABILISTIC.distance, DistanceMode::NonCausal);
        assert_eq!(
            Variant::new(SearchMode::Codebook, DistanceMode::NonCausal),
            Variant::CODEBOOK_PROBABILISTIC
        );
    }

    #[test]
    fn engine_params_follow_toggles() {
        let mut params = Parameters::default();
        let engine = params.to_engine_params();
        assert_eq!(engine.premature_stop, Some((10, 0.01)));
        assert!(engine.stats_dir.is_none());

        params.premature_stop = false;
        params.produce_stats = true;
        let engine = params.to_engine_params();
        assert!(engine.premature_stop.is_none());
        assert_eq!(engine.stats_dir, Some(PathBuf::from(".")));
    }

    #[test]
    fn writes_encoded_images() {
        let inpainted = InpaintedImage {
            pixels: PixelGrid::from_vec(2, 2, vec![0.0, 64.0, 128.0, 255.0]).unwrap(),
            outcome: Outcome::Exhausted { passes: 1 },
            records: Vec::new(),
        };

        let mut buffer = std::io::Cursor::new(Vec::new());
        inpainted
            .write(&mut buffer, image::ImageOutputFormat::Png)
            .unwrap();

        let decoded = image::load_from_memory(buffer.get_ref()).unwrap().to_luma8();
        assert_eq!(decoded.into_raw(), vec![0, 64, 128, 255]);
        assert_eq!(inpainted.outcome().passes(), 1);
    }
}

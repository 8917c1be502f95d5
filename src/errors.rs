use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) value: f64,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// An error in the image library occurred, eg failed to load/save
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// An input parameter had an invalid range specified
    #[error("{0}")]
    InvalidRange(InvalidRange),
    /// Io is notoriously error free with no problems, but we cover it just in case!
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The session was built without an input image
    #[error("an input image must be provided before building a session")]
    MissingInput,
    /// The input image has no pixels, or its buffer doesn't match its dimensions
    #[error("the input image ({width}x{height}, {len} values) is empty or malformed")]
    EmptyImage { width: u32, height: u32, len: usize },
    /// The image has more pixels than a flat `u32` index can address
    #[error("the input image ({width}x{height}) has more than 2^32 pixels")]
    TooLarge { width: u32, height: u32 },
    /// Every pixel is either masked or inside the border margin, so there is
    /// nothing to copy from
    #[error("the image has no source pixels to seed the masked region from")]
    InvalidMask,
    /// A codebook window around a masked pixel contains no source pixel
    #[error("the candidate window around masked pixel ({x}, {y}) contains no source pixel")]
    NoCandidate { x: u32, y: u32 },
    /// The energy of a pass could not be computed as a finite value
    #[error("the energy of iteration {iteration} is not a finite value")]
    DegenerateEnergy { iteration: u32 },
}

use std::convert::TryFrom;

use crate::{Dims, Error};

/// The 8 neighbors of a pixel, in row-major order. The center is never part
/// of a patch.
pub(crate) const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coord2D {
    pub x: u32,
    pub y: u32,
}

impl Coord2D {
    pub fn from(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub(crate) fn to_flat(self, dims: Dims) -> CoordFlat {
        CoordFlat(dims.width * self.y + self.x)
    }

    pub(crate) fn to_signed(self) -> SignedCoord2D {
        SignedCoord2D {
            x: self.x as i32,
            y: self.y as i32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SignedCoord2D {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl SignedCoord2D {
    #[inline]
    pub(crate) fn offset(self, (dx, dy): (i32, i32)) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub(crate) fn to_unsigned(self) -> Coord2D {
        Coord2D::from(self.x as u32, self.y as u32)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CoordFlat(pub(crate) u32);

impl CoordFlat {
    pub(crate) fn to_2d(self, dims: Dims) -> Coord2D {
        let y = self.0 / dims.width;
        let x = self.0 - y * dims.width;
        Coord2D::from(x, y)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single channel image stored as a flat, row-major `f32` buffer.
///
/// Pixel `(x, y)` lives at index `y * width + x`, which is also the order in
/// which every pass of the relaxation visits pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    data: Vec<f32>,
    dims: Dims,
}

impl PixelGrid {
    /// Creates a grid from row-major values, failing if the buffer length
    /// doesn't match the dimensions or the image is empty
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self, Error> {
        check_flat_len(Dims::new(width, height))?;

        if width == 0 || height == 0 || data.len() != width as usize * height as usize {
            return Err(Error::EmptyImage {
                width,
                height,
                len: data.len(),
            });
        }

        Ok(Self {
            data,
            dims: Dims::new(width, height),
        })
    }

    /// Creates a grid filled with a single value
    pub fn filled(dims: Dims, value: f32) -> Self {
        Self {
            data: vec![value; dims.width as usize * dims.height as usize],
            dims,
        }
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.dims.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dims.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.dims.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let width = self.dims.width as usize;
        self.data[y as usize * width + x as usize] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub(crate) fn is_in_bounds(&self, coord: SignedCoord2D) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.x < self.dims.width as i32
            && coord.y < self.dims.height as i32
    }

    #[inline]
    pub(crate) fn at(&self, coord: CoordFlat) -> f32 {
        self.data[coord.index()]
    }

    #[inline]
    pub(crate) fn at_signed(&self, coord: SignedCoord2D) -> f32 {
        self.data[coord.y as usize * self.dims.width as usize + coord.x as usize]
    }

    #[inline]
    pub(crate) fn assign(&mut self, coord: CoordFlat, value: f32) {
        self.data[coord.index()] = value;
    }
}

/// Flat coordinates are `u32`, so every pixel index must fit in one
pub(crate) fn check_flat_len(dims: Dims) -> Result<(), Error> {
    if u64::from(dims.width) * u64::from(dims.height) > u64::from(u32::MAX) {
        return Err(Error::TooLarge {
            width: dims.width,
            height: dims.height,
        });
    }

    Ok(())
}

impl TryFrom<&image::GrayImage> for PixelGrid {
    type Error = Error;

    fn try_from(img: &image::GrayImage) -> Result<Self, Error> {
        let (width, height) = img.dimensions();
        Self::from_vec(
            width,
            height,
            img.as_raw().iter().map(|&v| f32::from(v)).collect(),
        )
    }
}

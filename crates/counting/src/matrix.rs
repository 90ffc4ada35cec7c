//! Dense per-pixel planes of derived values.
//!
//! Classification outputs and the Lab conversion of the working photo are
//! stored as flat row-major matrices sized exactly to the photo.

/// A width x height plane of copyable values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Wrap an existing row-major buffer. The buffer length must equal
    /// `width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: T) {
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterate `(x, y, value)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (u32, u32, T)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &value)| (i as u32 % width, i as u32 / width, value))
    }
}

/// Winning palette-entry index per pixel.
pub type IndexMatrix = Matrix<u32>;
/// Squared Lab distance to the winning entry per pixel.
pub type DistanceMatrix = Matrix<f32>;

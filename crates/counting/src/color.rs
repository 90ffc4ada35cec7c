//! Color space plumbing for the engine.
//!
//! All picking, training and classification happens in CIE Lab (D65), where
//! Euclidean distance tracks perceived color difference far better than in
//! RGB. sRGB is only touched at the edges: decoding the photo and rendering
//! palette swatches back for display.

use image::{Rgb, RgbImage};
use palette::{FromColor, IntoColor, Lab, Srgb};

use crate::matrix::Matrix;

/// Per-pixel Lab triples `[l, a, b]` for the working photo.
pub type LabMatrix = Matrix<[f32; 3]>;

/// Convert one sRGB pixel to a Lab triple.
pub fn rgb_to_lab(px: Rgb<u8>) -> [f32; 3] {
    let srgb = Srgb::new(
        px[0] as f32 / 255.0,
        px[1] as f32 / 255.0,
        px[2] as f32 / 255.0,
    );
    let lab = Lab::from_color(srgb);
    [lab.l, lab.a, lab.b]
}

/// Convert a Lab triple back to an sRGB pixel, clamped to gamut.
pub fn lab_to_rgb(lab: [f32; 3]) -> Rgb<u8> {
    let srgb: Srgb = Lab::new(lab[0], lab[1], lab[2]).into_color();
    Rgb([
        (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    ])
}

/// Lab version of the photo, dimensions matching exactly.
pub fn lab_matrix(photo: &RgbImage) -> LabMatrix {
    let (width, height) = photo.dimensions();
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for px in photo.pixels() {
        data.push(rgb_to_lab(*px));
    }
    Matrix::from_vec(width, height, data)
}

/// Squared Euclidean distance between two Lab triples.
pub fn distance_sq(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dl = a[0] - b[0];
    let da = a[1] - b[1];
    let db = a[2] - b[2];
    dl * dl + da * da + db * db
}

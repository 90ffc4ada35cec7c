//! Fixed-range flood fill over the Lab matrix.
//!
//! Picking grows a 4-connected region out from a seed pixel, admitting
//! neighbors whose Lab channels all sit within the tolerance of the seed's
//! color. The fill writes straight into the class's accumulated mask, so
//! growing is also merging: pixels already set block expansion, and a seed
//! that lands inside an existing region produces nothing.

use image::{GrayImage, Luma};
use imageproc::rect::Rect;

use crate::color::LabMatrix;

/// Grow a region from `seed` into `mask`, returning the bounding box of
/// the newly filled pixels in photo coordinates.
///
/// The mask must be photo-sized plus a one-pixel border on every side;
/// photo pixel (x, y) lives at mask (x + 1, y + 1). Returns None for a
/// seed outside the photo, or when the fill sets no pixels.
pub fn grow(
    lab: &LabMatrix,
    mask: &mut GrayImage,
    seed: (u32, u32),
    tolerance: f32,
) -> Option<Rect> {
    let (width, height) = (lab.width(), lab.height());
    debug_assert_eq!(mask.dimensions(), (width + 2, height + 2));

    let (sx, sy) = seed;
    if sx >= width || sy >= height {
        return None;
    }
    if mask.get_pixel(sx + 1, sy + 1)[0] != 0 {
        // already inside an accumulated region: a zero-pixel fill
        return None;
    }

    let seed_color = lab.get(sx, sy);
    let mut stack = vec![(sx, sy)];
    mask.put_pixel(sx + 1, sy + 1, Luma([255u8]));

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (sx, sy, sx, sy);

    while let Some((x, y)) = stack.pop() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        for (dx, dy) in [(0i64, -1i64), (0, 1), (-1, 0), (1, 0)] {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if mask.get_pixel(nx + 1, ny + 1)[0] != 0 {
                continue;
            }
            if !within_tolerance(lab.get(nx, ny), seed_color, tolerance) {
                continue;
            }
            mask.put_pixel(nx + 1, ny + 1, Luma([255u8]));
            stack.push((nx, ny));
        }
    }

    Some(
        Rect::at(min_x as i32, min_y as i32)
            .of_size(max_x - min_x + 1, max_y - min_y + 1),
    )
}

/// Fixed-range admission: every channel within tolerance of the seed.
fn within_tolerance(px: [f32; 3], seed: [f32; 3], tolerance: f32) -> bool {
    (px[0] - seed[0]).abs() <= tolerance
        && (px[1] - seed[1]).abs() <= tolerance
        && (px[2] - seed[2]).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;
    use image::{Rgb, RgbImage};

    fn two_patch_photo() -> RgbImage {
        // left half green, right half pink
        let mut photo = RgbImage::new(40, 20);
        for y in 0..20 {
            for x in 0..40 {
                let px = if x < 20 {
                    Rgb([0u8, 200, 0])
                } else {
                    Rgb([250, 80, 180])
                };
                photo.put_pixel(x, y, px);
            }
        }
        photo
    }

    fn blank_mask(width: u32, height: u32) -> GrayImage {
        GrayImage::new(width + 2, height + 2)
    }

    fn filled_pixels(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] != 0).count()
    }

    #[test]
    fn test_grow_fills_uniform_patch() {
        let photo = two_patch_photo();
        let lab = color::lab_matrix(&photo);
        let mut mask = blank_mask(40, 20);

        let bounds = grow(&lab, &mut mask, (5, 5), 10.0).expect("Should fill the green half");
        assert_eq!(bounds.left(), 0);
        assert_eq!(bounds.top(), 0);
        assert_eq!(bounds.width(), 20);
        assert_eq!(bounds.height(), 20);
        assert_eq!(filled_pixels(&mask), 20 * 20, "Should fill the half exactly");
    }

    #[test]
    fn test_grow_does_not_cross_color_boundary() {
        let photo = two_patch_photo();
        let lab = color::lab_matrix(&photo);
        let mut mask = blank_mask(40, 20);

        grow(&lab, &mut mask, (30, 10), 10.0).expect("Should fill the pink half");
        // no pixel of the green half may be set
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(mask.get_pixel(x + 1, y + 1)[0], 0);
            }
        }
    }

    #[test]
    fn test_grow_leaves_border_untouched() {
        let photo = two_patch_photo();
        let lab = color::lab_matrix(&photo);
        let mut mask = blank_mask(40, 20);

        grow(&lab, &mut mask, (5, 5), 10.0).expect("Should fill");
        for x in 0..42 {
            assert_eq!(mask.get_pixel(x, 0)[0], 0);
            assert_eq!(mask.get_pixel(x, 21)[0], 0);
        }
        for y in 0..22 {
            assert_eq!(mask.get_pixel(0, y)[0], 0);
            assert_eq!(mask.get_pixel(41, y)[0], 0);
        }
    }

    #[test]
    fn test_regrow_inside_region_is_noop() {
        let photo = two_patch_photo();
        let lab = color::lab_matrix(&photo);
        let mut mask = blank_mask(40, 20);

        grow(&lab, &mut mask, (5, 5), 10.0).expect("Should fill");
        let before = filled_pixels(&mask);

        assert!(
            grow(&lab, &mut mask, (10, 10), 10.0).is_none(),
            "Seed inside the region should fill nothing"
        );
        assert_eq!(filled_pixels(&mask), before);
    }

    #[test]
    fn test_grow_out_of_bounds_seed() {
        let photo = two_patch_photo();
        let lab = color::lab_matrix(&photo);
        let mut mask = blank_mask(40, 20);

        assert!(grow(&lab, &mut mask, (40, 5), 10.0).is_none());
        assert!(grow(&lab, &mut mask, (5, 20), 10.0).is_none());
        assert_eq!(filled_pixels(&mask), 0);
    }

    #[test]
    fn test_tiny_tolerance_still_takes_seed() {
        // speckle the photo so nothing matches anything else
        let mut photo = RgbImage::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                photo.put_pixel(x, y, Rgb([(x * 40) as u8, (y * 40) as u8, 128]));
            }
        }
        let lab = color::lab_matrix(&photo);
        let mut mask = blank_mask(6, 6);

        let bounds = grow(&lab, &mut mask, (3, 3), 0.0).expect("Seed always joins its own fill");
        assert_eq!(filled_pixels(&mask), 1);
        assert_eq!((bounds.width(), bounds.height()), (1, 1));
        assert_eq!(bounds.left(), 3);
        assert_eq!(bounds.top(), 3);
    }
}

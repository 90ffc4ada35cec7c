use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::types::Outline;

/// Paint the outline's interior, boundary included, into `mask`.
///
/// `offset` shifts the outline's coordinates into the mask's frame before
/// drawing; anything falling outside the mask is clipped. Painting with
/// value 0 erases a previously filled region.
pub fn fill_outline(mask: &mut GrayImage, outline: &Outline, offset: (i32, i32), value: u8) {
    let mut ring: Vec<Point<i32>> = outline
        .points
        .iter()
        .map(|&[x, y]| {
            Point::new(
                x.round() as i32 + offset.0,
                y.round() as i32 + offset.1,
            )
        })
        .collect();
    // draw_polygon_mut wants an open path
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return;
    }
    draw_polygon_mut(mask, &ring, Luma([value]));
}

/// Render outlines into a fresh mask of the given size.
pub fn rasterize(outlines: &[Outline], width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for outline in outlines {
        fill_outline(&mut mask, outline, (0, 0), 255);
    }
    mask
}

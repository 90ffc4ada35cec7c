use geo::Simplify;
use geo_types::{Coord, LineString};
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::rect::Rect;

use crate::types::Outline;

/// Tuning for boundary extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractParams {
    /// Douglas-Peucker tolerance in pixels. 1.0 is near-lossless.
    pub simplify_tolerance: f32,
    /// Boundaries enclosing less than this many square pixels are dropped.
    pub min_area: f32,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            simplify_tolerance: 1.0,
            min_area: 0.0,
        }
    }
}

/// Trace the external boundaries of the mask's foreground.
///
/// Nonzero pixels are foreground. Hole borders are ignored, so nested
/// structure inside a blob never produces an outline. Each boundary is
/// simplified and area-filtered per `params`.
pub fn extract(mask: &GrayImage, params: &ExtractParams) -> Vec<Outline> {
    trace_boundaries(mask, 0, 0, params)
}

/// Trace boundaries inside `region` of the mask only.
///
/// The region is copied out before tracing, so the caller's mask is never
/// written. `offset` is added to every output point, letting callers map
/// from a shifted mask frame back into their own coordinates. The region
/// is clipped to the mask bounds first.
pub fn extract_region(
    mask: &GrayImage,
    region: Rect,
    offset: (i32, i32),
    params: &ExtractParams,
) -> Vec<Outline> {
    let x0 = region.left().max(0) as u32;
    let y0 = region.top().max(0) as u32;
    let x1 = ((region.left() + region.width() as i32).max(0) as u32).min(mask.width());
    let y1 = ((region.top() + region.height() as i32).max(0) as u32).min(mask.height());
    if x1 <= x0 || y1 <= y0 {
        return Vec::new();
    }
    let window = image::imageops::crop_imm(mask, x0, y0, x1 - x0, y1 - y0).to_image();
    // clipping may move the window origin; keep output coordinates anchored
    // to the caller's requested corner
    let dx = offset.0 + (x0 as i32 - region.left());
    let dy = offset.1 + (y0 as i32 - region.top());
    trace_boundaries(&window, dx, dy, params)
}

fn trace_boundaries(mask: &GrayImage, dx: i32, dy: i32, params: &ExtractParams) -> Vec<Outline> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter_map(|contour| {
            let coords: Vec<Coord<f32>> = contour
                .points
                .iter()
                .map(|p| Coord {
                    x: (p.x + dx) as f32,
                    y: (p.y + dy) as f32,
                })
                .collect();
            let simplified = LineString::new(coords).simplify(&params.simplify_tolerance);
            let points: Vec<[f32; 2]> = simplified.coords().map(|c| [c.x, c.y]).collect();
            if points.len() < 3 {
                return None;
            }
            let outline = Outline::new(points);
            if outline.area() < params.min_area {
                return None;
            }
            Some(outline)
        })
        .collect()
}

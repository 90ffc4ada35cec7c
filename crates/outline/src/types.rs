use geo::{Area, Contains};
use geo_types::{Coord, LineString, Point, Polygon};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// A single external boundary traced from a binary mask.
///
/// Points are pixel coordinates in traversal order. The ring is stored
/// open; geometric queries close it implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub points: Vec<[f32; 2]>,
}

impl Outline {
    pub fn new(points: Vec<[f32; 2]>) -> Self {
        Self { points }
    }

    /// View of the boundary as a geo polygon.
    pub fn to_geo_polygon(&self) -> Polygon<f32> {
        let coords: Vec<Coord<f32>> = self
            .points
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Enclosed area in square pixels.
    pub fn area(&self) -> f32 {
        self.to_geo_polygon().unsigned_area()
    }

    /// True when the point lies inside the boundary.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.to_geo_polygon().contains(&Point::new(x, y))
    }

    /// Axis-aligned bounding box, rounded outward to whole pixels.
    pub fn bounding_rect(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::at(0, 0).of_size(1, 1);
        }
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &[x, y] in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let left = min_x.floor() as i32;
        let top = min_y.floor() as i32;
        let width = (max_x.ceil() as i32 - left + 1).max(1) as u32;
        let height = (max_y.ceil() as i32 - top + 1).max(1) as u32;
        Rect::at(left, top).of_size(width, height)
    }
}

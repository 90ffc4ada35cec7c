//! Card counting over the classification planes.
//!
//! Pixels whose nearest-entry distance clears the cutoff are binned into
//! per-class masks, the masks are opened to kill single-pixel
//! misclassifications, and each surviving boundary above the minimum area
//! is one card. The diff image repaints accepted pixels in their palette
//! color over the photo so an operator can see what the counter saw.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;
use serde::Serialize;
use tracing::{debug, info};

use outline::{ExtractParams, Outline, extract};

use crate::ClassId;
use crate::classifier::NearestIndex;
use crate::color;
use crate::config::SessionConfig;
use crate::matrix::{DistanceMatrix, IndexMatrix};

/// Everything counted for one class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassCount {
    pub class: ClassId,
    pub name: String,
    pub count: usize,
    pub outlines: Vec<Outline>,
    /// The opened per-class mask the outlines were traced from.
    #[serde(skip)]
    pub mask: GrayImage,
}

/// Per-class counts plus the operator feedback image.
#[derive(Debug, Clone)]
pub struct CountReport {
    pub classes: Vec<ClassCount>,
    /// The working photo with accepted pixels repainted in palette colors.
    pub diff: RgbImage,
}

impl CountReport {
    pub fn count_for(&self, class: ClassId) -> usize {
        self.classes
            .iter()
            .find(|c| c.class == class)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.classes.iter().map(|c| c.count).sum()
    }
}

/// Count cards per class from the classification planes.
pub fn count(
    photo: &RgbImage,
    index: &NearestIndex,
    indices: &IndexMatrix,
    distances: &DistanceMatrix,
    config: &SessionConfig,
) -> CountReport {
    let (width, height) = (indices.width(), indices.height());
    let cutoff = config.squared_cutoff();
    let entry_colors: Vec<Rgb<u8>> = index
        .entries()
        .iter()
        .map(|e| color::lab_to_rgb(e.lab))
        .collect();

    let mut masks: Vec<GrayImage> = config
        .classes
        .iter()
        .map(|_| GrayImage::new(width, height))
        .collect();
    let mut diff = photo.clone();
    let mut accepted = 0usize;

    for (x, y, entry) in indices.enumerate() {
        if distances.get(x, y) > cutoff {
            continue;
        }
        let Some(class) = index.class_of(entry) else {
            continue;
        };
        let Some(mask) = masks.get_mut(class.0) else {
            continue;
        };
        mask.put_pixel(x, y, Luma([255u8]));
        diff.put_pixel(x, y, entry_colors[entry as usize]);
        accepted += 1;
    }
    debug!(
        "{accepted} of {} pixels accepted at squared cutoff {cutoff}",
        width as usize * height as usize
    );

    let params = ExtractParams {
        simplify_tolerance: 1.0,
        min_area: config.size_filter * config.size_filter,
    };
    let classes = masks
        .into_iter()
        .enumerate()
        .map(|(i, mask)| {
            let cleaned = open(&mask, Norm::LInf, 1);
            let outlines = extract(&cleaned, &params);
            info!("class {}: {} cards", config.classes[i], outlines.len());
            ClassCount {
                class: ClassId(i),
                name: config.classes[i].clone(),
                count: outlines.len(),
                outlines,
                mask: cleaned,
            }
        })
        .collect();

    CountReport { classes, diff }
}

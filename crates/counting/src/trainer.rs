//! Palette training over the picked samples.
//!
//! Each class's masked pixels are clustered independently into up to
//! `gradations` Lab centers, so one nominal color can span the shading
//! variations a real photo produces. Clustering is k-means with k-means++
//! seeding from a fixed RNG seed: training twice on the same picks yields
//! byte-identical palettes.

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ClassId;
use crate::color;

/// Refinement pass bound; training has to stay interactive.
const MAX_REFINE_PASSES: usize = 10;
/// Fixed seed so identical picks always train identical palettes.
const TRAIN_SEED: u64 = 7;

/// One trained cluster center, tagged with its owning class.
///
/// The class is stored explicitly; nothing is ever recovered from an
/// entry's position in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub lab: [f32; 3],
    pub class: ClassId,
}

/// The trained palette: every class's centers, classes in declaration
/// order. A class with fewer distinct picked colors than `gradations`
/// contributes fewer entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub entries: Vec<PaletteEntry>,
    pub gradations: usize,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for(&self, class: ClassId) -> impl Iterator<Item = &PaletteEntry> {
        self.entries.iter().filter(move |e| e.class == class)
    }

    /// Render the palette as a one-pixel-tall sRGB strip, one swatch per
    /// entry, in palette order.
    pub fn to_rgb_strip(&self) -> RgbImage {
        rgb_strip(&self.entries)
    }
}

pub(crate) fn rgb_strip(entries: &[PaletteEntry]) -> RgbImage {
    let mut strip = RgbImage::new(entries.len() as u32, 1);
    for (i, entry) in entries.iter().enumerate() {
        strip.put_pixel(i as u32, 0, color::lab_to_rgb(entry.lab));
    }
    strip
}

/// Cluster each class's samples and assemble the palette.
pub fn train_palette(
    class_samples: &[(ClassId, Vec<[f32; 3]>)],
    gradations: usize,
) -> Palette {
    let mut rng = StdRng::seed_from_u64(TRAIN_SEED);
    let mut entries = Vec::new();
    for (class, samples) in class_samples {
        if samples.is_empty() {
            debug!("class {} has no training pixels, skipping", class.0);
            continue;
        }
        let centers = kmeans(samples, gradations, &mut rng);
        debug!(
            "clustered {} pixels of class {} into {} centers",
            samples.len(),
            class.0,
            centers.len()
        );
        entries.extend(
            centers
                .into_iter()
                .map(|lab| PaletteEntry { lab, class: *class }),
        );
    }
    Palette {
        entries,
        gradations,
    }
}

/// K-means over Lab triples with k-means++ seeding and a bounded number
/// of refinement passes. Centers that end up owning no samples are
/// dropped, so the result can be shorter than `k`.
fn kmeans(samples: &[[f32; 3]], k: usize, rng: &mut StdRng) -> Vec<[f32; 3]> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }

    // k-means++ seeding: draw further centers with probability proportional
    // to squared distance from the ones picked so far
    let mut centers: Vec<[f32; 3]> = Vec::with_capacity(k);
    centers.push(samples[rng.gen_range(0..samples.len())]);
    while centers.len() < k {
        let weights: Vec<f32> = samples
            .iter()
            .map(|s| {
                centers
                    .iter()
                    .map(|c| color::distance_sq(*s, *c))
                    .fold(f32::MAX, f32::min)
            })
            .collect();
        let total: f32 = weights.iter().sum();
        if total <= f32::EPSILON {
            // every remaining sample coincides with a center
            break;
        }
        let mut draw = rng.gen_range(0.0..total);
        let mut chosen = samples.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if draw < *w {
                chosen = i;
                break;
            }
            draw -= w;
        }
        centers.push(samples[chosen]);
    }

    // bounded Lloyd refinement
    let mut assignment: Vec<usize> = samples
        .iter()
        .map(|s| nearest_center(*s, &centers))
        .collect();
    for _ in 0..MAX_REFINE_PASSES {
        let mut sums = vec![[0f64; 3]; centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (s, &a) in samples.iter().zip(&assignment) {
            sums[a][0] += s[0] as f64;
            sums[a][1] += s[1] as f64;
            sums[a][2] += s[2] as f64;
            counts[a] += 1;
        }
        for (i, center) in centers.iter_mut().enumerate() {
            if counts[i] > 0 {
                *center = [
                    (sums[i][0] / counts[i] as f64) as f32,
                    (sums[i][1] / counts[i] as f64) as f32,
                    (sums[i][2] / counts[i] as f64) as f32,
                ];
            }
        }

        let mut changed = false;
        for (i, s) in samples.iter().enumerate() {
            let best = nearest_center(*s, &centers);
            if assignment[i] != best {
                assignment[i] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // a center nothing maps to carries no information
    let mut counts = vec![0usize; centers.len()];
    for &a in &assignment {
        counts[a] += 1;
    }
    centers
        .into_iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .map(|(c, _)| c)
        .collect()
}

fn nearest_center(sample: [f32; 3], centers: &[[f32; 3]]) -> usize {
    let mut best = 0;
    let mut best_d = f32::MAX;
    for (i, center) in centers.iter().enumerate() {
        let d = color::distance_sq(sample, *center);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

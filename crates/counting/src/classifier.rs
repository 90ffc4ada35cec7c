//! Nearest-neighbor classification against the trained palette.
//!
//! The index contract is logical 1-NN in Lab space. Palettes stay tiny
//! (classes x gradations entries), so an exact linear scan implements the
//! contract; any replacement structure must return the same winners.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ClassId;
use crate::color::{self, LabMatrix};
use crate::error::Result;
use crate::matrix::{DistanceMatrix, IndexMatrix, Matrix};
use crate::trainer::{self, Palette, PaletteEntry};

/// File the serialized index lives in, next to the photo.
pub const INDEX_FILE: &str = "index.bin";
/// File the palette swatch strip lives in, next to the photo.
pub const PALETTE_FILE: &str = "palette.png";

/// Bumped whenever the on-disk blob layout changes.
const INDEX_FORMAT_VERSION: u32 = 1;

/// On-disk form of the trained index.
#[derive(Debug, Serialize, Deserialize)]
struct IndexBlob {
    version: u32,
    gradations: usize,
    classes: Vec<String>,
    entries: Vec<PaletteEntry>,
}

/// Exact nearest-neighbor index over the palette entries.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestIndex {
    entries: Vec<PaletteEntry>,
    gradations: usize,
}

impl NearestIndex {
    pub fn build(palette: &Palette) -> Self {
        info!("building color index over {} palette entries", palette.len());
        Self {
            entries: palette.entries.clone(),
            gradations: palette.gradations,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// The palette this index was built from.
    pub fn to_palette(&self) -> Palette {
        Palette {
            entries: self.entries.clone(),
            gradations: self.gradations,
        }
    }

    /// Class owning a palette entry.
    pub fn class_of(&self, entry: u32) -> Option<ClassId> {
        self.entries.get(entry as usize).map(|e| e.class)
    }

    /// 1-NN query: winning entry index and squared Lab distance. Ties keep
    /// the lowest entry index.
    pub fn nearest(&self, lab: [f32; 3]) -> (u32, f32) {
        let mut best = 0u32;
        let mut best_d = f32::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            let d = color::distance_sq(lab, entry.lab);
            if d < best_d {
                best = i as u32;
                best_d = d;
            }
        }
        (best, best_d)
    }

    /// Label every pixel with its nearest palette entry.
    pub fn classify(&self, lab: &LabMatrix) -> (IndexMatrix, DistanceMatrix) {
        let (width, height) = (lab.width(), lab.height());
        info!(
            "classifying {}x{} pixels against {} entries, please wait",
            width,
            height,
            self.entries.len()
        );
        let mut indices = Vec::with_capacity(width as usize * height as usize);
        let mut distances = Vec::with_capacity(width as usize * height as usize);
        for &px in lab.as_slice() {
            let (i, d) = self.nearest(px);
            indices.push(i);
            distances.push(d);
        }
        (
            Matrix::from_vec(width, height, indices),
            Matrix::from_vec(width, height, distances),
        )
    }

    /// Write the index blob and palette strip into `dir`.
    pub fn save(&self, dir: &Path, classes: &[String]) -> Result<()> {
        let blob = IndexBlob {
            version: INDEX_FORMAT_VERSION,
            gradations: self.gradations,
            classes: classes.to_vec(),
            entries: self.entries.clone(),
        };
        let bytes = bincode::serde::encode_to_vec(&blob, bincode::config::standard())?;
        fs::write(dir.join(INDEX_FILE), bytes)?;
        trainer::rgb_strip(&self.entries).save(dir.join(PALETTE_FILE))?;
        info!(
            "saved palette of {} entries to {}",
            self.entries.len(),
            dir.display()
        );
        Ok(())
    }

    /// Reload a previously saved palette and index from `dir`.
    ///
    /// Returns None unless both files exist and are structurally
    /// consistent with each other and with the configured class list;
    /// anything off means training has to be redone, never a crash.
    pub fn load(dir: &Path, classes: &[String]) -> Option<Self> {
        let index_path = dir.join(INDEX_FILE);
        let palette_path = dir.join(PALETTE_FILE);
        let bytes = fs::read(&index_path).ok()?;
        let decoded =
            bincode::serde::decode_from_slice::<IndexBlob, _>(&bytes, bincode::config::standard());
        let (blob, _) = match decoded {
            Ok(d) => d,
            Err(err) => {
                warn!("unreadable index {}: {err}", index_path.display());
                return None;
            }
        };
        if blob.version != INDEX_FORMAT_VERSION {
            warn!(
                "index {} has format version {}, wanted {}",
                index_path.display(),
                blob.version,
                INDEX_FORMAT_VERSION
            );
            return None;
        }
        if blob.classes != classes {
            warn!("saved palette was trained for different classes, retrain");
            return None;
        }
        if blob.entries.iter().any(|e| e.class.0 >= classes.len()) {
            warn!("saved palette references a class out of range, retrain");
            return None;
        }
        let strip = match image::open(&palette_path) {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                warn!("unreadable palette {}: {err}", palette_path.display());
                return None;
            }
        };
        if strip.height() != 1 || strip.width() as usize != blob.entries.len() {
            warn!(
                "palette image holds {} swatches but the index has {} entries",
                strip.width(),
                blob.entries.len()
            );
            return None;
        }
        info!(
            "restored palette of {} entries from {}",
            blob.entries.len(),
            dir.display()
        );
        Some(Self {
            entries: blob.entries,
            gradations: blob.gradations,
        })
    }
}

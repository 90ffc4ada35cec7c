//! The derived-data store: everything computed from the photo, cached
//! behind lazy accessors.
//!
//! Each accessor owns the rule for producing its item and nothing is
//! computed twice unless an invalidation drops it first. Two things
//! invalidate: a size-limit change makes every size-dependent item stale
//! (the store is simply reopened), and retraining drops the palette strip
//! and both classification planes.
//!
//! The working raster and the per-class pick masks also persist into a
//! `<photo stem>.cache/` directory beside the photo. All cache I/O is
//! best-effort: a write failure costs a recompute next session, never the
//! session itself.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{GrayImage, RgbImage};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::ClassId;
use crate::classifier::NearestIndex;
use crate::color::{self, LabMatrix};
use crate::error::Result;
use crate::grower;
use crate::matrix::{DistanceMatrix, IndexMatrix};
use crate::trainer::Palette;

/// Cache file holding the working-resolution raster.
const WORKING_FILE: &str = "working.png";

/// Cache file holding a class's accumulated pick mask.
pub(crate) fn mask_file(class_name: &str) -> String {
    format!("{class_name}.mask.png")
}

/// Cache directory for a photo: `<stem>.cache` beside it.
pub fn cache_dir_for(photo_path: &Path) -> PathBuf {
    let stem = photo_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("photo");
    photo_path.with_file_name(format!("{stem}.cache"))
}

pub struct DerivedStore {
    cache_dir: PathBuf,
    working: RgbImage,
    lab: Option<LabMatrix>,
    pick_masks: HashMap<ClassId, GrayImage>,
    palette: Option<Palette>,
    palette_rgb: Option<RgbImage>,
    nearest: Option<(IndexMatrix, DistanceMatrix)>,
}

impl DerivedStore {
    /// Open the store for a photo: decode (or reload from cache) the
    /// working raster and set up the cache directory.
    pub fn open(photo_path: &Path, size_limit: u32) -> Result<Self> {
        let cache_dir = cache_dir_for(photo_path);
        if let Err(err) = fs::create_dir_all(&cache_dir) {
            warn!(
                "could not create cache directory {}: {err}",
                cache_dir.display()
            );
        }
        let working = load_working(photo_path, &cache_dir, size_limit)?;
        Ok(Self {
            cache_dir,
            working,
            lab: None,
            pick_masks: HashMap::new(),
            palette: None,
            palette_rgb: None,
            nearest: None,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The photo at working resolution.
    pub fn working(&self) -> &RgbImage {
        &self.working
    }

    /// Working raster dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.working.dimensions()
    }

    /// Lab conversion of the working raster, computed once.
    pub fn lab(&mut self) -> &LabMatrix {
        match (&mut self.lab, &self.working) {
            (Some(lab), _) => lab,
            (slot, working) => {
                debug!("deriving lab matrix for {}x{} raster", working.width(), working.height());
                slot.insert(color::lab_matrix(working))
            }
        }
    }

    /// A class's accumulated pick mask: photo-sized plus a one-pixel
    /// border, created blank on first touch.
    pub fn pick_mask(&mut self, class: ClassId) -> &mut GrayImage {
        let (width, height) = self.working.dimensions();
        self.pick_masks
            .entry(class)
            .or_insert_with(|| GrayImage::new(width + 2, height + 2))
    }

    /// Set pixels in a class's mask, border excluded from the count.
    pub fn mask_pixel_count(&self, class: ClassId) -> usize {
        self.pick_masks
            .get(&class)
            .map(|mask| mask.pixels().filter(|p| p[0] != 0).count())
            .unwrap_or(0)
    }

    /// Forget a class's accumulated mask.
    pub fn clear_pick_mask(&mut self, class: ClassId) {
        self.pick_masks.remove(&class);
    }

    /// Run the region grower from `seed` into the class's mask.
    pub fn grow_region(
        &mut self,
        class: ClassId,
        seed: (u32, u32),
        tolerance: f32,
    ) -> Option<Rect> {
        self.lab();
        let (width, height) = self.working.dimensions();
        let lab = self.lab.as_ref()?;
        let mask = self
            .pick_masks
            .entry(class)
            .or_insert_with(|| GrayImage::new(width + 2, height + 2));
        grower::grow(lab, mask, seed, tolerance)
    }

    /// Lab triples of every pixel set in the class's mask.
    pub fn class_samples(&mut self, class: ClassId) -> Vec<[f32; 3]> {
        self.lab();
        let Some(lab) = self.lab.as_ref() else {
            return Vec::new();
        };
        let Some(mask) = self.pick_masks.get(&class) else {
            return Vec::new();
        };
        let mut samples = Vec::new();
        for y in 0..lab.height() {
            for x in 0..lab.width() {
                if mask.get_pixel(x + 1, y + 1)[0] != 0 {
                    samples.push(lab.get(x, y));
                }
            }
        }
        samples
    }

    /// Install a freshly trained palette. Retraining invalidates the
    /// display strip and both classification planes.
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette_rgb = None;
        self.nearest = None;
        self.palette = Some(palette);
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// sRGB swatch strip of the current palette, rendered once per
    /// palette.
    pub fn palette_rgb(&mut self) -> Option<&RgbImage> {
        match (&mut self.palette_rgb, &self.palette) {
            (Some(strip), _) => Some(strip),
            (_, None) => None,
            (slot, Some(palette)) => Some(slot.insert(palette.to_rgb_strip())),
        }
    }

    /// Classification planes for the current palette, plus the photo they
    /// were computed over. Classified once, cached until retraining.
    pub fn classify_with(
        &mut self,
        index: &NearestIndex,
    ) -> (&RgbImage, &IndexMatrix, &DistanceMatrix) {
        self.lab();
        match &mut self.nearest {
            Some((indices, distances)) => (&self.working, indices, distances),
            slot => {
                let planes = match &self.lab {
                    Some(lab) => index.classify(lab),
                    None => index.classify(&color::lab_matrix(&self.working)),
                };
                let (indices, distances) = slot.insert(planes);
                (&self.working, indices, distances)
            }
        }
    }

    /// Write every class's mask into the cache directory, borders
    /// stripped. A class whose mask is empty (or gone) gets its file
    /// removed instead.
    pub fn save_pick_masks(&self, classes: &[String]) {
        let (width, height) = self.working.dimensions();
        for (i, name) in classes.iter().enumerate() {
            let path = self.cache_dir.join(mask_file(name));
            match self.pick_masks.get(&ClassId(i)) {
                Some(mask) if mask.pixels().any(|p| p[0] != 0) => {
                    let inner = image::imageops::crop_imm(mask, 1, 1, width, height).to_image();
                    if let Err(err) = inner.save(&path) {
                        warn!("could not save mask {}: {err}", path.display());
                    }
                }
                _ => {
                    if path.exists() {
                        debug!("removing mask file for now-empty class {name}");
                        if let Err(err) = fs::remove_file(&path) {
                            warn!("could not remove {}: {err}", path.display());
                        }
                    }
                }
            }
        }
    }

    /// Load persisted class masks. A mask whose size no longer matches
    /// the working raster is stale: it is deleted and the class starts
    /// empty. Returns the classes that restored a mask.
    pub fn load_pick_masks(&mut self, classes: &[String]) -> Vec<ClassId> {
        let (width, height) = self.working.dimensions();
        let mut restored = Vec::new();
        for (i, name) in classes.iter().enumerate() {
            let path = self.cache_dir.join(mask_file(name));
            if !path.exists() {
                continue;
            }
            let loaded = match image::open(&path) {
                Ok(img) => img.to_luma8(),
                Err(err) => {
                    warn!("unreadable mask {}: {err}", path.display());
                    continue;
                }
            };
            if loaded.dimensions() != (width, height) {
                warn!(
                    "mask {} is {}x{} but the working raster is {width}x{height}, deleting",
                    path.display(),
                    loaded.width(),
                    loaded.height()
                );
                if let Err(err) = fs::remove_file(&path) {
                    warn!("could not remove stale mask {}: {err}", path.display());
                }
                continue;
            }
            let mut bordered = GrayImage::new(width + 2, height + 2);
            image::imageops::replace(&mut bordered, &loaded, 1, 1);
            self.pick_masks.insert(ClassId(i), bordered);
            restored.push(ClassId(i));
        }
        restored
    }
}

/// The working-raster rule: reuse the cached scaled copy when its longest
/// side still matches the size limit, otherwise decode the photo, scale it
/// down, and refresh the cache.
fn load_working(photo_path: &Path, cache_dir: &Path, size_limit: u32) -> Result<RgbImage> {
    let cached = cache_dir.join(WORKING_FILE);
    if cached.exists() {
        match image::open(&cached) {
            Ok(img) => {
                let img = img.to_rgb8();
                if img.width().max(img.height()) == size_limit {
                    debug!("reusing cached working raster {}", cached.display());
                    return Ok(img);
                }
                debug!(
                    "cached raster is {}x{} but the size limit is {size_limit}, rescaling",
                    img.width(),
                    img.height()
                );
            }
            Err(err) => warn!("unreadable cached raster {}: {err}", cached.display()),
        }
    }
    let photo = image::open(photo_path)?;
    let working = photo
        .resize(size_limit, size_limit, FilterType::Triangle)
        .to_rgb8();
    info!(
        "scaled {} from {}x{} to {}x{}",
        photo_path.display(),
        photo.width(),
        photo.height(),
        working.width(),
        working.height()
    );
    if let Err(err) = working.save(&cached) {
        warn!("could not cache working raster {}: {err}", cached.display());
    }
    Ok(working)
}

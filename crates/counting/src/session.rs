//! The interactive counting session.
//!
//! A session binds one photo to its derived-data store, the operator's
//! picks, the traced training boundaries, and the trained classifier, and
//! drives them through the pick / train / count loop. Sessions are
//! single-threaded by design; wrap one in a mutex if it has to be shared.
//!
//! On open, the session runs the load protocol: restore picks from
//! `data.json`, restore each class's mask from its cached image (or replay
//! the picks through the grower when the image is missing), re-derive the
//! training boundaries, and reload the trained palette when a valid one
//! sits beside the photo. Every restore step degrades to "start empty"
//! rather than failing the session.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, warn};

use outline::{ExtractParams, Outline};

use crate::ClassId;
use crate::classifier::NearestIndex;
use crate::config::SessionConfig;
use crate::counter::{self, CountReport};
use crate::error::{CountingError, Result};
use crate::store::DerivedStore;
use crate::trainer;

/// Cache file holding the operator's picks.
const DATA_FILE: &str = "data.json";

/// What the session is currently doing with input.
///
/// Switching modes only changes where picks land; masks, boundaries and
/// the palette survive every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    /// Ignore picks.
    Inert,
    /// Picks grow training regions for this class.
    Train(ClassId),
    /// Counting view; picks are ignored.
    Count,
}

/// On-disk form of the picks: per class name, a flat `[x, y, x, y, ...]`
/// coordinate list.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(default)]
    picks: BTreeMap<String, Vec<u32>>,
}

pub struct Session {
    config: SessionConfig,
    photo_path: PathBuf,
    parent_dir: PathBuf,
    store: DerivedStore,
    picks: Vec<Vec<(u32, u32)>>,
    outlines: Vec<Vec<Outline>>,
    classifier: Option<NearestIndex>,
    mode: Mode,
}

impl Session {
    /// Open a photo and restore whatever previous sessions left behind.
    pub fn open(photo_path: impl Into<PathBuf>, config: SessionConfig) -> Result<Self> {
        let photo_path = photo_path.into();
        config.validate()?;
        let parent_dir = photo_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let store = DerivedStore::open(&photo_path, config.size_limit)?;
        let class_count = config.classes.len();
        let mut session = Self {
            config,
            photo_path,
            parent_dir,
            store,
            picks: vec![Vec::new(); class_count],
            outlines: vec![Vec::new(); class_count],
            classifier: None,
            mode: Mode::Inert,
        };
        session.load_data();
        session.load_masks();
        session.load_classifier();
        Ok(session)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        debug!("mode -> {mode}");
        self.mode = mode;
    }

    /// Enter training mode for a class by name.
    pub fn train_class(&mut self, name: &str) -> Result<ClassId> {
        let class = self
            .config
            .class_id(name)
            .ok_or_else(|| CountingError::UnknownClass(name.to_string()))?;
        self.set_mode(Mode::Train(class));
        Ok(class)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn photo_path(&self) -> &Path {
        &self.photo_path
    }

    pub fn cache_dir(&self) -> &Path {
        self.store.cache_dir()
    }

    /// Working raster dimensions.
    pub fn photo_size(&self) -> (u32, u32) {
        self.store.dimensions()
    }

    pub fn picks_for(&self, class: ClassId) -> &[(u32, u32)] {
        self.picks.get(class.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn outlines_for(&self, class: ClassId) -> &[Outline] {
        self.outlines.get(class.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set pixels in a class's accumulated mask.
    pub fn mask_pixels(&self, class: ClassId) -> usize {
        self.store.mask_pixel_count(class)
    }

    pub fn is_trained(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn palette(&self) -> Option<&trainer::Palette> {
        self.store.palette()
    }

    /// Apply a new configuration; the only configuration entry point.
    ///
    /// A size-limit change makes every size-dependent derived item stale,
    /// so the store is reopened and per-class state reloads from disk
    /// (stale masks start empty). A class-list change does the same and
    /// additionally drops a classifier trained for the old list.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<()> {
        config.validate()?;
        let size_changed = config.size_limit != self.config.size_limit;
        let classes_changed = config.classes != self.config.classes;
        self.config = config;
        if size_changed || classes_changed {
            info!("configuration invalidates derived data, reloading");
            self.store = DerivedStore::open(&self.photo_path, self.config.size_limit)?;
            let class_count = self.config.classes.len();
            self.picks = vec![Vec::new(); class_count];
            self.outlines = vec![Vec::new(); class_count];
            self.classifier = None;
            self.mode = Mode::Inert;
            self.load_data();
            self.load_masks();
            self.load_classifier();
        }
        Ok(())
    }

    /// Operator pick: grow a training region around the seed.
    ///
    /// Only does anything in train mode. Returns the refreshed rectangle,
    /// or None when the pick was a no-op (wrong mode, off-photo seed, or
    /// a fill that produced no new pixels).
    pub fn pick(&mut self, x: i32, y: i32) -> Option<Rect> {
        let Mode::Train(class) = self.mode else {
            debug!("pick ({x}, {y}) ignored outside train mode");
            return None;
        };
        let (width, height) = self.store.dimensions();
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            debug!("pick ({x}, {y}) is off the photo, ignored");
            return None;
        }
        let seed = (x as u32, y as u32);
        let grown = self
            .store
            .grow_region(class, seed, self.config.pick_fuzz as f32)?;
        self.picks[class.0].push(seed);
        let roi = self.absorb_overlapping(class, grown);
        self.refresh_outlines(class, Some(roi));
        debug!(
            "picked ({x}, {y}) for {}: refreshed {}x{} region",
            self.config.class_name(class),
            roi.width(),
            roi.height()
        );
        Some(roi)
    }

    /// Remove the trained region containing the point, searching every
    /// class layer. Returns the owning class when something was removed.
    pub fn unpick(&mut self, x: i32, y: i32) -> Option<ClassId> {
        let (px, py) = (x as f32, y as f32);
        let mut hit = None;
        'scan: for (i, layer) in self.outlines.iter().enumerate() {
            for (j, outline) in layer.iter().enumerate() {
                if outline.contains(px, py) {
                    hit = Some((ClassId(i), j));
                    break 'scan;
                }
            }
        }
        let (class, slot) = hit?;
        let outline = self.outlines[class.0].remove(slot);
        // the picks recorded inside the boundary go with it
        self.picks[class.0]
            .retain(|&(sx, sy)| !outline.contains(sx as f32, sy as f32));
        let mask = self.store.pick_mask(class);
        outline::fill_outline(mask, &outline, (1, 1), 0);
        debug!(
            "unpicked a {} region at ({x}, {y})",
            self.config.class_name(class)
        );
        Some(class)
    }

    /// Forget a class's training entirely: picks, mask and boundaries.
    pub fn clear_class(&mut self, class: ClassId) {
        if class.0 >= self.config.classes.len() {
            return;
        }
        self.picks[class.0].clear();
        self.outlines[class.0].clear();
        self.store.clear_pick_mask(class);
        info!("cleared training for {}", self.config.class_name(class));
    }

    /// Cluster the picked samples into a palette and rebuild the
    /// classifier. The palette and its index are persisted beside the
    /// photo so they can season future sessions.
    pub fn train(&mut self) -> Result<()> {
        let class_samples: Vec<(ClassId, Vec<[f32; 3]>)> = self
            .config
            .class_ids()
            .map(|class| (class, self.store.class_samples(class)))
            .collect();
        for (class, samples) in &class_samples {
            debug!(
                "collected {} {} pixels",
                samples.len(),
                self.config.class_name(*class)
            );
        }
        if class_samples.iter().all(|(_, s)| s.is_empty()) {
            return Err(CountingError::NoSamples);
        }

        let palette = trainer::train_palette(&class_samples, self.config.gradations);
        info!("trained a palette of {} entries", palette.len());
        let index = NearestIndex::build(&palette);
        if let Err(err) = index.save(&self.parent_dir, &self.config.classes) {
            warn!("could not persist the palette: {err}");
        }
        self.store.set_palette(palette);
        self.classifier = Some(index);
        Ok(())
    }

    /// Classify the photo and count cards per class.
    ///
    /// Classification planes are cached across calls; only retraining
    /// recomputes them. Threshold and size-filter changes apply on the
    /// next count without invalidating anything.
    pub fn count(&mut self) -> Result<CountReport> {
        let Some(index) = self.classifier.clone() else {
            return Err(CountingError::NotTrained);
        };
        self.mode = Mode::Count;
        let (photo, indices, distances) = self.store.classify_with(&index);
        Ok(counter::count(photo, &index, indices, distances, &self.config))
    }

    /// Persist the session: picks into `data.json`, masks into their
    /// cache images. Best-effort; failures are logged and cost a replay
    /// next session, never the current one.
    pub fn save(&self) {
        let picks: BTreeMap<String, Vec<u32>> = self
            .config
            .classes
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let flat = self.picks[i]
                    .iter()
                    .flat_map(|&(x, y)| [x, y])
                    .collect();
                (name.clone(), flat)
            })
            .collect();
        let path = self.store.cache_dir().join(DATA_FILE);
        match serde_json::to_string_pretty(&SessionData { picks }) {
            Ok(json) => {
                if let Err(err) = fs::write(&path, json) {
                    warn!("could not save {}: {err}", path.display());
                }
            }
            Err(err) => warn!("could not serialize picks: {err}"),
        }
        self.store.save_pick_masks(&self.config.classes);
    }

    fn load_data(&mut self) {
        let path = self.store.cache_dir().join(DATA_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return,
        };
        let data: SessionData = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(err) => {
                warn!("unreadable {}: {err}, starting empty", path.display());
                return;
            }
        };
        for (name, flat) in data.picks {
            let Some(class) = self.config.class_id(&name) else {
                warn!("saved picks for unknown class '{name}' ignored");
                continue;
            };
            self.picks[class.0] = flat.chunks_exact(2).map(|p| (p[0], p[1])).collect();
        }
    }

    /// Restore class masks, replaying picks through the grower for any
    /// class whose cached mask is gone, then re-derive all boundaries.
    fn load_masks(&mut self) {
        let restored = self.store.load_pick_masks(&self.config.classes);
        for class in self.config.class_ids().collect::<Vec<_>>() {
            if !restored.contains(&class) && !self.picks[class.0].is_empty() {
                debug!(
                    "replaying {} picks for {}",
                    self.picks[class.0].len(),
                    self.config.class_name(class)
                );
                let fuzz = self.config.pick_fuzz as f32;
                for (x, y) in self.picks[class.0].clone() {
                    self.store.grow_region(class, (x, y), fuzz);
                }
            }
            if self.store.mask_pixel_count(class) == 0 {
                self.outlines[class.0].clear();
                continue;
            }
            self.refresh_outlines(class, None);
        }
    }

    fn load_classifier(&mut self) {
        self.classifier = NearestIndex::load(&self.parent_dir, &self.config.classes);
        if let Some(index) = &self.classifier {
            self.store.set_palette(index.to_palette());
        }
    }

    /// Absorb every existing boundary whose bounds the grown rectangle
    /// touches, so overlapping regions re-extract as one. Runs to a fixed
    /// point: each absorption can widen the rectangle into further
    /// boundaries. The probe is widened by one pixel because a fill that
    /// stops against an existing region sits adjacent to it, not on it.
    fn absorb_overlapping(&mut self, class: ClassId, grown: Rect) -> Rect {
        let layer = &mut self.outlines[class.0];
        let mut roi = grown;
        let mut absorbed = true;
        while absorbed {
            absorbed = false;
            let mut keep = Vec::with_capacity(layer.len());
            for outline in layer.drain(..) {
                let bounds = outline.bounding_rect();
                if inflate_rect(roi, 1).intersect(bounds).is_some() {
                    roi = union_rect(roi, bounds);
                    absorbed = true;
                } else {
                    keep.push(outline);
                }
            }
            *layer = keep;
        }
        let (width, height) = self.store.dimensions();
        clip_rect(roi, width, height)
    }

    /// Re-trace a class's boundaries, either inside a dirty rectangle
    /// (appending what is found) or over the whole mask (replacing).
    ///
    /// The class mask carries a one-pixel border, so the trace window is
    /// shifted by +1 and the output anchored back to photo coordinates.
    fn refresh_outlines(&mut self, class: ClassId, roi: Option<Rect>) {
        let (width, height) = self.store.dimensions();
        let params = ExtractParams::default();
        let mask = self.store.pick_mask(class);
        match roi {
            Some(roi) => {
                let window =
                    Rect::at(roi.left() + 1, roi.top() + 1).of_size(roi.width(), roi.height());
                let mut fresh =
                    outline::extract_region(mask, window, (roi.left(), roi.top()), &params);
                self.outlines[class.0].append(&mut fresh);
            }
            None => {
                let window = Rect::at(1, 1).of_size(width, height);
                self.outlines[class.0] =
                    outline::extract_region(mask, window, (0, 0), &params);
            }
        }
    }
}

fn inflate_rect(rect: Rect, by: i32) -> Rect {
    Rect::at(rect.left() - by, rect.top() - by).of_size(
        rect.width() + 2 * by as u32,
        rect.height() + 2 * by as u32,
    )
}

fn union_rect(a: Rect, b: Rect) -> Rect {
    let left = a.left().min(b.left());
    let top = a.top().min(b.top());
    let right = a.right().max(b.right());
    let bottom = a.bottom().max(b.bottom());
    Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32)
}

fn clip_rect(rect: Rect, width: u32, height: u32) -> Rect {
    rect.intersect(Rect::at(0, 0).of_size(width, height))
        .unwrap_or(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
    const DARK_GREEN: Rgb<u8> = Rgb([0, 120, 0]);
    const PINK: Rgb<u8> = Rgb([250, 80, 180]);
    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    /// 60x40 gray photo, a green card on the left, a pink card on the
    /// right.
    fn write_photo(dir: &Path) -> PathBuf {
        let mut photo = RgbImage::new(60, 40);
        for px in photo.pixels_mut() {
            *px = GRAY;
        }
        for y in 5..20 {
            for x in 5..20 {
                photo.put_pixel(x, y, GREEN);
            }
        }
        for y in 10..30 {
            for x in 35..55 {
                photo.put_pixel(x, y, PINK);
            }
        }
        let path = dir.join("crowd.png");
        photo.save(&path).expect("Should write test photo");
        path
    }

    fn test_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.size_limit = 60;
        config.classes = vec!["green".into(), "pink".into()];
        config.color_diff_threshold = 15.0;
        config.size_filter = 3.0;
        config
    }

    fn open_session(dir: &Path) -> Session {
        let photo_path = write_photo(dir);
        Session::open(photo_path, test_config()).expect("Should open session")
    }

    #[test]
    fn test_pick_requires_train_mode() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        assert_eq!(session.mode(), Mode::Inert);
        assert!(session.pick(10, 10).is_none());
        assert_eq!(session.mask_pixels(ClassId(0)), 0);
    }

    #[test]
    fn test_pick_grows_and_traces() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        let roi = session.pick(10, 10).expect("Should grow a region");
        assert_eq!((roi.width(), roi.height()), (15, 15));
        assert_eq!(session.picks_for(ClassId(0)), &[(10, 10)]);
        assert_eq!(session.outlines_for(ClassId(0)).len(), 1);
        assert_eq!(session.mask_pixels(ClassId(0)), 15 * 15);
    }

    #[test]
    fn test_pick_out_of_bounds_is_noop() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        assert!(session.pick(-1, 10).is_none());
        assert!(session.pick(10, 40).is_none());
        assert!(session.pick(60, 10).is_none());
        assert!(session.picks_for(ClassId(0)).is_empty());
        assert_eq!(session.mask_pixels(ClassId(0)), 0);
    }

    #[test]
    fn test_repick_inside_region_is_noop() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");
        assert!(
            session.pick(12, 12).is_none(),
            "A seed inside the region fills nothing"
        );
        assert_eq!(session.picks_for(ClassId(0)).len(), 1);
        assert_eq!(session.outlines_for(ClassId(0)).len(), 1);
    }

    #[test]
    fn test_overlapping_fills_merge_into_one_boundary() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        // a dark green frame around a green core: two fills, one region
        let mut photo = RgbImage::new(40, 40);
        for px in photo.pixels_mut() {
            *px = GRAY;
        }
        for y in 5..25 {
            for x in 5..25 {
                photo.put_pixel(x, y, DARK_GREEN);
            }
        }
        for y in 10..20 {
            for x in 10..20 {
                photo.put_pixel(x, y, GREEN);
            }
        }
        let photo_path = dir.path().join("crowd.png");
        photo.save(&photo_path).expect("Should write test photo");

        let mut config = test_config();
        config.size_limit = 40;
        let mut session = Session::open(photo_path, config).expect("Should open session");
        session.train_class("green").expect("Should enter train mode");

        session.pick(15, 15).expect("Should fill the core");
        assert_eq!(session.outlines_for(ClassId(0)).len(), 1);

        session.pick(6, 6).expect("Should fill the frame");
        assert_eq!(
            session.outlines_for(ClassId(0)).len(),
            1,
            "The frame fill should absorb the core boundary and re-trace as one"
        );
        let merged = &session.outlines_for(ClassId(0))[0];
        assert_eq!(merged.bounding_rect().left(), 5);
        assert_eq!(merged.bounding_rect().width(), 20);
    }

    #[test]
    fn test_adjacent_fills_merge_into_one_boundary() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        // two different greens side by side: the second fill stops exactly
        // where the first one's pixels block it
        let mut photo = RgbImage::new(40, 40);
        for px in photo.pixels_mut() {
            *px = GRAY;
        }
        for y in 10..30 {
            for x in 5..15 {
                photo.put_pixel(x, y, GREEN);
            }
            for x in 15..25 {
                photo.put_pixel(x, y, DARK_GREEN);
            }
        }
        let photo_path = dir.path().join("crowd.png");
        photo.save(&photo_path).expect("Should write test photo");

        let mut config = test_config();
        config.size_limit = 40;
        let mut session = Session::open(photo_path, config).expect("Should open session");
        session.train_class("green").expect("Should enter train mode");

        session.pick(10, 20).expect("Should fill the left strip");
        session.pick(20, 20).expect("Should fill the right strip");
        assert_eq!(
            session.outlines_for(ClassId(0)).len(),
            1,
            "Touching fills form one blob and must trace as one boundary"
        );
        let merged = &session.outlines_for(ClassId(0))[0];
        assert_eq!(merged.bounding_rect().left(), 5);
        assert_eq!(merged.bounding_rect().width(), 20);
    }

    #[test]
    fn test_unpick_removes_region() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");

        let removed = session.unpick(10, 10).expect("Should find the region");
        assert_eq!(removed, ClassId(0));
        assert!(session.picks_for(ClassId(0)).is_empty());
        assert!(session.outlines_for(ClassId(0)).is_empty());
        assert_eq!(session.mask_pixels(ClassId(0)), 0);
    }

    #[test]
    fn test_unpick_searches_every_class() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("pink").expect("Should enter train mode");
        session.pick(40, 20).expect("Should grow a region");
        session.set_mode(Mode::Inert);

        assert_eq!(session.unpick(40, 20), Some(ClassId(1)));
        assert!(session.unpick(2, 2).is_none(), "Nothing at the corner");
    }

    #[test]
    fn test_clear_class() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");
        session.clear_class(ClassId(0));

        assert!(session.picks_for(ClassId(0)).is_empty());
        assert!(session.outlines_for(ClassId(0)).is_empty());
        assert_eq!(session.mask_pixels(ClassId(0)), 0);
    }

    #[test]
    fn test_count_before_train_declines() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        match session.count() {
            Err(CountingError::NotTrained) => {}
            other => panic!("Expected NotTrained, got {other:?}"),
        }
    }

    #[test]
    fn test_train_without_picks_declines() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        match session.train() {
            Err(CountingError::NoSamples) => {}
            other => panic!("Expected NoSamples, got {other:?}"),
        }
    }

    #[test]
    fn test_save_writes_flat_pick_lists() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");
        session.save();

        let raw = fs::read_to_string(session.cache_dir().join(DATA_FILE))
            .expect("Should have written data.json");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("Should be JSON");
        assert_eq!(value["picks"]["green"], serde_json::json!([10, 10]));
        assert_eq!(value["picks"]["pink"], serde_json::json!([]));
    }

    #[test]
    fn test_reopen_restores_session_state() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");
        let mask_pixels = session.mask_pixels(ClassId(0));
        session.save();
        let photo_path = session.photo_path().to_path_buf();
        drop(session);

        let reopened =
            Session::open(photo_path, test_config()).expect("Should reopen session");
        assert_eq!(reopened.picks_for(ClassId(0)), &[(10, 10)]);
        assert_eq!(reopened.mask_pixels(ClassId(0)), mask_pixels);
        assert_eq!(reopened.outlines_for(ClassId(0)).len(), 1);
        assert_eq!(reopened.mode(), Mode::Inert);
    }

    #[test]
    fn test_end_to_end_train_and_count() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let photo_path = write_photo(dir.path());
        let mut config = test_config();
        config.classes = vec!["green".into(), "pink".into(), "yellow".into()];
        // uniform patches cluster to their exact color, so even a tight
        // threshold accepts them
        config.color_diff_threshold = 2.0;
        let mut session = Session::open(photo_path, config).expect("Should open session");

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should fill the green card");
        session.train_class("pink").expect("Should enter train mode");
        session.pick(40, 20).expect("Should fill the pink card");
        session.train().expect("Should train");

        let palette = session.palette().expect("Should hold a palette");
        let gradations = session.config().gradations;
        for class in [ClassId(0), ClassId(1)] {
            let entries = palette.entries_for(class).count();
            assert!(
                entries >= 1 && entries <= gradations,
                "Class {class:?} has {entries} entries"
            );
        }
        assert_eq!(
            palette.entries_for(ClassId(2)).count(),
            0,
            "An untrained class contributes no entries"
        );

        let report = session.count().expect("Should count");
        assert_eq!(report.count_for(ClassId(0)), 1);
        assert_eq!(report.count_for(ClassId(1)), 1);
        assert_eq!(report.count_for(ClassId(2)), 0);
        assert_eq!(session.mode(), Mode::Count);
    }

    #[test]
    fn test_reopen_restores_trained_classifier() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");
        session.train().expect("Should train");
        session.save();
        let photo_path = session.photo_path().to_path_buf();
        drop(session);

        let mut reopened =
            Session::open(photo_path, test_config()).expect("Should reopen session");
        assert!(reopened.is_trained(), "The saved palette should restore");
        assert!(reopened.palette().is_some());
        let report = reopened.count().expect("Should count without retraining");
        assert_eq!(report.count_for(ClassId(0)), 1);
    }

    #[test]
    fn test_reopen_replays_picks_when_mask_file_missing() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut session = open_session(dir.path());

        session.train_class("green").expect("Should enter train mode");
        session.pick(10, 10).expect("Should grow a region");
        let mask_pixels = session.mask_pixels(ClassId(0));
        session.save();
        let photo_path = session.photo_path().to_path_buf();
        let mask_path = session.cache_dir().join("green.mask.png");
        drop(session);
        fs::remove_file(&mask_path).expect("Should delete the cached mask");

        let reopened =
            Session::open(photo_path, test_config()).expect("Should reopen session");
        assert_eq!(
            reopened.mask_pixels(ClassId(0)),
            mask_pixels,
            "Replaying the saved picks should rebuild the same mask"
        );
        assert_eq!(reopened.outlines_for(ClassId(0)).len(), 1);
    }

    #[test]
    fn test_unknown_class_in_data_is_ignored() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let session = open_session(dir.path());
        let cache_dir = session.cache_dir().to_path_buf();
        let photo_path = session.photo_path().to_path_buf();
        drop(session);

        fs::write(
            cache_dir.join(DATA_FILE),
            r#"{"picks":{"mauve":[3,3],"green":[10,10]}}"#,
        )
        .expect("Should plant data.json");

        let session = Session::open(photo_path, test_config()).expect("Should reopen");
        assert_eq!(session.picks_for(ClassId(0)), &[(10, 10)]);
        assert!(session.picks_for(ClassId(1)).is_empty());
    }
}

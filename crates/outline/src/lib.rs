//! # Mask Boundary Tracing Library
//!
//! Traces the external boundaries of binary masks into simplified polygon
//! outlines, and rasterizes outlines back into masks. Built for card
//! counting, where class masks are flat blobs and hole topology never
//! matters.
//!
//! ## Core Features
//!
//! - **External Boundaries Only**: Hole borders are skipped at the source
//! - **Douglas-Peucker Simplification**: Tolerance-bounded point reduction
//! - **Windowed Extraction**: Re-trace only a dirty rectangle of a mask
//! - **Round-Tripping**: Fill an outline back into a mask, or erase it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image::open;
//! use outline::{ExtractParams, extract};
//!
//! let mask = open("mask.png")?.to_luma8();
//! let outlines = extract(&mask, &ExtractParams::default());
//! for outline in &outlines {
//!     println!("{} points, {} px^2", outline.points.len(), outline.area());
//! }
//! # Ok::<(), image::ImageError>(())
//! ```

pub mod extract;
pub mod raster;
pub mod types;

// Re-exports for convenience
pub use extract::{ExtractParams, extract, extract_region};
pub use raster::{fill_outline, rasterize};
pub use types::Outline;

//! # Interactive Card Counting Library
//!
//! A trainable counting engine for photos of colored voting cards.
//! The operator picks a few sample cards per color class, the library
//! clusters the picked pixels into a Lab palette, and every photo pixel
//! is then classified against that palette so connected card regions can
//! be traced and counted.
//!
//! ## Core Features
//!
//! - **Interactive Training**: flood-fill picks accumulate per-class color masks
//! - **Palette Clustering**: k-means condenses the picked pixels into a few Lab tones per class
//! - **Nearest-Neighbor Classification**: each pixel is labeled with its closest palette entry
//! - **Noise-Filtered Counting**: class masks are opened, traced, and filtered by area before counting
//! - **Session Persistence**: picks, masks, and the trained palette survive restarts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use counting::{Session, SessionConfig};
//!
//! // Open a photo; previous picks and palettes are restored if present
//! let mut session = Session::open("crowd.jpg", SessionConfig::default())?;
//!
//! // Teach it what a green card looks like
//! session.train_class("green")?;
//! session.pick(120, 88);
//!
//! // Cluster the samples and count the whole photo
//! session.train()?;
//! let report = session.count()?;
//! for class in &report.classes {
//!     println!("{}: {}", class.name, class.count);
//! }
//!
//! session.save();
//! # Ok::<(), counting::CountingError>(())
//! ```

use serde::{Deserialize, Serialize};

// Core modules
pub mod classifier;
pub mod color;
pub mod config;
pub mod counter;
pub mod error;
pub mod grower;
pub mod matrix;
pub mod session;
pub mod store;
pub mod trainer;

// Re-exports for convenience
pub use classifier::NearestIndex;
pub use config::SessionConfig;
pub use counter::{ClassCount, CountReport};
pub use error::{CountingError, Result};
pub use session::{Mode, Session};
pub use trainer::{Palette, PaletteEntry};

/// Index of a color class in the configured class list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ClassId(pub usize);

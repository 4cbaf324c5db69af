//! Symmetric circle-grid detection and calibration board types.
//!
//! The detector works on a plain grayscale view ([`GrayImageView`]) so it can
//! be fed from any image container:
//!
//! ```
//! use framewire_grid::{find_circles_grid, CirclesGridParams, GrayImage, PatternSize};
//!
//! let img = GrayImage::new(64, 64, 255);
//! let pattern = PatternSize::new(4, 3).unwrap();
//! assert!(find_circles_grid(&img.view(), pattern, &CirclesGridParams::default()).is_err());
//! ```

mod blobs;
mod board;
mod grid;
mod homography;
mod image;

pub use blobs::{closest_to_median_area, label_dark_blobs, Blob, BlobBounds, BlobFilter};
pub use board::{BoardError, CalibrationBoard, ImagePosition, PatternSize};
pub use grid::{find_circles_grid, CirclesGridParams, GridError};
pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use image::{histogram, otsu_threshold, GrayImage, GrayImageView};

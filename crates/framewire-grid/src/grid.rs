//! Symmetric circle-grid search.

use log::debug;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::blobs::{closest_to_median_area, label_dark_blobs, Blob, BlobFilter};
use crate::board::PatternSize;
use crate::homography::{estimate_homography, homography_from_4pt, Homography};
use crate::image::{otsu_threshold, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("image buffer does not match {width}x{height}")]
    InvalidImage { width: usize, height: usize },
    #[error("image has a single intensity level")]
    FlatImage,
    #[error("found {found} circle candidates, need {needed}")]
    TooFewBlobs { found: usize, needed: usize },
    #[error("candidates do not form a {width}x{height} grid")]
    NoGrid { width: usize, height: usize },
}

/// Detector tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CirclesGridParams {
    pub blobs: BlobFilter,
    /// Match radius as a fraction of the local grid spacing.
    pub match_tolerance: f32,
}

impl Default for CirclesGridParams {
    fn default() -> Self {
        Self {
            blobs: BlobFilter::default(),
            match_tolerance: 0.4,
        }
    }
}

/// Locate a symmetric grid of dark circles.
///
/// Returns `pattern.count()` centres, row-major (`pattern.width` per row).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(w = img.width, h = img.height))
)]
pub fn find_circles_grid(
    img: &GrayImageView<'_>,
    pattern: PatternSize,
    params: &CirclesGridParams,
) -> Result<Vec<Point2<f32>>, GridError> {
    if !img.is_valid() || img.width == 0 || img.height == 0 {
        return Err(GridError::InvalidImage {
            width: img.width,
            height: img.height,
        });
    }
    let threshold = otsu_threshold(img).ok_or(GridError::FlatImage)?;

    let candidates: Vec<Blob> = label_dark_blobs(img, threshold)
        .into_iter()
        .filter(|b| params.blobs.accepts(b))
        .collect();
    let needed = pattern.count();
    debug!(
        "threshold {threshold}, {} candidates for {}x{}",
        candidates.len(),
        pattern.width,
        pattern.height
    );
    if candidates.len() < needed {
        return Err(GridError::TooFewBlobs {
            found: candidates.len(),
            needed,
        });
    }
    let centers: Vec<Point2<f32>> = closest_to_median_area(candidates, needed)
        .into_iter()
        .map(|b| b.center)
        .collect();

    let (w, h) = ((pattern.width - 1) as f32, (pattern.height - 1) as f32);
    // Grid corners in cyclic order, for either assignment of rows to edges.
    let orientations = [
        [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ],
        [
            Point2::new(0.0, 0.0),
            Point2::new(0.0, h),
            Point2::new(w, h),
            Point2::new(w, 0.0),
        ],
    ];

    // Diagonal extremes tie along a whole edge near 45 degrees, axis
    // extremes near 0; one of the two always isolates the corners.
    for axes in [CornerAxes::Diagonal, CornerAxes::Axis] {
        let corners = outer_corners(&centers, axes);
        for grid_corners in &orientations {
            let Some(h0) = homography_from_4pt(grid_corners, &corners) else {
                continue;
            };
            if let Some(points) = fit_grid(h0, &centers, pattern, params.match_tolerance) {
                return Ok(points);
            }
        }
        debug!("no grid from {axes:?} corners");
    }
    Err(GridError::NoGrid {
        width: pattern.width,
        height: pattern.height,
    })
}

/// Pair of projections whose extremes pick the outer corners.
#[derive(Clone, Copy, Debug)]
enum CornerAxes {
    /// `x + y` and `x - y`.
    Diagonal,
    /// `y` and `x`.
    Axis,
}

impl CornerAxes {
    fn keys(self, p: &Point2<f32>) -> (f32, f32) {
        match self {
            Self::Diagonal => (p.x + p.y, p.x - p.y),
            Self::Axis => (p.y, p.x),
        }
    }
}

/// Outer corners in cyclic order: min `u`, max `v`, max `u`, min `v`.
///
/// Ties on one key are broken by the other, so the pick is deterministic.
fn outer_corners(points: &[Point2<f32>], axes: CornerAxes) -> [Point2<f32>; 4] {
    let pick = |rank: &dyn Fn(&Point2<f32>) -> (f32, f32)| {
        let mut best = points[0];
        for p in &points[1..] {
            let (a, b) = (rank(p), rank(&best));
            if a.0 > b.0 || (a.0 == b.0 && a.1 > b.1) {
                best = *p;
            }
        }
        best
    };
    let key = |p: &Point2<f32>| axes.keys(p);
    [
        pick(&|p| {
            let (u, v) = key(p);
            (-u, -v)
        }),
        pick(&|p| {
            let (u, v) = key(p);
            (v, -u)
        }),
        pick(&|p| {
            let (u, v) = key(p);
            (u, v)
        }),
        pick(&|p| {
            let (u, v) = key(p);
            (-v, u)
        }),
    ]
}

fn grid_nodes(pattern: PatternSize) -> impl Iterator<Item = Point2<f32>> {
    (0..pattern.height)
        .flat_map(move |r| (0..pattern.width).map(move |c| Point2::new(c as f32, r as f32)))
}

/// Nearest unused centre for every projected node, `None` where nothing lies
/// within `tolerance` times the local spacing.
fn match_nodes(
    hmg: &Homography,
    centers: &[Point2<f32>],
    pattern: PatternSize,
    tolerance: f32,
) -> Vec<Option<usize>> {
    let mut used = vec![false; centers.len()];
    grid_nodes(pattern)
        .map(|node| {
            let p = hmg.apply(node);
            let dx = (hmg.apply(node + Vector2::new(1.0, 0.0)) - p).norm();
            let dy = (hmg.apply(node + Vector2::new(0.0, 1.0)) - p).norm();
            let radius = tolerance * 0.5 * (dx + dy);

            let best = centers
                .iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .map(|(i, c)| (i, (*c - p).norm()))
                .filter(|(_, d)| d.is_finite() && *d <= radius)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            if let Some(i) = best {
                used[i] = true;
            }
            best
        })
        .collect()
}

fn fit_grid(
    mut hmg: Homography,
    centers: &[Point2<f32>],
    pattern: PatternSize,
    tolerance: f32,
) -> Option<Vec<Point2<f32>>> {
    let nodes: Vec<Point2<f32>> = grid_nodes(pattern).collect();
    let mut matches = match_nodes(&hmg, centers, pattern, tolerance);

    // Refine from whatever matched, then match again.
    for _ in 0..2 {
        let (src, dst): (Vec<_>, Vec<_>) = nodes
            .iter()
            .zip(&matches)
            .filter_map(|(n, m)| m.map(|i| (*n, centers[i])))
            .unzip();
        hmg = estimate_homography(&src, &dst)?;
        matches = match_nodes(&hmg, centers, pattern, tolerance);
        if matches.iter().all(Option::is_some) {
            return matches.into_iter().map(|m| m.map(|i| centers[i])).collect();
        }
    }
    None
}

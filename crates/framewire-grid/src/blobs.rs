//! Dark blob extraction: threshold, label, filter.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::GrayImageView;

/// Axis-aligned pixel bounds, inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobBounds {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl BlobBounds {
    fn at(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// One connected component of foreground pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub area: usize,
    pub center: Point2<f32>,
    pub bounds: BlobBounds,
    pub touches_border: bool,
}

impl Blob {
    /// `area / bbox area`; about pi/4 for a filled disc.
    pub fn fill(&self) -> f32 {
        self.area as f32 / (self.bounds.width() * self.bounds.height()) as f32
    }

    /// Long side over short side of the bounding box.
    pub fn aspect(&self) -> f32 {
        let (w, h) = (self.bounds.width() as f32, self.bounds.height() as f32);
        w.max(h) / w.min(h)
    }
}

/// Shape limits a blob must satisfy to count as a circle candidate.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobFilter {
    pub min_area: usize,
    pub max_area: usize,
    pub max_aspect: f32,
    pub min_fill: f32,
    pub max_fill: f32,
}

impl Default for BlobFilter {
    fn default() -> Self {
        Self {
            min_area: 9,
            max_area: 40_000,
            max_aspect: 3.0,
            min_fill: 0.5,
            max_fill: 0.95,
        }
    }
}

impl BlobFilter {
    pub fn accepts(&self, blob: &Blob) -> bool {
        !blob.touches_border
            && (self.min_area..=self.max_area).contains(&blob.area)
            && blob.aspect() <= self.max_aspect
            && (self.min_fill..=self.max_fill).contains(&blob.fill())
    }
}

/// 8-connected labelling of pixels `<= threshold`.
pub fn label_dark_blobs(img: &GrayImageView<'_>, threshold: u8) -> Vec<Blob> {
    let (w, h) = (img.width, img.height);
    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut blobs = Vec::new();

    for start in 0..w * h {
        if visited[start] || img.data[start] > threshold {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let (mut area, mut sx, mut sy) = (0usize, 0f64, 0f64);
        let mut bounds = BlobBounds::at(start % w, start / w);
        let mut touches_border = false;

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            area += 1;
            sx += x as f64;
            sy += y as f64;
            bounds.include(x, y);
            touches_border |= x == 0 || y == 0 || x + 1 == w || y + 1 == h;

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if !visited[n] && img.data[n] <= threshold {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        blobs.push(Blob {
            area,
            center: Point2::new((sx / area as f64) as f32, (sy / area as f64) as f32),
            bounds,
            touches_border,
        });
    }
    blobs
}

/// Keep the `n` blobs whose areas are closest to the median area.
pub fn closest_to_median_area(mut blobs: Vec<Blob>, n: usize) -> Vec<Blob> {
    if blobs.len() <= n {
        return blobs;
    }
    let mut areas: Vec<usize> = blobs.iter().map(|b| b.area).collect();
    areas.sort_unstable();
    let median = areas[areas.len() / 2];
    blobs.sort_by_key(|b| b.area.abs_diff(median));
    blobs.truncate(n);
    blobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::GrayImage;

    fn disc(img: &mut GrayImage, cx: f32, cy: f32, r: f32) {
        for y in 0..img.height {
            for x in 0..img.width {
                let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                if dx * dx + dy * dy <= r * r {
                    img.set(x, y, 0);
                }
            }
        }
    }

    #[test]
    fn labels_separate_discs() {
        let mut img = GrayImage::new(60, 30, 255);
        disc(&mut img, 15.0, 15.0, 5.0);
        disc(&mut img, 42.0, 14.0, 6.0);
        let blobs = label_dark_blobs(&img.view(), 127);
        assert_eq!(blobs.len(), 2);
        let left = blobs.iter().find(|b| b.center.x < 30.0).unwrap();
        let right = blobs.iter().find(|b| b.center.x > 30.0).unwrap();
        assert!((left.center.x - 15.0).abs() < 0.01);
        assert!((right.center.y - 14.0).abs() < 0.01);
        assert!(blobs.iter().all(|b| BlobFilter::default().accepts(b)));
    }

    #[test]
    fn diagonal_pixels_connect() {
        let mut img = GrayImage::new(5, 5, 255);
        img.set(1, 1, 0);
        img.set(2, 2, 0);
        img.set(3, 3, 0);
        let blobs = label_dark_blobs(&img.view(), 10);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 3);
        assert_eq!(blobs[0].bounds.width(), 3);
    }

    #[test]
    fn filter_rejects_border_squares_and_lines() {
        let mut img = GrayImage::new(40, 40, 255);
        // Square: fill 1.0.
        for y in 5..12 {
            for x in 5..12 {
                img.set(x, y, 0);
            }
        }
        // Line: aspect 10.
        for x in 15..35 {
            img.set(x, 20, 0);
            img.set(x, 21, 0);
        }
        disc(&mut img, 0.0, 35.0, 4.0);
        let filter = BlobFilter::default();
        let blobs = label_dark_blobs(&img.view(), 127);
        assert_eq!(blobs.len(), 3);
        assert!(blobs.iter().all(|b| !filter.accepts(b)));
    }

    #[test]
    fn median_selection_drops_outliers() {
        let blob = |area| Blob {
            area,
            center: Point2::origin(),
            bounds: BlobBounds::at(0, 0),
            touches_border: false,
        };
        let blobs = vec![blob(100), blob(12), blob(98), blob(103), blob(900)];
        let kept = closest_to_median_area(blobs, 3);
        let mut areas: Vec<usize> = kept.iter().map(|b| b.area).collect();
        areas.sort_unstable();
        assert_eq!(areas, vec![98, 100, 103]);
    }
}

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("pattern must be at least 2x2, got {width}x{height}")]
    InvalidPattern { width: usize, height: usize },
    #[error("square size must be finite and positive, got {0}")]
    InvalidSquareSize(f64),
    #[error("expected {expected} image points, got {got}")]
    PointCount { expected: usize, got: usize },
}

/// Circles per row (`width`) and number of rows (`height`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSize {
    pub width: usize,
    pub height: usize,
}

impl PatternSize {
    pub fn new(width: usize, height: usize) -> Result<Self, BoardError> {
        if width < 2 || height < 2 {
            return Err(BoardError::InvalidPattern { width, height });
        }
        Ok(Self { width, height })
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.width * self.height
    }
}

/// Planar calibration target: model geometry plus, after a detection, the
/// matching image points (same row-major order).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBoard {
    pattern: PatternSize,
    square_size: f64,
    object_points: Vec<Point3<f64>>,
    image_points: Option<Vec<Point2<f32>>>,
}

impl CalibrationBoard {
    pub fn new(pattern: PatternSize, square_size: f64) -> Result<Self, BoardError> {
        if !square_size.is_finite() || square_size <= 0.0 {
            return Err(BoardError::InvalidSquareSize(square_size));
        }
        let object_points = (0..pattern.height)
            .flat_map(|r| {
                (0..pattern.width)
                    .map(move |c| Point3::new(c as f64 * square_size, r as f64 * square_size, 0.0))
            })
            .collect();
        Ok(Self {
            pattern,
            square_size,
            object_points,
            image_points: None,
        })
    }

    pub fn pattern(&self) -> PatternSize {
        self.pattern
    }

    pub fn square_size(&self) -> f64 {
        self.square_size
    }

    pub fn object_points(&self) -> &[Point3<f64>] {
        &self.object_points
    }

    pub fn image_points(&self) -> Option<&[Point2<f32>]> {
        self.image_points.as_deref()
    }

    pub fn set_image_points(&mut self, points: Vec<Point2<f32>>) -> Result<(), BoardError> {
        if points.len() != self.pattern.count() {
            return Err(BoardError::PointCount {
                expected: self.pattern.count(),
                got: points.len(),
            });
        }
        self.image_points = Some(points);
        Ok(())
    }

    pub fn with_image_points(mut self, points: Vec<Point2<f32>>) -> Result<Self, BoardError> {
        self.set_image_points(points)?;
        Ok(self)
    }
}

/// Where a detected pattern sits in the frame.
///
/// `x`, `y` are the pattern centre mapped to `[-1, 1]` (image centre is 0),
/// `size` is the mean pattern diagonal over the image diagonal and
/// `rotation` is the angle of the first row in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePosition {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub rotation: f32,
}

impl ImagePosition {
    /// `points` must be row-major for `pattern`.
    pub fn from_points(
        points: &[Point2<f32>],
        pattern: PatternSize,
        image_width: usize,
        image_height: usize,
    ) -> Option<Self> {
        if points.len() != pattern.count() || image_width == 0 || image_height == 0 {
            return None;
        }
        let n = points.len() as f32;
        let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let (cx, cy) = (sx / n, sy / n);
        let (iw, ih) = (image_width as f32, image_height as f32);

        let first = points[0];
        let row_end = points[pattern.width - 1];
        let col_end = points[(pattern.height - 1) * pattern.width];
        let last = points[points.len() - 1];
        let diagonal = 0.5 * ((last - first).norm() + (col_end - row_end).norm());

        Some(Self {
            x: 2.0 * cx / iw - 1.0,
            y: 2.0 * cy / ih - 1.0,
            size: diagonal / iw.hypot(ih),
            rotation: (row_end.y - first.y).atan2(row_end.x - first.x),
        })
    }
}

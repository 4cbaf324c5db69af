use crate::grid::{
    find_circles_grid, BoardError, CalibrationBoard, CirclesGridParams, GrayImageView, GridError,
    ImagePosition, PatternSize,
};
use nalgebra::Point2;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A located grid: the board with its image points and where it sits.
#[derive(Clone, Debug, Serialize)]
pub struct GridDetection {
    pub board: CalibrationBoard,
    pub position: Option<ImagePosition>,
}

impl GridDetection {
    pub fn points(&self) -> &[Point2<f32>] {
        self.board.image_points().unwrap_or_default()
    }
}

/// Convert an `image::GrayImage` into the detector's view type.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Copy a raw row-major buffer into an `image::GrayImage`.
pub fn gray_image_from_slice(
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<::image::GrayImage, DetectError> {
    let expected = width as usize * height as usize;
    ::image::GrayImage::from_raw(width, height, data.to_vec()).ok_or(
        DetectError::InvalidGrayBuffer {
            expected,
            got: data.len(),
        },
    )
}

/// Run the circle-grid detector and build the calibration board.
///
/// Set `inverse` for light circles on a dark background.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(img, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_circles_grid(
    img: &::image::GrayImage,
    pattern: PatternSize,
    square_size: f64,
    inverse: bool,
    params: &CirclesGridParams,
) -> Result<GridDetection, DetectError> {
    let board = CalibrationBoard::new(pattern, square_size)?;
    let points = if inverse {
        let mut inverted = img.clone();
        ::image::imageops::invert(&mut inverted);
        find_circles_grid(&gray_view(&inverted), pattern, params)?
    } else {
        find_circles_grid(&gray_view(img), pattern, params)?
    };
    let position = ImagePosition::from_points(
        &points,
        pattern,
        img.width() as usize,
        img.height() as usize,
    );
    Ok(GridDetection {
        board: board.with_image_points(points)?,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_buffers_are_checked() {
        assert!(gray_image_from_slice(2, 2, &[0; 4]).is_ok());
        assert!(matches!(
            gray_image_from_slice(3, 2, &[0; 4]),
            Err(DetectError::InvalidGrayBuffer {
                expected: 6,
                got: 4
            })
        ));
    }

    #[test]
    fn detects_a_rendered_grid() {
        let img = ::image::GrayImage::from_fn(120, 100, |x, y| {
            let near = (0..2).any(|r| {
                (0..3).any(|c| {
                    let dx = x as f32 - (30.0 + 30.0 * c as f32);
                    let dy = y as f32 - (35.0 + 30.0 * r as f32);
                    dx * dx + dy * dy <= 49.0
                })
            });
            ::image::Luma([if near { 240 } else { 10 }])
        });
        let pattern = PatternSize::new(3, 2).unwrap();
        let params = CirclesGridParams::default();
        assert!(detect_circles_grid(&img, pattern, 1.0, false, &params).is_err());

        let found = detect_circles_grid(&img, pattern, 1.0, true, &params).unwrap();
        assert_eq!(found.points().len(), 6);
        assert!((found.points()[4].x - 60.0).abs() < 0.5);
        assert!((found.points()[4].y - 65.0).abs() < 0.5);
        assert!(found.position.is_some());
    }
}

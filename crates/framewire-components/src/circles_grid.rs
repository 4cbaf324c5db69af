//! Circle-grid calibration pattern finder.

use std::time::{Duration, Instant};

use framewire_core::{
    enum_translator, Component, ComponentError, DataStreamIn, DataStreamOut, Interface, Property,
    PropertyAccess,
};
use framewire_grid::{
    find_circles_grid, CalibrationBoard, CirclesGridParams, GrayImageView, ImagePosition,
    PatternSize,
};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use log::{debug, warn};
use nalgebra::Point2;

enum_translator! {
    /// Resampling used when `scale_factor` sub-samples the input.
    pub enum Interpolation {
        Nearest = ("NEAREST", 0),
        Linear = ("LINEAR", 1),
        Cubic = ("CUBIC", 2),
        Area = ("AREA", 3),
        Lanczos4 = ("LANCZOS4", 4),
    }
}

impl Interpolation {
    pub fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Linear | Interpolation::Area => FilterType::Triangle,
            Interpolation::Cubic => FilterType::CatmullRom,
            Interpolation::Lanczos4 => FilterType::Lanczos3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridHandler {
    NewImage,
}

/// Finds a symmetric circle grid in every image arriving on `in_img`.
pub struct CvFindCirclesGrid {
    name: String,
    width: Property<usize>,
    height: Property<usize>,
    square_size: Property<f64>,
    inverse: Property<bool>,
    interpolation_type: Property<Interpolation>,
    scale_factor: Property<f64>,

    in_img: DataStreamIn<DynamicImage>,
    out_chessboard: DataStreamOut<CalibrationBoard>,
    out_image_position: DataStreamOut<ImagePosition>,
    out_img: DataStreamOut<DynamicImage>,

    params: CirclesGridParams,
    board: Option<CalibrationBoard>,
    corners: Vec<Point2<f32>>,
    last_detection: Option<Duration>,
}

impl CvFindCirclesGrid {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            width: Property::new("width", 4),
            height: Property::new("height", 11),
            square_size: Property::new("square_size", 0.02),
            inverse: Property::new("inverse", false),
            interpolation_type: Property::new("interpolation_type", Interpolation::Linear),
            scale_factor: Property::new("scale_factor", 1.0),
            in_img: DataStreamIn::new(),
            out_chessboard: DataStreamOut::new(),
            out_image_position: DataStreamOut::new(),
            out_img: DataStreamOut::new(),
            params: CirclesGridParams::default(),
            board: None,
            corners: Vec::new(),
            last_detection: None,
        }
    }

    pub fn params(&self) -> &CirclesGridParams {
        &self.params
    }

    pub fn set_params(&mut self, params: CirclesGridParams) {
        self.params = params;
    }

    /// Board for the current `width`, `height` and `square_size`.
    pub fn board(&self) -> Option<&CalibrationBoard> {
        self.board.as_ref()
    }

    /// Centres found in the last successful detection, in source pixels.
    pub fn corners(&self) -> &[Point2<f32>] {
        &self.corners
    }

    pub fn last_detection(&self) -> Option<Duration> {
        self.last_detection
    }

    fn build_board(&self) -> Result<CalibrationBoard, ComponentError> {
        let pattern = PatternSize::new(*self.width, *self.height)
            .map_err(|e| ComponentError::Config(e.to_string()))?;
        CalibrationBoard::new(pattern, *self.square_size)
            .map_err(|e| ComponentError::Config(e.to_string()))
    }

    /// Gray, optionally inverted and sub-sampled copy of `img`.
    fn prepare_gray(&self, img: &DynamicImage) -> GrayImage {
        let mut gray = img.to_luma8();
        if *self.inverse {
            imageops::invert(&mut gray);
        }
        let scale = *self.scale_factor;
        if scale > 1.0 && gray.width() > 0 && gray.height() > 0 {
            let w = ((gray.width() as f64 / scale).round() as u32).max(1);
            let h = ((gray.height() as f64 / scale).round() as u32).max(1);
            gray = imageops::resize(&gray, w, h, self.interpolation_type.filter());
        }
        gray
    }

    fn on_new_image(&mut self) -> Result<(), ComponentError> {
        let Some(img) = self.in_img.read() else {
            return Ok(());
        };
        let work = self.prepare_gray(&img);

        match self.board.clone() {
            Some(board) => self.detect(&img, &work, board)?,
            None => warn!("{}: no valid board, skipping detection", self.name),
        }
        self.out_img.write(DynamicImage::ImageLuma8(work));
        Ok(())
    }

    fn detect(
        &mut self,
        src: &DynamicImage,
        work: &GrayImage,
        board: CalibrationBoard,
    ) -> Result<(), ComponentError> {
        let view = GrayImageView {
            width: work.width() as usize,
            height: work.height() as usize,
            data: work.as_raw(),
        };
        let pattern = board.pattern();

        let started = Instant::now();
        let found = find_circles_grid(&view, pattern, &self.params);
        let elapsed = started.elapsed();
        self.last_detection = Some(elapsed);

        let mut points = match found {
            Ok(points) => points,
            Err(err) => {
                debug!("{}: grid not found in {:?}: {err}", self.name, elapsed);
                return Ok(());
            }
        };
        debug!("{}: grid found in {:?}", self.name, elapsed);

        // Pixel centres back to source resolution.
        let sx = src.width() as f32 / work.width() as f32;
        let sy = src.height() as f32 / work.height() as f32;
        for p in &mut points {
            p.x = (p.x + 0.5) * sx - 0.5;
            p.y = (p.y + 0.5) * sy - 0.5;
        }

        let (width, height) = (src.width() as usize, src.height() as usize);
        let position = ImagePosition::from_points(&points, pattern, width, height);
        let board = board
            .with_image_points(points.clone())
            .map_err(|e| ComponentError::Failed(e.to_string()))?;
        self.corners = points;

        self.out_chessboard.write(board);
        if let Some(position) = position {
            self.out_image_position.write(position);
        }
        Ok(())
    }
}

impl Component for CvFindCirclesGrid {
    type Handler = GridHandler;

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&mut self) -> Vec<&mut dyn PropertyAccess> {
        vec![
            &mut self.width as &mut dyn PropertyAccess,
            &mut self.height,
            &mut self.square_size,
            &mut self.inverse,
            &mut self.interpolation_type,
            &mut self.scale_factor,
        ]
    }

    fn prepare_interface(
        &mut self,
        iface: &mut Interface<GridHandler>,
    ) -> Result<(), ComponentError> {
        iface.register_stream("in_img", &self.in_img)?;
        iface.register_handler("onNewImage", GridHandler::NewImage)?;
        iface.add_dependency("onNewImage", Some("in_img"))?;

        iface.register_stream("out_chessboard", &self.out_chessboard)?;
        iface.register_stream("out_imagePosition", &self.out_image_position)?;
        iface.register_stream("out_img", &self.out_img)?;
        Ok(())
    }

    fn on_init(&mut self) -> Result<(), ComponentError> {
        self.board = Some(self.build_board()?);
        self.corners.clear();
        Ok(())
    }

    fn handle(&mut self, handler: GridHandler) -> Result<(), ComponentError> {
        match handler {
            GridHandler::NewImage => self.on_new_image(),
        }
    }

    fn property_changed(&mut self, name: &str) {
        if !matches!(name, "width" | "height" | "square_size") {
            return;
        }
        match self.build_board() {
            Ok(board) => self.board = Some(board),
            Err(err) => {
                warn!("{}: {err}", self.name);
                self.board = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_codes_follow_the_usual_constants() {
        assert_eq!(Interpolation::from_code(3), Some(Interpolation::Area));
        assert_eq!(Interpolation::from_code(2), Some(Interpolation::Cubic));
        assert_eq!(Interpolation::from_label("lanczos4"), Some(Interpolation::Lanczos4));
        assert_eq!(Interpolation::Linear.filter(), FilterType::Triangle);
    }

    #[test]
    fn invalid_geometry_fails_init() {
        let mut finder = CvFindCirclesGrid::new("grid");
        finder.width.set(1);
        assert!(matches!(finder.on_init(), Err(ComponentError::Config(_))));
        finder.width.set(3);
        finder.on_init().unwrap();
        assert_eq!(finder.board().unwrap().object_points().len(), 33);
    }

    #[test]
    fn geometry_changes_rebuild_the_board() {
        let mut finder = CvFindCirclesGrid::new("grid");
        finder.on_init().unwrap();
        finder.square_size.set(0.5);
        finder.property_changed("square_size");
        assert_eq!(finder.board().unwrap().square_size(), 0.5);

        finder.height.set(0);
        finder.property_changed("height");
        assert!(finder.board().is_none());
    }
}

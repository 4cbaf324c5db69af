//! OpenCV `FileStorage` compatible matrix files.
//!
//! Only what an image dump needs: one `!!opencv-matrix` node per document, in
//! YAML (`%YAML:1.0`) or XML (`<opencv_storage>`), optionally gzip-wrapped.
//! Colour images are stored in BGR(A) channel order, which is what OpenCV
//! readers expect.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use image::DynamicImage;

use crate::error::WriteError;

const VALUES_PER_LINE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageSyntax {
    Yaml,
    Xml,
}

/// Structured output selected by a format string such as `yml` or `xml.gz`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageKind {
    pub syntax: StorageSyntax,
    pub gzip: bool,
}

impl StorageKind {
    /// `None` for formats that belong to the image encoder.
    pub fn from_format(format: &str) -> Option<Self> {
        let format = format.trim().to_ascii_lowercase();
        let (base, gzip) = match format.strip_suffix(".gz") {
            Some(base) => (base, true),
            None => (format.as_str(), false),
        };
        let syntax = match base {
            "yaml" | "yml" => StorageSyntax::Yaml,
            "xml" => StorageSyntax::Xml,
            _ => return None,
        };
        Some(Self { syntax, gzip })
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Elements {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

/// Dense matrix as OpenCV names it: rows, cols and a `dt` type string.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: u32,
    cols: u32,
    channels: usize,
    elements: Elements,
}

fn to_bgr<T>(mut data: Vec<T>, channels: usize) -> Vec<T> {
    if channels >= 3 {
        for px in data.chunks_exact_mut(channels) {
            px.swap(0, 2);
        }
    }
    data
}

impl Matrix {
    pub fn from_image(img: &DynamicImage) -> Self {
        let (cols, rows) = (img.width(), img.height());
        let (channels, elements) = match img {
            DynamicImage::ImageLuma8(b) => (1, Elements::U8(b.as_raw().clone())),
            DynamicImage::ImageLumaA8(b) => (2, Elements::U8(b.as_raw().clone())),
            DynamicImage::ImageRgb8(b) => (3, Elements::U8(to_bgr(b.as_raw().clone(), 3))),
            DynamicImage::ImageRgba8(b) => (4, Elements::U8(to_bgr(b.as_raw().clone(), 4))),
            DynamicImage::ImageLuma16(b) => (1, Elements::U16(b.as_raw().clone())),
            DynamicImage::ImageLumaA16(b) => (2, Elements::U16(b.as_raw().clone())),
            DynamicImage::ImageRgb16(b) => (3, Elements::U16(to_bgr(b.as_raw().clone(), 3))),
            DynamicImage::ImageRgba16(b) => (4, Elements::U16(to_bgr(b.as_raw().clone(), 4))),
            DynamicImage::ImageRgb32F(b) => (3, Elements::F32(to_bgr(b.as_raw().clone(), 3))),
            DynamicImage::ImageRgba32F(b) => (4, Elements::F32(to_bgr(b.as_raw().clone(), 4))),
            other => (3, Elements::U8(to_bgr(other.to_rgb8().into_raw(), 3))),
        };
        Self {
            rows,
            cols,
            channels,
            elements,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// OpenCV element type string: `u`, `3u`, `w`, `4f`, ...
    pub fn dt(&self) -> String {
        let depth = match self.elements {
            Elements::U8(_) => 'u',
            Elements::U16(_) => 'w',
            Elements::F32(_) => 'f',
        };
        if self.channels == 1 {
            depth.to_string()
        } else {
            format!("{}{}", self.channels, depth)
        }
    }

    fn values(&self) -> Vec<String> {
        match &self.elements {
            Elements::U8(v) => v.iter().map(u8::to_string).collect(),
            Elements::U16(v) => v.iter().map(u16::to_string).collect(),
            Elements::F32(v) => v.iter().map(|&x| format_float(x)).collect(),
        }
    }

    /// A complete `%YAML:1.0` document with the matrix under `key`.
    pub fn to_yaml(&self, key: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "%YAML:1.0");
        let _ = writeln!(out, "---");
        let _ = writeln!(out, "{key}: !!opencv-matrix");
        let _ = writeln!(out, "   rows: {}", self.rows);
        let _ = writeln!(out, "   cols: {}", self.cols);
        let _ = writeln!(out, "   dt: {}", self.dt());
        let lines: Vec<String> = self
            .values()
            .chunks(VALUES_PER_LINE)
            .map(|chunk| chunk.join(", "))
            .collect();
        if lines.is_empty() {
            let _ = writeln!(out, "   data: []");
        } else {
            let _ = writeln!(out, "   data: [ {} ]", lines.join(",\n       "));
        }
        out
    }

    /// A complete `<opencv_storage>` document with the matrix under `key`.
    pub fn to_xml(&self, key: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "<?xml version=\"1.0\"?>");
        let _ = writeln!(out, "<opencv_storage>");
        let _ = writeln!(out, "<{key} type_id=\"opencv-matrix\">");
        let _ = writeln!(out, "  <rows>{}</rows>", self.rows);
        let _ = writeln!(out, "  <cols>{}</cols>", self.cols);
        let _ = writeln!(out, "  <dt>{}</dt>", self.dt());
        let lines: Vec<String> = self
            .values()
            .chunks(VALUES_PER_LINE)
            .map(|chunk| chunk.join(" "))
            .collect();
        let _ = writeln!(out, "  <data>\n    {}</data></{key}>", lines.join("\n    "));
        let _ = writeln!(out, "</opencv_storage>");
        out
    }
}

/// `%.8e` with a signed two-digit exponent; `.Nan` / `.Inf` like OpenCV.
fn format_float(x: f32) -> String {
    if x.is_nan() {
        return ".Nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { ".Inf" } else { "-.Inf" }.to_string();
    }
    let s = format!("{x:.8e}");
    match s.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        _ => s,
    }
}

fn write_bytes(path: &Path, bytes: &[u8], gzip: bool) -> io::Result<()> {
    let file = BufWriter::new(File::create(path)?);
    if gzip {
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(bytes)?;
        enc.finish()?.flush()
    } else {
        let mut file = file;
        file.write_all(bytes)?;
        file.flush()
    }
}

/// Store `img` as a matrix named `key` at `path`.
pub fn write_storage(
    path: &Path,
    kind: StorageKind,
    key: &str,
    img: &DynamicImage,
) -> Result<(), WriteError> {
    let matrix = Matrix::from_image(img);
    let text = match kind.syntax {
        StorageSyntax::Yaml => matrix.to_yaml(key),
        StorageSyntax::Xml => matrix.to_xml(key),
    };
    write_bytes(path, text.as_bytes(), kind.gzip).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage};
    use std::io::Read;

    #[test]
    fn format_strings_select_syntax() {
        assert_eq!(
            StorageKind::from_format("yml"),
            Some(StorageKind {
                syntax: StorageSyntax::Yaml,
                gzip: false
            })
        );
        assert_eq!(
            StorageKind::from_format("XML.gz"),
            Some(StorageKind {
                syntax: StorageSyntax::Xml,
                gzip: true
            })
        );
        assert_eq!(StorageKind::from_format("png"), None);
        assert_eq!(StorageKind::from_format("gz"), None);
    }

    #[test]
    fn colour_is_stored_as_bgr() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 1, Rgb([1, 2, 3])));
        let m = Matrix::from_image(&img);
        assert_eq!(m.dt(), "3u");
        let yaml = m.to_yaml("img");
        assert!(yaml.starts_with("%YAML:1.0\n---\nimg: !!opencv-matrix\n"));
        assert!(yaml.contains("   rows: 1\n   cols: 2\n   dt: 3u\n"));
        assert!(yaml.contains("data: [ 3, 2, 1, 3, 2, 1 ]"));
    }

    #[test]
    fn xml_document_layout() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_raw(2, 2, vec![0, 1, 2, 255]).unwrap());
        let xml = Matrix::from_image(&img).to_xml("img");
        assert_eq!(
            xml,
            "<?xml version=\"1.0\"?>\n<opencv_storage>\n<img type_id=\"opencv-matrix\">\n  \
             <rows>2</rows>\n  <cols>2</cols>\n  <dt>u</dt>\n  <data>\n    0 1 2 255</data></img>\n\
             </opencv_storage>\n"
        );
    }

    #[test]
    fn long_rows_wrap() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(20, 1));
        let yaml = Matrix::from_image(&img).to_yaml("img");
        assert_eq!(yaml.lines().count(), 8);
    }

    #[test]
    fn floats_use_signed_exponents() {
        assert_eq!(format_float(1.5), "1.50000000e+00");
        assert_eq!(format_float(-0.25), "-2.50000000e-01");
        assert_eq!(format_float(f32::NAN), ".Nan");
    }

    #[test]
    fn gzip_output_decompresses_to_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.yml.gz");
        let img = DynamicImage::ImageLuma8(GrayImage::new(3, 2));
        let kind = StorageKind::from_format("yml.gz").unwrap();
        write_storage(&path, kind, "img", &img).unwrap();

        let mut text = String::new();
        flate2::read::GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, Matrix::from_image(&img).to_yaml("img"));
    }
}

//! Multi-channel image sink writing timestamped files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use framewire_core::{
    Component, ComponentError, DataStreamIn, Interface, Property, PropertyAccess,
};
use image::{DynamicImage, ImageFormat};
use log::{error, info, warn};

use crate::error::WriteError;
use crate::storage::{write_storage, StorageKind};

/// Key under which structured formats store the matrix.
pub const STORAGE_KEY: &str = "img";

/// Widest counter label; a `u64` never needs more digits.
pub const MAX_DIGITS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterHandler {
    WriteImage(usize),
    SaveImage,
    SaveTriggered,
}

#[derive(Debug, Default)]
struct Channel {
    input: DataStreamIn<DynamicImage>,
    base_name: String,
    format: String,
    save: bool,
    counter: u64,
    counter_label: String,
}

/// Writes images arriving on `in_img0..in_img{count-1}` to
/// `<directory>/<timestamp>_<base_name>.<format>`.
///
/// A channel writes only when its save flag is set (by `SaveImage` or a
/// signal on `in_save_trigger`) unless `auto_trigger` is on. The flag is
/// cleared by the next write attempt whatever its outcome.
pub struct ImageWriter {
    name: String,
    directory: Property<String>,
    base_name: Property<String>,
    format: Property<String>,
    digits: Property<usize>,
    count: Property<usize>,
    auto_trigger: Property<bool>,
    in_save_trigger: DataStreamIn<()>,
    channels: Vec<Channel>,
}

impl ImageWriter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            directory: Property::new("directory", ".".to_string()),
            base_name: Property::new("base_name", "img".to_string()),
            format: Property::new("format", "png".to_string()),
            digits: Property::new("digits", 2),
            count: Property::new("count", 1).constant(),
            auto_trigger: Property::new("auto_trigger", false),
            in_save_trigger: DataStreamIn::new(),
            channels: Vec::new(),
        }
    }

    /// Channels created by interface preparation.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn input(&self, channel: usize) -> Option<&DataStreamIn<DynamicImage>> {
        self.channels.get(channel).map(|c| &c.input)
    }

    pub fn save_flag(&self, channel: usize) -> Option<bool> {
        self.channels.get(channel).map(|c| c.save)
    }

    /// Completed write attempts on `channel`.
    pub fn counter(&self, channel: usize) -> Option<u64> {
        self.channels.get(channel).map(|c| c.counter)
    }

    /// The counter zero-padded to `digits`.
    pub fn counter_label(&self, channel: usize) -> Option<&str> {
        self.channels.get(channel).map(|c| c.counter_label.as_str())
    }

    /// Base name and format fixed for each channel at interface preparation.
    pub fn channel_names(&self) -> Vec<(&str, &str)> {
        self.channels
            .iter()
            .map(|c| (c.base_name.as_str(), c.format.as_str()))
            .collect()
    }

    fn request_save(&mut self) {
        for ch in &mut self.channels {
            ch.save = true;
        }
    }

    fn write_channel(&mut self, n: usize) -> Result<(), ComponentError> {
        let Some(ch) = self.channels.get_mut(n) else {
            return Err(ComponentError::UnknownHandler(format!("write_image_{n}")));
        };

        if !*self.auto_trigger && !ch.save {
            return Ok(());
        }
        ch.save = false;

        let img = match ch.input.read() {
            Some(img) if img.width() > 0 && img.height() > 0 => img,
            _ => {
                warn!("{}: image N({n}) empty", self.name);
                return Ok(());
            }
        };

        ch.counter += 1;
        let width = (*self.digits).min(MAX_DIGITS);
        ch.counter_label = format!("{:0width$}", ch.counter);

        let path = compose_filename(
            &self.directory,
            &timestamp(Local::now()),
            &ch.base_name,
            &ch.format,
        );
        match save_image(&path, &ch.format, &img) {
            Ok(()) => info!("{}: wrote {}", self.name, path.display()),
            Err(err) => error!("{}: {err}", self.name),
        }
        Ok(())
    }
}

/// Per-channel base names from a comma-separated list.
///
/// A single entry with `count > 1` is numbered per channel; channels past the
/// end of a longer list get the first entry numbered.
pub fn base_names(list: &str, count: usize) -> Vec<String> {
    let items: Vec<&str> = list.split(',').map(str::trim).collect();
    let first = items.first().copied().unwrap_or_default();
    if items.len() == 1 && count > 1 {
        return (0..count).map(|i| format!("{first}{i}")).collect();
    }
    (0..count)
        .map(|i| match items.get(i) {
            Some(item) => item.to_string(),
            None => format!("{first}{i}"),
        })
        .collect()
}

/// Per-channel formats from a comma-separated list; missing entries repeat
/// the last one.
pub fn formats(list: &str, count: usize) -> Vec<String> {
    let items: Vec<&str> = list.split(',').map(str::trim).collect();
    let last = items.last().copied().unwrap_or_default();
    (0..count)
        .map(|i| items.get(i).copied().unwrap_or(last).to_string())
        .collect()
}

/// ISO-8601 local time with microseconds.
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub fn compose_filename(directory: &str, timestamp: &str, base: &str, format: &str) -> PathBuf {
    Path::new(directory).join(format!("{timestamp}_{base}.{format}"))
}

/// Write `img` to `path`: structured formats (`yml`, `xml`, `*.gz`, ...) as an
/// OpenCV matrix under [`STORAGE_KEY`], anything else through the image
/// encoder for that extension.
pub fn save_image(path: &Path, format: &str, img: &DynamicImage) -> Result<(), WriteError> {
    if let Some(kind) = StorageKind::from_format(format) {
        return write_storage(path, kind, STORAGE_KEY, img);
    }
    let encoder = ImageFormat::from_extension(format.trim())
        .ok_or_else(|| WriteError::UnsupportedFormat(format.to_string()))?;
    img.save_with_format(path, encoder)
        .map_err(|source| WriteError::Encode {
            path: path.to_path_buf(),
            source,
        })
}

impl Component for ImageWriter {
    type Handler = WriterHandler;

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&mut self) -> Vec<&mut dyn PropertyAccess> {
        vec![
            &mut self.directory as &mut dyn PropertyAccess,
            &mut self.base_name,
            &mut self.format,
            &mut self.digits,
            &mut self.count,
            &mut self.auto_trigger,
        ]
    }

    fn prepare_interface(
        &mut self,
        iface: &mut Interface<WriterHandler>,
    ) -> Result<(), ComponentError> {
        let count = *self.count;
        if count == 0 {
            return Err(ComponentError::Config("count must be at least 1".into()));
        }
        if *self.digits > MAX_DIGITS {
            return Err(ComponentError::Config(format!(
                "digits must be at most {MAX_DIGITS}, got {}",
                *self.digits
            )));
        }
        self.channels = base_names(&self.base_name, count)
            .into_iter()
            .zip(formats(&self.format, count))
            .map(|(base_name, format)| Channel {
                base_name,
                format,
                ..Channel::default()
            })
            .collect();

        for (i, ch) in self.channels.iter().enumerate() {
            let stream = format!("in_img{i}");
            let handler = format!("write_image_{i}");
            iface.register_stream(stream.as_str(), &ch.input)?;
            iface.register_handler(handler.as_str(), WriterHandler::WriteImage(i))?;
            iface.add_dependency(&handler, Some(stream.as_str()))?;
        }
        // Channel 0 aliases. The handler alias is manual so a single
        // delivery does not run channel 0 twice.
        if let Some(first) = self.channels.first() {
            iface.register_stream("in_img", &first.input)?;
            iface.register_handler("write_image", WriterHandler::WriteImage(0))?;
        }

        iface.register_stream("in_save_trigger", &self.in_save_trigger)?;
        iface.register_handler("onSaveTriggered", WriterHandler::SaveTriggered)?;
        iface.add_dependency("onSaveTriggered", Some("in_save_trigger"))?;
        iface.register_handler("SaveImage", WriterHandler::SaveImage)?;
        Ok(())
    }

    fn handle(&mut self, handler: WriterHandler) -> Result<(), ComponentError> {
        match handler {
            WriterHandler::WriteImage(n) => self.write_channel(n),
            WriterHandler::SaveImage => {
                self.request_save();
                Ok(())
            }
            WriterHandler::SaveTriggered => {
                self.in_save_trigger.read();
                self.request_save();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn single_base_name_is_numbered_per_channel() {
        assert_eq!(base_names("img", 3), vec!["img0", "img1", "img2"]);
        assert_eq!(base_names("img", 1), vec!["img"]);
        assert_eq!(base_names("left, right", 2), vec!["left", "right"]);
        assert_eq!(base_names("left,right", 3), vec!["left", "right", "left2"]);
        assert_eq!(base_names("a,b,c", 2), vec!["a", "b"]);
    }

    #[test]
    fn missing_formats_repeat_the_last_one() {
        assert_eq!(formats("png", 2), vec!["png", "png"]);
        assert_eq!(formats("png,yml.gz", 3), vec!["png", "yml.gz", "yml.gz"]);
    }

    #[test]
    fn filename_layout() {
        let ts = timestamp(Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap());
        assert_eq!(ts, "2024-03-05T07:08:09.000000");
        assert_eq!(
            compose_filename("/tmp", &ts, "img0", "png"),
            PathBuf::from("/tmp/2024-03-05T07:08:09.000000_img0.png")
        );
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        let img = DynamicImage::new_luma8(2, 2);
        assert!(matches!(
            save_image(Path::new("/nonexistent/x.foo"), "foo", &img),
            Err(WriteError::UnsupportedFormat(_))
        ));
    }
}

use std::io;
use std::path::PathBuf;

/// Failure to persist an image; reported through the log by [`ImageWriter`].
///
/// [`ImageWriter`]: crate::ImageWriter
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("unsupported output format `{0}`")]
    UnsupportedFormat(String),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

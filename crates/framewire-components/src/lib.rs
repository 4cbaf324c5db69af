//! Builtin framewire components.
//!
//! - [`ImageWriter`]: writes incoming images to disk on request,
//! - [`TimeTrigger`]: periodic unit signal,
//! - [`CvFindCirclesGrid`]: symmetric circle-grid calibration finder.
//!
//! Hosts make them available by name with [`register_builtins`].

mod circles_grid;
mod error;
mod image_writer;
mod storage;
mod time_trigger;

use framewire_core::{hosted, ComponentRegistry, RegistryError};

pub use circles_grid::{CvFindCirclesGrid, GridHandler, Interpolation};
pub use error::WriteError;
pub use image_writer::{
    base_names, compose_filename, formats, save_image, timestamp, ImageWriter, WriterHandler,
    MAX_DIGITS, STORAGE_KEY,
};
pub use storage::{write_storage, Matrix, StorageKind, StorageSyntax};
pub use time_trigger::{TimeTrigger, TriggerHandler};

/// Register `ImageWriter`, `TimeTrigger` and `CvFindCirclesGrid`.
pub fn register_builtins(registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
    registry.register("ImageWriter", |name| hosted(ImageWriter::new(name)))?;
    registry.register("TimeTrigger", |name| hosted(TimeTrigger::new(name)))?;
    registry.register("CvFindCirclesGrid", |name| {
        hosted(CvFindCirclesGrid::new(name))
    })?;
    Ok(())
}

/// A registry holding only the builtin components.
pub fn builtin_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    let registered = register_builtins(&mut registry);
    debug_assert!(registered.is_ok(), "builtin type names are distinct");
    registry
}

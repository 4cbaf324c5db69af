use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use framewire::core::{HandlerInfo, Pipeline, PipelineConfig, PropertyInfo, StreamInfo};
use framewire::detect::{detect_circles_grid, GridDetection};
use framewire::{builtin_registry, CirclesGridParams, PatternSize};
use image::ImageReader;
use log::LevelFilter;
use serde::Serialize;

#[cfg(not(feature = "tracing"))]
use log::info;

#[cfg(feature = "tracing")]
use tracing::info;

#[cfg(feature = "tracing")]
use framewire::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use framewire::core::init_with_level;

#[derive(Debug, Parser)]
#[command(name = "framewire", version, about = "Run framewire pipelines and tools")]
struct Cli {
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Emit JSON log lines (with the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the builtin components with their properties, streams and handlers.
    List,
    /// Build a pipeline from a JSON description and run it.
    Run {
        config: PathBuf,
        /// Number of pipeline steps.
        #[arg(long, default_value_t = 1)]
        steps: usize,
        /// Pause between steps, in milliseconds.
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Locate a symmetric circle grid in an image file.
    FindGrid {
        image: PathBuf,
        /// Circles per row.
        #[arg(long)]
        width: usize,
        /// Number of rows.
        #[arg(long)]
        height: usize,
        /// Circle spacing in model units.
        #[arg(long, default_value_t = 0.02)]
        square_size: f64,
        /// Light circles on a dark background.
        #[arg(long)]
        inverse: bool,
        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct ComponentListing {
    #[serde(rename = "type")]
    kind: String,
    properties: Vec<PropertyInfo>,
    streams: Vec<StreamInfo>,
    handlers: Vec<HandlerInfo>,
}

#[derive(Debug, Serialize)]
struct GridReport {
    image_path: String,
    image_width: u32,
    image_height: u32,
    detection: Option<GridDetection>,
    error: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    {
        init_with_level(cli.log_level)?;
        if cli.log_json {
            log::warn!("--log-json needs the `tracing` feature, logging as text");
        }
    }

    #[cfg(feature = "tracing")]
    init_tracing(cli.log_level, cli.log_json);

    match cli.command {
        Command::List => list(),
        Command::Run {
            config,
            steps,
            interval_ms,
        } => run(&config, steps, Duration::from_millis(interval_ms)),
        Command::FindGrid {
            image,
            width,
            height,
            square_size,
            inverse,
            output,
        } => find_grid(&image, width, height, square_size, inverse, output.as_deref()),
    }
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("`{s}` is not one of off, error, warn, info, debug, trace"))
}

fn list() -> Result<(), Box<dyn std::error::Error>> {
    let registry = builtin_registry();
    let mut listings = Vec::new();
    for kind in registry.type_names() {
        let mut node = registry.create(kind, kind)?;
        node.prepare_interface()?;
        listings.push(ComponentListing {
            kind: kind.to_string(),
            properties: node.property_infos(),
            streams: node.stream_infos(),
            handlers: node.handler_infos(),
        });
    }
    println!("{}", serde_json::to_string_pretty(&listings)?);
    Ok(())
}

fn run(config: &Path, steps: usize, interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = PipelineConfig::load_json(config)?;
    let mut pipeline = Pipeline::from_config(&cfg, &builtin_registry())?;
    info!(
        "pipeline with {} components, {} connections",
        pipeline.len(),
        cfg.connections.len()
    );

    pipeline.init()?;
    pipeline.start()?;
    let mut handlers = 0;
    for step in 0..steps {
        if step > 0 && !interval.is_zero() {
            thread::sleep(interval);
        }
        handlers += pipeline.step();
    }
    pipeline.stop()?;
    pipeline.finish()?;

    info!("{steps} steps, {handlers} handler calls");
    Ok(())
}

fn find_grid(
    image: &Path,
    width: usize,
    height: usize,
    square_size: f64,
    inverse: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = PatternSize::new(width, height)?;
    let img = ImageReader::open(image)?.decode()?.to_luma8();

    let (detection, error) = match detect_circles_grid(
        &img,
        pattern,
        square_size,
        inverse,
        &CirclesGridParams::default(),
    ) {
        Ok(found) => (Some(found), None),
        Err(err) => (None, Some(err.to_string())),
    };
    info!(
        "{}: grid {}",
        image.display(),
        if detection.is_some() { "found" } else { "not found" }
    );

    let report = GridReport {
        image_path: image.display().to_string(),
        image_width: img.width(),
        image_height: img.height(),
        detection,
        error,
    };
    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

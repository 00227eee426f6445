use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

use pathaccum::camera::{FrameClock, Movement};
use pathaccum::config::RenderConfig;
use pathaccum::imageio::FormatFallback;
use pathaccum::renderer::SkyBackend;
use pathaccum::{ImageEncoder, ImageFormat, InputEvent, Session};

/// Accumulate single-sample frames until the sample budget is reached, then write the image.
#[derive(Parser, Debug)]
struct Args {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output path; a known extension picks the format unless --format is given
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// ppm, png or jpg
    #[arg(short, long)]
    format: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Samples per pixel
    #[arg(long)]
    spp: Option<u32>,

    /// Vertical field of view in degrees
    #[arg(long)]
    fov: Option<f32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Fail on unrecognized formats instead of writing PPM
    #[arg(long)]
    strict_format: bool,

    /// Turn the view right by this many degrees every frame
    #[arg(long, default_value_t = 0.0)]
    pan: f32,

    /// Walk forward for the measured frame time every frame
    #[arg(long)]
    walk: bool,

    /// Per-frame noise amplitude of the sky backend
    #[arg(long, default_value_t = 0.1)]
    noise: f32,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default()
        .with(filter)
        .with(HierarchicalLayer::new(2))
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    if let Some(width) = args.width { config.width = width; }
    if let Some(height) = args.height { config.height = height; }
    if let Some(spp) = args.spp { config.samples = spp; }
    if let Some(fov) = args.fov { config.fov = fov; }
    if args.seed.is_some() { config.seed = args.seed; }
    if args.strict_format { config.output.fallback = FormatFallback::Reject; }

    if let Some(output) = &args.output {
        if args.format.is_none() {
            if let Some(format) = ImageFormat::from_path(output) {
                config.output.format = format.to_string();
            }
        }
        config.output.path = output.clone();
    }
    if let Some(format) = &args.format {
        config.output.format = format.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;

    // resolve before rendering so a bad format fails fast
    let format = ImageEncoder::new(config.output.fallback).resolve_format(&config.output.format)?;
    if !format.is_lossless() {
        tracing::info!(%format, quality = ImageEncoder::JPEG_QUALITY, "output is lossy");
    }
    tracing::info!(
        width = config.width, height = config.height, spp = config.samples,
        output = %config.output.path.display(), %format,
        "starting render"
    );

    let mut session = Session::new(config, SkyBackend::new(args.noise))?;

    let sensitivity = session.camera().mouse_sensitivity;
    let mut cursor_x = 0.0f64;
    session.handle_input(InputEvent::CursorMoved { x: cursor_x, y: 0.0 })?;
    let mut clock = FrameClock::new();

    let progress = ProgressBar::new(session.film().target_samples() as u64);
    progress.set_style(ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} spp")?);

    while !session.is_converged() {
        if args.pan != 0.0 {
            cursor_x += (args.pan / sensitivity) as f64;
            session.handle_input(InputEvent::CursorMoved { x: cursor_x, y: 0.0 })?;
        }
        if args.walk {
            let dt = clock.tick();
            session.handle_input(InputEvent::Move { direction: Movement::Forward, dt })?;
        }

        session.render_frame()?;
        progress.set_position(session.film().sample_count() as u64);
    }
    progress.finish();

    let path = session.config().output.path.clone();
    session.save(&path, format)?;
    Ok(())
}

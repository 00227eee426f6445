use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::{Float, Result};
use crate::camera::{Camera, CursorTracker, Movement};
use crate::config::RenderConfig;
use crate::film::{FrameAccumulator, SubmitStatus};
use crate::imageio::{ImageEncoder, ImageFormat};
use crate::raygen::RayGenerator;
use crate::renderer::{BackendSetup, RenderBackend};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// A movement key was held for `dt` seconds.
    Move { direction: Movement, dt: Float },
    /// Absolute cursor position in window pixels, y growing downwards.
    CursorMoved { x: f64, y: f64 },
    Resized { width: u32, height: u32 },
    Close,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

/// Owns all per-run state and drives one frame at a time: camera, static rays,
/// accumulation buffer, seed generator and the backend.
pub struct Session<B: RenderBackend> {
    config: RenderConfig,
    camera: Camera,
    cursor: CursorTracker,
    rays: RayGenerator,
    film: FrameAccumulator,
    encoder: ImageEncoder,
    backend: B,
    rng: Xoshiro256Plus,
    frames: u64,
}

impl<B: RenderBackend> Session<B> {
    pub fn new(config: RenderConfig, backend: B) -> Result<Self> {
        config.validate()?;

        let rays = RayGenerator::generate(config.width, config.height, config.fov, config.aspect_ratio())?;
        let film = FrameAccumulator::new(config.width, config.height, config.samples)?;
        let rng = match config.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };

        let mut session = Self {
            camera: Camera::from_config(&config.camera),
            cursor: CursorTracker::new(),
            encoder: ImageEncoder::new(config.output.fallback),
            config,
            rays,
            film,
            backend,
            rng,
            frames: 0,
        };
        session.upload_rays()?;
        Ok(session)
    }

    fn upload_rays(&mut self) -> Result<()> {
        let setup = BackendSetup {
            rays: &self.rays,
            target_samples: self.config.samples,
            russian_roulette: self.config.backend.russian_roulette,
            indirect_light_rate: self.config.backend.indirect_light_rate,
        };
        self.backend.setup(&setup)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn rays(&self) -> &RayGenerator {
        &self.rays
    }

    pub fn film(&self) -> &FrameAccumulator {
        &self.film
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn encoder(&self) -> &ImageEncoder {
        &self.encoder
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn is_converged(&self) -> bool {
        self.film.is_ready()
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Result<Control> {
        match event {
            InputEvent::Move { direction, dt } => self.camera.process_movement(direction, dt),
            InputEvent::CursorMoved { x, y } => {
                if let Some((dx, dy)) = self.cursor.delta(x, y) {
                    self.camera.process_orientation(dx, dy, true);
                }
            }
            InputEvent::Resized { width, height } => self.resize(width, height)?,
            InputEvent::Close => return Ok(Control::Exit),
        }
        Ok(Control::Continue)
    }

    /// Regenerates the screen rays and starts a fresh accumulation. Samples taken
    /// at the old resolution are discarded together with the old ray buffer.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            // minimized window; keep rendering at the current size
            tracing::debug!(width, height, "ignoring degenerate resize");
            return Ok(());
        }
        if (width, height) == self.rays.dimensions() {
            return Ok(());
        }

        let aspect = width as Float / height as Float;
        let rays = RayGenerator::generate(width, height, self.rays.fov(), aspect)?;
        let film = FrameAccumulator::new(width, height, self.config.samples)?;

        tracing::debug!(width, height, discarded = self.film.sample_count(), "resized, restarting accumulation");
        self.rays = rays;
        self.film = film;
        self.config.width = width;
        self.config.height = height;
        self.upload_rays()
    }

    pub fn next_seed(&mut self) -> [Float; 4] {
        self.rng.gen()
    }

    /// Render one frame with the current camera and fold it into the accumulation.
    pub fn render_frame(&mut self) -> Result<SubmitStatus> {
        let span = tracing::trace_span!("frame", index = self.frames);
        let _enter = span.enter();

        let seed = self.next_seed();
        let inputs = self.camera.frame_inputs(seed);
        let frame = self.backend.render_frame(&inputs)?;
        self.frames += 1;

        self.film.submit(&frame)
    }

    /// Render until the sample budget is reached, calling `on_frame` after each frame.
    pub fn run_to_completion(&mut self, mut on_frame: impl FnMut(&FrameAccumulator)) -> Result<()> {
        let span = tracing::info_span!("accumulate", spp = self.film.target_samples());
        let _enter = span.enter();

        while !self.film.is_ready() {
            self.render_frame()?;
            on_frame(&self.film);
        }
        Ok(())
    }

    /// Write the converged image. `Ok(false)` if the accumulation is not finished.
    pub fn save(&self, path: impl AsRef<Path>, format: ImageFormat) -> Result<bool> {
        self.encoder.write(&self.film, path, format)
    }

    /// Write the converged image to the configured output path and format.
    pub fn save_configured(&self) -> Result<bool> {
        let format = self.encoder.resolve_format(&self.config.output.format)?;
        self.save(&self.config.output.path, format)
    }
}

use cgmath::{InnerSpace, Transform};
use rayon::prelude::*;

use crate::{Float, Matrix4f, Point3f, Result, Vec3f, lerp, to_rgb};
use crate::film::CHANNELS;
use crate::raygen::RayGenerator;

/// Per-frame uniforms for the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInputs {
    /// Applied to every static screen ray.
    pub rotation: Matrix4f,
    pub eye: Point3f,
    /// Uniform in [0, 1) per component, fresh every frame.
    pub seed: [Float; 4],
}

/// Everything handed to the backend once per resolution.
pub struct BackendSetup<'a> {
    pub rays: &'a RayGenerator,
    pub target_samples: u32,
    pub russian_roulette: Float,
    pub indirect_light_rate: Float,
}

impl BackendSetup<'_> {
    pub fn screen(&self) -> (u32, u32) {
        self.rays.dimensions()
    }
}

/// The renderer that traces one sample per pixel per frame.
///
/// Frames are returned as tightly packed RGB bytes, row-major with the bottom row
/// first, `width * height * 3` bytes long.
pub trait RenderBackend {
    /// Upload the static ray buffer. Called again after every resize.
    fn setup(&mut self, setup: &BackendSetup<'_>) -> Result<()>;

    fn render_frame(&mut self, inputs: &FrameInputs) -> Result<Vec<u8>>;
}

pub fn background(dir: &Vec3f) -> Vec3f {
    // scale so t is between 0.0 and 1.0
    let t = 0.5 * (dir.y + 1.0);
    // white at the horizon, blue overhead
    Vec3f::new(lerp(t, 1.0, 0.5), lerp(t, 1.0, 0.7), lerp(t, 1.0, 1.0))
}

/// CPU stand-in for the GPU program: shades each rotated screen ray with a sky
/// gradient plus per-frame noise driven by the seed. Useful for exercising the
/// accumulation loop without a GPU.
pub struct SkyBackend {
    directions: Vec<Vec3f>,
    noise: Float,
}

impl SkyBackend {
    pub fn new(noise: Float) -> Self {
        Self {
            directions: Vec::new(),
            noise,
        }
    }
}

impl Default for SkyBackend {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl RenderBackend for SkyBackend {
    fn setup(&mut self, setup: &BackendSetup<'_>) -> Result<()> {
        self.directions = setup.rays.rays().iter().map(|r| r.direction).collect();
        let (width, height) = setup.screen();
        tracing::debug!(
            width, height,
            spp = setup.target_samples,
            russian_roulette = setup.russian_roulette,
            indirect_light_rate = setup.indirect_light_rate,
            "sky backend set up"
        );
        Ok(())
    }

    fn render_frame(&mut self, inputs: &FrameInputs) -> Result<Vec<u8>> {
        let mut frame = vec![0u8; self.directions.len() * CHANNELS];
        let rotation = inputs.rotation;
        let seed = inputs.seed;
        let noise = self.noise;

        frame.par_chunks_mut(CHANNELS)
            .zip(self.directions.par_iter())
            .enumerate()
            .for_each(|(i, (px, dir))| {
                let dir = rotation.transform_vector(*dir).normalize();
                let offset = noise * (hash_unit(i as u32, seed) - 0.5);
                let color = background(&dir) + Vec3f::new(offset, offset, offset);
                px.copy_from_slice(&to_rgb(color));
            });

        Ok(frame)
    }
}

/// Uniform value in [0, 1) decorrelated across pixels and frames.
fn hash_unit(index: u32, seed: [Float; 4]) -> Float {
    let mut x = index.wrapping_mul(0x9e37_79b9);
    for s in seed.iter() {
        x ^= s.to_bits();
        x ^= x >> 16;
        x = x.wrapping_mul(0x7feb_352d);
        x ^= x >> 15;
        x = x.wrapping_mul(0x846c_a68b);
        x ^= x >> 16;
    }
    (x >> 8) as Float / (1u32 << 24) as Float
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    fn setup_backend(width: u32, height: u32, noise: Float) -> (SkyBackend, RayGenerator) {
        let rays = RayGenerator::generate(width, height, 60.0, width as Float / height as Float).unwrap();
        let mut backend = SkyBackend::new(noise);
        backend.setup(&BackendSetup {
            rays: &rays,
            target_samples: 1,
            russian_roulette: 0.8,
            indirect_light_rate: 1.0,
        }).unwrap();
        (backend, rays)
    }

    fn inputs(seed: [Float; 4]) -> FrameInputs {
        FrameInputs { rotation: Matrix4f::identity(), eye: point3f!(0, 0, 0), seed }
    }

    #[test]
    fn test_frame_size() {
        let (mut backend, _) = setup_backend(7, 5, 0.1);
        let frame = backend.render_frame(&inputs([0.1, 0.2, 0.3, 0.4])).unwrap();
        assert_eq!(frame.len(), 7 * 5 * 3);
    }

    #[test]
    fn test_noiseless_sky_is_brighter_at_horizon() {
        let (mut backend, _) = setup_backend(1, 9, 0.0);
        let frame = backend.render_frame(&inputs([0.0; 4])).unwrap();
        // red channel fades from white at the horizon towards the zenith color
        let bottom = frame[0];
        let top = frame[8 * 3];
        assert!(bottom > top);
        // noise-free frames do not depend on the seed
        assert_eq!(frame, backend.render_frame(&inputs([0.9; 4])).unwrap());
    }

    #[test]
    fn test_seed_changes_noise() {
        let (mut backend, _) = setup_backend(16, 16, 0.2);
        let a = backend.render_frame(&inputs([0.1, 0.2, 0.3, 0.4])).unwrap();
        let b = backend.render_frame(&inputs([0.5, 0.6, 0.7, 0.8])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_background_gradient() {
        assert_eq!(background(&vec3f!(0, -1, 0)), vec3f!(1, 1, 1));
        assert_eq!(background(&vec3f!(0, 1, 0)), vec3f!(0.5, 0.7, 1.0));
        let horizon = background(&vec3f!(0, 0, 1));
        assert!((horizon.x - 0.75).abs() < 1e-6);
        assert!((horizon.y - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_hash_unit_range() {
        for i in 0..1000 {
            let h = hash_unit(i, [0.25, 0.5, 0.75, 0.99]);
            assert!((0.0..1.0).contains(&h));
        }
    }
}

use cgmath::InnerSpace;
use rayon::prelude::*;

use crate::{Error, Float, Result, Vec3f, pixel_center_ndc};

/// Floats per pixel in the flattened vertex buffer: direction xyz, screen u, screen v.
pub const FLOATS_PER_RAY: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRay {
    /// Unit direction in camera space.
    pub direction: Vec3f,
    pub screen_u: Float,
    pub screen_v: Float,
}

/// The static screen-space rays for one resolution and field of view.
///
/// Rays are stored row-major with row 0 at the bottom of the screen. The buffer
/// never changes once generated; the per-frame camera rotation is applied to it
/// by the backend, so a new resolution or field of view needs a new generator.
#[derive(Clone, Debug)]
pub struct RayGenerator {
    width: u32,
    height: u32,
    fov: Float,
    rays: Vec<PixelRay>,
}

impl RayGenerator {
    /// `fov` is the vertical field of view in degrees.
    pub fn generate(width: u32, height: u32, fov: Float, aspect_ratio: Float) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "cannot generate rays for a {}x{} screen", width, height
            )));
        }
        if !(fov > 0.0 && fov < 180.0) {
            return Err(Error::InvalidConfig(format!("field of view {} is out of range", fov)));
        }

        let scale = (fov * 0.5).to_radians().tan();

        let mut rays = vec![
            PixelRay { direction: Vec3f::new(0.0, 0.0, 1.0), screen_u: 0.0, screen_v: 0.0 };
            width as usize * height as usize
        ];

        rays.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(j, row)| {
                let v = pixel_center_ndc(j as u32, height);
                for (i, ray) in row.iter_mut().enumerate() {
                    let u = pixel_center_ndc(i as u32, width);
                    let dir = Vec3f::new(u * aspect_ratio * scale, v * scale, 1.0);
                    *ray = PixelRay {
                        direction: dir.normalize(),
                        screen_u: u,
                        screen_v: v,
                    };
                }
            });

        tracing::debug!(width, height, fov, aspect_ratio, "generated screen rays");

        Ok(Self { width, height, fov, rays })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn fov(&self) -> Float {
        self.fov
    }

    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    pub fn rays(&self) -> &[PixelRay] {
        &self.rays
    }

    /// `row` counts up from the bottom of the screen.
    pub fn ray(&self, col: u32, row: u32) -> &PixelRay {
        &self.rays[row as usize * self.width as usize + col as usize]
    }

    /// Flattened buffer for upload, `FLOATS_PER_RAY` floats per pixel.
    pub fn to_vertex_data(&self) -> Vec<Float> {
        let mut data = Vec::with_capacity(self.rays.len() * FLOATS_PER_RAY);
        for ray in &self.rays {
            data.extend_from_slice(&[
                ray.direction.x,
                ray.direction.y,
                ray.direction.z,
                ray.screen_u,
                ray.screen_v,
            ]);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unit_directions_and_screen_bounds() {
        let gen = RayGenerator::generate(37, 23, 40.0, 37.0 / 23.0).unwrap();
        assert_eq!(gen.len(), 37 * 23);
        for ray in gen.rays() {
            assert_abs_diff_eq!(ray.direction.magnitude(), 1.0, epsilon = 1.0e-5);
            assert!(ray.screen_u > -1.0 && ray.screen_u < 1.0);
            assert!(ray.screen_v > -1.0 && ray.screen_v < 1.0);
            assert!(ray.direction.z > 0.0);
        }
    }

    #[test]
    fn test_row_major_bottom_up() {
        let gen = RayGenerator::generate(4, 2, 90.0, 2.0).unwrap();
        let first = gen.rays()[0];
        assert_abs_diff_eq!(first.screen_u, -0.75);
        assert_abs_diff_eq!(first.screen_v, -0.5);

        // index = row * width + col
        assert_eq!(*gen.ray(3, 1), gen.rays()[7]);
        assert_abs_diff_eq!(gen.ray(3, 1).screen_u, 0.75);
        assert_abs_diff_eq!(gen.ray(3, 1).screen_v, 0.5);
        assert!(gen.ray(0, 0).direction.y < 0.0);
        assert!(gen.ray(0, 1).direction.y > 0.0);
    }

    #[test]
    fn test_direction_matches_fov() {
        // at 90 degrees, scale = tan(45) = 1 and the direction is (u * aspect, v, 1)
        let gen = RayGenerator::generate(4, 2, 90.0, 2.0).unwrap();
        let ray = gen.ray(3, 1);
        let expected = Vec3f::new(0.75 * 2.0, 0.5, 1.0).normalize();
        assert_abs_diff_eq!(ray.direction, expected, epsilon = 1.0e-6);
    }

    #[test]
    fn test_corners_approach_screen_edges() {
        let mut prev_err = Float::INFINITY;
        for &n in &[2u32, 8, 64, 512] {
            let gen = RayGenerator::generate(n, n, 40.0, 1.0).unwrap();
            let corners = [
                (gen.ray(0, 0), -1.0, -1.0),
                (gen.ray(n - 1, 0), 1.0, -1.0),
                (gen.ray(0, n - 1), -1.0, 1.0),
                (gen.ray(n - 1, n - 1), 1.0, 1.0),
            ];
            let err = corners.iter()
                .map(|(ray, u, v)| (ray.screen_u - u).abs().max((ray.screen_v - v).abs()))
                .fold(0.0, Float::max);
            assert_abs_diff_eq!(err, 1.0 / n as Float, epsilon = 1.0e-6);
            assert!(err < prev_err);
            prev_err = err;
        }
    }

    #[test]
    fn test_vertex_data_layout() {
        let gen = RayGenerator::generate(3, 2, 40.0, 1.5).unwrap();
        let data = gen.to_vertex_data();
        assert_eq!(data.len(), 3 * 2 * FLOATS_PER_RAY);
        let ray = gen.ray(1, 1);
        let offset = 4 * FLOATS_PER_RAY;
        assert_eq!(&data[offset..offset + FLOATS_PER_RAY],
                   &[ray.direction.x, ray.direction.y, ray.direction.z, ray.screen_u, ray.screen_v]);
    }

    #[test]
    fn test_rejects_degenerate_configs() {
        assert!(RayGenerator::generate(0, 10, 40.0, 1.0).is_err());
        assert!(RayGenerator::generate(10, 10, 0.0, 1.0).is_err());
        assert!(RayGenerator::generate(10, 10, 180.0, 1.0).is_err());
    }

    #[test]
    fn test_deterministic() {
        let a = RayGenerator::generate(64, 48, 55.0, 4.0 / 3.0).unwrap();
        let b = RayGenerator::generate(64, 48, 55.0, 4.0 / 3.0).unwrap();
        assert_eq!(a.rays(), b.rays());
    }
}

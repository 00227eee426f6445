use crate::{Float, Vec3f};

/// World up axis (+Y).
pub const WORLD_UP: Vec3f = Vec3f { x: 0.0, y: 1.0, z: 0.0 };

/// Direction the camera faces at yaw = pitch = 0 (+Z).
pub const WORLD_FRONT: Vec3f = Vec3f { x: 0.0, y: 0.0, z: 1.0 };

/// Pitch limit in degrees, keeps `front` away from `WORLD_UP`.
pub const MAX_PITCH: Float = 89.0;

pub fn lerp(t: Float, v1: Float, v2: Float) -> Float {
    (1.0 - t) * v1 + t * v2
}

/// Normalized device coordinate of the center of pixel `i` along an axis of `n` pixels.
pub fn pixel_center_ndc(i: u32, n: u32) -> Float {
    2.0 * (i as Float + 0.5) / n as Float - 1.0
}

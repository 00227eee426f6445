#[macro_use] pub mod macros; // must stay at the top
pub mod math;
pub mod error;
pub mod config;
pub mod camera;
pub mod raygen;
pub mod film;
pub mod imageio;
pub mod renderer;
pub mod session;

pub use math::*;
pub use error::{Error, Result};
pub use camera::{Camera, Movement, Orientation};
pub use raygen::{PixelRay, RayGenerator};
pub use film::{FinalImage, FrameAccumulator, SubmitStatus};
pub use imageio::{FormatFallback, ImageEncoder, ImageFormat};
pub use renderer::{BackendSetup, FrameInputs, RenderBackend};
pub use session::{Control, InputEvent, Session};

use cgmath::Vector3;
use cgmath::Point3;
use cgmath::Matrix4;

pub type Float = f32;

pub type Vec3f = Vector3<Float>;
pub type Point3f = Point3<Float>;
pub type Matrix4f = Matrix4<Float>;

/// Quantize a linear color in [0, 1] to 8 bits, clamping out-of-range values.
pub fn to_rgb(v: Vec3f) -> [u8; 3] {
    let q = |x: Float| (x.clamp(0.0, 1.0) * 255.0) as u8;
    [q(v.x), q(v.y), q(v.z)]
}

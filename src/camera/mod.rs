//! First-person camera driving the per-frame ray rotation.
//!
//! Conventions: right-handed, world up is +Y and the camera looks down +Z at
//! yaw = pitch = 0. `left = cross(WORLD_UP, front)`, so the initial left vector
//! is +X. Angles are stored in degrees.

use cgmath::{Deg, InnerSpace, Matrix4};

use crate::{Float, Matrix4f, Point3f, Vec3f, MAX_PITCH, WORLD_FRONT, WORLD_UP};
use crate::config::CameraConfig;
use crate::renderer::FrameInputs;

pub mod input;

pub use input::{CursorTracker, FrameClock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orientation {
    pub yaw: Float,
    pub pitch: Float,
    pub front: Vec3f,
    pub left: Vec3f,
    pub up: Vec3f,
}

impl Orientation {
    /// Pitch is clamped to `[-MAX_PITCH, MAX_PITCH]`.
    pub fn new(yaw: Float, pitch: Float) -> Self {
        let mut orientation = Self {
            yaw,
            pitch: pitch.clamp(-MAX_PITCH, MAX_PITCH),
            front: WORLD_FRONT,
            left: WORLD_UP.cross(WORLD_FRONT),
            up: WORLD_UP,
        };
        orientation.update_vectors();
        orientation
    }

    fn update_vectors(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.to_radians().sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.to_radians().sin_cos();

        let front = Vec3f::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw).normalize();

        // An unconstrained pitch of exactly +-90 makes front parallel to up; keep
        // the previous left vector rather than normalizing a zero vector.
        let left = WORLD_UP.cross(front);
        if left.magnitude2() > 1.0e-12 {
            self.left = left.normalize();
        }
        self.front = front;
        self.up = front.cross(self.left).normalize();
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    position: Point3f,
    orientation: Orientation,
    pub movement_speed: Float,
    pub mouse_sensitivity: Float,
}

impl Camera {
    pub const DEFAULT_SPEED: Float = 100.0;
    pub const DEFAULT_SENSITIVITY: Float = 0.1;

    pub fn new(position: Point3f, yaw: Float, pitch: Float) -> Self {
        Self {
            position,
            orientation: Orientation::new(yaw, pitch),
            movement_speed: Self::DEFAULT_SPEED,
            mouse_sensitivity: Self::DEFAULT_SENSITIVITY,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let [x, y, z] = config.position;
        let mut camera = Self::new(point3f!(x, y, z), config.yaw, config.pitch);
        camera.movement_speed = config.speed;
        camera.mouse_sensitivity = config.sensitivity;
        camera
    }

    pub fn position(&self) -> Point3f {
        self.position
    }

    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }

    pub fn yaw(&self) -> Float {
        self.orientation.yaw
    }

    pub fn pitch(&self) -> Float {
        self.orientation.pitch
    }

    pub fn process_movement(&mut self, direction: Movement, dt: Float) {
        let velocity = self.movement_speed * dt;
        let o = &self.orientation;
        match direction {
            Movement::Forward => self.position += o.front * velocity,
            Movement::Backward => self.position -= o.front * velocity,
            Movement::Left => self.position += o.left * velocity,
            Movement::Right => self.position -= o.left * velocity,
        }
    }

    /// Rotate the view by a pointer delta in pixels. `dy` is positive when the
    /// pointer moves up; moving the pointer right turns the view right.
    pub fn process_orientation(&mut self, dx: Float, dy: Float, constrain_pitch: bool) {
        let dx = dx * self.mouse_sensitivity;
        let dy = dy * self.mouse_sensitivity;

        let o = &mut self.orientation;
        o.yaw -= dx;
        o.pitch += dy;

        if constrain_pitch {
            o.pitch = o.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        }

        o.update_vectors();
    }

    /// Rotation taking the static camera-space pixel directions to the current view:
    /// a rotation by `-pitch` about `left` composed with a rotation by `yaw` about world up.
    pub fn rotation_for_frame(&self) -> Matrix4f {
        let o = &self.orientation;
        Matrix4::from_axis_angle(o.left, Deg(-o.pitch)) * Matrix4::from_axis_angle(WORLD_UP, Deg(o.yaw))
    }

    pub fn frame_inputs(&self, seed: [Float; 4]) -> FrameInputs {
        FrameInputs {
            rotation: self.rotation_for_frame(),
            eye: self.position,
            seed,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

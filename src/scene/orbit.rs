//! Damped orbit camera controls
//!
//! Input accumulates into a pending spherical/pan delta. Each [`update`]
//! applies a `damping_factor` fraction of the pending delta and decays the
//! remainder, so the camera keeps gliding for a few frames after the mouse
//! stops. `update` must therefore run every frame, not only on input.
//!
//! [`update`]: CameraController::update

use glam::{Vec2, Vec3};

use super::Camera;

/// Input state for camera controllers
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    /// Mouse delta since last frame (in pixels)
    pub mouse_delta: Vec2,

    /// Mouse scroll delta (positive = scroll up)
    pub scroll_delta: f32,

    /// Whether orbiting is active (left mouse button held)
    pub rotate_active: bool,

    /// Whether panning is active (right mouse button held)
    pub pan_active: bool,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame deltas (call after update)
    pub fn reset_deltas(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }
}

/// Abstract camera controller
pub trait CameraController {
    /// Feed one frame of input
    fn handle_input(&mut self, input: &CameraInput);

    /// Advance the controller and write the result into `camera`.
    /// Returns whether the camera moved.
    fn update(&mut self, camera: &mut Camera) -> bool;

    fn name(&self) -> &'static str;
}

/// Rotation around the target, polar angle measured from +Y
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SphericalDelta {
    azimuth: f32,
    polar: f32,
}

const MIN_POLAR: f32 = 1e-4;
const SETTLE_EPSILON: f32 = 1e-6;
const MOVE_EPSILON: f32 = 1e-4;

/// Orbit controller with inertia
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    /// Fraction of the pending motion applied per update
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Orbit sensitivity (radians per pixel)
    pub rotate_speed: f32,
    /// Zoom factor per scroll unit
    pub zoom_factor: f32,
    /// Pan distance per pixel, relative to the target distance
    pub pan_speed: f32,

    pending: SphericalDelta,
    pending_pan: Vec3,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: true,
            damping_factor: 0.05,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            rotate_speed: 0.005,
            zoom_factor: 1.1,
            pan_speed: 0.001,
            pending: SphericalDelta::default(),
            pending_pan: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn with_damping(mut self, damping_factor: f32) -> Self {
        self.enable_damping = damping_factor > 0.0;
        self.damping_factor = damping_factor.clamp(0.0, 1.0);
        self
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.pending.azimuth -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.pending.polar -= angle;
    }

    /// Zoom in by `factor` (> 1 moves closer)
    pub fn dolly_in(&mut self, factor: f32) {
        if factor > 0.0 {
            self.scale /= factor;
        }
    }

    /// Pan by a screen-space delta (x right, y up), in units of the
    /// target distance.
    pub fn pan(&mut self, delta: Vec2) {
        self.pending_pan += delta.extend(0.0);
    }

    /// Whether motion is still pending from earlier input
    pub fn is_settled(&self) -> bool {
        self.pending.azimuth.abs() < SETTLE_EPSILON
            && self.pending.polar.abs() < SETTLE_EPSILON
            && self.pending_pan.length_squared() < SETTLE_EPSILON * SETTLE_EPSILON
            && self.scale == 1.0
    }
}

impl CameraController for OrbitControls {
    fn handle_input(&mut self, input: &CameraInput) {
        if input.rotate_active && input.mouse_delta != Vec2::ZERO {
            self.rotate_left(input.mouse_delta.x * self.rotate_speed);
            self.rotate_up(input.mouse_delta.y * self.rotate_speed);
        }

        if input.pan_active && input.mouse_delta != Vec2::ZERO {
            self.pan(Vec2::new(-input.mouse_delta.x, input.mouse_delta.y) * self.pan_speed);
        }

        if input.scroll_delta > 0.0 {
            self.dolly_in(self.zoom_factor);
        } else if input.scroll_delta < 0.0 {
            self.dolly_in(1.0 / self.zoom_factor);
        }
    }

    fn update(&mut self, camera: &mut Camera) -> bool {
        let before = camera.position;
        let offset = camera.position - self.target;

        let mut radius = offset.length();
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            std::f32::consts::FRAC_PI_2
        };

        let step = if self.enable_damping { self.damping_factor } else { 1.0 };

        azimuth += self.pending.azimuth * step;
        polar += self.pending.polar * step;
        polar = polar.clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        // Pan is expressed in the camera's screen plane, scaled by distance
        let forward = (-offset).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        let pan = self.pending_pan * step * radius.max(1.0);
        self.target += right * pan.x + up * pan.y;

        let sin_polar = polar.sin();
        let new_offset = Vec3::new(
            radius * sin_polar * azimuth.sin(),
            radius * polar.cos(),
            radius * sin_polar * azimuth.cos(),
        );

        camera.position = self.target + new_offset;
        camera.target = self.target;

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.pending.azimuth *= decay;
            self.pending.polar *= decay;
            self.pending_pan *= decay;
        } else {
            self.pending = SphericalDelta::default();
            self.pending_pan = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance_squared(before) > MOVE_EPSILON * MOVE_EPSILON
    }

    fn name(&self) -> &'static str {
        "Orbit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Projection;

    fn camera() -> Camera {
        Camera::new(Vec3::new(12.0, 8.0, 16.0), Vec3::ZERO, Projection::default())
    }

    #[test]
    fn test_update_without_input_keeps_camera() {
        let mut cam = camera();
        let mut controls = OrbitControls::default();
        assert!(!controls.update(&mut cam));
        assert!(cam.position.abs_diff_eq(Vec3::new(12.0, 8.0, 16.0), 1e-4));
    }

    #[test]
    fn test_damped_rotation_glides_then_settles() {
        let mut cam = camera();
        let mut controls = OrbitControls::default().with_damping(0.05);
        controls.rotate_left(0.5);

        let first = {
            let start = cam.position;
            assert!(controls.update(&mut cam));
            cam.position.distance(start)
        };
        let second = {
            let start = cam.position;
            controls.update(&mut cam);
            cam.position.distance(start)
        };
        // Each frame moves less than the one before
        assert!(second < first);

        for _ in 0..1000 {
            controls.update(&mut cam);
        }
        assert!(controls.is_settled());
        // Distance to target is preserved by pure rotation
        assert!((cam.position.length() - Vec3::new(12.0, 8.0, 16.0).length()).abs() < 1e-3);
    }

    #[test]
    fn test_undamped_rotation_applies_at_once() {
        let mut cam = camera();
        let mut controls = OrbitControls::default().with_damping(0.0);
        controls.rotate_left(0.3);
        controls.update(&mut cam);
        assert!(controls.is_settled());
    }

    #[test]
    fn test_zoom_respects_distance_limits() {
        let mut cam = camera();
        let mut controls = OrbitControls {
            min_distance: 5.0,
            max_distance: 30.0,
            ..Default::default()
        };
        for _ in 0..50 {
            controls.dolly_in(2.0);
            controls.update(&mut cam);
        }
        assert!((cam.position.length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut cam = camera();
        let mut controls = OrbitControls::default().with_damping(0.0);
        controls.rotate_up(10.0);
        controls.update(&mut cam);
        assert!(cam.position.y > 0.0);
        assert!(cam.position.x.is_finite() && cam.position.z.is_finite());
    }

    #[test]
    fn test_input_requires_active_button() {
        let mut controls = OrbitControls::default();
        controls.handle_input(&CameraInput {
            mouse_delta: Vec2::new(10.0, 5.0),
            ..Default::default()
        });
        assert!(controls.is_settled());

        controls.handle_input(&CameraInput {
            mouse_delta: Vec2::new(10.0, 5.0),
            rotate_active: true,
            ..Default::default()
        });
        assert!(!controls.is_settled());
    }
}

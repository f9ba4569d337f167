//! Camera system

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::perspective(45.0, 16.0 / 9.0, 0.1, 100.0)
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Camera for viewing the scene
///
/// The projection matrix is cached: changing [`Camera::projection`] has no
/// effect on rendering until [`Camera::update_projection`] is called.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Projection::default())
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, projection: Projection) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection,
            projection_matrix: projection.matrix(),
        }
    }

    /// Set the aspect ratio from viewport dimensions. Degenerate sizes are
    /// ignored so a minimized window never produces a NaN projection.
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.projection.aspect = width / height;
        }
    }

    /// Recompute the cached projection matrix
    pub fn update_projection(&mut self) {
        self.projection_matrix = self.projection.matrix();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix()
    }

    /// Build camera uniform data for shaders
    pub fn uniform_data(&self) -> CameraUniformData {
        CameraUniformData {
            view_proj: self.view_projection_matrix(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(self.projection.near, self.projection.far, 0.0, 0.0),
        }
    }
}

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view_proj: Mat4,
    pub position: Vec4,
    pub near_far: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_is_cached_until_updated() {
        let mut camera = Camera::default();
        let before = camera.projection_matrix();

        camera.set_aspect(800.0, 800.0);
        assert_eq!(camera.projection_matrix(), before);

        camera.update_projection();
        assert_ne!(camera.projection_matrix(), before);
        assert_eq!(camera.projection.aspect, 1.0);
    }

    #[test]
    fn test_degenerate_aspect_is_ignored() {
        let mut camera = Camera::default();
        let aspect = camera.projection.aspect;
        camera.set_aspect(0.0, 600.0);
        camera.set_aspect(800.0, 0.0);
        assert_eq!(camera.projection.aspect, aspect);
    }

    #[test]
    fn test_view_projection_maps_target_to_center() {
        let camera = Camera::new(Vec3::new(12.0, 8.0, 16.0), Vec3::ZERO, Projection::default());
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}

// scene/camera.rs - Perspective camera with position and roll

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    /// Roll around the view axis, radians
    pub rotation_z: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            rotation_z: 0.0,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Rebuild the projection after changing `fov_degrees`, `aspect`, `near` or `far`
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        (Mat4::from_translation(self.position) * Mat4::from_rotation_z(self.rotation_z)).inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_projects_to_centre() {
        let mut camera = PerspectiveCamera::new(60.0, 16.0 / 9.0, 0.1, 2000.0);
        camera.position.z = 25.0;
        let clip = camera.view_projection() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_aspect_change_needs_projection_update() {
        let mut camera = PerspectiveCamera::new(60.0, 1.0, 0.1, 100.0);
        let before = camera.projection();
        camera.aspect = 2.0;
        assert_eq!(camera.projection(), before);
        camera.update_projection_matrix();
        assert!((camera.projection().x_axis.x * 2.0 - before.x_axis.x).abs() < 1e-5);
    }
}

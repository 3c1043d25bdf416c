//! Orbit camera around the glass

use glam::{Mat4, Vec3};

use cafe_core::RenderUniforms;

const DRAG_SENSITIVITY: f32 = 0.008;
const ZOOM_SENSITIVITY: f32 = 0.01;
const PHI_LIMIT: f32 = 1.2;
const MIN_DISTANCE: f32 = 3.0;
const MAX_DISTANCE: f32 = 10.0;

const FOV: f32 = std::f32::consts::FRAC_PI_4;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub distance: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            distance: 6.2,
            theta: std::f32::consts::FRAC_PI_4,
            phi: std::f32::consts::PI / 7.0,
        }
    }
}

impl OrbitCamera {
    /// Orbit by a cursor delta in pixels
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.theta -= dx * DRAG_SENSITIVITY;
        self.phi = (self.phi + dy * DRAG_SENSITIVITY).clamp(-PHI_LIMIT, PHI_LIMIT);
    }

    /// Move in or out by a scroll delta in pixels (positive moves away)
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance + delta * ZOOM_SENSITIVITY).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(
            self.distance * self.theta.sin() * self.phi.cos(),
            self.distance * self.phi.sin(),
            self.distance * self.theta.cos() * self.phi.cos(),
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV, aspect.max(1e-3), NEAR, FAR)
    }

    /// Matrices and per-frame values for the render passes
    pub fn render_uniforms(
        &self,
        width: u32,
        height: u32,
        sphere_size: f32,
        time: f32,
        stir_strength: f32,
    ) -> RenderUniforms {
        let width = width.max(1);
        let height = height.max(1);
        let view = self.view();
        let projection = self.projection(width as f32 / height as f32);
        RenderUniforms {
            texel_size: [1.0 / width as f32, 1.0 / height as f32],
            sphere_size,
            _pad0: 0.0,
            inv_projection: projection.inverse().to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            inv_view: view.inverse().to_cols_array_2d(),
            time,
            stir_strength,
            _pad1: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_default_orbit() {
        let camera = OrbitCamera::default();
        assert!((camera.eye().length() - 6.2).abs() < 1e-4);
        assert!(camera.eye().y > 0.0);
    }

    #[test]
    fn drag_clamps_elevation() {
        let mut camera = OrbitCamera::default();
        camera.drag(0.0, 10_000.0);
        assert_eq!(camera.phi, 1.2);
        camera.drag(0.0, -10_000.0);
        assert_eq!(camera.phi, -1.2);

        let theta = camera.theta;
        camera.drag(100.0, 0.0);
        assert!((camera.theta - (theta - 0.8)).abs() < 1e-5);
    }

    #[test]
    fn zoom_clamps_distance() {
        let mut camera = OrbitCamera::default();
        camera.zoom(1e5);
        assert_eq!(camera.distance, 10.0);
        camera.zoom(-1e5);
        assert_eq!(camera.distance, 3.0);
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let camera = OrbitCamera::default();
        let clip = camera.projection(1.5) * camera.view() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn uniforms_carry_inverse_matrices() {
        let camera = OrbitCamera::default();
        let u = camera.render_uniforms(800, 600, 0.04, 1.0, 9.5);
        assert_eq!(u.texel_size, [1.0 / 800.0, 1.0 / 600.0]);

        let product = Mat4::from_cols_array_2d(&u.projection) * Mat4::from_cols_array_2d(&u.inv_projection);
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
        let product = Mat4::from_cols_array_2d(&u.view) * Mat4::from_cols_array_2d(&u.inv_view);
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}

use glam::{Mat4, Vec3};

/// Orbit camera around a target point. Pixel dimensions live here so the
/// picking and brush-sizing math always agrees with the viewport.
pub struct Camera {
    pub width: f32,
    pub height: f32,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,

    // Orbit parameters
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,

    position: Vec3,
}

const DEFAULT_YAW: f32 = -0.35;
const DEFAULT_PITCH: f32 = 0.25;

impl Camera {
    pub fn new() -> Self {
        let yaw = DEFAULT_YAW;
        let pitch = DEFAULT_PITCH;
        let distance = 4.0;
        Self {
            width: 1280.0,
            height: 720.0,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            near: 0.05,
            far: 1000.0,
            yaw,
            pitch,
            distance,
            position: Self::orbit_position(Vec3::ZERO, yaw, pitch, distance),
        }
    }

    /// Track the drawable surface size. Safe to call redundantly.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.width = width;
            self.height = height;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect(), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Orbit around the target by yaw/pitch deltas (in radians).
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch =
            (self.pitch + delta_pitch).clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
        self.update_position();
    }

    /// Slide the target across the view plane.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = self.forward();
        let right = forward.cross(self.up).normalize_or_zero();
        let up = right.cross(forward);
        self.target += right * dx + up * dy;
        self.update_position();
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).max(0.1);
        self.update_position();
    }

    /// Re-center on freshly loaded geometry: default orientation, distance
    /// chosen so the bounding sphere fills most of the frame.
    pub fn frame(&mut self, center: Vec3, radius: f32) {
        self.target = center;
        self.yaw = DEFAULT_YAW;
        self.pitch = DEFAULT_PITCH;
        self.distance = (radius / (self.fov_y * 0.5).sin() * 1.25).max(0.5);
        self.update_position();
    }

    pub fn reset(&mut self) {
        self.frame(Vec3::ZERO, 1.0);
    }

    fn update_position(&mut self) {
        self.position = Self::orbit_position(self.target, self.yaw, self.pitch, self.distance);
    }

    fn orbit_position(target: Vec3, yaw: f32, pitch: f32, distance: f32) -> Vec3 {
        let offset = Vec3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            yaw.cos() * pitch.cos(),
        ) * distance;
        target + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_projection_is_finite() {
        let camera = Camera::new();
        let vp = camera.view_projection();
        assert!(!vp.to_cols_array().iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn viewport_update_is_idempotent() {
        let mut camera = Camera::new();
        camera.set_viewport(800.0, 600.0);
        assert_eq!((camera.width, camera.height), (800.0, 600.0));
        camera.set_viewport(1024.0, 768.0);
        camera.set_viewport(1024.0, 768.0);
        assert_eq!((camera.width, camera.height), (1024.0, 768.0));
        // Zero-sized viewports are ignored, not applied.
        camera.set_viewport(0.0, 0.0);
        assert_eq!((camera.width, camera.height), (1024.0, 768.0));
    }

    #[test]
    fn framing_looks_at_the_given_center() {
        let mut camera = Camera::new();
        camera.frame(Vec3::new(3.0, 1.0, -2.0), 2.0);
        assert!(camera.target.abs_diff_eq(Vec3::new(3.0, 1.0, -2.0), 1e-6));
        assert!(camera.distance > 2.0);
        let to_target = camera.target - camera.position();
        assert!((to_target.length() - camera.distance).abs() < 1e-3);
    }
}

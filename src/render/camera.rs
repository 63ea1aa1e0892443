//! Orbit camera around the target surface. Mouse drag orbits, wheel zooms.

use glam::{Mat4, Vec3};

/// Radians per pixel of mouse drag.
const ORBIT_SENSITIVITY: f32 = 0.008;
/// Zoom factor per scroll line.
const ZOOM_STEP: f32 = 0.9;
const MIN_DISTANCE: f32 = 1.0;
const MAX_DISTANCE: f32 = 60.0;
/// Keep the camera off the poles so the view matrix stays well-formed.
const MAX_PITCH: f32 = 1.54;

pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 12.0,
            yaw: 0.8,
            pitch: 0.7,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(cy * cp, sp, sy * cp) * self.distance
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch + dy * ORBIT_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    pub fn zoom(&mut self, scroll_lines: f32) {
        self.distance =
            (self.distance * ZOOM_STEP.powf(scroll_lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), aspect.max(1e-3), 0.1, 200.0);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_clamps_to_range() {
        let mut cam = OrbitCamera::new();
        cam.zoom(-1000.0);
        assert_eq!(cam.distance, MAX_DISTANCE);
        cam.zoom(1000.0);
        assert_eq!(cam.distance, MIN_DISTANCE);
    }

    #[test]
    fn pitch_never_reaches_pole() {
        let mut cam = OrbitCamera::new();
        cam.orbit(0.0, 1e6);
        let m = cam.view_proj(16.0 / 9.0);
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
    }
}

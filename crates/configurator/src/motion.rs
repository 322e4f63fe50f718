use foundation::math::Vec3;
use foundation::time::Time;

use crate::settings::{MotionSettings, OrbitSettings};

/// Small oscillating yaw applied to the model every frame.
///
/// Independent of the camera, so it never fights user input.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IdleMotion {
    amplitude_rad: f64,
    time_scale_s: f64,
}

impl IdleMotion {
    pub fn from_settings(motion: &MotionSettings) -> Self {
        Self {
            amplitude_rad: motion.idle_amplitude_rad,
            time_scale_s: motion.idle_time_scale_s,
        }
    }

    pub fn yaw_at(&self, t: Time) -> f64 {
        if self.time_scale_s <= 0.0 {
            return 0.0;
        }
        self.amplitude_rad * (t.seconds() / self.time_scale_s).sin()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub polar_rad: f64,
    pub azimuth_rad: f64,
    pub distance: f64,
}

/// Drag-to-rotate and scroll-to-zoom around the origin. No panning.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    polar_rad: f64,
    azimuth_rad: f64,
    distance: f64,
    limits: OrbitSettings,
}

impl OrbitControls {
    pub fn from_settings(orbit: &OrbitSettings) -> Self {
        let [x, y, z] = orbit.start;
        let start = Vec3::new(x, y, z);
        let distance = start.length();
        let polar = if distance > 0.0 {
            (y / distance).clamp(-1.0, 1.0).acos()
        } else {
            orbit.max_polar_rad
        };
        let defaults = OrbitSettings::default();
        let mut limits = orbit.clone();
        (limits.min_polar_rad, limits.max_polar_rad) = ordered(
            orbit.min_polar_rad,
            orbit.max_polar_rad,
            (defaults.min_polar_rad, defaults.max_polar_rad),
        );
        (limits.min_distance, limits.max_distance) = ordered(
            orbit.min_distance,
            orbit.max_distance,
            (defaults.min_distance, defaults.max_distance),
        );
        let mut controls = Self {
            polar_rad: polar,
            azimuth_rad: x.atan2(z),
            distance,
            limits,
        };
        controls.clamp();
        controls
    }

    /// Pointer drag in pixels; right and down are positive.
    pub fn drag(&mut self, dx_px: f64, dy_px: f64) {
        self.azimuth_rad -= dx_px * self.limits.rotate_rad_per_px;
        self.polar_rad -= dy_px * self.limits.rotate_rad_per_px;
        self.clamp();
    }

    /// Scroll delta; positive zooms out.
    pub fn zoom(&mut self, delta: f64) {
        self.distance *= 1.0 + delta * self.limits.zoom_per_unit;
        self.clamp();
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: Vec3::from_spherical(self.distance, self.polar_rad, self.azimuth_rad),
            polar_rad: self.polar_rad,
            azimuth_rad: self.azimuth_rad,
            distance: self.distance,
        }
    }

    fn clamp(&mut self) {
        let l = &self.limits;
        self.polar_rad = self.polar_rad.clamp(l.min_polar_rad, l.max_polar_rad);
        self.distance = self.distance.clamp(l.min_distance, l.max_distance);
    }
}

/// `(min, max)` in order; non-finite bounds fall back to `default`.
fn ordered(min: f64, max: f64, default: (f64, f64)) -> (f64, f64) {
    if !(min.is_finite() && max.is_finite()) {
        return default;
    }
    if min <= max { (min, max) } else { (max, min) }
}

use serde::{Deserialize, Serialize};

use crate::config::{require, ConfigError, Validate};

/// Tuning for orbit and transit motion.
///
/// Rates are expressed per reference frame; `tick` scales them by
/// `dt / reference_frame` so motion does not depend on the caller's frame rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitConfig {
    /// Distance kept from the anchor while orbiting.
    pub orbit_radius: f32,
    /// Radians of orbit advanced per reference frame.
    pub orbit_rate: f32,
    /// Duration of one reference frame, in seconds.
    pub reference_frame: f32,
    /// Largest heading error, in radians, at which a pending course departs.
    pub alignment_tolerance: f32,
    pub max_speed: f32,
    /// Speed gained per reference frame while far from the destination.
    pub acceleration: f32,
    /// Speed shed per reference frame inside `braking_distance`.
    pub deceleration: f32,
    /// Speed never drops below this while braking, so the vessel cannot stall.
    pub floor_speed: f32,
    pub braking_distance: f32,
}

impl Default for TransitConfig {
    fn default() -> Self {
        TransitConfig {
            orbit_radius: 20.0,
            orbit_rate: 0.01,
            reference_frame: 1.0 / 60.0,
            alignment_tolerance: 0.02,
            max_speed: 2.0,
            acceleration: 0.05,
            deceleration: 0.05,
            floor_speed: 0.5,
            braking_distance: 50.0,
        }
    }
}

impl TransitConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        crate::config::from_json_str(json)
    }

    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        crate::config::from_json_file(path)
    }

    /// Reference frames needed for one full orbit.
    pub fn orbital_period_frames(&self) -> f32 {
        crate::geometry::TAU / self.orbit_rate
    }
}

impl Validate for TransitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("orbit_radius", self.orbit_radius),
            ("orbit_rate", self.orbit_rate),
            ("reference_frame", self.reference_frame),
            ("alignment_tolerance", self.alignment_tolerance),
            ("max_speed", self.max_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("floor_speed", self.floor_speed),
        ];
        for (name, value) in positive {
            require(value.is_finite() && value > 0.0, || {
                format!("{name} must be positive, got {value}")
            })?;
        }
        require(self.braking_distance >= 0.0, || {
            format!("braking_distance must not be negative, got {}", self.braking_distance)
        })?;
        require(self.floor_speed <= self.max_speed, || {
            format!(
                "floor_speed {} exceeds max_speed {}",
                self.floor_speed, self.max_speed
            )
        })?;
        // one orbit step must not jump over the whole alignment window
        require(self.orbit_rate < 2.0 * self.alignment_tolerance, || {
            format!(
                "orbit_rate {} would step over the alignment window of ±{}",
                self.orbit_rate, self.alignment_tolerance
            )
        })
    }
}

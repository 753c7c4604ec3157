//! Plane geometry shared by the spatial index and the transit controller.

mod angle;
mod point;

pub use angle::{angular_difference, normalize_angle, TAU};
pub use point::Point2D;

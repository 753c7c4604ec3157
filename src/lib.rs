pub mod config;
pub mod data;
pub mod field;
pub mod geometry;
pub mod scene;
pub mod spatial;
pub mod transit;

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// Stable identity of a navigable body.
pub type BodyId = u32;

/// Selection radius given to bodies that do not specify one.
pub const DEFAULT_SELECTION_RADIUS: f32 = 12.0;

/// A navigable body on the map (a star, planet or station).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub name: String,
    /// Position in map world units. May move over time (orbiting planets).
    pub pos: Point2D,
    /// Pointer/touch hit tolerance around `pos`.
    #[serde(default = "default_selection_radius")]
    pub selection_radius: f32,
}

fn default_selection_radius() -> f32 {
    DEFAULT_SELECTION_RADIUS
}

impl Body {
    pub fn new(id: BodyId, name: impl Into<String>, pos: Point2D) -> Self {
        Body {
            id,
            name: name.into(),
            pos,
            selection_radius: DEFAULT_SELECTION_RADIUS,
        }
    }

    pub fn with_selection_radius(mut self, radius: f32) -> Self {
        self.selection_radius = radius;
        self
    }

    pub fn distance(&self, other: &Body) -> f32 {
        self.pos.distance(&other.pos)
    }

    pub fn distance_to_point(&self, p: Point2D) -> f32 {
        self.pos.distance(&p)
    }
}

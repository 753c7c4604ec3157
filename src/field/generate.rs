use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{require, ConfigError, Validate};
use crate::field::names::NameRegistry;
use crate::field::star_field::{FieldError, StarField};
use crate::geometry::{Point2D, TAU};
use crate::{Body, BodyId, DEFAULT_SELECTION_RADIUS};

/// Placement attempts per requested body before the disc counts as full.
const ATTEMPTS_PER_BODY: usize = 64;

/// Parameters for procedural body placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub count: usize,
    /// Radius of the disc, centred on the origin, that bodies are placed in.
    pub extent: f32,
    /// Minimum distance between any two bodies.
    pub min_separation: f32,
    pub selection_radius: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            count: 400,
            extent: 2_000.0,
            min_separation: 40.0,
            selection_radius: DEFAULT_SELECTION_RADIUS,
        }
    }
}

impl Validate for FieldConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require(self.extent.is_finite() && self.extent > 0.0, || {
            format!("extent must be positive, got {}", self.extent)
        })?;
        require(self.min_separation >= 0.0, || {
            format!("min_separation must not be negative, got {}", self.min_separation)
        })?;
        require(self.selection_radius > 0.0, || {
            format!("selection_radius must be positive, got {}", self.selection_radius)
        })
    }
}

/// Scatters `config.count` named bodies uniformly over a disc.
///
/// Ids run from 1 in placement order. When the separation constraint leaves
/// no room, placement stops early and the shorter field is returned.
pub fn generate_field<R: Rng + ?Sized>(
    config: &FieldConfig,
    rng: &mut R,
    names: &mut NameRegistry,
) -> Result<StarField, FieldError> {
    config.validate()?;

    let min_sep2 = config.min_separation * config.min_separation;
    let mut positions: Vec<Point2D> = Vec::with_capacity(config.count);
    let mut attempts = 0usize;
    let budget = config.count.saturating_mul(ATTEMPTS_PER_BODY);

    while positions.len() < config.count && attempts < budget {
        attempts += 1;
        // sqrt of a uniform sample keeps the density uniform over the disc
        let r = config.extent * rng.gen::<f32>().sqrt();
        let theta = rng.gen::<f32>() * TAU;
        let candidate = Point2D::ORIGIN.offset_polar(r, theta);
        if positions
            .iter()
            .all(|p| p.distance_squared(&candidate) >= min_sep2)
        {
            positions.push(candidate);
        }
    }

    if positions.len() < config.count {
        warn!(
            "Placed only {} of {} bodies; extent {} is too crowded for separation {}",
            positions.len(),
            config.count,
            config.extent,
            config.min_separation
        );
    }

    let bodies = positions
        .into_iter()
        .enumerate()
        .map(|(i, pos)| {
            Body::new((i + 1) as BodyId, names.generate(rng), pos)
                .with_selection_radius(config.selection_radius)
        })
        .collect::<Vec<_>>();
    debug!("Generated field of {} bodies in {} attempts", bodies.len(), attempts);

    StarField::new(bodies)
}

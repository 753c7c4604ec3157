//! Glue between pointer input, the spatial index and a vessel.
//!
//! This is the boundary a renderer or UI layer drives: it turns a pointer
//! position into a body, a body into a travel request, and frame time into
//! controller ticks. Nothing here draws.

use log::debug;
use thiserror::Error;

use crate::field::StarField;
use crate::geometry::Point2D;
use crate::spatial::{SharedIndex, SpatialError};
use crate::transit::{TransitConfig, TransitController, TransitError, VesselId};
use crate::BodyId;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Transit(#[from] TransitError),
}

pub struct Scene {
    pub field: StarField,
    index: SharedIndex,
    vessel: TransitController,
}

impl Scene {
    /// Builds the index over `field` and puts a vessel in orbit around `home`.
    pub fn new(
        field: StarField,
        vessel: VesselId,
        home: BodyId,
        config: TransitConfig,
    ) -> Result<Self, SceneError> {
        let index = SharedIndex::build(&field.bodies)?;
        let vessel = TransitController::new(vessel, home, 0.0, config, &field)?;
        Ok(Scene {
            field,
            index,
            vessel,
        })
    }

    pub fn vessel(&self) -> &TransitController {
        &self.vessel
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    /// The body under `point`, if the point is inside its selection radius.
    pub fn select_at(&self, point: Point2D) -> Result<Option<BodyId>, SceneError> {
        Ok(self.index.load().pick(point)?.map(|hit| hit.id))
    }

    /// Picks the body under `point` and sets course for it.
    ///
    /// Returns `Ok(None)` when nothing was hit.
    pub fn travel_to_point(&mut self, point: Point2D) -> Result<Option<BodyId>, SceneError> {
        let Some(target) = self.select_at(point)? else {
            return Ok(None);
        };
        self.vessel.request_travel(target, &self.field)?;
        debug!("Scene routed pointer at ({}, {}) to body {}", point.x, point.y, target);
        Ok(Some(target))
    }

    pub fn advance(&mut self, dt: f32) {
        self.vessel.tick(dt, &self.field);
    }

    /// Moves a body. The index keeps the old position until [`Scene::refresh_index`].
    pub fn move_body(&mut self, id: BodyId, pos: Point2D) -> bool {
        self.field.set_position(id, pos)
    }

    pub fn refresh_index(&self) -> Result<(), SceneError> {
        self.index.rebuild(&self.field.bodies)?;
        Ok(())
    }
}

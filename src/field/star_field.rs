use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::geometry::Point2D;
use crate::{Body, BodyId};

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("duplicate body id {0}")]
    DuplicateId(BodyId),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Read access to current body positions.
///
/// The transit controller never owns bodies; it resolves anchors through this
/// trait on every tick so that moving bodies are followed.
pub trait BodyLookup {
    fn position_of(&self, id: BodyId) -> Option<Point2D>;
}

/// Owning collection of the bodies on a map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StarField {
    pub bodies: Vec<Body>,
    #[serde(skip)]
    id_index: HashMap<BodyId, usize>,
    #[serde(skip)]
    name_index: HashMap<String, usize>,
}

impl StarField {
    pub fn new(bodies: Vec<Body>) -> Result<Self, FieldError> {
        let mut field = StarField {
            bodies,
            id_index: HashMap::new(),
            name_index: HashMap::new(),
        };
        field.rebuild_indices();
        if field.id_index.len() != field.bodies.len() {
            let mut seen = HashSet::new();
            for body in &field.bodies {
                if !seen.insert(body.id) {
                    return Err(FieldError::DuplicateId(body.id));
                }
            }
        }
        Ok(field)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index_of_id(id).map(|idx| &self.bodies[idx])
    }

    pub fn index_of_id(&self, id: BodyId) -> Option<usize> {
        self.id_index.get(&id).copied()
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    /// Moves a body. Returns `false` if no body has that id.
    ///
    /// Spatial indexes built earlier keep answering against the old position
    /// until they are rebuilt.
    pub fn set_position(&mut self, id: BodyId, pos: Point2D) -> bool {
        match self.index_of_id(id) {
            Some(idx) => {
                self.bodies[idx].pos = pos;
                true
            }
            None => false,
        }
    }

    pub fn rebuild_indices(&mut self) {
        self.id_index = self
            .bodies
            .iter()
            .enumerate()
            .map(|(idx, body)| (body.id, idx))
            .collect();
        self.name_index = self
            .bodies
            .iter()
            .enumerate()
            .map(|(idx, body)| (body.name.clone(), idx))
            .collect();
    }
}

impl BodyLookup for StarField {
    fn position_of(&self, id: BodyId) -> Option<Point2D> {
        self.get(id).map(|b| b.pos)
    }
}

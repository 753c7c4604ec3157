use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::BodyLookup;
use crate::geometry::Point2D;
use crate::{Body, BodyId};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialError {
    #[error("spatial index has no bodies")]
    EmptyIndex,
}

/// Node in a 2D k-d tree. Holds a snapshot of one body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KDNode {
    pub point: Point2D,
    pub body: BodyId,
    /// Position of the body in the slice the tree was built from.
    pub index: usize,
    pub selection_radius: f32,
    pub axis: usize,
    pub left: Option<Box<KDNode>>,
    pub right: Option<Box<KDNode>>,
}

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Nearest {
    pub id: BodyId,
    pub index: usize,
    /// Where the body was when the tree was built.
    pub position: Point2D,
    pub distance: f32,
    pub selection_radius: f32,
}

/// A body whose live position has drifted away from the tree's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StaleQuery {
    pub id: BodyId,
    pub snapshot: Point2D,
    pub current: Point2D,
    pub drift: f32,
}

impl Nearest {
    /// Compares the answer against current positions.
    ///
    /// Returns `Some` when the body has moved more than `tolerance` since the
    /// tree was built, meaning a different body may now be nearest. This is
    /// informational; the answer itself is still the snapshot's answer.
    pub fn stale_against<L: BodyLookup + ?Sized>(
        &self,
        lookup: &L,
        tolerance: f32,
    ) -> Option<StaleQuery> {
        let current = lookup.position_of(self.id)?;
        let drift = current.distance(&self.position);
        (drift > tolerance).then_some(StaleQuery {
            id: self.id,
            snapshot: self.position,
            current,
            drift,
        })
    }
}

/// Balanced 2D k-d tree over a snapshot of body positions.
///
/// The tree never follows later body movement; call [`KDTree::rebuild`] (or
/// swap a fresh tree into a [`super::SharedIndex`]) to pick up new positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KDTree {
    pub root: Option<Box<KDNode>>,
    len: usize,
}

impl KDTree {
    pub fn build(bodies: &[Body]) -> Result<Self, SpatialError> {
        if bodies.is_empty() {
            return Err(SpatialError::EmptyIndex);
        }
        let mut indices: Vec<usize> = (0..bodies.len()).collect();
        let root = Self::build_recursive(bodies, &mut indices, 0);
        Ok(KDTree {
            root,
            len: bodies.len(),
        })
    }

    /// Re-snapshots `bodies`. On error the current tree is left untouched.
    pub fn rebuild(&mut self, bodies: &[Body]) -> Result<(), SpatialError> {
        *self = Self::build(bodies)?;
        Ok(())
    }

    fn build_recursive(bodies: &[Body], idx: &mut [usize], depth: usize) -> Option<Box<KDNode>> {
        if idx.is_empty() {
            return None;
        }

        let axis = depth % 2;
        idx.sort_by(|&a, &b| bodies[a].pos.axis(axis).total_cmp(&bodies[b].pos.axis(axis)));
        let mid = idx.len() / 2;
        let median = idx[mid];
        let body = &bodies[median];

        let (lower, rest) = idx.split_at_mut(mid);
        Some(Box::new(KDNode {
            point: body.pos,
            body: body.id,
            index: median,
            selection_radius: body.selection_radius,
            axis,
            left: Self::build_recursive(bodies, lower, depth + 1),
            right: Self::build_recursive(bodies, &mut rest[1..], depth + 1),
        }))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The body nearest to `target`, by snapshot position.
    pub fn nearest(&self, target: Point2D) -> Result<Nearest, SpatialError> {
        let mut best: Option<(&KDNode, f32)> = None;
        Self::nearest_recursive(&self.root, target, &mut best);
        let (node, dist2) = best.ok_or(SpatialError::EmptyIndex)?;
        Ok(Nearest {
            id: node.body,
            index: node.index,
            position: node.point,
            distance: dist2.sqrt(),
            selection_radius: node.selection_radius,
        })
    }

    fn nearest_recursive<'a>(
        node: &'a Option<Box<KDNode>>,
        target: Point2D,
        best: &mut Option<(&'a KDNode, f32)>,
    ) {
        if let Some(noderef) = node.as_deref() {
            let dist2 = noderef.point.distance_squared(&target);
            if best.as_ref().map_or(true, |&(_, b)| dist2 < b) {
                *best = Some((noderef, dist2));
            }

            let axis = noderef.axis;
            let delta = target.axis(axis) - noderef.point.axis(axis);
            let (near, far) = if delta < 0.0 {
                (&noderef.left, &noderef.right)
            } else {
                (&noderef.right, &noderef.left)
            };

            Self::nearest_recursive(near, target, best);
            // everything across the split is at least |delta| away
            if best.as_ref().map_or(true, |&(_, b)| delta * delta < b) {
                Self::nearest_recursive(far, target, best);
            }
        }
    }

    /// Hit-test: the nearest body, if `point` falls inside its selection radius.
    pub fn pick(&self, point: Point2D) -> Result<Option<Nearest>, SpatialError> {
        let nearest = self.nearest(point)?;
        Ok((nearest.distance <= nearest.selection_radius).then_some(nearest))
    }

    /// Returns up to `n` nearest neighbours within the given radius of the target point.
    pub fn nearest_n_within_radius(
        &self,
        target: Point2D,
        radius: f32,
        n: usize,
    ) -> Vec<(usize, f32)> {
        let mut results = Vec::new();
        let radius2 = radius * radius;
        Self::search_recursive(&self.root, target, radius2, &mut results);
        // sort ascending by distance
        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        results.truncate(n);
        results
    }

    fn search_recursive(
        node: &Option<Box<KDNode>>,
        target: Point2D,
        radius2: f32,
        results: &mut Vec<(usize, f32)>,
    ) {
        if let Some(noderef) = node {
            let dist2 = noderef.point.distance_squared(&target);
            if dist2 <= radius2 {
                results.push((noderef.index, dist2.sqrt()));
            }

            let axis = noderef.axis;
            let delta = target.axis(axis) - noderef.point.axis(axis);
            let (first, second) = if delta < 0.0 {
                (&noderef.left, &noderef.right)
            } else {
                (&noderef.right, &noderef.left)
            };

            Self::search_recursive(first, target, radius2, results);
            if delta * delta <= radius2 {
                Self::search_recursive(second, target, radius2, results);
            }
        }
    }

    /// Largest distance any indexed body has moved since the snapshot.
    /// Bodies missing from `lookup` are ignored.
    pub fn max_drift<L: BodyLookup + ?Sized>(&self, lookup: &L) -> f32 {
        let mut stack: Vec<&KDNode> = self.root.as_deref().into_iter().collect();
        let mut max = 0.0_f32;
        while let Some(node) = stack.pop() {
            if let Some(current) = lookup.position_of(node.body) {
                max = max.max(current.distance(&node.point));
            }
            stack.extend(node.left.as_deref());
            stack.extend(node.right.as_deref());
        }
        max
    }
}

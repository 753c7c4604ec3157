use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::spatial::kd_tree::{KDTree, SpatialError};
use crate::Body;

/// A swappable handle to the current spatial index.
///
/// Readers take a cheap `Arc` clone and query it without holding the lock,
/// so a rebuild never blocks an in-flight query and never mutates a tree
/// someone is reading.
#[derive(Debug)]
pub struct SharedIndex {
    current: RwLock<Arc<KDTree>>,
}

impl SharedIndex {
    pub fn new(tree: KDTree) -> Self {
        SharedIndex {
            current: RwLock::new(Arc::new(tree)),
        }
    }

    pub fn build(bodies: &[Body]) -> Result<Self, SpatialError> {
        Ok(Self::new(KDTree::build(bodies)?))
    }

    pub fn load(&self) -> Arc<KDTree> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs `tree`, returning the one it replaced.
    pub fn swap(&self, tree: KDTree) -> Arc<KDTree> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(tree))
    }

    /// Builds a fresh snapshot of `bodies` outside the lock and swaps it in.
    pub fn rebuild(&self, bodies: &[Body]) -> Result<(), SpatialError> {
        let tree = KDTree::build(bodies)?;
        debug!("Rebuilt spatial index over {} bodies", tree.len());
        self.swap(tree);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2D;
    use std::thread;

    fn pair(x: f32) -> Vec<Body> {
        vec![
            Body::new(1, "A", Point2D::ORIGIN),
            Body::new(2, "B", Point2D::new(x, 0.0)),
        ]
    }

    #[test]
    fn readers_keep_their_snapshot_across_a_swap() {
        let shared = SharedIndex::build(&pair(100.0)).expect("index");
        let before = shared.load();
        shared.rebuild(&pair(5.0)).expect("rebuild");

        let query = Point2D::new(4.0, 0.0);
        assert_eq!(before.nearest(query).expect("nearest").id, 1);
        assert_eq!(shared.load().nearest(query).expect("nearest").id, 2);
    }

    #[test]
    fn failed_rebuild_keeps_current_index() {
        let shared = SharedIndex::build(&pair(100.0)).expect("index");
        assert_eq!(shared.rebuild(&[]), Err(SpatialError::EmptyIndex));
        assert_eq!(shared.load().len(), 2);
    }

    #[test]
    fn concurrent_readers() {
        let shared = Arc::new(SharedIndex::build(&pair(100.0)).expect("index"));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let query = Point2D::new(i as f32 * 30.0, 0.0);
                    shared.load().nearest(query).map(|n| n.id)
                })
            })
            .collect();
        let ids: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("nearest"))
            .collect();
        assert_eq!(ids, vec![1, 1, 2, 2]);
    }
}

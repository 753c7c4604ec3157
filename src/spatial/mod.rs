pub mod handle;
pub mod kd_tree;

pub use handle::SharedIndex;
pub use kd_tree::{KDTree, Nearest, SpatialError, StaleQuery};

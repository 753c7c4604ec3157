//! The catalogue of navigable bodies, plus procedural placement and naming.

pub mod generate;
pub mod names;
pub mod star_field;

pub use generate::{generate_field, FieldConfig};
pub use names::NameRegistry;
pub use star_field::{BodyLookup, FieldError, StarField};

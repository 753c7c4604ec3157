//! Orbit and transit motion of a single vessel.

pub mod config;
pub mod controller;
pub mod events;
pub mod voyage;

pub use config::TransitConfig;
pub use controller::{OrbitAnchor, TransitController, TransitError, TransitPlan, TransitState};
pub use events::{EventBus, TransitEvent, VesselId};
pub use voyage::{simulate_voyage, VoyageReport};

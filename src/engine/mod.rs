//! Isochrone engine, route builder and orchestration.

pub mod models;
pub mod orchestration;
pub mod physics;
pub mod route_builder;
pub mod router;

pub use models::*;
pub use orchestration::{run_competitors, route_waypoint_legs, CompetitorSeed, Leg, Passage};
pub use route_builder::build_route;
pub use router::{EngineState, IsochroneEngine, IsochroneRun};

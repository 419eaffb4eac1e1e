//! Isochrone-expansion sailing router over gridded meteo fields.
//!
//! `geo`, `polar`, `grib`, `mask` are the leaf providers; `engine` consumes
//! them to expand isochrones, build finalised routes and orchestrate
//! waypoint legs / multi-competitor runs. `config` and `error` are the
//! ambient configuration surface and error taxonomy shared by all of them.

pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod grib;
pub mod mask;
pub mod polar;

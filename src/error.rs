//! Error kinds shared by every core component.
//!
//! Variant names are stable so callers can match on them
//! without translation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("invalid grib: {0}")]
    InvalidGrib(String),

    #[error("point ({lat}, {lon}) is outside the grib zone")]
    GridOutOfBounds { lat: f64, lon: f64 },

    #[error("invalid polar: {0}")]
    PolarInvalid(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("no solution: first successor generation was empty")]
    NoSolution,

    #[error("routing stopped by external request")]
    Stopped,

    #[error("destination not reached: {0}")]
    Unreached(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoutingError>;

//! Great-circle geometry helpers.

pub mod haversine;

pub use haversine::{haversine_km, round_km, EARTH_RADIUS_KM};

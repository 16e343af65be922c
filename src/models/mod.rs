//! Domain models for the ride-price comparison backend.
//!
//! This module contains the per-session trip intent, the per-cycle
//! provider quotes and the snapshot pushed to clients.

pub mod coordinates;
pub mod intent;
pub mod quote;
pub mod snapshot;

// Re-export all models for convenient access
pub use coordinates::Coordinates;
pub use intent::TripIntent;
pub use quote::{Diagnostics, ProviderQuote, SAME_ADDRESS_REASON};
pub use snapshot::{ComparisonSnapshot, PriceUpdate};

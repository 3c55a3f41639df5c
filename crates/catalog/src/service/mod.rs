//! Stateless data-access services over the table stores.
//!
//! Every call is a single round trip: no retry, no batching, no caching.

mod points;
mod settings;

pub use points::PointsService;
pub use settings::SettingsService;

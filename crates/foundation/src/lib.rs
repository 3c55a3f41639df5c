pub mod future;
pub mod geo;
pub mod ids;

// Foundation crate: small, well-tested primitives only.
pub use future::*;
pub use geo::*;
pub use ids::*;

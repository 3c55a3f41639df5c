//! Synchronization core between the map surface and the point/settings stores.
//!
//! [`MapSync`] owns the point list, camera, and selection for one session scope.
//! Remote mutations follow confirm-then-apply: local state changes only after
//! the store acknowledges, and only while the scope is open and still loaded
//! for the identity that issued the write.

pub mod config;
pub mod form;
pub mod state;
pub mod sync;

pub use config::*;
pub use form::*;
pub use state::*;
pub use sync::*;

//! Point and settings records, the table stores that hold them, and the
//! stateless services the map core talks to.

pub mod error;
pub mod memory;
pub mod point;
pub mod rest;
pub mod service;
pub mod settings;
pub mod store;

pub use error::*;
pub use memory::*;
pub use point::*;
pub use service::*;
pub use settings::*;
pub use store::*;

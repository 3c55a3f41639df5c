pub mod event_bus;
pub mod generation;
pub mod session;

pub use event_bus::*;
pub use generation::*;
pub use session::*;

//! The map surface contract: camera state, named styles, marker and popup
//! projection, and routing of surface input into core actions.

pub mod input;
pub mod markers;
pub mod selection;
pub mod style;
pub mod view;

pub use input::*;
pub use markers::*;
pub use selection::*;
pub use style::*;
pub use view::*;

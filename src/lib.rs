//! Grid-based naval combat engine with a TCP relay for exchanging fleet
//! layouts between clients.

mod board;
mod common;
mod events;
mod fleet;
mod game;
mod grid;
mod logging;
pub mod relay;

pub use board::*;
pub use common::*;
pub use events::*;
pub use fleet::*;
pub use game::*;
pub use grid::*;
pub use logging::init_logging;

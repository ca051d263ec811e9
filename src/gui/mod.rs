//! A terminal front end showing what a running bridge is doing.

mod error;
mod monitor;

pub use error::GuiError;
pub use monitor::monitor;

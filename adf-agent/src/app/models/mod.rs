//! Data models for the terminal dashboard

mod app;
mod pane;

pub use app::*;
pub use pane::*;

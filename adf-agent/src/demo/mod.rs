//! Offline backends for `--demo`
//!
//! The real driver, dispatch and normalizer run unchanged against these.

mod service;
mod status;

pub use service::DemoAgentService;
pub use status::{DemoStatusSource, DEMO_RUN_ID};

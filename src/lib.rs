//! wifi_analyzer library components
//!
//! The frame parser, the BSS/STA state manager and the capture session, exposed for the
//! binary and for integration tests.

pub mod agent;
pub mod airtime;
pub mod channels;
pub mod config;
pub mod devices;
pub mod frame_parser;
pub mod publisher;
pub mod session;
pub mod snapshot;
pub mod splitter;
pub mod state;
pub mod status;
pub mod util;

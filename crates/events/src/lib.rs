//! Event system for the KEMTLS demo server
//!
//! This crate provides the event vocabulary streamed to demo observers and
//! the broadcast bus that fans events out to every connected observer.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;

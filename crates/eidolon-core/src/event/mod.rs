//! Session event distribution for Eidolon.

pub mod bus;

pub use bus::EventBus;

//! Core infrastructure shared by the background work orchestration crates.
//!
//! This crate provides the pieces every other `aya-*` crate builds on:
//! - an event system for observability (`events`)
//! - the shared error taxonomy (`error`)

pub mod error;
pub mod events;

pub use error::AyaError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};

//! # mira-view
//!
//! Headless viewer for a mira mirror source: connects over TCP, runs
//! the command pump, and applies decoded updates to an in-memory
//! surface.

pub mod config;
pub mod surface;

//! Durable preference storage contracts.

pub mod prefs;

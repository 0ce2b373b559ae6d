//! Storage-domain contracts, path helpers and directory adapters.

pub mod memory;
pub mod native;
pub mod path;
pub mod service;
pub mod types;

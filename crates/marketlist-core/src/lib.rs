pub mod action;
pub mod config;
pub mod enrich;
pub mod error;
pub mod flows;
pub mod io;
pub mod keys;
pub mod orchestrator;
pub mod page;
pub mod paths;
pub mod product;
pub mod progress;
pub mod registry;
pub mod repair;
pub mod resilience;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ListingError, Result};

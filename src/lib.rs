pub mod api;
pub mod archive;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod logging;
pub mod report;
pub mod scan;
pub mod scheduler;

pub use error::{Error, Result};

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod lookup;
pub mod profile;
pub mod report;
pub mod storage;
pub mod timing;
pub mod workload;

pub use error::{Error, Result};

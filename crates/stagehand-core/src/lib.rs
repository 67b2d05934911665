pub mod advisor;
pub mod capture;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod hook;
pub mod io;
pub mod orchestrate;
pub mod paths;
pub mod session;

pub use error::{Result, StagehandError};

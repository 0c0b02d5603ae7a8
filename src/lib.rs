pub mod control_plane;
pub mod error;
pub mod fairness;
pub mod fetch;
pub mod job;
pub mod kubectl;
pub mod lifecycle;
pub mod ownership;
pub mod status;
pub mod wait;

pub(crate) mod process;
pub(crate) mod temp_path;
pub(crate) mod time_ext;
pub(crate) mod user_host;

#[cfg(test)]
pub(crate) mod testing;

pub mod cli;

pub use error::{Error, Result};

//! Service implementations
//!
//! Real implementations of the supervisor's service traits. These are the
//! production implementations that touch the environment and the OS.

pub mod env_validator;
pub mod output_handler;
pub mod process_manager;

#[cfg(test)]
mod tests;

pub use env_validator::RealEnvValidator;
pub use process_manager::RealWorkerSpawner;

//! Service implementations
//!
//! Real implementations of the worker's service traits.

pub mod master_link;

#[cfg(test)]
mod tests;

pub use master_link::{DetachedLink, StdoutLink};

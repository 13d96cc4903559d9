//! Unit tests for the worker's service implementations

mod master_link;

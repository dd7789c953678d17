//! CLI command implementations.

pub mod config;
pub mod context;
pub mod datasets;
pub mod employees;
pub mod report;
pub mod rows;
pub mod send;
pub mod threads;
pub mod whoami;

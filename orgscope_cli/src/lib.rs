//! orgscope command line interface
//!
//! The binary is a thin clap layer; commands, configuration and output
//! formatting live here so integration tests can drive them directly.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod terminal;

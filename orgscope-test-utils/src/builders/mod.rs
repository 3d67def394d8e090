//! Builders and fixtures for describes and metadata rows

mod test_data;

pub use test_data::*;

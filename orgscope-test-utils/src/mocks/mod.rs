//! Mock implementations for testing

mod client;

pub use client::{Endpoint, MockQueryClient};

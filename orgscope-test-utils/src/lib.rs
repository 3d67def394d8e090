//! Test utilities for orgscope
//!
//! This crate provides a scripted query client and builders for describes
//! and metadata rows, so engine tests run without an org.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{DescribeBuilder, FieldBuilder, account_describe};
pub use mocks::{Endpoint, MockQueryClient};

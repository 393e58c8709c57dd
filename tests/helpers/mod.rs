//! Test helpers module
//!
//! In-memory backend, scripted auth backend, test data builders and a test
//! context wiring them into the EventHub services.

#![allow(dead_code)]

pub mod mock_auth;
pub mod mock_gateway;
pub mod simple_test;
pub mod test_context;
pub mod test_data;

pub use mock_auth::*;
pub use mock_gateway::*;
pub use simple_test::*;
pub use test_context::*;
pub use test_data::*;

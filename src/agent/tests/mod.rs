pub mod delegation_tests;

pub use test_utils::*;

#![cfg(test)]

pub mod common;
pub mod pipeline_tests;
pub mod routing_tests;
pub mod services_tests;

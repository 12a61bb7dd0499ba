//! Test utilities and fixtures for shadertrack
//!
//! This crate provides shared test helpers for the integration tests of the
//! core and CLI crates (tests/ directories).

pub mod compile;
pub mod fixtures;
pub mod mocks;

//! Shared utilities

pub mod string;

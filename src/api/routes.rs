//! Endpoint handlers, grouped by concern

pub mod diagnostics;
pub mod identity;
pub mod vector;

//! Core types shared across the tablegate crates

pub mod error_builder;
pub mod problemdetails;

pub use error_builder::*;
pub use problemdetails::{Problem, ProblemDetails};

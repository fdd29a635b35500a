//! HTTP handlers for the gateway

mod health;
mod meta;
mod tables;
mod types;

pub use health::*;
pub use meta::*;
pub use tables::*;
pub use types::*;

//! Block types and per-type optical properties.
#![forbid(unsafe_code)]

pub mod types;

pub use types::{BlockEntity, BlockType, Opacity};

// src/validation/mod.rs

pub mod plan;

pub use plan::{SchemaError, parse_resolution, validate_resolution, validate_step, validate_value};

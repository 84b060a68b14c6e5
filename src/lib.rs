// src/lib.rs

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod protocol;
pub mod tools;
pub mod validation;

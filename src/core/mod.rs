//! Core data types and frame I/O.

pub mod cloud;
pub mod loaders;
pub mod writers;

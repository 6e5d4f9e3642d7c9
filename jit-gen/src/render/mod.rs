//! Source renderers for generated programs.

pub mod java;

//! Running generated programs: backends, timeouts and the iteration loop.

pub mod backend;
pub mod error;
pub mod java;
pub mod run;

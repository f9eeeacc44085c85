//! Declarative inputs for an advice run.

pub mod yaml;

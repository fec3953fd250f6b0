//! Types shared between the tracking backend and its display collaborators.

pub mod types;

pub use types::*;

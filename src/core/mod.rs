//! Shared enumerations and the crate error type.

pub mod errors;
pub mod types;

pub use errors::{Error, Result};
pub use types::{
    Access, Antiquity, Derivability, Direction, Distribution, Exists, Implementation, Mode,
    Persistence, ProcessState, Scope, Severity, Synchronization, Visibility,
};

//! Canonical invoice model, envelope, code lists and errors.
//!
//! The types mirror the canonical JSON document field for field, so an
//! envelope decodes straight into an [`Invoice`] and back.

mod builder;
pub mod codes;
mod envelope;
mod error;
mod types;
pub mod units;

pub use builder::*;
pub use envelope::*;
pub use error::*;
pub use types::*;

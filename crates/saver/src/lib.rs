//! # WS Metadata Saver
//!
//! Turns a loaded [`wsmeta_model::DocumentGraph`] into a flat directory of
//! files whose import/include locations point at each other.
//!
//! [`plan`] is pure: it names every section (by target namespace or by source
//! file name, unique ignoring case), rewrites reference attribute values in
//! place and collects `could not resolve reference` warnings for edges whose
//! target is not saved. [`SavePlan::write`] does the I/O.

mod error;
mod naming;
mod plan;

pub use error::{Result, SaveError};
pub use plan::{plan, PlannedFile, SaveOptions, SavePlan};
pub use wsmeta_location::NamingStrategy;

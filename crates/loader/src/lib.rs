//! # WS Metadata Loader
//!
//! Builds the complete metadata graph of a service from an endpoint address
//! or a set of local files.
//!
//! ## Traversal
//!
//! ```text
//! EntryPoint (URI | file globs)
//!     │
//!     ├──> EndpointResolver / file read ──> MetadataSection
//!     │
//!     ├──> depth-first over import/include/EPR edges
//!     │      ├─ resolve_import_location (saved copies first)
//!     │      └─ VisitedSet: each normalized location fetched once
//!     │
//!     └──> chameleon fixup ──> LoadOutcome { graph, errors }
//! ```
//!
//! Failures of single edges are collected in [`LoadOutcome::errors`]; a load
//! only fails when no WSDL or XSD could be obtained at all, or when it is
//! cancelled.

mod chameleon;
mod config;
mod error;
mod loader;
mod state;

pub use chameleon::link_chameleons;
pub use config::{ResolverConfig, CONFIG_ENV};
pub use error::{LoadError, Result};
pub use loader::{DocumentGraphLoader, EntryPoint, LoadOutcome};
pub use state::{ResolutionState, VisitedSet};

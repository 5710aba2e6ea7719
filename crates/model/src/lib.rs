//! # WS Metadata Model
//!
//! Metadata sections and the document graph that ties them together.
//!
//! ## Architecture
//!
//! ```text
//! raw XML text
//!     │
//!     ├──> Dialect sniffing (root element)
//!     │      └─ WSDL / XSD / Policy / EndpointReference / opaque
//!     │
//!     ├──> MetadataSection (parsed payload + original text)
//!     │      └─ RawReference edges (wsdl:import, xsd:import|include|redefine)
//!     │
//!     └──> DocumentGraph (arena)
//!            ├─ Sections indexed by SectionId
//!            ├─ ImportReferences indexed by ReferenceId
//!            └─ ChameleonLinks (schema → adopted namespace)
//! ```

mod error;
mod graph;
mod parse;
mod section;
mod types;
pub mod xml;

pub use error::{ModelError, Result};
pub use graph::{ChameleonLink, DocumentGraph, ImportReference, ResolvedTarget};
pub use parse::{
    is_well_known_namespace, MEX_NS, POLICY_NS, POLICY_NS_15, WSA_NS, WSA_NS_2004, WSDL_NS,
    XML_NS, XSD_NS,
};
pub use section::MetadataSection;
pub use types::{
    Dialect, EndpointReferenceDocument, OpaqueDocument, PolicyDocument, RawReference,
    ReferenceId, ReferenceKind, SchemaDocument, SectionId, SectionPayload, WsdlDocument,
};

//! # WS Metadata Transport
//!
//! Retrieval of metadata documents from service endpoints.
//!
//! ## Retrieval
//!
//! ```text
//! address
//!     │
//!     ├──> retrieval_plan (GET / ?wsdl / help page / MEX / MEX on /mex)
//!     │
//!     ├──> first_success ── terminal fault? ──> abort
//!     │        │
//!     │        └─> EndpointResolver::execute
//!     │               ├─ 401/407 → credentials provider, retry once
//!     │               ├─ 403     → client certificate provider, retry once
//!     │               └─ cancellation polled while the request is in flight
//!     │
//!     └──> MetadataSection list (at least one WSDL or XSD)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wsmeta_transport::{EndpointResolver, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = HttpTransport::new("wsmeta", None)?;
//!     let resolver = EndpointResolver::new(Arc::new(transport));
//!     let sections = resolver.resolve("http://localhost/Service.svc").await?;
//!     println!("{} sections", sections.len());
//!     Ok(())
//! }
//! ```

mod cancel;
mod error;
pub mod mex;
mod plan;
mod providers;
mod resolver;
mod transport;

pub use cancel::CancellationSignal;
pub use error::{FaultKind, ResolveError, Result, TransportFault};
pub use plan::{
    first_success, help_page_metadata_link, retrieval_plan, Attempt,
    AttemptMethod, AttemptOutcome, PlanError,
};
pub use providers::{
    ClientCertificate, ClientCertificateProvider, HttpCredentialsProvider, NetworkCredential,
    NoProvider, ServerCertificateValidation, TrustDecision,
};
pub use resolver::{
    EndpointResolver, ResolverOptions, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_POLL_INTERVAL,
};
pub use transport::{
    HttpTransport, Method, Transport, TransportRequest, TransportResponse, SOAP12_CONTENT_TYPE,
};

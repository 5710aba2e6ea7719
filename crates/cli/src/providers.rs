//! Providers backed by command-line options.

use url::Url;
use wsmeta_transport::{
    ClientCertificate, ClientCertificateProvider, HttpCredentialsProvider, NetworkCredential,
    ServerCertificateValidation, TransportFault, TrustDecision,
};

/// Answers every authentication challenge with the same credential.
pub struct FixedCredentials(pub NetworkCredential);

impl HttpCredentialsProvider for FixedCredentials {
    fn credentials(&self, url: &Url, fault: &TransportFault) -> Option<NetworkCredential> {
        log::info!("{url} answered {}, sending credentials", fault.kind);
        Some(self.0.clone())
    }
}

/// Presents the certificate loaded from `--client-cert`.
pub struct FixedCertificate(pub ClientCertificate);

impl ClientCertificateProvider for FixedCertificate {
    fn certificate(&self, url: &Url) -> Option<ClientCertificate> {
        log::info!("{url} requires a client certificate");
        Some(self.0.clone())
    }
}

pub struct AcceptInvalidCertificates;

impl ServerCertificateValidation for AcceptInvalidCertificates {
    fn before(&self, url: &Url) -> TrustDecision {
        log::debug!("skipping server certificate validation for {url}");
        TrustDecision::AcceptInvalid
    }
}

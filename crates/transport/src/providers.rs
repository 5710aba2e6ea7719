//! Callbacks the resolver consults when an endpoint asks for credentials or
//! presents a certificate.

use crate::error::TransportFault;
use url::Url;

/// User name and password for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkCredential {
    pub user_name: String,
    pub password: String,
}

impl NetworkCredential {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for NetworkCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkCredential")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .finish()
    }
}

/// PEM bundle holding a client certificate and its private key.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub pem: Vec<u8>,
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("pem_bytes", &self.pem.len())
            .finish()
    }
}

/// How the server certificate of the next request is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustDecision {
    #[default]
    Default,
    AcceptInvalid,
}

/// Asked for credentials after a 401/407 fault.
pub trait HttpCredentialsProvider: Send + Sync {
    fn credentials(&self, url: &Url, fault: &TransportFault) -> Option<NetworkCredential>;
}

/// Asked for a client certificate after a 403 fault.
pub trait ClientCertificateProvider: Send + Sync {
    fn certificate(&self, url: &Url) -> Option<ClientCertificate>;
}

/// Hook around every request to decide how the server certificate is
/// checked.
pub trait ServerCertificateValidation: Send + Sync {
    fn before(&self, url: &Url) -> TrustDecision;

    fn after(&self, _url: &Url) {}
}

impl<F> HttpCredentialsProvider for F
where
    F: Fn(&Url, &TransportFault) -> Option<NetworkCredential> + Send + Sync,
{
    fn credentials(&self, url: &Url, fault: &TransportFault) -> Option<NetworkCredential> {
        self(url, fault)
    }
}

impl<F> ClientCertificateProvider for F
where
    F: Fn(&Url) -> Option<ClientCertificate> + Send + Sync,
{
    fn certificate(&self, url: &Url) -> Option<ClientCertificate> {
        self(url)
    }
}

/// Provider that never supplies anything and keeps default validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvider;

impl HttpCredentialsProvider for NoProvider {
    fn credentials(&self, _url: &Url, _fault: &TransportFault) -> Option<NetworkCredential> {
        None
    }
}

impl ClientCertificateProvider for NoProvider {
    fn certificate(&self, _url: &Url) -> Option<ClientCertificate> {
        None
    }
}

impl ServerCertificateValidation for NoProvider {
    fn before(&self, _url: &Url) -> TrustDecision {
        TrustDecision::Default
    }
}

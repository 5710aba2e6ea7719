use crate::error::{FaultKind, TransportFault};
use crate::providers::{ClientCertificate, NetworkCredential, TrustDecision};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub const SOAP12_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// One HTTP exchange as the resolver sees it
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
    pub content_type: Option<&'static str>,
    pub credential: Option<NetworkCredential>,
    pub certificate: Option<ClientCertificate>,
    pub trust: TrustDecision,
}

impl TransportRequest {
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            body: None,
            content_type: None,
            credential: None,
            certificate: None,
            trust: TrustDecision::Default,
        }
    }

    #[must_use]
    pub fn post(url: Url, body: String, content_type: &'static str) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            content_type: Some(content_type),
            ..Self::get(url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

impl TransportResponse {
    /// Turn a non-2xx status into a classified fault.
    pub fn into_result(self) -> Result<Self, TransportFault> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(TransportFault::from_status(self.status, self.url.as_str()))
        }
    }

    #[must_use]
    pub fn looks_like_html(&self) -> bool {
        let declared = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"));
        declared || {
            let head = self.body.trim_start();
            let starts_with = |prefix: &str| {
                head.get(..prefix.len())
                    .is_some_and(|h| h.eq_ignore_ascii_case(prefix))
            };
            starts_with("<html") || starts_with("<!doctype html")
        }
    }
}

/// Sends requests to endpoints.
///
/// Connection-level failures are returned as faults; HTTP error statuses are
/// returned as responses and classified by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFault>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    insecure_client: reqwest::Client,
    user_agent: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, TransportFault> {
        Ok(Self {
            client: build_client(user_agent, timeout, None, false)?,
            insecure_client: build_client(user_agent, timeout, None, true)?,
            user_agent: user_agent.to_string(),
            timeout,
        })
    }

    fn client_for(&self, request: &TransportRequest) -> Result<reqwest::Client, TransportFault> {
        let accept_invalid = request.trust == TrustDecision::AcceptInvalid;
        match &request.certificate {
            Some(certificate) => build_client(
                &self.user_agent,
                self.timeout,
                Some(certificate),
                accept_invalid,
            ),
            None if accept_invalid => Ok(self.insecure_client.clone()),
            None => Ok(self.client.clone()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFault> {
        if !matches!(request.url.scheme(), "http" | "https") {
            return Err(TransportFault::new(
                FaultKind::Other,
                request.url.as_str(),
                format!("scheme {} is not supported over HTTP", request.url.scheme()),
            ));
        }

        let client = self.client_for(&request)?;
        let mut builder = match request.method {
            Method::Get => client.get(request.url.clone()),
            Method::Post => client.post(request.url.clone()),
        };
        if let Some(content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(credential) = &request.credential {
            builder = builder.basic_auth(&credential.user_name, Some(&credential.password));
        }

        log::debug!("{:?} {}", request.method, request.url);
        let response = builder
            .send()
            .await
            .map_err(|err| fault_from_error(&request.url, &err))?;

        let status = response.status().as_u16();
        let url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|err| fault_from_error(&url, &err))?;

        Ok(TransportResponse {
            status,
            url,
            content_type,
            body,
        })
    }
}

fn build_client(
    user_agent: &str,
    timeout: Option<Duration>,
    certificate: Option<&ClientCertificate>,
    accept_invalid: bool,
) -> Result<reqwest::Client, TransportFault> {
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .danger_accept_invalid_certs(accept_invalid);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(certificate) = certificate {
        let identity = reqwest::Identity::from_pem(&certificate.pem).map_err(|err| {
            TransportFault::new(
                FaultKind::Other,
                "",
                format!("invalid client certificate: {err}"),
            )
        })?;
        builder = builder.identity(identity);
    }
    builder
        .build()
        .map_err(|err| TransportFault::new(FaultKind::Other, "", err.to_string()))
}

fn fault_from_error(url: &Url, err: &reqwest::Error) -> TransportFault {
    let mut message = err.to_string();
    let mut kind = FaultKind::Other;
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        let text = inner.to_string();
        if text.to_ascii_lowercase().contains("certificate") {
            kind = FaultKind::TrustFailure;
        }
        message = format!("{message}: {text}");
        source = inner.source();
    }
    TransportFault::new(kind, url.as_str(), message)
}

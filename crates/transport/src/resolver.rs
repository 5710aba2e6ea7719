use crate::cancel::CancellationSignal;
use crate::error::{FaultKind, ResolveError, Result, TransportFault};
use crate::mex::{self, MexEntry};
use crate::plan::{
    first_success, help_page_metadata_link, retrieval_plan, Attempt, AttemptMethod,
    AttemptOutcome, PlanError,
};
use crate::providers::{
    ClientCertificate, ClientCertificateProvider, HttpCredentialsProvider, NetworkCredential,
    NoProvider, ServerCertificateValidation,
};
use crate::transport::{Transport, TransportRequest, TransportResponse, SOAP12_CONTENT_TYPE};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use url::Url;
use wsmeta_model::{Dialect, MetadataSection, SectionPayload};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// How often an in-flight request checks the cancellation signal.
    pub poll_interval: Duration,
    pub max_document_bytes: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

/// Credentials obtained during this resolver's lifetime
#[derive(Debug, Default)]
struct AuthSession {
    credential: Option<NetworkCredential>,
    certificate: Option<ClientCertificate>,
    /// Set once a request carrying the credential succeeded; afterwards the
    /// provider is never asked again.
    authenticated: bool,
}

enum ExchangeState {
    Send { retried: bool },
    Done(Result<TransportResponse>),
}

/// Retrieves metadata documents from an endpoint address.
///
/// [`Self::resolve`] walks the [`retrieval_plan`] of the address and stops at
/// the first attempt that yields a WSDL or XSD. Authentication faults are
/// retried once with whatever the providers hand out, and the result is
/// remembered for every later request of this resolver.
pub struct EndpointResolver {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn HttpCredentialsProvider>,
    certificates: Arc<dyn ClientCertificateProvider>,
    validation: Arc<dyn ServerCertificateValidation>,
    cancel: CancellationSignal,
    options: ResolverOptions,
    session: Mutex<AuthSession>,
}

impl EndpointResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            credentials: Arc::new(NoProvider),
            certificates: Arc::new(NoProvider),
            validation: Arc::new(NoProvider),
            cancel: CancellationSignal::new(),
            options: ResolverOptions::default(),
            session: Mutex::new(AuthSession::default()),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, provider: Arc<dyn HttpCredentialsProvider>) -> Self {
        self.credentials = provider;
        self
    }

    #[must_use]
    pub fn with_client_certificates(mut self, provider: Arc<dyn ClientCertificateProvider>) -> Self {
        self.certificates = provider;
        self
    }

    #[must_use]
    pub fn with_server_certificate_validation(
        mut self,
        validation: Arc<dyn ServerCertificateValidation>,
    ) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancel = signal;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancel
    }

    #[must_use]
    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session().authenticated
    }

    /// Retrieve the metadata published at `address`.
    pub async fn resolve(&self, address: &str) -> Result<Vec<MetadataSection>> {
        let url = Url::parse(address.trim())
            .map_err(|_| ResolveError::InvalidAddress(address.to_string()))?;
        let plan = retrieval_plan(&url);

        let outcome = first_success(
            &plan,
            |attempt| self.run_attempt(attempt.clone()),
            ResolveError::is_terminal,
        )
        .await;

        match outcome {
            Ok(sections) => {
                log::info!("retrieved {} metadata sections from {url}", sections.len());
                Ok(sections)
            }
            Err(PlanError::Failed(err)) => Err(err),
            Err(PlanError::Exhausted { tried }) => Err(ResolveError::NoMetadata {
                uri: url.to_string(),
                attempts: tried,
            }),
        }
    }

    /// Single metadata exchange against `address`, without the GET
    /// fallbacks of [`Self::resolve`].
    pub async fn resolve_mex(&self, address: &Url) -> Result<Vec<MetadataSection>> {
        let (sections, _) = self.exchange(address).await?;
        Ok(sections)
    }

    /// GET one document and parse it.
    pub async fn fetch_document(&self, url: &Url) -> Result<MetadataSection> {
        let response = self.execute(TransportRequest::get(url.clone())).await?;
        self.parse_response(&response)
    }

    async fn run_attempt(&self, attempt: Attempt) -> Result<AttemptOutcome<Vec<MetadataSection>>> {
        match attempt.method {
            AttemptMethod::Sniff => {
                let response = self.execute(TransportRequest::get(attempt.url)).await?;
                Ok(self.contract_outcome(&response))
            }
            AttemptMethod::HttpGet => {
                let response = self.execute(TransportRequest::get(attempt.url)).await?;
                if response.looks_like_html() {
                    if let Some(link) = help_page_metadata_link(&response.body, &response.url)
                        .filter(|link| *link != response.url)
                    {
                        log::debug!("following help page link {link}");
                        let linked = self.execute(TransportRequest::get(link)).await?;
                        return Ok(self.contract_outcome(&linked));
                    }
                }
                Ok(self.contract_outcome(&response))
            }
            AttemptMethod::Mex => {
                let (mut sections, references) = self.exchange(&attempt.url).await?;
                if !has_contract(&sections) && !references.is_empty() {
                    sections = self.follow_references(sections, references).await?;
                }
                if has_contract(&sections) {
                    Ok(AttemptOutcome::Success(sections))
                } else {
                    Ok(AttemptOutcome::Unusable(
                        "metadata exchange returned no WSDL or XSD".to_string(),
                    ))
                }
            }
        }
    }

    /// Run one GET request of the metadata exchange protocol.
    ///
    /// Returns the sections and the addresses of `MetadataReference` entries,
    /// which stay in the result as endpoint reference sections.
    async fn exchange(&self, address: &Url) -> Result<(Vec<MetadataSection>, Vec<Url>)> {
        let envelope = mex::get_request(address, &uuid::Uuid::new_v4());
        let request = TransportRequest::post(address.clone(), envelope, SOAP12_CONTENT_TYPE);
        let response = self.execute(request).await?;
        MetadataSection::check_size(
            &response.body,
            address.as_str(),
            self.options.max_document_bytes,
        )?;
        let entries = mex::parse_get_response(&response.body, address.as_str())?;

        let mut sections = Vec::with_capacity(entries.len());
        let mut references = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match entry {
                MexEntry::Inline {
                    identifier, text, ..
                } => match MetadataSection::parse_inline(&text, identifier.as_deref(), address.as_str())
                {
                    Ok(mut section) => {
                        section.backfill_location(section_location(address, section.dialect(), index))?;
                        sections.push(section);
                    }
                    Err(err) => log::warn!("skipping metadata section {index} from {address}: {err}"),
                },
                MexEntry::Location { location, .. } => {
                    let Ok(url) = address.join(&location) else {
                        log::warn!("invalid metadata location `{location}` in {address}");
                        continue;
                    };
                    match self.fetch_document(&url).await {
                        Ok(section) => sections.push(section),
                        Err(err) if err.is_terminal() => return Err(err),
                        Err(err) => log::warn!("could not fetch metadata location {url}: {err}"),
                    }
                }
                MexEntry::Reference {
                    identifier,
                    address: target,
                    text,
                } => {
                    let mut section = MetadataSection::parse_inline(
                        &text,
                        identifier.as_deref(),
                        address.as_str(),
                    )?;
                    section.backfill_location(section_location(
                        address,
                        Dialect::EndpointReference,
                        index,
                    ))?;
                    match Url::parse(&target) {
                        Ok(url) => references.push(url),
                        Err(_) => log::warn!("invalid metadata reference address `{target}`"),
                    }
                    sections.push(section);
                }
            }
        }
        Ok((sections, references))
    }

    /// Replace endpoint references by what a nested exchange returns for
    /// them. Only one level is followed.
    async fn follow_references(
        &self,
        sections: Vec<MetadataSection>,
        references: Vec<Url>,
    ) -> Result<Vec<MetadataSection>> {
        let mut followed = Vec::new();
        let mut result: Vec<MetadataSection> = Vec::new();
        for target in references {
            match self.exchange(&target).await {
                Ok((nested, _)) => {
                    followed.push(target);
                    result.extend(nested);
                }
                Err(err) if err.is_terminal() => return Err(err),
                Err(err) => log::warn!("metadata reference {target} failed: {err}"),
            }
        }

        let kept = sections.into_iter().filter(|section| {
            let address = match section.payload() {
                SectionPayload::EndpointReference(epr) => Some(epr.address.as_str()),
                _ => None,
            };
            !address.is_some_and(|a| followed.iter().any(|f| f.as_str() == a))
        });
        let mut merged: Vec<MetadataSection> = kept.collect();
        merged.extend(result);
        Ok(merged)
    }

    fn contract_outcome(&self, response: &TransportResponse) -> AttemptOutcome<Vec<MetadataSection>> {
        match self.parse_response(response) {
            Ok(section) if section.dialect().is_contract() => AttemptOutcome::Success(vec![section]),
            Ok(section) => AttemptOutcome::Unusable(format!(
                "{} document is not WSDL or XSD",
                section.dialect()
            )),
            Err(err) => AttemptOutcome::Unusable(err.to_string()),
        }
    }

    fn parse_response(&self, response: &TransportResponse) -> Result<MetadataSection> {
        let location = response.url.as_str();
        MetadataSection::check_size(&response.body, location, self.options.max_document_bytes)?;
        Ok(MetadataSection::parse(&response.body, location)?)
    }

    /// Send a request, retrying once after an authentication fault.
    async fn execute(&self, mut request: TransportRequest) -> Result<TransportResponse> {
        {
            let session = self.session();
            request.credential = session.credential.clone();
            request.certificate = session.certificate.clone();
        }

        let mut state = ExchangeState::Send { retried: false };
        loop {
            state = match state {
                ExchangeState::Send { retried } => {
                    let outcome = self
                        .send_cancellable(request.clone())
                        .await
                        .and_then(|response| response.into_result().map_err(ResolveError::from));
                    match outcome {
                        Ok(response) => {
                            if request.credential.is_some() {
                                self.session().authenticated = true;
                            }
                            ExchangeState::Done(Ok(response))
                        }
                        Err(ResolveError::Fault(fault)) if !retried => {
                            if self.recover(&fault, &mut request) {
                                ExchangeState::Send { retried: true }
                            } else {
                                ExchangeState::Done(Err(fault.into()))
                            }
                        }
                        Err(err) => ExchangeState::Done(Err(err)),
                    }
                }
                ExchangeState::Done(result) => return result,
            };
        }
    }

    /// Ask the providers for whatever the fault calls for. Returns true when
    /// the request should be sent again.
    fn recover(&self, fault: &TransportFault, request: &mut TransportRequest) -> bool {
        match fault.kind {
            FaultKind::Unauthorized => {
                if self.session().authenticated {
                    return false;
                }
                let Some(credential) = self.credentials.credentials(&request.url, fault) else {
                    return false;
                };
                log::debug!("retrying {} with credentials", request.url);
                self.session().credential = Some(credential.clone());
                request.credential = Some(credential);
                true
            }
            FaultKind::Forbidden => {
                let Some(certificate) = self.certificates.certificate(&request.url) else {
                    return false;
                };
                log::debug!("retrying {} with a client certificate", request.url);
                self.session().certificate = Some(certificate.clone());
                request.certificate = Some(certificate);
                true
            }
            FaultKind::TrustFailure | FaultKind::Other => false,
        }
    }

    async fn send_cancellable(&self, mut request: TransportRequest) -> Result<TransportResponse> {
        let url = request.url.clone();
        if self.cancel.is_cancelled() {
            return Err(ResolveError::Cancelled(url.to_string()));
        }
        request.trust = self.validation.before(&url);

        let call = self.transport.send(request);
        tokio::pin!(call);
        let mut ticker = time::interval(self.options.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                response = &mut call => break response.map_err(ResolveError::from),
                _ = ticker.tick() => {
                    if self.cancel.is_cancelled() {
                        log::info!("cancelled request to {url}");
                        break Err(ResolveError::Cancelled(url.to_string()));
                    }
                }
            }
        };
        self.validation.after(&url);
        result
    }

    fn session(&self) -> MutexGuard<'_, AuthSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn has_contract(sections: &[MetadataSection]) -> bool {
    sections.iter().any(|s| s.dialect().is_contract())
}

/// Location given to an inline section: the exchange address with a
/// fragment naming the section.
fn section_location(address: &Url, dialect: Dialect, index: usize) -> String {
    let mut url = address.clone();
    url.set_fragment(Some(&format!("{dialect}{index}")));
    url.to_string()
}

//! Ordered retrieval attempts for an endpoint address and the combinator
//! that runs them.

use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptMethod {
    /// GET the address itself; it may already be a metadata document.
    Sniff,
    /// GET, following `?wsdl` links when a service help page comes back.
    HttpGet,
    /// WS-MetadataExchange GET request.
    Mex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub description: String,
    pub method: AttemptMethod,
    pub url: Url,
    /// Failures of best-effort attempts are logged and the next attempt runs.
    pub best_effort: bool,
}

impl Attempt {
    fn new(method: AttemptMethod, url: Url) -> Self {
        let label = match method {
            AttemptMethod::Sniff => "GET",
            AttemptMethod::HttpGet => "GET (help page aware)",
            AttemptMethod::Mex => "MEX",
        };
        Self {
            description: format!("{label} {url}"),
            method,
            url,
            best_effort: true,
        }
    }
}

/// Result of a single attempt that did not fail outright
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// The endpoint answered but with nothing usable.
    Unusable(String),
}

#[derive(Debug)]
pub enum PlanError<E> {
    /// Every attempt ran without yielding a usable result.
    Exhausted { tried: Vec<String> },
    Failed(E),
}

/// Build the attempts for `address`, most specific first.
///
/// - with a query: GET as given, then MEX on the address without its query;
/// - ending in `/mex`: MEX, then GET `?wsdl` on the base address;
/// - otherwise: sniff, `?wsdl`, help-page GET, MEX, MEX on `/mex`.
///
/// Every attempt but the last is best effort.
#[must_use]
pub fn retrieval_plan(address: &Url) -> Vec<Attempt> {
    let mut attempts = if address.query().is_some() {
        let mut bare = address.clone();
        bare.set_query(None);
        vec![
            Attempt::new(AttemptMethod::HttpGet, address.clone()),
            Attempt::new(AttemptMethod::Mex, bare),
        ]
    } else if let Some(base) = strip_mex_suffix(address) {
        vec![
            Attempt::new(AttemptMethod::Mex, address.clone()),
            Attempt::new(AttemptMethod::HttpGet, with_query(&base, "wsdl")),
        ]
    } else {
        vec![
            Attempt::new(AttemptMethod::Sniff, address.clone()),
            Attempt::new(AttemptMethod::HttpGet, with_query(address, "wsdl")),
            Attempt::new(AttemptMethod::HttpGet, address.clone()),
            Attempt::new(AttemptMethod::Mex, address.clone()),
            Attempt::new(AttemptMethod::Mex, with_mex_suffix(address)),
        ]
    };
    if let Some(last) = attempts.last_mut() {
        last.best_effort = false;
    }
    attempts
}

/// Run `attempts` in order and return the first success.
///
/// Errors for which `is_terminal` holds stop the plan at once; so does any
/// error of the final attempt.
pub async fn first_success<T, E, F, Fut>(
    attempts: &[Attempt],
    mut run: F,
    is_terminal: impl Fn(&E) -> bool,
) -> Result<T, PlanError<E>>
where
    F: FnMut(&Attempt) -> Fut,
    Fut: Future<Output = Result<AttemptOutcome<T>, E>>,
    E: std::fmt::Display,
{
    let mut tried = Vec::with_capacity(attempts.len());
    for attempt in attempts {
        log::debug!("trying {}", attempt.description);
        match run(attempt).await {
            Ok(AttemptOutcome::Success(value)) => return Ok(value),
            Ok(AttemptOutcome::Unusable(reason)) => {
                log::debug!("{}: {reason}", attempt.description);
                tried.push(format!("{}: {reason}", attempt.description));
            }
            Err(err) if is_terminal(&err) || !attempt.best_effort => {
                return Err(PlanError::Failed(err));
            }
            Err(err) => {
                log::info!("{} failed: {err}", attempt.description);
                tried.push(format!("{}: {err}", attempt.description));
            }
        }
    }
    Err(PlanError::Exhausted { tried })
}

static METADATA_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']+\?(?:singlewsdl|wsdl))["']"#)
        .expect("metadata link pattern is valid")
});

/// First `?wsdl` or `?singlewsdl` link of a service help page, resolved
/// against the page address.
#[must_use]
pub fn help_page_metadata_link(page: &str, page_url: &Url) -> Option<Url> {
    METADATA_LINK
        .captures_iter(page)
        .filter_map(|caps| caps.get(1))
        .find_map(|link| page_url.join(&link.as_str().replace("&amp;", "&")).ok())
}

fn strip_mex_suffix(address: &Url) -> Option<Url> {
    let segments: Vec<&str> = address.path_segments()?.collect();
    let last = segments.iter().rposition(|s| !s.is_empty())?;
    if !segments[last].eq_ignore_ascii_case("mex") {
        return None;
    }
    let mut base = address.clone();
    base.set_path(&segments[..last].join("/"));
    Some(base)
}

fn with_query(address: &Url, query: &str) -> Url {
    let mut url = address.clone();
    url.set_query(Some(query));
    url
}

fn with_mex_suffix(address: &Url) -> Url {
    let mut url = address.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("mex");
    }
    url
}

//! # WS Metadata Location
//!
//! Pure URI/path reconciliation for metadata references.
//!
//! - [`can_resolve`] classifies a raw reference as an absolute URL, a URL
//!   relative to a base URL, or a file path relative to a base directory.
//! - [`resolve_import_location`] picks the canonical target of an
//!   import/include, preferring files already present on disk (for example
//!   copies renamed by a previous save) over a fresh download.
//! - [`normalize_location`] produces the case-insensitive key used to
//!   deduplicate loaded documents.

mod error;
mod naming;

pub use error::{LocationError, Result};
pub use naming::{namespace_file_name, NamingStrategy, NO_NAMESPACE_FILE_NAME};

use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Schemes a reference may use.
pub const ALLOWED_SCHEMES: [&str; 5] = ["http", "https", "net.tcp", "net.pipe", "file"];

/// Absolute form of a reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalLocation {
    Url(Url),
    File(PathBuf),
}

impl CanonicalLocation {
    /// Directory that relative references of a local document resolve against.
    #[must_use]
    pub fn base_dir(&self) -> Option<PathBuf> {
        match self {
            Self::File(path) => path.parent().map(Path::to_path_buf),
            Self::Url(_) => None,
        }
    }

    /// Last path segment without query or fragment.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            Self::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for CanonicalLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Classify `raw` and turn it into an absolute location.
///
/// Returns `None` when the reference uses a scheme outside
/// [`ALLOWED_SCHEMES`] or is relative with nothing to resolve it against.
#[must_use]
pub fn can_resolve(
    raw: &str,
    base_url: Option<&Url>,
    base_path: Option<&Path>,
) -> Option<CanonicalLocation> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(url) = parse_absolute_url(raw) {
        return from_url(url);
    }

    if let Some(base) = base_url {
        if let Ok(joined) = base.join(&raw.replace('\\', "/")) {
            return from_url(joined);
        }
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        return Some(CanonicalLocation::File(clean_path(path)));
    }
    base_path.map(|base| CanonicalLocation::File(clean_path(&base.join(path))))
}

/// Parse an absolute location (URL or absolute file path) without any base.
#[must_use]
pub fn parse_location(raw: &str) -> Option<CanonicalLocation> {
    can_resolve(raw, None, None)
}

/// Resolve `relative` against the location of the document that contains it.
#[must_use]
pub fn compose_location(base_doc_location: &str, relative: &str) -> Option<CanonicalLocation> {
    match parse_location(base_doc_location) {
        Some(CanonicalLocation::Url(base)) => can_resolve(relative, Some(&base), None),
        Some(file @ CanonicalLocation::File(_)) => {
            can_resolve(relative, None, file.base_dir().as_deref())
        }
        None => can_resolve(relative, None, None),
    }
}

/// Pick the canonical target of an import or include.
///
/// Rules, first match wins:
/// 1. `schema_location` is itself an existing local file.
/// 2. A file named after `target_namespace` exists under `base_path`. An
///    empty namespace looks for [`NO_NAMESPACE_FILE_NAME`]; `None` (includes
///    and redefines) skips the rule.
/// 3. `base_path` joined with `schema_location` exists.
/// 4. `base_path` joined with the last segment of `schema_location` exists.
/// 5. `schema_location` composed with `base_doc_location`.
pub fn resolve_import_location(
    schema_location: &str,
    base_doc_location: &str,
    base_path: Option<&Path>,
    target_namespace: Option<&str>,
    extension: &str,
) -> Result<CanonicalLocation> {
    if let Some(base) = base_path {
        if let Some(CanonicalLocation::File(path)) = parse_location(schema_location) {
            if path.is_file() {
                return Ok(CanonicalLocation::File(path));
            }
        }

        if let Some(ns) = target_namespace {
            let candidate = base.join(format!("{}.{extension}", namespace_file_name(ns)));
            if candidate.is_file() {
                log::debug!(
                    "using namespace-named copy {} for {schema_location}",
                    candidate.display()
                );
                return Ok(CanonicalLocation::File(clean_path(&candidate)));
            }
        }

        let literal = base.join(schema_location);
        if literal.is_file() {
            return Ok(CanonicalLocation::File(clean_path(&literal)));
        }

        if let Some(segment) = last_segment(schema_location) {
            let candidate = base.join(segment);
            if candidate.is_file() {
                return Ok(CanonicalLocation::File(clean_path(&candidate)));
            }
        }
    }

    compose_location(base_doc_location, schema_location).ok_or_else(|| {
        LocationError::Unresolved {
            location: schema_location.to_string(),
            base: base_doc_location.to_string(),
        }
    })
}

/// Case-insensitive key identifying a location for deduplication.
#[must_use]
pub fn normalize_location(location: &CanonicalLocation) -> String {
    match location {
        // Fragments are kept: sections of a MEX response share one URL.
        CanonicalLocation::Url(url) => url.as_str().to_lowercase(),
        CanonicalLocation::File(path) => {
            let path = std::fs::canonicalize(path).unwrap_or_else(|_| clean_path(path));
            path.to_string_lossy().replace('\\', "/").to_lowercase()
        }
    }
}

fn parse_absolute_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    // `C:\dir\a.xsd` parses as scheme `c`.
    if url.scheme().len() == 1 {
        return None;
    }
    Some(url)
}

fn from_url(url: Url) -> Option<CanonicalLocation> {
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        log::debug!("rejecting reference with scheme {}: {url}", url.scheme());
        return None;
    }
    if url.scheme() == "file" {
        return url
            .to_file_path()
            .ok()
            .map(|p| CanonicalLocation::File(clean_path(&p)));
    }
    Some(CanonicalLocation::Url(url))
}

fn last_segment(location: &str) -> Option<&str> {
    let without_query = location.split(['?', '#']).next().unwrap_or(location);
    without_query
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty() && *segment != location)
}

/// Lexically resolve `.` and `..` components.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn absolute_urls_with_allowed_schemes_resolve() {
        for raw in [
            "http://host/svc.svc",
            "https://host/svc.svc?wsdl",
            "net.tcp://host:808/svc",
            "net.pipe://localhost/svc",
        ] {
            assert_eq!(
                can_resolve(raw, None, None),
                Some(CanonicalLocation::Url(url(raw)))
            );
        }
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_eq!(can_resolve("ftp://host/a.xsd", None, None), None);
        assert_eq!(can_resolve("mailto:someone@host", None, None), None);
    }

    #[test]
    fn relative_reference_uses_base_url_first() {
        let base = url("http://host/dir/svc.wsdl");
        assert_eq!(
            can_resolve("../types/a.xsd", Some(&base), Some(Path::new("/tmp"))),
            Some(CanonicalLocation::Url(url("http://host/types/a.xsd")))
        );
    }

    #[test]
    fn relative_reference_falls_back_to_base_path() {
        assert_eq!(
            can_resolve("./sub/../a.xsd", None, Some(Path::new("/data/svc"))),
            Some(CanonicalLocation::File(PathBuf::from("/data/svc/a.xsd")))
        );
        assert_eq!(can_resolve("a.xsd", None, None), None);
    }

    #[test]
    fn file_urls_become_paths() {
        assert_eq!(
            can_resolve("file:///data/a.xsd", None, None),
            Some(CanonicalLocation::File(PathBuf::from("/data/a.xsd")))
        );
    }

    #[test]
    fn compose_against_file_uses_containing_directory() {
        assert_eq!(
            compose_location("/data/svc/main.wsdl", "xsd/common.xsd"),
            Some(CanonicalLocation::File(PathBuf::from(
                "/data/svc/xsd/common.xsd"
            )))
        );
        assert_eq!(
            compose_location("http://host/svc.svc?wsdl", "svc.svc?xsd=xsd0"),
            Some(CanonicalLocation::Url(url("http://host/svc.svc?xsd=xsd0")))
        );
    }

    #[test]
    fn normalized_urls_ignore_case() {
        let a = CanonicalLocation::Url(url("HTTP://Host/Svc.svc?wsdl"));
        let b = CanonicalLocation::Url(url("http://host/svc.svc?WSDL"));
        assert_eq!(normalize_location(&a), normalize_location(&b));
        let c = CanonicalLocation::Url(url("http://host/svc.svc?wsdl#xsd0"));
        assert_ne!(normalize_location(&a), normalize_location(&c));
    }

    #[test]
    fn last_segment_drops_query() {
        assert_eq!(last_segment("http://host/x/common.xsd?v=2"), Some("common.xsd"));
        assert_eq!(last_segment("common.xsd"), None);
    }
}

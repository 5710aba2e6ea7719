use serde::{Deserialize, Serialize};

/// How saved documents are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// One file per target namespace.
    #[default]
    ByNamespace,
    /// Keep the file name of the source location.
    BySourceFileName,
}

/// File stem used for documents without a target namespace.
pub const NO_NAMESPACE_FILE_NAME: &str = "noNamespace";

/// Data-contract namespaces are long and share this prefix; it carries no
/// information once stripped.
const SHORTENED_PREFIX: &str = "http://schemas.datacontract.org/2004/07/";

/// Deterministic file stem derived from a target namespace.
///
/// The same stem is used by the saver when it names files and by
/// [`crate::resolve_import_location`] when it looks for previously saved
/// copies, so the two must stay in sync.
#[must_use]
pub fn namespace_file_name(namespace: &str) -> String {
    let namespace = namespace.trim();
    let mut rest = namespace.strip_prefix(SHORTENED_PREFIX).unwrap_or(namespace);
    if let Some(idx) = rest.find("://") {
        rest = &rest[idx + 3..];
    } else if let Some(stripped) = rest.strip_prefix("urn:") {
        rest = stripped;
    }

    let mut out = String::with_capacity(rest.len());
    for ch in rest.chars() {
        let ch = if is_invalid_file_char(ch) { '.' } else { ch };
        if ch == '.' && out.ends_with('.') {
            continue;
        }
        out.push(ch);
    }

    let trimmed = out.trim_matches('.');
    if trimmed.is_empty() {
        NO_NAMESPACE_FILE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_invalid_file_char(ch: char) -> bool {
    matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | '%')
        || ch.is_whitespace()
        || ch.is_control()
}

use std::collections::HashSet;
use wsmeta_location::{namespace_file_name, parse_location, NamingStrategy};
use wsmeta_model::{Dialect, DocumentGraph, SectionId};

/// Hands out file names that are unique ignoring case
#[derive(Debug, Default)]
pub(crate) struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    /// `stem.ext`, or `stem1.ext`, `stem2.ext`, ... when taken.
    pub(crate) fn claim(&mut self, stem: &str, extension: &str) -> String {
        let mut candidate = format!("{stem}.{extension}");
        let mut suffix = 0;
        while !self.used.insert(candidate.to_lowercase()) {
            suffix += 1;
            candidate = format!("{stem}{suffix}.{extension}");
        }
        candidate
    }
}

/// File stem for a section under `strategy`, before uniqueness is applied.
pub(crate) fn file_stem(graph: &DocumentGraph, id: SectionId, strategy: NamingStrategy) -> String {
    let Some(section) = graph.section(id) else {
        return dialect_stem(Dialect::Opaque).to_string();
    };
    let dialect = section.dialect();

    let by_source = || {
        section
            .location()
            .and_then(parse_location)
            .and_then(|location| location.file_name())
            .map(|name| strip_known_extension(&name).to_string())
            .filter(|stem| !stem.is_empty())
    };

    let by_namespace = || {
        let namespace = match dialect {
            Dialect::Schema => graph.effective_namespace(id, None),
            _ => section.target_namespace(),
        };
        namespace_file_name(namespace.unwrap_or_default())
    };

    match (strategy, dialect) {
        (NamingStrategy::ByNamespace, Dialect::Wsdl | Dialect::Schema) => by_namespace(),
        (NamingStrategy::ByNamespace, _) => section
            .identifier()
            .filter(|identifier| !identifier.trim().is_empty())
            .map(namespace_file_name)
            .or_else(by_source)
            .unwrap_or_else(|| dialect_stem(dialect).to_string()),
        (NamingStrategy::BySourceFileName, _) => by_source().unwrap_or_else(by_namespace),
    }
}

fn dialect_stem(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Policy => "policy",
        Dialect::EndpointReference => "endpoint",
        _ => "metadata",
    }
}

fn strip_known_extension(name: &str) -> &str {
    for extension in [".wsdl", ".xsd", ".xml"] {
        if name.len() > extension.len() {
            let (stem, tail) = name.split_at(name.len() - extension.len());
            if tail.eq_ignore_ascii_case(extension) {
                return stem;
            }
        }
    }
    name
}

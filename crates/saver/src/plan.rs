use crate::error::{Result, SaveError};
use crate::naming::{file_stem, FileNamer};
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use wsmeta_location::{compose_location, normalize_location, parse_location, NamingStrategy};
use wsmeta_model::xml::{apply_replacements, escape_attribute};
use wsmeta_model::{DocumentGraph, ImportReference, ReferenceKind, SectionId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    pub naming: NamingStrategy,
    /// Sections left out of the output; references to them become warnings.
    pub excluded: HashSet<SectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub section: SectionId,
    pub path: PathBuf,
    /// Section text with its references rewritten to the planned names.
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    pub out_dir: PathBuf,
    pub files: Vec<PlannedFile>,
    /// `could not resolve reference` messages, without duplicates.
    pub warnings: Vec<String>,
    /// The WSDL no other saved WSDL imports.
    pub root: Option<SectionId>,
}

impl SavePlan {
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }

    #[must_use]
    pub fn root_path(&self) -> Option<&Path> {
        let root = self.root?;
        self.files
            .iter()
            .find(|f| f.section == root)
            .map(|f| f.path.as_path())
    }

    /// Create the output directory and write every planned file.
    pub fn write(&self) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| SaveError::CreateDir {
            path: self.out_dir.clone(),
            source,
        })?;
        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            std::fs::write(&file.path, &file.contents).map_err(|source| SaveError::Write {
                path: file.path.clone(),
                source,
            })?;
            written.push(file.path.clone());
        }
        log::info!("wrote {} files to {}", written.len(), self.out_dir.display());
        Ok(written)
    }
}

/// Reference waiting for its target to be named
struct Pending<'g> {
    reference: &'g ImportReference,
    /// Normalized location the reference points at.
    target_key: Option<String>,
}

/// Assign a file name to every saved section and rewrite the references
/// between them. No I/O happens here.
#[must_use]
pub fn plan(graph: &DocumentGraph, out_dir: &Path, options: &SaveOptions) -> SavePlan {
    let saved: Vec<SectionId> = graph
        .sections()
        .map(|(id, _)| id)
        .filter(|id| !options.excluded.contains(id))
        .collect();

    let mut pending: Vec<Pending> = graph
        .references()
        .iter()
        .filter(|r| r.kind != ReferenceKind::MetadataReference && saved.contains(&r.owner))
        .map(|reference| Pending {
            reference,
            target_key: target_key(graph, reference),
        })
        .collect();

    let mut namer = FileNamer::default();
    let mut names: BTreeMap<SectionId, String> = BTreeMap::new();
    let mut edits: BTreeMap<SectionId, Vec<(Range<usize>, String)>> = BTreeMap::new();

    for &id in &saved {
        let Some(section) = graph.section(id) else {
            continue;
        };
        let stem = file_stem(graph, id, options.naming);
        let name = namer.claim(&stem, section.dialect().file_extension());
        let section_key = section
            .location()
            .and_then(parse_location)
            .map(|location| normalize_location(&location));

        pending.retain(|p| {
            let matches = p.reference.target_section() == Some(id)
                || (p.target_key.is_some() && p.target_key == section_key)
                || is_chameleon_include(graph, p.reference, id);
            if !matches {
                return true;
            }
            if let Some(range) = p.reference.value_range.clone() {
                edits
                    .entry(p.reference.owner)
                    .or_default()
                    .push((range, escape_attribute(&name)));
            }
            false
        });
        names.insert(id, name);
    }

    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    for p in &pending {
        if !seen.insert(p.reference.location.as_str()) {
            continue;
        }
        let warning = format!("could not resolve reference `{}`", p.reference.location);
        log::warn!("{warning}");
        warnings.push(warning);
    }

    let files = saved
        .iter()
        .filter_map(|id| {
            let section = graph.section(*id)?;
            let name = names.get(id)?;
            let contents = match edits.remove(id) {
                Some(section_edits) => apply_replacements(section.text(), section_edits),
                None => section.text().to_string(),
            };
            Some(PlannedFile {
                section: *id,
                path: out_dir.join(name),
                contents,
            })
        })
        .collect();

    SavePlan {
        out_dir: out_dir.to_path_buf(),
        files,
        warnings,
        root: graph.root_wsdl_among(|id| saved.contains(&id)),
    }
}

fn target_key(graph: &DocumentGraph, reference: &ImportReference) -> Option<String> {
    let composed = match &reference.resolved {
        Some(resolved) => parse_location(&resolved.location),
        None => graph
            .section(reference.owner)
            .and_then(|owner| owner.location())
            .and_then(|base| compose_location(base, &reference.location)),
    };
    composed.map(|location| normalize_location(&location))
}

/// An include of a chameleon schema by the includer it adopted its
/// namespace from, when the include points at the schema's file name.
fn is_chameleon_include(graph: &DocumentGraph, reference: &ImportReference, schema: SectionId) -> bool {
    if !reference.kind.is_include() || reference.target_section().is_some() {
        return false;
    }
    let Some(link) = graph.chameleon_link(schema) else {
        return false;
    };
    if link.includer != reference.owner || link.includer_schema != reference.schema_index {
        return false;
    }
    let schema_name = graph
        .section(schema)
        .and_then(|s| s.location())
        .and_then(parse_location)
        .and_then(|location| location.file_name());
    let include_name = parse_location(&reference.location)
        .and_then(|location| location.file_name())
        .or_else(|| reference.location.rsplit(['/', '\\']).next().map(str::to_string));
    schema_name.is_some() && schema_name == include_name
}

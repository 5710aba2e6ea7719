use crate::section::MetadataSection;
use crate::types::{Dialect, RawReference, ReferenceId, ReferenceKind, SectionId};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Canonical target of an edge once the loader has resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub location: String,
    /// Section the location was loaded into, if loading succeeded.
    pub section: Option<SectionId>,
}

/// Edge from one section to another document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    pub id: ReferenceId,
    pub owner: SectionId,
    pub kind: ReferenceKind,
    pub location: String,
    pub namespace: Option<String>,
    pub value_range: Option<Range<usize>>,
    pub schema_index: Option<usize>,
    pub resolved: Option<ResolvedTarget>,
}

impl ImportReference {
    #[must_use]
    pub fn target_section(&self) -> Option<SectionId> {
        self.resolved.as_ref().and_then(|r| r.section)
    }
}

/// Non-owning relation from a namespace-less schema to the schema that first
/// includes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChameleonLink {
    pub schema: SectionId,
    pub includer: SectionId,
    pub includer_schema: Option<usize>,
    pub namespace: String,
}

/// Arena holding every loaded section and every edge between them.
#[derive(Debug, Clone, Default)]
pub struct DocumentGraph {
    sections: Vec<MetadataSection>,
    references: Vec<ImportReference>,
    by_location: HashMap<String, SectionId>,
    chameleons: HashMap<SectionId, ChameleonLink>,
}

impl DocumentGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section and register its outgoing references.
    ///
    /// `location_key` is the normalized location the section was loaded from;
    /// keys are compared case-insensitively.
    pub fn add_section(
        &mut self,
        location_key: Option<&str>,
        section: MetadataSection,
    ) -> (SectionId, Vec<ReferenceId>) {
        let id = SectionId(self.sections.len());
        let raw: Vec<RawReference> = section.references().into_iter().cloned().collect();
        self.sections.push(section);

        if let Some(key) = location_key {
            self.register_location(key, id);
        }

        let mut ids = Vec::with_capacity(raw.len());
        for reference in raw {
            let ref_id = ReferenceId(self.references.len());
            self.references.push(ImportReference {
                id: ref_id,
                owner: id,
                kind: reference.kind,
                location: reference.location,
                namespace: reference.namespace,
                value_range: reference.value_range,
                schema_index: reference.schema_index,
                resolved: None,
            });
            ids.push(ref_id);
        }

        (id, ids)
    }

    /// First registration of a key wins.
    pub fn register_location(&mut self, location_key: &str, id: SectionId) {
        self.by_location
            .entry(location_key.to_lowercase())
            .or_insert(id);
    }

    #[must_use]
    pub fn find_by_location(&self, location_key: &str) -> Option<SectionId> {
        self.by_location.get(&location_key.to_lowercase()).copied()
    }

    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&MetadataSection> {
        self.sections.get(id.0)
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &MetadataSection)> {
        self.sections
            .iter()
            .enumerate()
            .map(|(idx, s)| (SectionId(idx), s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn reference(&self, id: ReferenceId) -> Option<&ImportReference> {
        self.references.get(id.0)
    }

    #[must_use]
    pub fn references(&self) -> &[ImportReference] {
        &self.references
    }

    pub fn references_from(&self, owner: SectionId) -> impl Iterator<Item = &ImportReference> {
        self.references.iter().filter(move |r| r.owner == owner)
    }

    /// Store the canonical target of an edge.
    pub fn resolve_reference(&mut self, id: ReferenceId, target: ResolvedTarget) {
        if let Some(reference) = self.references.get_mut(id.0) {
            reference.resolved = Some(target);
        }
    }

    /// Returns false when the schema is already linked; the first link wins.
    pub fn link_chameleon(&mut self, link: ChameleonLink) -> bool {
        if self.chameleons.contains_key(&link.schema) {
            return false;
        }
        self.chameleons.insert(link.schema, link);
        true
    }

    #[must_use]
    pub fn chameleon_link(&self, schema: SectionId) -> Option<&ChameleonLink> {
        self.chameleons.get(&schema)
    }

    /// Namespace a schema lives in: its own, or the one adopted through a
    /// chameleon link. For embedded schemas pass the `schema_index`.
    #[must_use]
    pub fn effective_namespace(
        &self,
        id: SectionId,
        schema_index: Option<usize>,
    ) -> Option<&str> {
        let own = self
            .section(id)?
            .payload()
            .schema(schema_index)
            .and_then(|s| s.target_namespace.as_deref())
            .filter(|ns| !ns.is_empty());
        if own.is_some() || schema_index.is_some() {
            return own;
        }
        self.chameleon_link(id).map(|l| l.namespace.as_str())
    }

    /// The WSDL that no other WSDL imports; with an import cycle, the first
    /// visited WSDL.
    #[must_use]
    pub fn root_wsdl(&self) -> Option<SectionId> {
        self.root_wsdl_among(|_| true)
    }

    /// [`Self::root_wsdl`] restricted to the sections accepted by `include`.
    pub fn root_wsdl_among(&self, include: impl Fn(SectionId) -> bool) -> Option<SectionId> {
        let wsdls: Vec<SectionId> = self
            .sections()
            .filter(|(id, s)| s.dialect() == Dialect::Wsdl && include(*id))
            .map(|(id, _)| id)
            .collect();

        let imported: HashSet<SectionId> = self
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::WsdlImport && wsdls.contains(&r.owner))
            .filter_map(|r| r.target_section().filter(|t| *t != r.owner))
            .collect();

        wsdls
            .iter()
            .copied()
            .find(|id| !imported.contains(id))
            .or_else(|| wsdls.first().copied())
    }
}

use crate::chameleon::link_chameleons;
use crate::config::ResolverConfig;
use crate::error::{LoadError, Result};
use crate::state::{ResolutionState, VisitedSet};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;
use wsmeta_location::{
    normalize_location, parse_location, resolve_import_location, CanonicalLocation,
};
use wsmeta_model::{
    is_well_known_namespace, Dialect, DocumentGraph, MetadataSection, ReferenceId,
    ReferenceKind, ResolvedTarget, SectionId,
};
use wsmeta_transport::EndpointResolver;

/// Where a load starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Service endpoint address, resolved through the full retrieval plan.
    Uri(String),
    /// Local file glob patterns, expanded in order.
    Files(Vec<String>),
}

/// Result of a successful load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub graph: DocumentGraph,
    /// Failures that did not prevent obtaining a WSDL or XSD.
    pub errors: Vec<LoadError>,
}

#[derive(Default)]
struct LoaderInner {
    state: ResolutionState,
    outcome: Option<Arc<LoadOutcome>>,
    partial: Vec<MetadataSection>,
}

/// Loads the complete document graph reachable from an entry point.
///
/// A loader runs once: a repeated call after success returns the same
/// outcome, a call while a load is running or after a failed load is an
/// error.
pub struct DocumentGraphLoader {
    resolver: Arc<EndpointResolver>,
    cache_dir: Option<PathBuf>,
    inner: Mutex<LoaderInner>,
}

impl DocumentGraphLoader {
    pub fn new(resolver: Arc<EndpointResolver>) -> Self {
        Self {
            resolver,
            cache_dir: None,
            inner: Mutex::new(LoaderInner::default()),
        }
    }

    /// Loader around `resolver` (usually built by
    /// [`ResolverConfig::endpoint_resolver`]) with the cache directory of
    /// `config`.
    #[must_use]
    pub fn from_config(config: &ResolverConfig, resolver: EndpointResolver) -> Self {
        let mut loader = Self::new(Arc::new(resolver));
        loader.cache_dir.clone_from(&config.local_cache_dir);
        loader
    }

    /// Directory searched for previously saved copies of remote imports.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn state(&self) -> ResolutionState {
        self.inner().state
    }

    /// Sections committed by the last load, including one that failed or
    /// was cancelled.
    #[must_use]
    pub fn partial_sections(&self) -> Vec<MetadataSection> {
        let inner = self.inner();
        match &inner.outcome {
            Some(outcome) => outcome.graph.sections().map(|(_, s)| s.clone()).collect(),
            None => inner.partial.clone(),
        }
    }

    pub async fn load(&self, entry: EntryPoint) -> Result<Arc<LoadOutcome>> {
        {
            let mut inner = self.inner();
            match inner.state {
                ResolutionState::NotStarted => inner.state = ResolutionState::Started,
                ResolutionState::Started => return Err(LoadError::AlreadyStarted),
                ResolutionState::Failed => return Err(LoadError::PreviouslyFailed),
                ResolutionState::Successful => {
                    if let Some(outcome) = &inner.outcome {
                        return Ok(Arc::clone(outcome));
                    }
                    return Err(LoadError::PreviouslyFailed);
                }
            }
        }
        let _started = StartedGuard(&self.inner);

        let mut traversal = Traversal::new(&self.resolver, self.cache_dir.as_deref());
        let result = traversal.run(entry).await;
        let Traversal { graph, errors, .. } = traversal;

        let mut inner = self.inner();
        match result {
            Ok(()) if has_contract(&graph) => {
                log::info!(
                    "loaded {} sections ({} non-fatal errors)",
                    graph.len(),
                    errors.len()
                );
                let outcome = Arc::new(LoadOutcome { graph, errors });
                inner.state = ResolutionState::Successful;
                inner.outcome = Some(Arc::clone(&outcome));
                Ok(outcome)
            }
            Ok(()) => {
                inner.state = ResolutionState::Failed;
                inner.partial = graph.sections().map(|(_, s)| s.clone()).collect();
                Err(LoadError::NoMetadata { errors })
            }
            Err(err) => {
                log::warn!("load aborted after {} sections: {err}", graph.len());
                inner.state = ResolutionState::Failed;
                inner.partial = graph.sections().map(|(_, s)| s.clone()).collect();
                Err(err)
            }
        }
    }

    fn inner(&self) -> MutexGuard<'_, LoaderInner> {
        lock(&self.inner)
    }
}

fn lock(inner: &Mutex<LoaderInner>) -> MutexGuard<'_, LoaderInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fails a load whose future is dropped before it finishes.
struct StartedGuard<'a>(&'a Mutex<LoaderInner>);

impl Drop for StartedGuard<'_> {
    fn drop(&mut self) {
        let mut inner = lock(self.0);
        if inner.state == ResolutionState::Started {
            log::warn!("load abandoned before completion");
            inner.state = ResolutionState::Failed;
        }
    }
}

fn has_contract(graph: &DocumentGraph) -> bool {
    graph.sections().any(|(_, s)| s.dialect().is_contract())
}

/// Unit of work on the traversal stack
#[derive(Debug)]
enum Task {
    /// A single document, reached through `reference` or named as an entry.
    Document {
        target: CanonicalLocation,
        reference: Option<ReferenceId>,
    },
    /// Entry endpoint: full retrieval plan.
    Service { address: Url },
    /// Endpoint reference found in metadata: metadata exchange only.
    Exchange {
        address: Url,
        reference: Option<ReferenceId>,
    },
}

struct Traversal<'a> {
    resolver: &'a EndpointResolver,
    cache_dir: Option<&'a Path>,
    graph: DocumentGraph,
    visited: VisitedSet,
    errors: Vec<LoadError>,
    /// Namespaces provided by sections that arrived together in one
    /// endpoint response, for imports that point back at the endpoint.
    batch_namespaces: HashMap<(Dialect, String), SectionId>,
    stack: Vec<Task>,
}

impl<'a> Traversal<'a> {
    fn new(resolver: &'a EndpointResolver, cache_dir: Option<&'a Path>) -> Self {
        Self {
            resolver,
            cache_dir,
            graph: DocumentGraph::new(),
            visited: VisitedSet::new(),
            errors: Vec::new(),
            batch_namespaces: HashMap::new(),
            stack: Vec::new(),
        }
    }

    async fn run(&mut self, entry: EntryPoint) -> Result<()> {
        let roots = self.expand(entry)?;
        self.push_all(roots);

        while let Some(task) = self.stack.pop() {
            if self.resolver.cancellation().is_cancelled() {
                return Err(LoadError::Cancelled);
            }
            let outcome = match task {
                Task::Document { target, reference } => self.visit_document(target, reference).await,
                Task::Service { address } => self.visit_endpoint(address, None, true).await,
                Task::Exchange { address, reference } => {
                    self.visit_endpoint(address, reference, false).await
                }
            };
            if let Err(err) = outcome {
                if err.is_cancellation() {
                    return Err(LoadError::Cancelled);
                }
                log::warn!("{err}");
                self.errors.push(err);
            }
        }

        link_chameleons(&mut self.graph);
        Ok(())
    }

    fn expand(&mut self, entry: EntryPoint) -> Result<Vec<Task>> {
        match entry {
            EntryPoint::Uri(raw) => match parse_location(&raw) {
                Some(CanonicalLocation::Url(address)) => Ok(vec![Task::Service { address }]),
                Some(target @ CanonicalLocation::File(_)) => Ok(vec![Task::Document {
                    target,
                    reference: None,
                }]),
                None => Err(LoadError::InvalidAddress(raw)),
            },
            EntryPoint::Files(patterns) => {
                let mut tasks = Vec::new();
                for pattern in patterns {
                    match expand_pattern(&pattern) {
                        Ok(targets) => tasks.extend(targets.into_iter().map(|target| {
                            Task::Document {
                                target,
                                reference: None,
                            }
                        })),
                        Err(err) => {
                            log::warn!("{err}");
                            self.errors.push(err);
                        }
                    }
                }
                Ok(tasks)
            }
        }
    }

    async fn visit_document(
        &mut self,
        target: CanonicalLocation,
        reference: Option<ReferenceId>,
    ) -> Result<()> {
        let key = normalize_location(&target);
        if !self.visited.insert(&key) {
            self.link(reference, &target, self.graph.find_by_location(&key));
            return Ok(());
        }

        let fetched = self.fetch(&target).await;
        let section = match fetched {
            Ok(section) => section,
            Err(err) => {
                self.link(reference, &target, None);
                return Err(err);
            }
        };
        let ids = self.commit(&key, vec![section]);
        self.link(reference, &target, ids.first().copied());
        Ok(())
    }

    async fn visit_endpoint(
        &mut self,
        address: Url,
        reference: Option<ReferenceId>,
        full_plan: bool,
    ) -> Result<()> {
        let target = CanonicalLocation::Url(address.clone());
        let key = normalize_location(&target);
        if !self.visited.insert(&key) {
            self.link(reference, &target, self.graph.find_by_location(&key));
            return Ok(());
        }

        let fetched = if full_plan {
            self.resolver.resolve(address.as_str()).await
        } else {
            self.resolver.resolve_mex(&address).await
        };
        let sections = match fetched {
            Ok(sections) => sections,
            Err(err) => {
                self.link(reference, &target, None);
                return Err(err.into());
            }
        };
        let ids = self.commit(&key, sections);
        self.link(reference, &target, ids.first().copied());
        Ok(())
    }

    async fn fetch(&self, target: &CanonicalLocation) -> Result<MetadataSection> {
        match target {
            CanonicalLocation::File(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: path.clone(),
                        source,
                    })?;
                let location = target.to_string();
                MetadataSection::check_size(
                    &text,
                    &location,
                    self.resolver.options().max_document_bytes,
                )?;
                Ok(MetadataSection::parse(&text, &location)?)
            }
            CanonicalLocation::Url(url) => Ok(self.resolver.fetch_document(url).await?),
        }
    }

    /// Append newly retrieved sections and schedule their references.
    ///
    /// `key` is the location the sections were requested from; a section
    /// whose own location is already in the graph is dropped in favour of
    /// the existing one.
    fn commit(&mut self, key: &str, sections: Vec<MetadataSection>) -> Vec<SectionId> {
        let batch = sections.len() > 1;
        let mut ids = Vec::with_capacity(sections.len());
        let mut added = Vec::new();
        for section in sections {
            let own_key = section
                .location()
                .and_then(parse_location)
                .map(|location| normalize_location(&location));
            if let Some(existing) = own_key.as_deref().and_then(|k| self.graph.find_by_location(k)) {
                log::debug!("reusing already loaded {existing} for {key}");
                // Later references to `key` stop at the visited check.
                self.graph.register_location(key, existing);
                ids.push(existing);
                continue;
            }

            let (id, references) = self.graph.add_section(Some(key), section);
            if let Some(own_key) = own_key {
                self.visited.insert(&own_key);
                self.graph.register_location(&own_key, id);
            }
            log::debug!(
                "loaded {} {id} from {key}",
                self.graph.section(id).map_or(Dialect::Opaque, MetadataSection::dialect)
            );
            ids.push(id);
            added.push((id, references));
        }

        if batch {
            for (id, _) in &added {
                self.remember_batch_namespace(*id);
            }
        }
        let tasks: Vec<Task> = added
            .into_iter()
            .flat_map(|(_, references)| references)
            .filter_map(|reference| self.edge_task(reference))
            .collect();
        self.push_all(tasks);
        ids
    }

    /// Work needed to follow one reference, or `None` when it resolves
    /// without any fetch.
    fn edge_task(&mut self, reference: ReferenceId) -> Option<Task> {
        let edge = self.graph.reference(reference)?.clone();
        let owner_location = self.graph.section(edge.owner)?.location()?.to_string();

        if edge.kind == ReferenceKind::MetadataReference {
            return match Url::parse(&edge.location) {
                Ok(address) => Some(Task::Exchange {
                    address,
                    reference: Some(reference),
                }),
                Err(_) => {
                    self.errors
                        .push(LoadError::InvalidAddress(edge.location.clone()));
                    None
                }
            };
        }

        if let Some(namespace) = edge.namespace.as_deref() {
            if edge.kind == ReferenceKind::SchemaImport && is_well_known_namespace(namespace) {
                log::debug!("not fetching well-known namespace {namespace}");
                return None;
            }
            let dialect = match edge.kind {
                ReferenceKind::WsdlImport => Dialect::Wsdl,
                _ => Dialect::Schema,
            };
            if let Some(&section) = self
                .batch_namespaces
                .get(&(dialect, namespace.to_string()))
            {
                self.graph.resolve_reference(
                    reference,
                    ResolvedTarget {
                        location: edge.location.clone(),
                        section: Some(section),
                    },
                );
                return None;
            }
        }

        let owner_parsed = parse_location(&owner_location);
        let base_path = match &owner_parsed {
            Some(CanonicalLocation::File(path)) => path.parent().map(Path::to_path_buf),
            _ => self.cache_dir.map(Path::to_path_buf),
        };
        let extension = match edge.kind {
            ReferenceKind::WsdlImport => "wsdl",
            _ => "xsd",
        };
        // Includes share their includer's namespace, whose saved copy is the
        // includer itself.
        let namespace = match edge.kind {
            ReferenceKind::WsdlImport | ReferenceKind::SchemaImport => {
                Some(edge.namespace.as_deref().unwrap_or_default())
            }
            _ => None,
        };

        match resolve_import_location(
            &edge.location,
            &owner_location,
            base_path.as_deref(),
            namespace,
            extension,
        ) {
            Ok(target) => Some(Task::Document {
                target,
                reference: Some(reference),
            }),
            Err(err) => {
                log::warn!("{err}");
                self.errors.push(err.into());
                None
            }
        }
    }

    fn remember_batch_namespace(&mut self, id: SectionId) {
        let Some(section) = self.graph.section(id) else {
            return;
        };
        let dialect = section.dialect();
        if let Some(namespace) = section.target_namespace().filter(|_| dialect.is_contract()) {
            self.batch_namespaces
                .entry((dialect, namespace.to_string()))
                .or_insert(id);
        }
    }

    fn link(
        &mut self,
        reference: Option<ReferenceId>,
        target: &CanonicalLocation,
        section: Option<SectionId>,
    ) {
        if let Some(reference) = reference {
            self.graph.resolve_reference(
                reference,
                ResolvedTarget {
                    location: target.to_string(),
                    section,
                },
            );
        }
    }

    /// Push so that the first task is popped first.
    fn push_all(&mut self, tasks: Vec<Task>) {
        self.stack.extend(tasks.into_iter().rev());
    }
}

fn expand_pattern(pattern: &str) -> Result<Vec<CanonicalLocation>> {
    let paths = glob::glob(pattern).map_err(|err| LoadError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })?;

    let mut matches = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => matches.push(absolute_file(path)),
            Ok(_) => {}
            Err(err) => log::warn!("skipping unreadable match of `{pattern}`: {err}"),
        }
    }
    if matches.is_empty() {
        return Err(LoadError::NoMatches(pattern.to_string()));
    }
    Ok(matches)
}

fn absolute_file(path: PathBuf) -> CanonicalLocation {
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    };
    parse_location(&absolute.to_string_lossy())
        .unwrap_or(CanonicalLocation::File(absolute))
}

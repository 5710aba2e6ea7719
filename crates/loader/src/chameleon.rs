//! Post-traversal linking of schemas without a target namespace to the
//! schema that includes them.
//!
//! During descent an includer may be visited after the chameleon it
//! includes (the chameleon arrived first through another path), so linking
//! waits until the whole graph is loaded. Includers are considered in
//! visitation order and the first one with a known namespace wins.

use wsmeta_location::{compose_location, normalize_location, parse_location};
use wsmeta_model::{ChameleonLink, DocumentGraph, ImportReference, SectionId, SectionPayload};

/// Link every chameleon schema of `graph`. Returns the number of new links.
pub fn link_chameleons(graph: &mut DocumentGraph) -> usize {
    // Strict passes only accept the first includer in visitation order and
    // wait for it to learn its namespace; the relaxed passes then take the
    // first includer that has one.
    let mut linked = run_to_fixpoint(graph, true);
    linked += run_to_fixpoint(graph, false);
    if linked > 0 {
        log::info!("linked {linked} chameleon schemas");
    }
    linked
}

fn run_to_fixpoint(graph: &mut DocumentGraph, strict: bool) -> usize {
    let mut linked = 0;
    loop {
        let pending = unlinked_chameleons(graph);
        let mut progress = false;
        for schema in pending {
            if let Some(link) = find_includer(graph, schema, strict) {
                log::debug!(
                    "schema {schema} adopts namespace {} from {}",
                    link.namespace,
                    link.includer
                );
                if graph.link_chameleon(link) {
                    linked += 1;
                    progress = true;
                }
            }
        }
        if !progress {
            return linked;
        }
    }
}

fn unlinked_chameleons(graph: &DocumentGraph) -> Vec<SectionId> {
    graph
        .sections()
        .filter(|(id, section)| {
            matches!(section.payload(), SectionPayload::Schema(doc) if doc.is_chameleon())
                && graph.chameleon_link(*id).is_none()
        })
        .map(|(id, _)| id)
        .collect()
}

fn find_includer(graph: &DocumentGraph, schema: SectionId, strict: bool) -> Option<ChameleonLink> {
    let target_key = graph
        .section(schema)?
        .location()
        .and_then(parse_location)
        .map(|location| normalize_location(&location));

    let mut candidates = graph
        .references()
        .iter()
        .filter(|r| r.kind.is_include() && r.owner != schema)
        .filter(|r| includes(graph, r, schema, target_key.as_deref()));

    let link_for = |reference: &ImportReference| {
        graph
            .effective_namespace(reference.owner, reference.schema_index)
            .map(|namespace| ChameleonLink {
                schema,
                includer: reference.owner,
                includer_schema: reference.schema_index,
                namespace: namespace.to_string(),
            })
    };

    if strict {
        candidates.next().and_then(link_for)
    } else {
        candidates.find_map(link_for)
    }
}

/// Whether `reference` points at `schema`: either the loader resolved it
/// there, or the include location composed with the includer's location
/// names the schema's retrieval location.
fn includes(
    graph: &DocumentGraph,
    reference: &ImportReference,
    schema: SectionId,
    target_key: Option<&str>,
) -> bool {
    if reference.target_section() == Some(schema) {
        return true;
    }
    let Some(target_key) = target_key else {
        return false;
    };
    graph
        .section(reference.owner)
        .and_then(|owner| owner.location())
        .and_then(|base| compose_location(base, &reference.location))
        .is_some_and(|composed| normalize_location(&composed) == target_key)
}

//! Graph loading from local files

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use wsmeta_loader::{DocumentGraphLoader, EntryPoint, LoadError, ResolutionState};
use wsmeta_model::{Dialect, ReferenceKind};
use wsmeta_transport::{EndpointResolver, HttpTransport};

fn loader() -> DocumentGraphLoader {
    let transport = HttpTransport::new("wsmeta-test", None).unwrap();
    DocumentGraphLoader::new(Arc::new(EndpointResolver::new(Arc::new(transport))))
}

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path.to_string_lossy().into_owned()
}

fn wsdl(tns: &str, imports: &[&str]) -> String {
    let imports: String = imports
        .iter()
        .map(|loc| format!(r#"<wsdl:import namespace="urn:any" location="{loc}"/>"#))
        .collect();
    format!(
        r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" targetNamespace="{tns}">{imports}</wsdl:definitions>"#
    )
}

fn schema(tns: Option<&str>, includes: &[&str]) -> String {
    let tns = tns
        .map(|ns| format!(r#" targetNamespace="{ns}""#))
        .unwrap_or_default();
    let includes: String = includes
        .iter()
        .map(|loc| format!(r#"<xs:include schemaLocation="{loc}"/>"#))
        .collect();
    format!(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"{tns}>{includes}</xs:schema>"#)
}

#[tokio::test]
async fn import_cycle_terminates_with_one_section_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.wsdl", &wsdl("urn:a", &["b.wsdl"]));
    write(dir.path(), "b.wsdl", &wsdl("urn:b", &["./a.wsdl"]));

    let loader = loader();
    let outcome = loader.load(EntryPoint::Files(vec![a])).await.unwrap();
    let graph = &outcome.graph;

    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    assert_eq!(graph.len(), 2);
    let targets: Vec<_> = graph
        .references()
        .iter()
        .map(|r| (r.owner, r.target_section()))
        .collect();
    let (a_id, _) = graph.sections().next().unwrap();
    let (b_id, _) = graph.sections().nth(1).unwrap();
    assert_eq!(targets, vec![(a_id, Some(b_id)), (b_id, Some(a_id))]);
    assert_eq!(graph.root_wsdl(), Some(a_id));
    assert_eq!(loader.state(), ResolutionState::Successful);
}

#[tokio::test]
async fn chameleon_gets_includer_namespace_in_either_order() {
    for chameleon_first in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let common = write(dir.path(), "common.xsd", &schema(None, &[]));
        let main = write(dir.path(), "main.xsd", &schema(Some("urn:main"), &["common.xsd"]));
        let files = if chameleon_first {
            vec![common.clone(), main]
        } else {
            vec![main, common.clone()]
        };

        let outcome = loader().load(EntryPoint::Files(files)).await.unwrap();
        let graph = &outcome.graph;
        assert_eq!(graph.len(), 2);
        let (common_id, _) = graph
            .sections()
            .find(|(_, s)| s.location() == Some(common.as_str()))
            .unwrap();
        assert_eq!(
            graph.effective_namespace(common_id, None),
            Some("urn:main"),
            "chameleon_first = {chameleon_first}"
        );
    }
}

#[tokio::test]
async fn chameleon_tie_break_follows_visitation_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "common.xsd", &schema(None, &[]));
    let first = write(dir.path(), "first.xsd", &schema(Some("urn:first"), &["common.xsd"]));
    let second = write(dir.path(), "second.xsd", &schema(Some("urn:second"), &["common.xsd"]));

    let outcome = loader()
        .load(EntryPoint::Files(vec![second, first]))
        .await
        .unwrap();
    let graph = &outcome.graph;
    let (common_id, _) = graph
        .sections()
        .find(|(_, s)| s.target_namespace().is_none())
        .unwrap();
    assert_eq!(graph.effective_namespace(common_id, None), Some("urn:second"));
}

#[tokio::test]
async fn glob_patterns_expand_and_missing_patterns_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "types/b.xsd", &schema(Some("urn:b"), &[]));
    write(dir.path(), "types/a.xsd", &schema(Some("urn:a"), &[]));
    write(dir.path(), "types/readme.txt", "not metadata");

    let pattern = dir.path().join("types/*.xsd").to_string_lossy().into_owned();
    let missing = dir.path().join("none/*.wsdl").to_string_lossy().into_owned();
    let outcome = loader()
        .load(EntryPoint::Files(vec![pattern, missing.clone()]))
        .await
        .unwrap();

    let namespaces: Vec<_> = outcome
        .graph
        .sections()
        .map(|(_, s)| s.target_namespace().unwrap_or_default().to_string())
        .collect();
    assert_eq!(namespaces, vec!["urn:a", "urn:b"]);
    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(&outcome.errors[0], LoadError::NoMatches(p) if *p == missing));
}

#[tokio::test]
async fn failing_import_does_not_stop_its_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(
        dir.path(),
        "main.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:main">
             <xs:import namespace="urn:missing" schemaLocation="missing.xsd"/>
             <xs:import namespace="urn:bad" schemaLocation="bad.xml"/>
             <xs:import namespace="urn:good" schemaLocation="good.xsd"/>
             <xs:import namespace="http://www.w3.org/XML/1998/namespace" schemaLocation="http://www.w3.org/2001/xml.xsd"/>
           </xs:schema>"#,
    );
    write(dir.path(), "bad.xml", "<html><body/></html>");
    write(dir.path(), "good.xsd", &schema(Some("urn:good"), &[]));

    let outcome = loader().load(EntryPoint::Files(vec![main])).await.unwrap();
    assert_eq!(outcome.graph.len(), 2);
    assert_eq!(outcome.errors.len(), 2);
    assert!(matches!(outcome.errors[0], LoadError::Io { .. }));
    assert!(matches!(outcome.errors[1], LoadError::Document(_)));

    let resolved: Vec<_> = outcome
        .graph
        .references()
        .iter()
        .map(|r| (r.kind, r.target_section().is_some()))
        .collect();
    assert_eq!(
        resolved,
        vec![
            (ReferenceKind::SchemaImport, false),
            (ReferenceKind::SchemaImport, false),
            (ReferenceKind::SchemaImport, true),
            (ReferenceKind::SchemaImport, false),
        ]
    );
}

#[tokio::test]
async fn load_without_metadata_fails_and_stays_failed() {
    let dir = tempfile::tempdir().unwrap();
    let note = write(dir.path(), "note.xml", "<note/>");

    let loader = loader();
    let err = loader
        .load(EntryPoint::Files(vec![note.clone()]))
        .await
        .unwrap_err();
    match err {
        LoadError::NoMetadata { errors } => assert_eq!(errors.len(), 1),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(loader.state(), ResolutionState::Failed);
    assert!(loader.partial_sections().is_empty());

    let again = loader.load(EntryPoint::Files(vec![note])).await.unwrap_err();
    assert!(matches!(again, LoadError::PreviouslyFailed));
}

#[tokio::test]
async fn repeated_load_returns_cached_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.wsdl", &wsdl("urn:a", &[]));

    let loader = loader();
    let first = loader.load(EntryPoint::Files(vec![a.clone()])).await.unwrap();
    let second = loader.load(EntryPoint::Files(vec![a])).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.partial_sections().len(), 1);
    assert_eq!(
        first.graph.sections().next().map(|(_, s)| s.dialect()),
        Some(Dialect::Wsdl)
    );
}

//! Planning and writing saved document sets

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::path::Path;
use wsmeta_model::{DocumentGraph, MetadataSection, ResolvedTarget, SectionId};
use wsmeta_saver::{plan, NamingStrategy, SaveOptions};

const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

fn add(graph: &mut DocumentGraph, text: &str, location: &str) -> SectionId {
    graph
        .add_section(Some(location), MetadataSection::parse(text, location).unwrap())
        .0
}

/// Point every reference owned by `owner` at `target`, in order.
fn resolve(graph: &mut DocumentGraph, owner: SectionId, targets: &[(SectionId, &str)]) {
    let ids: Vec<_> = graph.references_from(owner).map(|r| r.id).collect();
    for (id, (target, location)) in ids.into_iter().zip(targets) {
        graph.resolve_reference(
            id,
            ResolvedTarget {
                location: location.to_string(),
                section: Some(*target),
            },
        );
    }
}

fn service_graph() -> (DocumentGraph, SectionId, SectionId, SectionId) {
    let mut graph = DocumentGraph::new();
    let root = add(
        &mut graph,
        &format!(
            r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" {XS} targetNamespace="http://tempuri.org/"><wsdl:import namespace="urn:bindings" location="http://host/svc.svc?wsdl=wsdl1"/><wsdl:types><xs:schema><xs:import namespace="urn:shop:orders" schemaLocation="http://host/svc.svc?xsd=xsd0"/></xs:schema></wsdl:types></wsdl:definitions>"#
        ),
        "http://host/svc.svc?wsdl",
    );
    let bindings = add(
        &mut graph,
        r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:bindings"/>"#,
        "http://host/svc.svc?wsdl=wsdl1",
    );
    let orders = add(
        &mut graph,
        &format!(r#"<xs:schema {XS} targetNamespace="urn:shop:orders"/>"#),
        "http://host/svc.svc?xsd=xsd0",
    );
    resolve(
        &mut graph,
        root,
        &[
            (bindings, "http://host/svc.svc?wsdl=wsdl1"),
            (orders, "http://host/svc.svc?xsd=xsd0"),
        ],
    );
    (graph, root, bindings, orders)
}

#[test]
fn references_are_rewritten_to_planned_names() {
    let (graph, root, _, _) = service_graph();
    let plan = plan(&graph, Path::new("/out"), &SaveOptions::default());

    let names: Vec<_> = plan
        .files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["tempuri.org.wsdl", "bindings.wsdl", "shop.orders.xsd"]);
    assert!(plan.warnings.is_empty());
    assert_eq!(plan.root, Some(root));
    assert_eq!(plan.root_path(), Some(Path::new("/out/tempuri.org.wsdl")));

    let root_text = &plan.files[0].contents;
    assert!(root_text.contains(r#"location="bindings.wsdl""#));
    assert!(root_text.contains(r#"schemaLocation="shop.orders.xsd""#));
    assert!(!root_text.contains("svc.svc?"));
}

#[test]
fn same_namespace_gets_numeric_suffix() {
    let mut graph = DocumentGraph::new();
    for location in ["http://host/a/types.xsd", "http://host/b/types.xsd"] {
        add(
            &mut graph,
            &format!(r#"<xs:schema {XS} targetNamespace="http://tempuri.org/"/>"#),
            location,
        );
    }

    let plan = plan(&graph, Path::new("out"), &SaveOptions::default());
    let paths: Vec<_> = plan.paths().into_iter().map(Path::to_path_buf).collect();
    assert_eq!(
        paths,
        vec![
            Path::new("out/tempuri.org.xsd").to_path_buf(),
            Path::new("out/tempuri.org1.xsd").to_path_buf(),
        ]
    );
}

#[test]
fn excluded_targets_become_deduplicated_warnings() {
    let (graph, root, _, orders) = service_graph();
    let mut graph = graph;
    // A second edge to the same excluded schema.
    let extra = add(
        &mut graph,
        &format!(
            r#"<xs:schema {XS} targetNamespace="urn:extra"><xs:import namespace="urn:shop:orders" schemaLocation="http://host/svc.svc?xsd=xsd0"/></xs:schema>"#
        ),
        "http://host/svc.svc?xsd=xsd1",
    );
    resolve(&mut graph, extra, &[(orders, "http://host/svc.svc?xsd=xsd0")]);

    let options = SaveOptions {
        excluded: HashSet::from([orders]),
        ..SaveOptions::default()
    };
    let plan = plan(&graph, Path::new("/out"), &options);

    assert_eq!(plan.files.len(), 3);
    assert_eq!(
        plan.warnings,
        vec!["could not resolve reference `http://host/svc.svc?xsd=xsd0`".to_string()]
    );
    assert_eq!(plan.root, Some(root));
    let root_text = &plan.files[0].contents;
    assert!(root_text.contains(r#"schemaLocation="http://host/svc.svc?xsd=xsd0""#));
}

#[test]
fn warnings_keep_first_occurrence_order() {
    let (mut graph, _, bindings, orders) = service_graph();
    let extra = add(
        &mut graph,
        &format!(
            r#"<xs:schema {XS} targetNamespace="urn:extra"><xs:import namespace="urn:shop:orders" schemaLocation="http://host/svc.svc?xsd=xsd0"/></xs:schema>"#
        ),
        "http://host/svc.svc?xsd=xsd1",
    );
    resolve(&mut graph, extra, &[(orders, "http://host/svc.svc?xsd=xsd0")]);

    let options = SaveOptions {
        excluded: HashSet::from([bindings, orders]),
        ..SaveOptions::default()
    };
    let plan = plan(&graph, Path::new("/out"), &options);

    assert_eq!(
        plan.warnings,
        vec![
            "could not resolve reference `http://host/svc.svc?wsdl=wsdl1`".to_string(),
            "could not resolve reference `http://host/svc.svc?xsd=xsd0`".to_string(),
        ]
    );
}

#[test]
fn source_file_names_can_be_kept() {
    let mut graph = DocumentGraph::new();
    let main = add(
        &mut graph,
        &format!(
            r#"<xs:schema {XS} targetNamespace="urn:main"><xs:include schemaLocation="sub/Common.xsd"/></xs:schema>"#
        ),
        "/src/Main.xsd",
    );
    let common = add(
        &mut graph,
        &format!(r#"<xs:schema {XS} targetNamespace="urn:main"/>"#),
        "/src/sub/Common.xsd",
    );
    resolve(&mut graph, main, &[(common, "/src/sub/Common.xsd")]);

    let options = SaveOptions {
        naming: NamingStrategy::BySourceFileName,
        ..SaveOptions::default()
    };
    let plan = plan(&graph, Path::new("/out"), &options);
    assert_eq!(
        plan.paths(),
        vec![Path::new("/out/Main.xsd"), Path::new("/out/Common.xsd")]
    );
    assert!(plan.files[0]
        .contents
        .contains(r#"schemaLocation="Common.xsd""#));
}

#[test]
fn root_is_the_saved_wsdl_nobody_imports() {
    let (graph, root, bindings, _) = service_graph();
    let options = SaveOptions {
        excluded: HashSet::from([root]),
        ..SaveOptions::default()
    };
    let plan = plan(&graph, Path::new("/out"), &options);
    assert_eq!(plan.root, Some(bindings));
}

#[test]
fn write_creates_directory_and_files() {
    let (graph, _, _, _) = service_graph();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/out");

    let plan = plan(&graph, &out, &SaveOptions::default());
    let written = plan.write().unwrap();

    assert_eq!(written.len(), 3);
    for file in &plan.files {
        assert_eq!(std::fs::read_to_string(&file.path).unwrap(), file.contents);
    }
}

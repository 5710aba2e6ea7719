//! Loading a saved document set reproduces the original graph

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use wsmeta_loader::{DocumentGraphLoader, EntryPoint};
use wsmeta_model::{Dialect, DocumentGraph};
use wsmeta_saver::{plan, SaveOptions};
use wsmeta_transport::{EndpointResolver, HttpTransport};

const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

fn loader() -> DocumentGraphLoader {
    let transport = HttpTransport::new("wsmeta-test", None).unwrap();
    DocumentGraphLoader::new(Arc::new(EndpointResolver::new(Arc::new(transport))))
}

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// Sorted (dialect, namespace) pairs, with chameleons under their adopted
/// namespace.
fn composition(graph: &DocumentGraph) -> Vec<(Dialect, String)> {
    let mut pairs: Vec<_> = graph
        .sections()
        .map(|(id, section)| {
            let namespace = match section.dialect() {
                Dialect::Schema => graph.effective_namespace(id, None),
                _ => section.target_namespace(),
            };
            (section.dialect(), namespace.unwrap_or_default().to_string())
        })
        .collect();
    pairs.sort_by(|a, b| (a.0 as u8, &a.1).cmp(&(b.0 as u8, &b.1)));
    pairs
}

#[tokio::test]
async fn saved_files_load_back_into_the_same_graph() {
    let src = tempfile::tempdir().unwrap();
    write(
        src.path(),
        "svc.wsdl",
        &format!(
            r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" {XS} targetNamespace="urn:svc">
  <wsdl:import namespace="urn:b" location="bindings/b.wsdl"/>
  <wsdl:types>
    <xs:schema targetNamespace="urn:svc:types">
      <xs:import namespace="urn:orders" schemaLocation="xsd/orders.xsd"/>
    </xs:schema>
  </wsdl:types>
</wsdl:definitions>"#
        ),
    );
    write(
        src.path(),
        "bindings/b.wsdl",
        r#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:b"/>"#,
    );
    write(
        src.path(),
        "xsd/orders.xsd",
        &format!(
            r#"<xs:schema {XS} targetNamespace="urn:orders"><xs:include schemaLocation="common.xsd"/></xs:schema>"#
        ),
    );
    write(
        src.path(),
        "xsd/common.xsd",
        &format!(r#"<xs:schema {XS}><xs:element name="id" type="xs:string"/></xs:schema>"#),
    );

    let entry = src.path().join("svc.wsdl").to_string_lossy().into_owned();
    let first = loader().load(EntryPoint::Files(vec![entry])).await.unwrap();
    assert!(first.errors.is_empty(), "{:?}", first.errors);
    assert_eq!(first.graph.len(), 4);

    let out = tempfile::tempdir().unwrap();
    let saved = plan(&first.graph, out.path(), &SaveOptions::default());
    assert!(saved.warnings.is_empty(), "{:?}", saved.warnings);
    saved.write().unwrap();
    let root = saved.root_path().unwrap().to_string_lossy().into_owned();
    assert!(root.ends_with("svc.wsdl"));

    let second = loader().load(EntryPoint::Files(vec![root])).await.unwrap();
    assert!(second.errors.is_empty(), "{:?}", second.errors);
    assert_eq!(composition(&second.graph), composition(&first.graph));
    assert_eq!(
        composition(&first.graph),
        vec![
            (Dialect::Wsdl, "urn:b".to_string()),
            (Dialect::Wsdl, "urn:svc".to_string()),
            (Dialect::Schema, "urn:orders".to_string()),
            (Dialect::Schema, "urn:orders".to_string()),
        ]
    );
}

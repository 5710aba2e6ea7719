use crate::error::{ModelError, Result};
use crate::types::{
    EndpointReferenceDocument, OpaqueDocument, PolicyDocument, RawReference, ReferenceKind,
    SchemaDocument, SectionPayload, WsdlDocument,
};
use roxmltree::{Document, Node, ParsingOptions};

pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const POLICY_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";
pub const POLICY_NS_15: &str = "http://www.w3.org/ns/ws-policy";
pub const WSA_NS: &str = "http://www.w3.org/2005/08/addressing";
pub const WSA_NS_2004: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
pub const MEX_NS: &str = "http://schemas.xmlsoap.org/ws/2004/09/mex";

/// Namespaces whose schemas are built into every processor and never fetched.
#[must_use]
pub fn is_well_known_namespace(ns: &str) -> bool {
    ns == XML_NS || ns == XSD_NS
}

pub(crate) fn parsing_options() -> ParsingOptions {
    ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    }
}

pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Sniff the root element of `text` and parse the matching payload.
///
/// Unknown roots are an error unless `allow_opaque` is set, in which case
/// they are kept as an [`OpaqueDocument`].
pub(crate) fn parse_payload(
    text: &str,
    location: &str,
    allow_opaque: bool,
) -> Result<SectionPayload> {
    let doc = Document::parse_with_options(text, parsing_options()).map_err(|e| {
        ModelError::Xml {
            location: location.to_string(),
            message: e.to_string(),
        }
    })?;
    let root = doc.root_element();
    let namespace = root.tag_name().namespace().unwrap_or_default();
    let name = root.tag_name().name();

    match (namespace, name) {
        (WSDL_NS, "definitions") => Ok(SectionPayload::Wsdl(parse_wsdl(root))),
        (XSD_NS, "schema") => Ok(SectionPayload::Schema(parse_schema(root, None))),
        (POLICY_NS | POLICY_NS_15, "Policy") => Ok(SectionPayload::Policy(PolicyDocument {
            id: root
                .attributes()
                .find(|a| a.name() == "Id" || a.name() == "Name")
                .map(|a| a.value().to_string()),
        })),
        (WSA_NS | WSA_NS_2004, "EndpointReference") => {
            parse_endpoint_reference(root, namespace, location)
                .map(SectionPayload::EndpointReference)
        }
        _ if allow_opaque => Ok(SectionPayload::Opaque(OpaqueDocument {
            root_namespace: root.tag_name().namespace().map(str::to_string),
            root_name: name.to_string(),
        })),
        _ => Err(ModelError::UnsupportedDocument {
            location: location.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }),
    }
}

fn parse_wsdl(root: Node) -> WsdlDocument {
    let mut doc = WsdlDocument {
        target_namespace: non_empty_attribute(root, "targetNamespace"),
        ..Default::default()
    };

    for child in root.children().filter(Node::is_element) {
        if child.tag_name().namespace() != Some(WSDL_NS) {
            continue;
        }
        match child.tag_name().name() {
            "import" => {
                if let Some(reference) =
                    location_reference(child, "location", ReferenceKind::WsdlImport, None)
                {
                    doc.imports.push(reference);
                }
            }
            "types" => {
                for schema in child.children().filter(|n| is_xsd(*n, "schema")) {
                    let index = doc.schemas.len();
                    doc.schemas.push(parse_schema(schema, Some(index)));
                }
            }
            _ => {}
        }
    }

    doc
}

fn parse_schema(node: Node, schema_index: Option<usize>) -> SchemaDocument {
    let references = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(XSD_NS))
        .filter_map(|child| {
            let kind = match child.tag_name().name() {
                "import" => ReferenceKind::SchemaImport,
                "include" => ReferenceKind::SchemaInclude,
                "redefine" => ReferenceKind::SchemaRedefine,
                _ => return None,
            };
            location_reference(child, "schemaLocation", kind, schema_index)
        })
        .collect();

    SchemaDocument {
        target_namespace: non_empty_attribute(node, "targetNamespace"),
        references,
    }
}

fn parse_endpoint_reference(
    root: Node,
    namespace: &str,
    location: &str,
) -> Result<EndpointReferenceDocument> {
    let address_node = root
        .children()
        .find(|n| n.tag_name().namespace() == Some(namespace) && n.tag_name().name() == "Address")
        .ok_or_else(|| ModelError::Xml {
            location: location.to_string(),
            message: "EndpointReference has no Address".to_string(),
        })?;
    let text_node = address_node.first_child().filter(Node::is_text);
    let address = address_node.text().unwrap_or_default().trim().to_string();
    if address.is_empty() {
        return Err(ModelError::Xml {
            location: location.to_string(),
            message: "EndpointReference Address is empty".to_string(),
        });
    }

    Ok(EndpointReferenceDocument {
        reference: RawReference {
            kind: ReferenceKind::MetadataReference,
            location: address.clone(),
            namespace: None,
            value_range: text_node.map(|n| n.range()),
            schema_index: None,
        },
        address,
    })
}

fn location_reference(
    node: Node,
    attribute: &str,
    kind: ReferenceKind,
    schema_index: Option<usize>,
) -> Option<RawReference> {
    let attr = node
        .attributes()
        .find(|a| a.name() == attribute && a.namespace().is_none())?;
    let location = attr.value().trim();
    if location.is_empty() {
        return None;
    }

    Some(RawReference {
        kind,
        location: location.to_string(),
        namespace: non_empty_attribute(node, "namespace"),
        value_range: Some(attr.range_value()),
        schema_index,
    })
}

fn non_empty_attribute(node: Node, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_xsd(node: Node, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(XSD_NS) && node.tag_name().name() == name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dialect;
    use pretty_assertions::assert_eq;

    const WSDL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    targetNamespace="http://tempuri.org/">
  <wsdl:import namespace="http://tempuri.org/bindings" location="bindings.wsdl"/>
  <wsdl:types>
    <xsd:schema targetNamespace="http://tempuri.org/Imports">
      <xsd:import schemaLocation="types0.xsd" namespace="http://tempuri.org/"/>
      <xsd:import namespace="http://www.w3.org/XML/1998/namespace"/>
    </xsd:schema>
  </wsdl:types>
</wsdl:definitions>"#;

    #[test]
    fn wsdl_imports_and_embedded_schemas_are_collected() {
        let payload = parse_payload(WSDL, "svc.wsdl", false).unwrap();
        assert_eq!(payload.dialect(), Dialect::Wsdl);
        assert_eq!(payload.target_namespace(), Some("http://tempuri.org/"));

        let refs = payload.references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].kind, ReferenceKind::WsdlImport);
        assert_eq!(refs[0].location, "bindings.wsdl");
        assert_eq!(refs[0].schema_index, None);
        assert_eq!(refs[1].kind, ReferenceKind::SchemaImport);
        assert_eq!(refs[1].namespace.as_deref(), Some("http://tempuri.org/"));
        assert_eq!(refs[1].schema_index, Some(0));

        let range = refs[1].value_range.clone().unwrap();
        assert_eq!(&WSDL[range], "types0.xsd");
    }

    #[test]
    fn chameleon_schema_has_no_namespace() {
        let text = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:include schemaLocation="common.xsd"/>
        </xs:schema>"#;
        let SectionPayload::Schema(schema) = parse_payload(text, "a.xsd", false).unwrap() else {
            panic!("expected schema");
        };
        assert!(schema.is_chameleon());
        assert_eq!(schema.references[0].kind, ReferenceKind::SchemaInclude);
    }

    #[test]
    fn unknown_root_is_rejected_unless_opaque_allowed() {
        let html = "<html><body>Service help page</body></html>";
        let err = parse_payload(html, "http://host/svc.svc", false).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedDocument { ref name, .. } if name == "html"));

        let payload = parse_payload(html, "http://host/svc.svc", true).unwrap();
        assert_eq!(payload.dialect(), Dialect::Opaque);
    }

    #[test]
    fn endpoint_reference_address_becomes_an_edge() {
        let text = r#"<wsa:EndpointReference xmlns:wsa="http://www.w3.org/2005/08/addressing">
            <wsa:Address> http://host/svc.svc/mex </wsa:Address>
        </wsa:EndpointReference>"#;
        let payload = parse_payload(text, "mex", false).unwrap();
        let refs = payload.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::MetadataReference);
        assert_eq!(refs[0].location, "http://host/svc.svc/mex");
    }

    #[test]
    fn policy_id_is_read_from_wsu_id() {
        let text = r#"<wsp:Policy xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy"
            xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"
            wsu:Id="BasicBinding_policy"/>"#;
        let payload = parse_payload(text, "p.xml", false).unwrap();
        assert_eq!(
            payload,
            SectionPayload::Policy(PolicyDocument {
                id: Some("BasicBinding_policy".to_string())
            })
        );
    }
}

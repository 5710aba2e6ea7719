//! WS-MetadataExchange GET request and response codec.

use crate::error::{ResolveError, Result};
use roxmltree::{Document, Node};
use url::Url;
use wsmeta_model::xml::{escape_attribute, escape_text, extract_element};
use wsmeta_model::{Dialect, ModelError, MEX_NS, WSA_NS, WSA_NS_2004};

pub const SOAP12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const SOAP11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const TRANSFER_GET_ACTION: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Get";
const ANONYMOUS: &str = "http://www.w3.org/2005/08/addressing/anonymous";

/// SOAP 1.2 envelope for a WS-Transfer Get addressed to `to`.
#[must_use]
pub fn get_request(to: &Url, message_id: &uuid::Uuid) -> String {
    format!(
        concat!(
            r#"<s:Envelope xmlns:s="{soap}" xmlns:a="{wsa}">"#,
            r#"<s:Header>"#,
            r#"<a:Action s:mustUnderstand="1">{action}</a:Action>"#,
            r#"<a:MessageID>urn:uuid:{id}</a:MessageID>"#,
            r#"<a:ReplyTo><a:Address>{anonymous}</a:Address></a:ReplyTo>"#,
            r#"<a:To s:mustUnderstand="1">{to}</a:To>"#,
            r#"</s:Header>"#,
            r#"<s:Body/>"#,
            r#"</s:Envelope>"#
        ),
        soap = SOAP12_NS,
        wsa = WSA_NS,
        action = TRANSFER_GET_ACTION,
        id = message_id.hyphenated(),
        anonymous = ANONYMOUS,
        to = escape_text(to.as_str()),
    )
}

/// One `wsx:MetadataSection` of a GET response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MexEntry {
    /// The document itself, re-rooted as a standalone text.
    Inline {
        dialect: Dialect,
        identifier: Option<String>,
        text: String,
    },
    /// `wsx:Location`: the document has to be fetched with a GET.
    Location {
        dialect: Dialect,
        identifier: Option<String>,
        location: String,
    },
    /// `wsx:MetadataReference`: another MEX endpoint, as an EndpointReference
    /// document.
    Reference {
        identifier: Option<String>,
        address: String,
        text: String,
    },
}

/// Split a GET response into its metadata sections.
///
/// A response without a `wsx:Metadata` element yields no entries; a SOAP
/// fault is an error.
pub fn parse_get_response(text: &str, origin: &str) -> Result<Vec<MexEntry>> {
    let doc = Document::parse(text).map_err(|err| ModelError::Xml {
        location: origin.to_string(),
        message: err.to_string(),
    })?;

    if let Some(fault) = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "Fault" && is_soap(n))
    {
        return Err(ResolveError::MexFault {
            url: origin.to_string(),
            reason: fault_reason(fault),
        });
    }

    let Some(metadata) = doc.descendants().find(|n| is_mex(n, "Metadata")) else {
        log::debug!("no wsx:Metadata in response from {origin}");
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for section in metadata.children().filter(|n| is_mex(n, "MetadataSection")) {
        let dialect = section
            .attribute("Dialect")
            .map_or(Dialect::Opaque, Dialect::from_uri);
        let identifier = section
            .attribute("Identifier")
            .map(str::to_string)
            .filter(|id| !id.trim().is_empty());

        let Some(child) = section.first_element_child() else {
            log::debug!("empty metadata section in response from {origin}");
            continue;
        };

        if is_mex(&child, "Location") {
            let location = child.text().unwrap_or_default().trim().to_string();
            if !location.is_empty() {
                entries.push(MexEntry::Location {
                    dialect,
                    identifier,
                    location,
                });
            }
        } else if is_mex(&child, "MetadataReference") {
            match reference_address(child) {
                Some((wsa, address)) => entries.push(MexEntry::Reference {
                    identifier,
                    text: endpoint_reference(&wsa, &address),
                    address,
                }),
                None => log::warn!("metadata reference without address in {origin}"),
            }
        } else {
            entries.push(MexEntry::Inline {
                dialect,
                identifier,
                text: extract_element(text, child),
            });
        }
    }
    Ok(entries)
}

fn is_mex(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(MEX_NS)
}

fn is_soap(node: &Node) -> bool {
    matches!(node.tag_name().namespace(), Some(SOAP12_NS | SOAP11_NS))
}

fn fault_reason(fault: Node) -> String {
    fault
        .descendants()
        .find(|n| n.is_element() && matches!(n.tag_name().name(), "Text" | "faultstring"))
        .and_then(|n| n.text())
        .map_or_else(|| "unspecified fault".to_string(), |t| t.trim().to_string())
}

fn reference_address(reference: Node) -> Option<(String, String)> {
    reference.children().find_map(|n| {
        let ns = n.tag_name().namespace()?;
        if n.is_element() && n.tag_name().name() == "Address" && (ns == WSA_NS || ns == WSA_NS_2004)
        {
            let address = n.text()?.trim().to_string();
            (!address.is_empty()).then(|| (ns.to_string(), address))
        } else {
            None
        }
    })
}

fn endpoint_reference(wsa: &str, address: &str) -> String {
    format!(
        r#"<wsa:EndpointReference xmlns:wsa="{}"><wsa:Address>{}</wsa:Address></wsa:EndpointReference>"#,
        escape_attribute(wsa),
        escape_text(address)
    )
}

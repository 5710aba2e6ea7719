//! Text-level XML helpers: re-rooting a subtree as a standalone document and
//! rewriting attribute values in place.

use roxmltree::Node;
use std::ops::Range;

/// Escape a value for use inside a double-quoted attribute.
#[must_use]
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape character data.
#[must_use]
pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Replace byte ranges of `text`. Ranges must not overlap.
#[must_use]
pub fn apply_replacements(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor || range.end > text.len() {
            log::warn!("skipping overlapping replacement at {range:?}");
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Copy an element out of `source` as a standalone document.
///
/// Namespace declarations inherited from ancestors are added to the start
/// tag so prefixes keep resolving once the element is detached.
#[must_use]
pub fn extract_element(source: &str, node: Node) -> String {
    let slice = &source[node.range()];
    let tag_end = start_tag_end(slice);
    let start_tag = &slice[..tag_end];
    let name_end = start_tag
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace() || *c == '>' || *c == '/')
        .map_or(tag_end, |(idx, _)| idx);

    let mut declarations = String::new();
    for ns in node.namespaces() {
        let attr = match ns.name() {
            Some("xml") => continue,
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        if declares(start_tag, &attr) {
            continue;
        }
        declarations.push_str(&format!(" {attr}=\"{}\"", escape_attribute(ns.uri())));
    }

    let mut out = String::with_capacity(slice.len() + declarations.len());
    out.push_str(&slice[..name_end]);
    out.push_str(&declarations);
    out.push_str(&slice[name_end..]);
    out
}

fn declares(start_tag: &str, attr: &str) -> bool {
    start_tag.match_indices(attr).any(|(idx, _)| {
        let before_ok = start_tag[..idx]
            .chars()
            .last()
            .is_some_and(char::is_whitespace);
        let after = start_tag[idx + attr.len()..].trim_start();
        before_ok && after.starts_with('=')
    })
}

/// Index just past the `>` that closes the first start tag, honouring quotes.
fn start_tag_end(slice: &str) -> usize {
    let mut quote: Option<char> = None;
    for (idx, ch) in slice.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return idx + 1,
            (None, _) => {}
        }
    }
    slice.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    #[test]
    fn replacements_are_applied_in_order() {
        let text = r#"<a x="one" y="two"/>"#;
        let edits = vec![(14..17, "2".to_string()), (6..9, "1".to_string())];
        assert_eq!(apply_replacements(text, edits), r#"<a x="1" y="2"/>"#);
    }

    #[test]
    fn extracted_element_keeps_inherited_prefixes() {
        let text = r#"<env xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns="urn:outer"><xs:schema targetNamespace="urn:t"><xs:element name="a"/></xs:schema></env>"#;
        let doc = Document::parse(text).unwrap();
        let schema = doc.root_element().first_element_child().unwrap();

        let extracted = extract_element(text, schema);
        let reparsed = Document::parse(&extracted).unwrap();
        let root = reparsed.root_element();
        assert_eq!(root.tag_name().name(), "schema");
        assert_eq!(
            root.tag_name().namespace(),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert!(extracted.contains(r#"xmlns="urn:outer""#));
    }

    #[test]
    fn own_declarations_are_not_duplicated() {
        let text = r#"<env><p:x xmlns:p="urn:p"/></env>"#;
        let doc = Document::parse(text).unwrap();
        let node = doc.root_element().first_element_child().unwrap();
        assert_eq!(extract_element(text, node), r#"<p:x xmlns:p="urn:p"/>"#);
    }

    #[test]
    fn attribute_values_are_escaped() {
        assert_eq!(escape_attribute(r#"a&b"c"#), "a&amp;b&quot;c");
    }
}

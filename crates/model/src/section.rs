use crate::error::{ModelError, Result};
use crate::parse::{parse_payload, strip_bom};
use crate::types::{Dialect, RawReference, SectionPayload};
use std::sync::Arc;

/// One resolved metadata document.
///
/// The original text is kept next to the parsed payload: reference value
/// ranges point into it and the saver rewrites it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSection {
    payload: SectionPayload,
    identifier: Option<String>,
    location: Option<String>,
    text: Arc<str>,
}

impl MetadataSection {
    /// Parse a document fetched directly from a file or URL. Unknown root
    /// elements are rejected.
    pub fn parse(text: &str, location: &str) -> Result<Self> {
        let text = strip_bom(text);
        let payload = parse_payload(text, location, false)?;
        Ok(Self {
            identifier: payload.target_namespace().map(str::to_string),
            payload,
            location: Some(location.to_string()),
            text: Arc::from(text),
        })
    }

    /// Parse an inline MEX section. Unknown dialects are kept as opaque XML
    /// and the location is left for the loader to backfill.
    pub fn parse_inline(text: &str, identifier: Option<&str>, origin: &str) -> Result<Self> {
        let text = strip_bom(text);
        let payload = parse_payload(text, origin, true)?;
        let identifier = identifier
            .map(str::to_string)
            .or_else(|| payload.target_namespace().map(str::to_string));
        Ok(Self {
            payload,
            identifier,
            location: None,
            text: Arc::from(text),
        })
    }

    /// Reject documents above `max_bytes` before they are parsed.
    pub fn check_size(text: &str, location: &str, max_bytes: usize) -> Result<()> {
        if text.len() > max_bytes {
            return Err(ModelError::TooLarge {
                location: location.to_string(),
                size: text.len(),
                max: max_bytes,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.payload.dialect()
    }

    #[must_use]
    pub fn payload(&self) -> &SectionPayload {
        &self.payload
    }

    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn target_namespace(&self) -> Option<&str> {
        self.payload.target_namespace()
    }

    #[must_use]
    pub fn references(&self) -> Vec<&RawReference> {
        self.payload.references()
    }

    /// Set the source location of a section that was created without one.
    pub fn backfill_location(&mut self, location: impl Into<String>) -> Result<()> {
        if let Some(existing) = &self.location {
            return Err(ModelError::LocationAlreadySet(existing.clone()));
        }
        self.location = Some(location.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD: &str = "\u{feff}<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\" targetNamespace=\"urn:a\"/>";

    #[test]
    fn bom_is_stripped_and_identifier_defaults_to_namespace() {
        let section = MetadataSection::parse(XSD, "a.xsd").unwrap();
        assert!(section.text().starts_with('<'));
        assert_eq!(section.identifier(), Some("urn:a"));
        assert_eq!(section.location(), Some("a.xsd"));
    }

    #[test]
    fn location_backfill_happens_once() {
        let mut section = MetadataSection::parse_inline(XSD, Some("mex-0"), "mex").unwrap();
        assert_eq!(section.location(), None);
        section.backfill_location("http://host/a.xsd").unwrap();
        let err = section.backfill_location("http://host/b.xsd").unwrap_err();
        assert_eq!(
            err,
            ModelError::LocationAlreadySet("http://host/a.xsd".to_string())
        );
    }

    #[test]
    fn oversized_documents_are_rejected() {
        let err = MetadataSection::check_size("<a/>", "a.xml", 2).unwrap_err();
        assert!(matches!(err, ModelError::TooLarge { size: 4, max: 2, .. }));
    }
}

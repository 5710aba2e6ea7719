use std::fmt;
use std::ops::Range;

/// Index of a section inside a [`crate::DocumentGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub usize);

/// Index of an edge inside a [`crate::DocumentGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(pub usize);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata dialect of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Wsdl,
    Schema,
    Policy,
    EndpointReference,
    Opaque,
}

impl Dialect {
    /// Dialect named by a WS-MetadataExchange `Dialect` attribute.
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        match uri.trim() {
            crate::WSDL_NS => Self::Wsdl,
            crate::XSD_NS => Self::Schema,
            crate::POLICY_NS | crate::POLICY_NS_15 => Self::Policy,
            crate::WSA_NS | crate::WSA_NS_2004 => Self::EndpointReference,
            _ => Self::Opaque,
        }
    }

    /// File extension used when the section is written to disk
    #[must_use]
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Wsdl => "wsdl",
            Self::Schema => "xsd",
            Self::Policy | Self::EndpointReference | Self::Opaque => "xml",
        }
    }

    /// WSDL and XSD are the dialects that count as usable metadata.
    #[must_use]
    pub fn is_contract(self) -> bool {
        matches!(self, Self::Wsdl | Self::Schema)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wsdl => "wsdl",
            Self::Schema => "xsd",
            Self::Policy => "policy",
            Self::EndpointReference => "epr",
            Self::Opaque => "xml",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    WsdlImport,
    SchemaImport,
    SchemaInclude,
    SchemaRedefine,
    /// Address of an EndpointReference that leads to more metadata.
    MetadataReference,
}

impl ReferenceKind {
    /// Include and redefine pull the target into the includer's namespace.
    #[must_use]
    pub fn is_include(self) -> bool {
        matches!(self, Self::SchemaInclude | Self::SchemaRedefine)
    }
}

/// An edge as found in the document text, before any resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    pub kind: ReferenceKind,
    pub location: String,
    pub namespace: Option<String>,
    /// Byte range of the location attribute value inside the section text.
    pub value_range: Option<Range<usize>>,
    /// Embedded schema (inside `wsdl:types`) that owns the reference.
    pub schema_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDocument {
    pub target_namespace: Option<String>,
    pub references: Vec<RawReference>,
}

impl SchemaDocument {
    /// A schema without a target namespace adopts its includer's namespace.
    #[must_use]
    pub fn is_chameleon(&self) -> bool {
        self.target_namespace
            .as_deref()
            .map_or(true, |ns| ns.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WsdlDocument {
    pub target_namespace: Option<String>,
    pub imports: Vec<RawReference>,
    pub schemas: Vec<SchemaDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyDocument {
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReferenceDocument {
    pub address: String,
    pub reference: RawReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueDocument {
    pub root_namespace: Option<String>,
    pub root_name: String,
}

/// Parsed payload of a metadata section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPayload {
    Wsdl(WsdlDocument),
    Schema(SchemaDocument),
    Policy(PolicyDocument),
    EndpointReference(EndpointReferenceDocument),
    Opaque(OpaqueDocument),
}

impl SectionPayload {
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Wsdl(_) => Dialect::Wsdl,
            Self::Schema(_) => Dialect::Schema,
            Self::Policy(_) => Dialect::Policy,
            Self::EndpointReference(_) => Dialect::EndpointReference,
            Self::Opaque(_) => Dialect::Opaque,
        }
    }

    #[must_use]
    pub fn target_namespace(&self) -> Option<&str> {
        match self {
            Self::Wsdl(doc) => doc.target_namespace.as_deref(),
            Self::Schema(doc) => doc.target_namespace.as_deref(),
            _ => None,
        }
    }

    /// All outgoing edges in document order: WSDL imports first, then the
    /// references of each embedded schema.
    #[must_use]
    pub fn references(&self) -> Vec<&RawReference> {
        match self {
            Self::Wsdl(doc) => doc
                .imports
                .iter()
                .chain(doc.schemas.iter().flat_map(|s| s.references.iter()))
                .collect(),
            Self::Schema(doc) => doc.references.iter().collect(),
            Self::EndpointReference(doc) => vec![&doc.reference],
            Self::Policy(_) | Self::Opaque(_) => Vec::new(),
        }
    }

    /// Schema that owns references with the given `schema_index`; for a
    /// standalone XSD the index is `None`.
    #[must_use]
    pub fn schema(&self, schema_index: Option<usize>) -> Option<&SchemaDocument> {
        match (self, schema_index) {
            (Self::Schema(doc), None) => Some(doc),
            (Self::Wsdl(doc), Some(idx)) => doc.schemas.get(idx),
            _ => None,
        }
    }
}

// src/xbrl/qname.rs
use std::collections::HashMap;

/// Separator between prefix and local name in a taxonomy identifier (`us-gaap;Revenues`).
pub const TAXONOMY_ID_SEPARATOR: char = ';';

/// An element name as seen at the XML layer. A name without a namespace is an ordinary
/// variant, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QName {
    Qualified { namespace: String, local: String },
    Unqualified(String),
}

impl QName {
    /// Splits an element's expanded name into namespace and local name.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        match tag.namespace() {
            Some(namespace) if !namespace.is_empty() => QName::Qualified {
                namespace: namespace.to_string(),
                local: tag.name().to_string(),
            },
            _ => QName::Unqualified(tag.name().to_string()),
        }
    }

    pub fn local_name(&self) -> &str {
        match self {
            QName::Qualified { local, .. } => local,
            QName::Unqualified(local) => local,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            QName::Qualified { namespace, .. } => Some(namespace),
            QName::Unqualified(_) => None,
        }
    }
}

/// A name after namespace-to-prefix resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// `Some("")` when the element lives in the document's default namespace.
    pub prefix: Option<String>,
    pub local_name: String,
}

impl ResolvedName {
    /// `prefix;local` when a non-empty prefix is known, the bare local name otherwise.
    pub fn taxonomy_id_candidate(&self) -> String {
        match self.prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}{}{}", prefix, TAXONOMY_ID_SEPARATOR, self.local_name)
            }
            _ => self.local_name.clone(),
        }
    }
}

/// `namespace-uri -> prefix` table taken from the declarations on a document's root element.
#[derive(Debug, Clone, Default)]
pub struct NamespaceTable {
    uri_to_prefix: HashMap<String, String>,
}

impl NamespaceTable {
    pub fn from_root(doc: &roxmltree::Document<'_>) -> Self {
        let mut uri_to_prefix = HashMap::new();
        for ns in doc.root_element().namespaces() {
            // The default namespace maps to the empty prefix.
            uri_to_prefix.insert(ns.uri().to_string(), ns.name().unwrap_or("").to_string());
        }
        Self { uri_to_prefix }
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.uri_to_prefix.get(uri).map(String::as_str)
    }

    /// Never fails: an unknown namespace or a bare name yields no prefix.
    pub fn resolve(&self, name: &QName) -> ResolvedName {
        let prefix = name
            .namespace()
            .and_then(|uri| self.prefix_for(uri))
            .map(str::to_string);
        ResolvedName {
            prefix,
            local_name: name.local_name().to_string(),
        }
    }
}

// src/xbrl/linkbase.rs
use std::collections::BTreeMap;
use std::path::Path;

use crate::utils::error::LinkbaseError;
use crate::xbrl::filing::LinkbaseKind;

/// Namespace of the XBRL 2.1 linkbase vocabulary.
pub const LINKBASE_NAMESPACE: &str = "http://www.xbrl.org/2003/linkbase";

/// Local names that carry structure worth keeping. Everything else in a linkbase is ignored.
pub const RECOGNIZED_ELEMENTS: [&str; 10] = [
    "label",
    "labelLink",
    "labelArc",
    "loc",
    "definitionLink",
    "definitionArc",
    "calculationArc",
    "presentationLink",
    "presentationArc",
    "presentation",
];

/// Attribute names with their namespace portion removed (`xlink:label` -> `label`).
pub type Attributes = BTreeMap<String, String>;

/// One structurally relevant element pulled out of a linkbase.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkElement {
    pub kind: LinkbaseKind,
    /// `<document label>_<local name>`, e.g. `label_label` or `calculation_calculationArc`.
    pub document_label: String,
    pub attributes: Attributes,
    /// Trimmed text content; for label resources this is the human-readable label.
    pub text: Option<String>,
}

impl LinkElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct LinkbaseExtractor;

impl LinkbaseExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Reads and extracts one linkbase file.
    pub fn load(&self, path: &Path, kind: LinkbaseKind) -> Result<Vec<LinkElement>, LinkbaseError> {
        let content = std::fs::read_to_string(path).map_err(|source| LinkbaseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let elements = self.extract_str(&content, kind)?;
        tracing::debug!(
            "Extracted {} {} elements from {}",
            elements.len(),
            kind,
            path.display()
        );
        Ok(elements)
    }

    /// Walks every `<kind container>` directly under the linkbase root and emits each
    /// recognized element inside it, the container included, in document order.
    pub fn extract_str(&self, xml: &str, kind: LinkbaseKind) -> Result<Vec<LinkElement>, LinkbaseError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let doc = roxmltree::Document::parse(xml)?;

        let containers = doc.root_element().children().filter(|node| {
            node.is_element()
                && node.tag_name().name() == kind.container()
                && node.tag_name().namespace() == Some(LINKBASE_NAMESPACE)
        });

        let mut elements = Vec::new();
        for container in containers {
            for node in container.descendants().filter(|n| n.is_element()) {
                let local = node.tag_name().name();
                if !RECOGNIZED_ELEMENTS.contains(&local) {
                    continue;
                }
                elements.push(LinkElement {
                    kind,
                    document_label: format!("{}_{}", kind.document_label(), local),
                    attributes: stripped_attributes(node),
                    text: node
                        .text()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                });
            }
        }
        Ok(elements)
    }
}

/// Later attributes win if two namespaced attributes share a local name.
fn stripped_attributes(node: roxmltree::Node<'_, '_>) -> Attributes {
    node.attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect()
}

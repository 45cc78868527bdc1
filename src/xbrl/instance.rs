// src/xbrl/instance.rs
use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::utils::error::XbrlError;
use crate::xbrl::linkbase::Attributes;
use crate::xbrl::numeric;
use crate::xbrl::qname::{NamespaceTable, QName};

/// Placeholder written for absent non-numeric attributes.
const NULL: &str = "null";

/// Entity and reporting period a fact is reported against. A period is either a
/// start/end range or an instant, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Context {
    pub id: String,
    pub entity_identifier: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub instant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub measures: Vec<String>,
}

/// One reported value from the instance document.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub tag_local_name: String,
    /// `None` when the element's namespace is not declared on the root; `Some("")` for the
    /// default namespace.
    pub tag_prefix: Option<String>,
    pub taxonomy_id_candidate: String,
    pub context_ref: String,
    pub unit_ref: Option<String>,
    pub decimals: Option<String>,
    pub raw_value: Option<String>,
    pub numeric_value: Option<f64>,
}

/// Descriptive record of a `nonNumeric`/`nonFractional` element, keyed by its `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonNumericFact {
    pub name: String,
    pub context_ref: Option<String>,
    pub id: Option<String>,
    pub continued_at: String,
    pub escape: String,
    pub format: String,
    pub unit_ref: String,
    pub decimals: String,
    pub scale: String,
    pub value: String,
}

impl NonNumericFact {
    fn from_node(name: &str, node: roxmltree::Node<'_, '_>) -> Self {
        let or_null = |attr: &str| node.attribute(attr).unwrap_or(NULL).to_string();
        Self {
            name: name.to_string(),
            context_ref: node.attribute("contextRef").map(str::to_string),
            id: node.attribute("id").map(str::to_string),
            continued_at: or_null("continuedAt"),
            escape: or_null("escape"),
            format: or_null("format"),
            unit_ref: or_null("unitRef"),
            decimals: or_null("decimals"),
            scale: or_null("scale"),
            value: node
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(NULL)
                .to_string(),
        }
    }

    pub fn to_attributes(&self) -> Attributes {
        let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| NULL.to_string());
        Attributes::from([
            ("name".to_string(), self.name.clone()),
            ("context_ref".to_string(), optional(&self.context_ref)),
            ("id".to_string(), optional(&self.id)),
            ("continued_at".to_string(), self.continued_at.clone()),
            ("escape".to_string(), self.escape.clone()),
            ("format".to_string(), self.format.clone()),
            ("unit_ref".to_string(), self.unit_ref.clone()),
            ("decimals".to_string(), self.decimals.clone()),
            ("scale".to_string(), self.scale.clone()),
            ("value".to_string(), self.value.clone()),
        ])
    }
}

/// Everything pulled out of one instance document.
#[derive(Debug, Clone, Default)]
pub struct InstanceDocument {
    pub contexts: BTreeMap<String, Context>,
    pub units: BTreeMap<String, Unit>,
    /// Facts in document order.
    pub facts: Vec<Fact>,
    pub non_numeric: Vec<NonNumericFact>,
}

#[derive(Debug, Default)]
pub struct InstanceParser;

impl InstanceParser {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, path: &Path) -> Result<InstanceDocument, XbrlError> {
        let content = std::fs::read_to_string(path).map_err(|source| XbrlError::ReadInstance {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&content)
    }

    /// Single pass over every element. Anomalies in individual elements never fail the parse.
    pub fn parse_str(&self, xml: &str) -> Result<InstanceDocument, XbrlError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let doc = roxmltree::Document::parse(xml)?;
        let namespaces = NamespaceTable::from_root(&doc);

        let mut instance = InstanceDocument::default();
        for node in doc.descendants().filter(|n| n.is_element()) {
            let local = node.tag_name().name();

            if local == "context" {
                if let Some(context) = parse_context(node) {
                    instance.contexts.insert(context.id.clone(), context);
                }
            } else if local == "unit" {
                if let Some(unit) = parse_unit(node) {
                    instance.units.insert(unit.id.clone(), unit);
                }
            } else if local.contains("nonNumeric") || local.contains("nonFractional") {
                // Identified by the `name` attribute, not by the element's own name.
                if let Some(name) = node.attribute("name") {
                    instance.non_numeric.push(NonNumericFact::from_node(name, node));
                }
            } else if let Some(context_ref) = node.attribute("contextRef") {
                instance.facts.push(parse_fact(node, context_ref, &namespaces));
            }
        }

        tracing::debug!(
            "Parsed instance: {} contexts, {} units, {} facts, {} non-numeric records",
            instance.contexts.len(),
            instance.units.len(),
            instance.facts.len(),
            instance.non_numeric.len()
        );
        Ok(instance)
    }
}

fn trimmed_text(node: roxmltree::Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn descendant_text(node: roxmltree::Node<'_, '_>, local: &str) -> Option<String> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local)
        .and_then(trimmed_text)
}

fn child_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    local: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

fn parse_context(node: roxmltree::Node<'_, '_>) -> Option<Context> {
    let id = node.attribute("id")?;
    let entity_identifier = child_element(node, "entity").and_then(|e| descendant_text(e, "identifier"));

    let (mut period_start, mut period_end, mut instant) = (None, None, None);
    if let Some(period) = child_element(node, "period") {
        period_start = descendant_text(period, "startDate");
        period_end = descendant_text(period, "endDate");
        if period_start.is_none() && period_end.is_none() {
            instant = descendant_text(period, "instant");
        }
    }

    Some(Context {
        id: id.to_string(),
        entity_identifier,
        period_start,
        period_end,
        instant,
    })
}

fn parse_unit(node: roxmltree::Node<'_, '_>) -> Option<Unit> {
    let id = node.attribute("id")?;
    let measures = node
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "measure")
        .filter_map(trimmed_text)
        .collect();
    Some(Unit {
        id: id.to_string(),
        measures,
    })
}

fn parse_fact(node: roxmltree::Node<'_, '_>, context_ref: &str, namespaces: &NamespaceTable) -> Fact {
    let resolved = namespaces.resolve(&QName::from_node(node));
    let decimals = node.attribute("decimals").map(str::to_string);
    let raw_value = trimmed_text(node);
    let numeric_value = numeric::normalize(raw_value.as_deref(), decimals.as_deref());

    Fact {
        taxonomy_id_candidate: resolved.taxonomy_id_candidate(),
        tag_local_name: resolved.local_name,
        tag_prefix: resolved.prefix,
        context_ref: context_ref.to_string(),
        unit_ref: node.attribute("unitRef").map(str::to_string),
        decimals,
        raw_value,
        numeric_value,
    }
}

// src/xbrl/concepts.rs
use std::borrow::Cow;
use std::collections::btree_map::{self, BTreeMap};

use crate::xbrl::instance::{Fact, NonNumericFact};
use crate::xbrl::linkbase::{Attributes, LinkElement};
use crate::xbrl::qname::TAXONOMY_ID_SEPARATOR;

/// Document label of the label-linkbase resources that define concepts.
pub const LABEL_RESOURCE: &str = "label_label";
const LABEL_ID_PREFIX: &str = "lab_";
const LOCATION_ID_PREFIX: &str = "loc_";
/// Role of the standard (non-terse, non-documentation) label resource.
pub const STANDARD_LABEL_ROLE: &str = "http://www.xbrl.org/2003/role/label";

/// Master key: the label identifier with every `lab_` removed.
pub fn master_key_for(label_id: &str) -> String {
    label_id.replace(LABEL_ID_PREFIX, "")
}

pub fn location_id_for(label_id: &str) -> String {
    label_id.replace(LABEL_ID_PREFIX, LOCATION_ID_PREFIX)
}

/// `first;second` from the first two `_`-separated segments of the master key, or the master
/// key itself when it has no separator.
pub fn taxonomy_id_for(master_key: &str) -> String {
    let mut segments = master_key.split('_');
    match (segments.next(), segments.next()) {
        (Some(first), Some(second)) => format!("{}{}{}", first, TAXONOMY_ID_SEPARATOR, second),
        _ => master_key.to_string(),
    }
}

/// One reporting concept, merged from every label-linkbase resource sharing its master key.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyConcept {
    pub master_key: String,
    pub label_id: String,
    pub location_id: String,
    pub taxonomy_id: String,
    /// Human-readable label. The standard-role label is preferred over terse or
    /// documentation variants.
    pub label_text: Option<String>,
    /// Raw attributes per link-type tag (`label_label`, ...).
    pub links: BTreeMap<String, Attributes>,
    /// Every fact reported against this concept, in document order.
    pub facts: Vec<Fact>,
    pub non_numeric: Option<NonNumericFact>,
}

impl TaxonomyConcept {
    fn new(master_key: String) -> Self {
        Self {
            taxonomy_id: taxonomy_id_for(&master_key),
            master_key,
            label_id: String::new(),
            location_id: String::new(),
            label_text: None,
            links: BTreeMap::new(),
            facts: Vec::new(),
            non_numeric: None,
        }
    }

    /// Flattened view used by exporters: one entry per category.
    pub fn record_fields(&self) -> Vec<(Cow<'_, str>, RecordValue<'_>)> {
        let mut fields = vec![
            (Cow::Borrowed("label_id"), RecordValue::Scalar(Some(&self.label_id))),
            (Cow::Borrowed("location_id"), RecordValue::Scalar(Some(&self.location_id))),
            (Cow::Borrowed("taxonomy_id"), RecordValue::Scalar(Some(&self.taxonomy_id))),
            (Cow::Borrowed("label_text"), RecordValue::Scalar(self.label_text.as_deref())),
        ];
        for (tag, attributes) in &self.links {
            fields.push((Cow::Borrowed(tag.as_str()), RecordValue::Attributes(Cow::Borrowed(attributes))));
        }
        if let Some(non_numeric) = &self.non_numeric {
            fields.push((
                Cow::Borrowed("non_numeric"),
                RecordValue::Attributes(Cow::Owned(non_numeric.to_attributes())),
            ));
        }
        fields.push((Cow::Borrowed("facts"), RecordValue::FactList(&self.facts)));
        fields
    }
}

/// A concept field as handed to serializers.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue<'a> {
    Scalar(Option<&'a str>),
    Attributes(Cow<'a, Attributes>),
    FactList(&'a [Fact]),
}

/// `taxonomy id -> master key`. Later registrations replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyIndex {
    entries: BTreeMap<String, String>,
}

impl TaxonomyIndex {
    /// Returns the master key previously registered for `taxonomy_id`, if any.
    pub fn register(&mut self, taxonomy_id: String, master_key: String) -> Option<String> {
        self.entries.insert(taxonomy_id, master_key)
    }

    pub fn master_key(&self, taxonomy_id: &str) -> Option<&str> {
        self.entries.get(taxonomy_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The master concept table plus the audit trail of every other link element.
#[derive(Debug, Default)]
pub struct ConceptTable {
    concepts: BTreeMap<String, TaxonomyConcept>,
    index: TaxonomyIndex,
    link_elements: Vec<LinkElement>,
    skipped_labels: usize,
}

impl ConceptTable {
    pub fn builder() -> ConceptTableBuilder {
        ConceptTableBuilder::default()
    }

    pub fn get(&self, master_key: &str) -> Option<&TaxonomyConcept> {
        self.concepts.get(master_key)
    }

    pub fn concepts(&self) -> btree_map::Values<'_, String, TaxonomyConcept> {
        self.concepts.values()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn index(&self) -> &TaxonomyIndex {
        &self.index
    }

    /// Link elements outside the master-key path, in extraction order.
    pub fn link_elements(&self) -> &[LinkElement] {
        &self.link_elements
    }

    /// Label resources dropped for lacking a `label` attribute.
    pub fn skipped_labels(&self) -> usize {
        self.skipped_labels
    }

    /// Concept owning `taxonomy_id`, through the taxonomy index.
    pub fn by_taxonomy_id_mut(&mut self, taxonomy_id: &str) -> Option<&mut TaxonomyConcept> {
        let master_key = self.index.master_key(taxonomy_id)?;
        self.concepts.get_mut(master_key)
    }
}

/// Accumulates link elements from any number of linkbases, in any order.
#[derive(Debug, Default)]
pub struct ConceptTableBuilder {
    table: ConceptTable,
}

impl ConceptTableBuilder {
    pub fn ingest_all<I: IntoIterator<Item = LinkElement>>(&mut self, elements: I) {
        for element in elements {
            self.ingest(element);
        }
    }

    /// Label resources upsert a concept; everything else joins the audit trail.
    ///
    /// Merge policy: a resource whose master key already exists overwrites the concept's
    /// identifiers and its `label_label` attributes. Two *different* label identifiers
    /// stripping to the same master key are merged too, with a warning.
    pub fn ingest(&mut self, element: LinkElement) {
        if element.document_label != LABEL_RESOURCE {
            self.table.link_elements.push(element);
            return;
        }

        let Some(label_id) = element.attribute("label").map(str::to_string) else {
            tracing::warn!("Skipping label resource without a label attribute: {:?}", element.attributes);
            self.table.skipped_labels += 1;
            return;
        };

        let master_key = master_key_for(&label_id);
        let concept = self
            .table
            .concepts
            .entry(master_key.clone())
            .or_insert_with(|| TaxonomyConcept::new(master_key.clone()));

        if !concept.label_id.is_empty() && concept.label_id != label_id {
            tracing::warn!(
                "Label ids {:?} and {:?} both map to concept {:?}; merging, later wins",
                concept.label_id,
                label_id,
                master_key
            );
        }

        let is_standard_role = element.attribute("role") == Some(STANDARD_LABEL_ROLE);
        if element.text.is_some() && (is_standard_role || concept.label_text.is_none()) {
            concept.label_text = element.text.clone();
        }
        concept.location_id = location_id_for(&label_id);
        concept.taxonomy_id = taxonomy_id_for(&master_key);
        concept.label_id = label_id;
        let taxonomy_id = concept.taxonomy_id.clone();
        concept.links.insert(LABEL_RESOURCE.to_string(), element.attributes);

        if let Some(previous) = self.table.index.register(taxonomy_id.clone(), master_key.clone()) {
            if previous != master_key {
                tracing::debug!(
                    "Taxonomy id {} moved from concept {} to {}",
                    taxonomy_id,
                    previous,
                    master_key
                );
            }
        }
    }

    pub fn finish(self) -> ConceptTable {
        tracing::debug!(
            "Concept table built: {} concepts, {} index entries, {} audit elements",
            self.table.concepts.len(),
            self.table.index.len(),
            self.table.link_elements.len()
        );
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbrl::filing::LinkbaseKind;

    fn element(kind: LinkbaseKind, local: &str, attrs: &[(&str, &str)], text: Option<&str>) -> LinkElement {
        LinkElement {
            kind,
            document_label: format!("{}_{}", kind.document_label(), local),
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            text: text.map(str::to_string),
        }
    }

    fn label(value: &str) -> LinkElement {
        element(LinkbaseKind::Label, "label", &[("label", value), ("type", "resource")], None)
    }

    #[test]
    fn derives_identifiers_from_label_value() {
        assert_eq!(master_key_for("lab_XYZ_123"), "XYZ_123");
        assert_eq!(location_id_for("lab_XYZ_123"), "loc_XYZ_123");
        assert_eq!(taxonomy_id_for("XYZ_123"), "XYZ;123");
        // Only the first two segments count.
        assert_eq!(taxonomy_id_for("us-gaap_Revenues_1"), "us-gaap;Revenues");
        // No separator: the master key is its own taxonomy id.
        assert_eq!(taxonomy_id_for("Revenues"), "Revenues");
    }

    #[test]
    fn label_resource_creates_concept_and_index_entry() {
        let mut builder = ConceptTable::builder();
        builder.ingest(label("lab_XYZ_123"));
        let table = builder.finish();

        let concept = table.get("XYZ_123").unwrap();
        assert_eq!(concept.label_id, "lab_XYZ_123");
        assert_eq!(concept.location_id, "loc_XYZ_123");
        assert_eq!(concept.taxonomy_id, "XYZ;123");
        assert_eq!(concept.links["label_label"]["label"], "lab_XYZ_123");
        assert_eq!(table.index().master_key("XYZ;123"), Some("XYZ_123"));
        assert!(table.link_elements().is_empty());
    }

    #[test]
    fn non_label_elements_go_to_the_audit_trail_only() {
        let mut builder = ConceptTable::builder();
        builder.ingest_all([
            element(LinkbaseKind::Label, "loc", &[("label", "loc_meta_Revenue")], None),
            element(LinkbaseKind::Calculation, "calculationArc", &[("from", "a"), ("to", "b")], None),
            element(LinkbaseKind::Presentation, "presentationLink", &[("role", "r")], None),
        ]);
        let table = builder.finish();

        assert!(table.is_empty());
        assert_eq!(table.index().len(), 0);
        let labels: Vec<&str> = table
            .link_elements()
            .iter()
            .map(|e| e.document_label.as_str())
            .collect();
        assert_eq!(labels, vec!["label_loc", "calculation_calculationArc", "presentation_presentationLink"]);
    }

    #[test]
    fn same_master_key_is_merged_last_write_wins() {
        let mut builder = ConceptTable::builder();
        builder.ingest(element(
            LinkbaseKind::Label,
            "label",
            &[("label", "lab_meta_Revenue"), ("lang", "en-US"), ("role", "terse")],
            Some("Rev."),
        ));
        builder.ingest(element(
            LinkbaseKind::Label,
            "label",
            &[("label", "lab_meta_Revenue"), ("lang", "en-GB")],
            Some("Turnover"),
        ));
        let table = builder.finish();

        assert_eq!(table.len(), 1);
        let concept = table.get("meta_Revenue").unwrap();
        let attrs = &concept.links["label_label"];
        assert_eq!(attrs["lang"], "en-GB");
        assert!(!attrs.contains_key("role"));
        // No standard-role label seen: the first text sticks.
        assert_eq!(concept.label_text.as_deref(), Some("Rev."));
    }

    #[test]
    fn standard_role_label_text_is_preferred() {
        let mut builder = ConceptTable::builder();
        builder.ingest(element(
            LinkbaseKind::Label,
            "label",
            &[("label", "lab_meta_Revenue"), ("role", STANDARD_LABEL_ROLE)],
            Some("Revenue"),
        ));
        builder.ingest(element(
            LinkbaseKind::Label,
            "label",
            &[("label", "lab_meta_Revenue"), ("role", "http://www.xbrl.org/2003/role/documentation")],
            Some("Amount of revenue recognized."),
        ));
        let table = builder.finish();
        assert_eq!(table.get("meta_Revenue").unwrap().label_text.as_deref(), Some("Revenue"));
    }

    #[test]
    fn colliding_label_ids_merge_into_one_concept() {
        let mut builder = ConceptTable::builder();
        builder.ingest(label("lab_meta_Revenue"));
        builder.ingest(label("lab_lab_meta_Revenue"));
        let table = builder.finish();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("meta_Revenue").unwrap().label_id, "lab_lab_meta_Revenue");
    }

    #[test]
    fn later_concept_wins_the_taxonomy_index() {
        let mut builder = ConceptTable::builder();
        builder.ingest(label("lab_meta_Revenue"));
        builder.ingest(label("lab_meta_Revenue_Alt"));
        let table = builder.finish();

        assert_eq!(table.len(), 2);
        assert_eq!(table.index().master_key("meta;Revenue"), Some("meta_Revenue_Alt"));
    }

    #[test]
    fn label_without_label_attribute_is_skipped() {
        let mut builder = ConceptTable::builder();
        builder.ingest(element(LinkbaseKind::Label, "label", &[("type", "resource")], Some("x")));
        let table = builder.finish();
        assert!(table.is_empty());
        assert!(table.link_elements().is_empty());
        assert_eq!(table.skipped_labels(), 1);
    }

    #[test]
    fn record_fields_cover_every_category() {
        let mut builder = ConceptTable::builder();
        builder.ingest(label("lab_meta_Revenue"));
        let table = builder.finish();
        let fields = table.get("meta_Revenue").unwrap().record_fields();
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_ref()).collect();
        assert_eq!(
            names,
            vec!["label_id", "location_id", "taxonomy_id", "label_text", "label_label", "facts"]
        );
        assert!(matches!(&fields[5].1, RecordValue::FactList(facts) if facts.is_empty()));
    }
}

// src/xbrl/resolver.rs
use std::collections::BTreeMap;

use crate::xbrl::concepts::ConceptTable;
use crate::xbrl::instance::{Fact, NonNumericFact};

/// Facts and non-numeric records with no matching concept. Kept for inspection only.
#[derive(Debug, Clone, Default)]
pub struct UnmappedBucket {
    pub facts: Vec<Fact>,
    pub non_numeric: BTreeMap<String, NonNumericFact>,
}

/// Outcome of one join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Mapped { master_key: String },
    Unmapped,
}

/// Joins instance facts onto a finished concept table by taxonomy id.
/// A miss is routine and ends up in the unmapped bucket.
pub struct FactResolver<'t> {
    concepts: &'t mut ConceptTable,
    unmapped: UnmappedBucket,
}

impl<'t> FactResolver<'t> {
    pub fn new(concepts: &'t mut ConceptTable) -> Self {
        Self {
            concepts,
            unmapped: UnmappedBucket::default(),
        }
    }

    /// Appends the fact to its concept's fact list (a concept may collect one per period).
    pub fn resolve_fact(&mut self, fact: &Fact) -> Resolution {
        match self.concepts.by_taxonomy_id_mut(&fact.taxonomy_id_candidate) {
            Some(concept) => {
                concept.facts.push(fact.clone());
                Resolution::Mapped {
                    master_key: concept.master_key.clone(),
                }
            }
            None => {
                self.unmapped.facts.push(fact.clone());
                Resolution::Unmapped
            }
        }
    }

    /// Matches on the record's `name` verbatim. A concept keeps only the latest record.
    pub fn resolve_non_numeric(&mut self, record: &NonNumericFact) -> Resolution {
        match self.concepts.by_taxonomy_id_mut(&record.name) {
            Some(concept) => {
                concept.non_numeric = Some(record.clone());
                Resolution::Mapped {
                    master_key: concept.master_key.clone(),
                }
            }
            None => {
                self.unmapped
                    .non_numeric
                    .insert(record.name.clone(), record.clone());
                Resolution::Unmapped
            }
        }
    }

    pub fn finish(self) -> UnmappedBucket {
        self.unmapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xbrl::filing::LinkbaseKind;
    use crate::xbrl::linkbase::LinkElement;

    fn table_with(label_ids: &[&str]) -> ConceptTable {
        let mut builder = ConceptTable::builder();
        for id in label_ids {
            builder.ingest(LinkElement {
                kind: LinkbaseKind::Label,
                document_label: "label_label".to_string(),
                attributes: [("label".to_string(), id.to_string())].into_iter().collect(),
                text: None,
            });
        }
        builder.finish()
    }

    fn fact(candidate: &str, context_ref: &str) -> Fact {
        let (prefix, local) = candidate.split_once(';').unwrap_or(("", candidate));
        Fact {
            tag_local_name: local.to_string(),
            tag_prefix: Some(prefix.to_string()),
            taxonomy_id_candidate: candidate.to_string(),
            context_ref: context_ref.to_string(),
            unit_ref: Some("usd".to_string()),
            decimals: None,
            raw_value: Some("1".to_string()),
            numeric_value: Some(1.0),
        }
    }

    fn non_numeric(name: &str, value: &str) -> NonNumericFact {
        NonNumericFact {
            name: name.to_string(),
            context_ref: Some("c1".to_string()),
            id: None,
            continued_at: "null".to_string(),
            escape: "null".to_string(),
            format: "null".to_string(),
            unit_ref: "null".to_string(),
            decimals: "null".to_string(),
            scale: "null".to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn mapped_and_unmapped_are_mutually_exclusive() {
        let mut table = table_with(&["lab_meta_Revenue"]);
        let facts = [
            fact("meta;Revenue", "c1"),
            fact("dei;DocumentType", "c1"),
            fact("meta;Revenue", "c2"),
        ];

        let mut resolver = FactResolver::new(&mut table);
        let outcomes: Vec<Resolution> = facts.iter().map(|f| resolver.resolve_fact(f)).collect();
        let mapped = outcomes
            .iter()
            .filter(|o| matches!(o, Resolution::Mapped { .. }))
            .count();
        assert_eq!(mapped, 2);
        let unmapped = resolver.finish();

        assert_eq!(
            outcomes[0],
            Resolution::Mapped {
                master_key: "meta_Revenue".to_string()
            }
        );
        assert_eq!(outcomes[1], Resolution::Unmapped);

        let concept = table.get("meta_Revenue").unwrap();
        let contexts: Vec<&str> = concept.facts.iter().map(|f| f.context_ref.as_str()).collect();
        assert_eq!(contexts, vec!["c1", "c2"]);
        assert_eq!(unmapped.facts.len(), 1);
        assert_eq!(unmapped.facts[0].taxonomy_id_candidate, "dei;DocumentType");
        assert!(unmapped
            .facts
            .iter()
            .all(|f| table.index().master_key(&f.taxonomy_id_candidate).is_none()));
    }

    #[test]
    fn non_numeric_records_attach_by_name() {
        let mut table = table_with(&["lab_dei_EntityRegistrantName"]);
        let mut resolver = FactResolver::new(&mut table);

        resolver.resolve_non_numeric(&non_numeric("dei;EntityRegistrantName", "first"));
        resolver.resolve_non_numeric(&non_numeric("dei;EntityRegistrantName", "second"));
        let outcome = resolver.resolve_non_numeric(&non_numeric("dei:EntityCentralIndexKey", "0001"));
        assert_eq!(outcome, Resolution::Unmapped);
        let unmapped = resolver.finish();

        let concept = table.get("dei_EntityRegistrantName").unwrap();
        assert_eq!(concept.non_numeric.as_ref().unwrap().value, "second");
        assert_eq!(unmapped.non_numeric["dei:EntityCentralIndexKey"].value, "0001");
        assert!(unmapped.facts.is_empty());
    }

    #[test]
    fn empty_table_sends_everything_to_unmapped() {
        let mut table = ConceptTable::default();
        let mut resolver = FactResolver::new(&mut table);
        assert_eq!(resolver.resolve_fact(&fact("meta;Revenue", "c1")), Resolution::Unmapped);
        assert_eq!(resolver.finish().facts.len(), 1);
    }
}

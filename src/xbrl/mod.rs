// src/xbrl/mod.rs
//! Linkbase-to-instance resolution.
//!
//! The label linkbase defines the master concept table, the other linkbases only feed the
//! audit trail, and instance facts are joined onto concepts by taxonomy id. The concept
//! table must be complete before the instance is resolved, so [`resolve_filing`] runs the
//! stages strictly in that order.

pub mod concepts;
pub mod filing;
pub mod instance;
pub mod linkbase;
pub mod numeric;
pub mod qname;
pub mod resolver;

use serde::Serialize;

use crate::utils::error::XbrlError;
use concepts::{ConceptTable, ConceptTableBuilder};
use filing::{FilingDocuments, LinkbaseKind};
use instance::{InstanceDocument, InstanceParser};
use linkbase::LinkbaseExtractor;
use resolver::{FactResolver, Resolution, UnmappedBucket};

/// Counts describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub linkbases_loaded: Vec<String>,
    pub linkbases_missing: Vec<String>,
    pub concepts: usize,
    pub taxonomy_ids: usize,
    pub link_elements: usize,
    pub skipped_labels: usize,
    pub contexts: usize,
    pub units: usize,
    pub facts: usize,
    pub mapped_facts: usize,
    pub unmapped_facts: usize,
    pub mapped_non_numeric: usize,
    pub unmapped_non_numeric: usize,
}

/// The joined record set handed to exporters.
#[derive(Debug)]
pub struct ResolvedFiling {
    pub concepts: ConceptTable,
    pub instance: InstanceDocument,
    pub unmapped: UnmappedBucket,
    pub summary: ResolutionSummary,
}

/// Resolves a filing from local files. Only a missing or unparseable instance document
/// fails the run; unusable linkbases are logged and skipped.
pub fn resolve_filing(documents: &FilingDocuments) -> Result<ResolvedFiling, XbrlError> {
    let instance_path = documents.instance.as_deref().ok_or(XbrlError::MissingInstance)?;

    let extractor = LinkbaseExtractor::new();
    let mut builder = ConceptTable::builder();
    let mut loaded = Vec::new();
    let mut missing = Vec::new();

    for kind in LinkbaseKind::ALL {
        let Some(path) = documents.linkbase(kind) else {
            tracing::warn!("No {} linkbase in filing, skipping", kind);
            missing.push(kind.to_string());
            continue;
        };
        match extractor.load(path, kind) {
            Ok(elements) => {
                builder.ingest_all(elements);
                loaded.push(kind.to_string());
            }
            Err(e) => {
                tracing::warn!("Skipping {} linkbase: {}", kind, e);
                missing.push(kind.to_string());
            }
        }
    }

    let instance = InstanceParser::new().load(instance_path)?;
    let mut resolved = join(builder, instance);
    resolved.summary.linkbases_loaded = loaded;
    resolved.summary.linkbases_missing = missing;
    Ok(resolved)
}

/// Same pipeline over in-memory documents. Linkbases that fail to parse are skipped.
#[allow(dead_code)]
pub fn resolve_sources(linkbases: &[(LinkbaseKind, &str)], instance_xml: &str) -> Result<ResolvedFiling, XbrlError> {
    let extractor = LinkbaseExtractor::new();
    let mut builder = ConceptTable::builder();
    let mut loaded = Vec::new();
    let mut missing = Vec::new();

    for (kind, xml) in linkbases {
        match extractor.extract_str(xml, *kind) {
            Ok(elements) => {
                builder.ingest_all(elements);
                loaded.push(kind.to_string());
            }
            Err(e) => {
                tracing::warn!("Skipping {} linkbase: {}", kind, e);
                missing.push(kind.to_string());
            }
        }
    }

    let instance = InstanceParser::new().parse_str(instance_xml)?;
    let mut resolved = join(builder, instance);
    resolved.summary.linkbases_loaded = loaded;
    resolved.summary.linkbases_missing = missing;
    Ok(resolved)
}

fn join(builder: ConceptTableBuilder, instance: InstanceDocument) -> ResolvedFiling {
    let mut concepts = builder.finish();
    if concepts.is_empty() {
        tracing::warn!("No concepts defined by the label linkbase; every fact will be unmapped");
    }

    let mut resolver = FactResolver::new(&mut concepts);
    let mut mapped_facts = 0;
    for fact in &instance.facts {
        if let Resolution::Mapped { master_key } = resolver.resolve_fact(fact) {
            tracing::trace!("{} -> {}", fact.taxonomy_id_candidate, master_key);
            mapped_facts += 1;
        }
    }
    let mut mapped_non_numeric = 0;
    for record in &instance.non_numeric {
        if let Resolution::Mapped { master_key } = resolver.resolve_non_numeric(record) {
            tracing::trace!("{} -> {}", record.name, master_key);
            mapped_non_numeric += 1;
        }
    }
    let unmapped = resolver.finish();

    let summary = ResolutionSummary {
        concepts: concepts.len(),
        taxonomy_ids: concepts.index().len(),
        link_elements: concepts.link_elements().len(),
        skipped_labels: concepts.skipped_labels(),
        contexts: instance.contexts.len(),
        units: instance.units.len(),
        facts: instance.facts.len(),
        mapped_facts,
        unmapped_facts: unmapped.facts.len(),
        mapped_non_numeric,
        unmapped_non_numeric: unmapped.non_numeric.len(),
        ..Default::default()
    };

    tracing::info!(
        "Resolved {} of {} facts onto {} concepts ({} unmapped)",
        summary.mapped_facts,
        summary.facts,
        summary.concepts,
        summary.unmapped_facts
    );

    ResolvedFiling {
        concepts,
        instance,
        unmapped,
        summary,
    }
}

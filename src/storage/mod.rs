// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::error::StorageError;
use crate::xbrl::concepts::RecordValue;
use crate::xbrl::instance::Fact;
use crate::xbrl::ResolvedFiling;

pub const LINKS_FILE: &str = "links.csv";
pub const CONCEPTS_FILE: &str = "concepts.csv";
pub const FACTS_FILE: &str = "facts.csv";
pub const CONTEXTS_FILE: &str = "contexts.csv";
pub const UNITS_FILE: &str = "units.csv";
pub const UNMAPPED_NON_NUMERIC_FILE: &str = "unmapped_non_numeric.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Writes a resolved filing as a set of CSV tables plus a JSON summary.
pub struct RecordWriter {
    base_dir: PathBuf,
}

impl RecordWriter {
    /// Creates a new RecordWriter, creating the output directory if needed.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self { base_dir: base_path })
    }

    /// Writes every table and returns the paths written, in order.
    pub fn write_all(&self, filing: &ResolvedFiling, label: &str) -> Result<Vec<PathBuf>, StorageError> {
        let paths = vec![
            self.write_links(filing)?,
            self.write_concepts(filing)?,
            self.write_facts(filing)?,
            self.write_contexts(filing)?,
            self.write_units(filing)?,
            self.write_unmapped_non_numeric(filing)?,
            self.write_summary(filing, label)?,
        ];
        for path in &paths {
            tracing::info!("Wrote {}", path.display());
        }
        Ok(paths)
    }

    fn csv_writer(&self, name: &str) -> Result<(csv::Writer<fs::File>, PathBuf), StorageError> {
        let path = self.base_dir.join(name);
        Ok((csv::Writer::from_path(&path)?, path))
    }

    /// One row per attribute of every audit link element.
    pub fn write_links(&self, filing: &ResolvedFiling) -> Result<PathBuf, StorageError> {
        let (mut writer, path) = self.csv_writer(LINKS_FILE)?;
        writer.write_record(["FILE", "LABEL", "VALUE"])?;
        for element in filing.concepts.link_elements() {
            writer.write_record([element.kind.document_label(), "item_type", element.document_label.as_str()])?;
            for (name, value) in &element.attributes {
                writer.write_record([element.kind.document_label(), name.as_str(), value.as_str()])?;
            }
        }
        writer.flush()?;
        Ok(path)
    }

    /// Concepts flattened to `ID, CATEGORY, LABEL, VALUE`; each fact becomes a row per field.
    pub fn write_concepts(&self, filing: &ResolvedFiling) -> Result<PathBuf, StorageError> {
        let (mut writer, path) = self.csv_writer(CONCEPTS_FILE)?;
        writer.write_record(["ID", "CATEGORY", "LABEL", "VALUE"])?;
        for concept in filing.concepts.concepts() {
            let id = concept.master_key.as_str();
            for (category, value) in concept.record_fields() {
                let category: &str = &category;
                match value {
                    RecordValue::Scalar(scalar) => {
                        writer.write_record([id, category, "", scalar.unwrap_or("")])?;
                    }
                    RecordValue::Attributes(attributes) => {
                        for (name, value) in attributes.iter() {
                            writer.write_record([id, category, name.as_str(), value.as_str()])?;
                        }
                    }
                    RecordValue::FactList(facts) => {
                        for (i, fact) in facts.iter().enumerate() {
                            let category = format!("{}[{}]", category, i);
                            for (name, value) in fact_fields(fact) {
                                writer.write_record([id, category.as_str(), name, value.as_str()])?;
                            }
                        }
                    }
                }
            }
        }
        writer.flush()?;
        Ok(path)
    }

    /// Every fact in document order, with the concept it resolved to and that concept's label
    /// (both empty when unmapped).
    pub fn write_facts(&self, filing: &ResolvedFiling) -> Result<PathBuf, StorageError> {
        let (mut writer, path) = self.csv_writer(FACTS_FILE)?;
        writer.write_record([
            "tag_prefix",
            "tag_local",
            "taxonomy_id_candidate",
            "contextRef",
            "unitRef",
            "decimals",
            "value_raw",
            "value_numeric",
            "concept",
            "concept_label",
        ])?;
        let index = filing.concepts.index();
        for fact in &filing.instance.facts {
            let concept = index.master_key(&fact.taxonomy_id_candidate).unwrap_or("");
            let label = filing
                .concepts
                .get(concept)
                .and_then(|c| c.label_text.as_deref())
                .unwrap_or("");
            let mut row: Vec<String> = fact_fields(fact).into_iter().map(|(_, v)| v).collect();
            row.push(concept.to_string());
            row.push(label.to_string());
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_contexts(&self, filing: &ResolvedFiling) -> Result<PathBuf, StorageError> {
        let (mut writer, path) = self.csv_writer(CONTEXTS_FILE)?;
        // Header comes from the Context field names.
        for context in filing.instance.contexts.values() {
            writer.serialize(context)?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_units(&self, filing: &ResolvedFiling) -> Result<PathBuf, StorageError> {
        let (mut writer, path) = self.csv_writer(UNITS_FILE)?;
        writer.write_record(["unit_id", "measures"])?;
        for unit in filing.instance.units.values() {
            let measures = unit.measures.join(" ");
            writer.write_record([unit.id.as_str(), measures.as_str()])?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_unmapped_non_numeric(&self, filing: &ResolvedFiling) -> Result<PathBuf, StorageError> {
        let (mut writer, path) = self.csv_writer(UNMAPPED_NON_NUMERIC_FILE)?;
        writer.write_record(["NAME", "LABEL", "VALUE"])?;
        for (name, record) in &filing.unmapped.non_numeric {
            for (label, value) in record.to_attributes() {
                writer.write_record([name.as_str(), label.as_str(), value.as_str()])?;
            }
        }
        writer.flush()?;
        Ok(path)
    }

    /// Summary counts plus extraction metadata, as pretty JSON.
    pub fn write_summary(&self, filing: &ResolvedFiling, label: &str) -> Result<PathBuf, StorageError> {
        let path = self.base_dir.join(SUMMARY_FILE);
        let metadata = serde_json::json!({
            "filing": label,
            "summary": filing.summary,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&path, metadata_str)?;
        Ok(path)
    }
}

fn fact_fields(fact: &Fact) -> [(&'static str, String); 8] {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        ("tag_prefix", text(&fact.tag_prefix)),
        ("tag_local", fact.tag_local_name.clone()),
        ("taxonomy_id_candidate", fact.taxonomy_id_candidate.clone()),
        ("context_ref", fact.context_ref.clone()),
        ("unit_ref", text(&fact.unit_ref)),
        ("decimals", text(&fact.decimals)),
        ("value_raw", text(&fact.raw_value)),
        (
            "value_numeric",
            fact.numeric_value.map(|v| v.to_string()).unwrap_or_default(),
        ),
    ]
}

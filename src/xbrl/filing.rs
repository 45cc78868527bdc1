// src/xbrl/filing.rs
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// File-name suffix of the instance document in an EDGAR filing directory.
pub const INSTANCE_SUFFIX: &str = "_htm.xml";

/// The four taxonomy linkbases a filing may ship with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkbaseKind {
    Calculation,
    Definition,
    Label,
    Presentation,
}

impl LinkbaseKind {
    /// Processing order for a resolution run.
    pub const ALL: [LinkbaseKind; 4] = [
        LinkbaseKind::Calculation,
        LinkbaseKind::Definition,
        LinkbaseKind::Label,
        LinkbaseKind::Presentation,
    ];

    /// Local name of the extended-link container holding this linkbase's elements.
    pub fn container(self) -> &'static str {
        match self {
            LinkbaseKind::Calculation => "calculationLink",
            LinkbaseKind::Definition => "definitionLink",
            LinkbaseKind::Label => "labelLink",
            LinkbaseKind::Presentation => "presentationLink",
        }
    }

    /// Prefix used when building a link element's document label (`label_loc`, ...).
    pub fn document_label(self) -> &'static str {
        match self {
            LinkbaseKind::Calculation => "calculation",
            LinkbaseKind::Definition => "definition",
            LinkbaseKind::Label => "label",
            LinkbaseKind::Presentation => "presentation",
        }
    }

    pub fn file_suffix(self) -> &'static str {
        match self {
            LinkbaseKind::Calculation => "_cal.xml",
            LinkbaseKind::Definition => "_def.xml",
            LinkbaseKind::Label => "_lab.xml",
            LinkbaseKind::Presentation => "_pre.xml",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| name.ends_with(kind.file_suffix()))
    }
}

impl fmt::Display for LinkbaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_label())
    }
}

/// True for any of the five document kinds the resolver consumes.
pub fn is_filing_document(name: &str) -> bool {
    name.ends_with(INSTANCE_SUFFIX) || LinkbaseKind::from_file_name(name).is_some()
}

/// Local paths of one filing's documents. Any linkbase may be absent.
#[derive(Debug, Clone, Default)]
pub struct FilingDocuments {
    pub instance: Option<PathBuf>,
    pub linkbases: BTreeMap<LinkbaseKind, PathBuf>,
}

impl FilingDocuments {
    /// Classifies paths by file-name suffix. Unrelated files are ignored; when two files
    /// share a suffix the later one wins.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut documents = Self::default();
        for path in paths {
            let path = path.into();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(INSTANCE_SUFFIX) {
                documents.instance = Some(path);
            } else if let Some(kind) = LinkbaseKind::from_file_name(name) {
                documents.linkbases.insert(kind, path);
            }
        }
        documents
    }

    /// Scans a directory (non-recursively) for filing documents.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(entry.path());
            }
        }
        // read_dir order is platform-dependent
        paths.sort();
        Ok(Self::from_paths(paths))
    }

    pub fn linkbase(&self, kind: LinkbaseKind) -> Option<&Path> {
        self.linkbases.get(&kind).map(PathBuf::as_path)
    }
}

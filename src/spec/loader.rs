//! YAML loading for specification and macro documents.
//!
//! Parse failures carry the document source and the failing location so the CLI can render
//! them with `miette`.

use std::fs;
use std::path::{Path, PathBuf};

use miette::{NamedSource, SourceSpan};
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use super::{MacroNamespaceDoc, SpecDocument};
use crate::ClashError;

/// A macro document together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroSource {
    pub origin: String,
    pub entries: MacroNamespaceDoc,
}

/// A fully loaded specification: the main document plus every macro document it pulls in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    pub document: SpecDocument,
    pub macro_sources: Vec<MacroSource>,
}

impl Specification {
    pub fn new(document: SpecDocument) -> Self {
        Self {
            document,
            macro_sources: Vec::new(),
        }
    }

    pub fn with_macros(mut self, origin: impl Into<String>, entries: MacroNamespaceDoc) -> Self {
        self.macro_sources.push(MacroSource {
            origin: origin.into(),
            entries,
        });
        self
    }
}

// =============================
// Public API for document loading
// =============================

/// Parses a specification document from YAML source.
pub fn load_spec_from_str(source: &str, origin: &str) -> Result<SpecDocument, ClashError> {
    parse_yaml(source, origin)
}

/// Reads and parses a specification document.
pub fn load_spec_from_file(path: &Path) -> Result<SpecDocument, ClashError> {
    let source = read_source(path)?;
    load_spec_from_str(&source, &path.display().to_string())
}

/// Parses a macro namespace document from YAML source. An empty document is an empty namespace.
pub fn load_macros_from_str(source: &str, origin: &str) -> Result<MacroNamespaceDoc, ClashError> {
    if source.trim().is_empty() {
        return Ok(MacroNamespaceDoc::new());
    }
    parse_yaml(source, origin)
}

/// Reads and parses a macro document.
pub fn load_macros_from_file(path: &Path) -> Result<MacroNamespaceDoc, ClashError> {
    let source = read_source(path)?;
    load_macros_from_str(&source, &path.display().to_string())
}

/// Loads the specification at `path`, its `macro_files` (resolved relative to it) and any
/// `extra_macros` paths. Directories are walked for `*.yaml`/`*.yml` files in sorted order.
pub fn load_specification(path: &Path, extra_macros: &[PathBuf]) -> Result<Specification, ClashError> {
    let document = load_spec_from_file(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let declared: Vec<PathBuf> = document
        .macro_files
        .iter()
        .map(|p| if p.is_absolute() { p.clone() } else { base.join(p) })
        .collect();

    let mut spec = Specification::new(document);
    for macro_path in declared.iter().chain(extra_macros) {
        for file in macro_files_under(macro_path)? {
            tracing::debug!(path = %file.display(), "loading macro document");
            let entries = load_macros_from_file(&file)?;
            spec = spec.with_macros(file.display().to_string(), entries);
        }
    }
    Ok(spec)
}

// =============================
// Internal helpers
// =============================

fn read_source(path: &Path) -> Result<String, ClashError> {
    fs::read_to_string(path).map_err(|e| ClashError::resource("read", path, e))
}

fn parse_yaml<T: DeserializeOwned>(source: &str, origin: &str) -> Result<T, ClashError> {
    serde_yaml::from_str(source).map_err(|e| {
        let offset = e.location().map(|l| l.index()).unwrap_or(0);
        ClashError::SpecSyntax {
            origin: origin.to_string(),
            message: e.to_string(),
            src: NamedSource::new(origin, source.to_string()),
            span: SourceSpan::from((offset.min(source.len()), 0)),
        }
    })
}

fn macro_files_under(path: &Path) -> Result<Vec<PathBuf>, ClashError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk loop"));
            ClashError::resource("walk", path, io)
        })?;
        let is_yaml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if entry.file_type().is_file() && is_yaml {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

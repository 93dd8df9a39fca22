//! Macro registry: the merged namespace of every loaded macro document.
//!
//! # Merging
//! Documents merge level by level. Two namespaces with the same name merge recursively; any
//! other pairing at one path (macro/macro, macro/namespace) is a `NameCollision`.
//!
//! # Lookup
//! | Method            | Input            | Fails with                      |
//! |-------------------|------------------|---------------------------------|
//! | `lookup`          | `nested.macro2`  | `UnknownMacro` (missing or ns)  |
//! | `entry`           | `nested`         | never, returns `Option`         |
//! | `qualified_names` | -                | never                           |

use crate::macros::types::{Macro, MacroEntry, MacroNamespace, MacroPath};
use crate::spec::{MacroNamespaceDoc, Specification};
use crate::ClashError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroRegistry {
    root: MacroNamespace,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from a specification's inline macros and macro documents, in
    /// that order.
    pub fn from_specification(spec: &Specification) -> Result<Self, ClashError> {
        let mut registry = Self::new();
        registry.merge_document(spec.document.macros.clone())?;
        for source in &spec.macro_sources {
            tracing::debug!(origin = %source.origin, "merging macro document");
            registry.merge_document(source.entries.clone())?;
        }
        Ok(registry)
    }

    /// Merges a loaded macro document into the registry.
    pub fn merge_document(&mut self, doc: MacroNamespaceDoc) -> Result<(), ClashError> {
        for (name, entry_doc) in doc {
            let entry = MacroEntry::from_doc(&name, entry_doc)?;
            merge_entry(&mut self.root, &MacroPath::root(&name), entry)?;
        }
        Ok(())
    }

    /// Registers a single macro at `path`, creating namespaces along the way.
    pub fn register(&mut self, path: &str, definition: Macro) -> Result<(), ClashError> {
        let path = MacroPath::parse(path)?;
        let mut entry = MacroEntry::Leaf(definition);
        for segment in path.segments()[1..].iter().rev() {
            let mut namespace = MacroNamespace::new();
            namespace.insert(segment.clone(), entry);
            entry = MacroEntry::Namespace(namespace);
        }
        let top = MacroPath::root(&path.segments()[0]);
        merge_entry(&mut self.root, &top, entry)
    }

    /// Finds the macro a dotted reference names.
    pub fn lookup(&self, reference: &str) -> Result<&Macro, ClashError> {
        let path = MacroPath::parse(reference)?;
        match self.entry(&path) {
            Some(MacroEntry::Leaf(m)) => Ok(m),
            Some(MacroEntry::Namespace(_)) => Err(ClashError::UnknownMacro {
                path: reference.to_string(),
                help: Some(format!("'{reference}' is a namespace; reference one of its macros")),
            }),
            None => Err(ClashError::UnknownMacro {
                path: reference.to_string(),
                help: self.suggest(reference),
            }),
        }
    }

    pub fn entry(&self, path: &MacroPath) -> Option<&MacroEntry> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first)?;
        for segment in rest {
            let MacroEntry::Namespace(namespace) = current else {
                return None;
            };
            current = namespace.get(segment)?;
        }
        Some(current)
    }

    /// Top-level entries, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &MacroEntry)> {
        self.root.iter()
    }

    /// Every macro's dotted name, sorted.
    pub fn qualified_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_names(&self.root, None, &mut names);
        names
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.lookup(reference).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    fn suggest(&self, reference: &str) -> Option<String> {
        let leaf = reference.rsplit('.').next().unwrap_or(reference);
        let close: Vec<String> = self
            .qualified_names()
            .into_iter()
            .filter(|name| name.rsplit('.').next() == Some(leaf))
            .collect();
        if close.is_empty() {
            None
        } else {
            Some(format!("did you mean: {}", close.join(", ")))
        }
    }
}

// Merges `entry` under `path` into `namespace`; only namespace/namespace pairs combine.
fn merge_entry(namespace: &mut MacroNamespace, path: &MacroPath, entry: MacroEntry) -> Result<(), ClashError> {
    let name = path.leaf().to_string();
    let Some(existing) = namespace.get_mut(&name) else {
        namespace.insert(name, entry);
        return Ok(());
    };
    match (existing, entry) {
        (MacroEntry::Namespace(existing), MacroEntry::Namespace(incoming)) => {
            for (child, child_entry) in incoming {
                merge_entry(existing, &path.child(&child), child_entry)?;
            }
            Ok(())
        }
        (existing, incoming) => Err(ClashError::NameCollision {
            path: path.to_string(),
            reason: format!(
                "a {} is already defined here, cannot add a {}",
                existing.kind(),
                incoming.kind()
            ),
        }),
    }
}

fn collect_names(namespace: &MacroNamespace, prefix: Option<&str>, out: &mut Vec<String>) {
    for (name, entry) in namespace {
        let qualified = match prefix {
            Some(p) => format!("{p}.{name}"),
            None => name.clone(),
        };
        match entry {
            MacroEntry::Leaf(_) => out.push(qualified),
            MacroEntry::Namespace(inner) => collect_names(inner, Some(&qualified), out),
        }
    }
}

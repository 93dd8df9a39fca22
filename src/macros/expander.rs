//! Macro expansion and command lowering.
//!
//! Lowers declarative [`CommandDoc`]s into [`CommandNode`]s, splicing every macro reference
//! they contain. Expansion is depth-first over the chain of macros currently being
//! expanded; meeting a macro already on that chain is a `Cycle` error, as is exceeding
//! [`MAX_MACRO_RECURSION_DEPTH`].
//!
//! Each reference builds fresh nodes from the macro's documents, so two expansions of the
//! same macro never share state.

use crate::completion::CompleterRegistry;
use crate::macros::registry::MacroRegistry;
use crate::macros::types::{MacroEntry, MacroPath, MAX_MACRO_RECURSION_DEPTH};
use crate::spec::{ArgumentDoc, CommandDoc, OptionDoc};
use crate::tree::{ArgumentSpec, CommandNode, OptionSpec};
use crate::ClashError;

pub struct MacroExpander<'a> {
    registry: &'a MacroRegistry,
    completers: &'a CompleterRegistry,
}

// =============================
// Public API for macro expansion
// =============================

impl<'a> MacroExpander<'a> {
    pub fn new(registry: &'a MacroRegistry, completers: &'a CompleterRegistry) -> Self {
        Self {
            registry,
            completers,
        }
    }

    /// Expands the macro at `reference` into a node called `name`.
    pub fn expand(&self, reference: &str, name: &str) -> Result<CommandNode, ClashError> {
        self.expand_with(reference, name, &mut Vec::new())
    }

    /// Expands a registry entry: a macro becomes a command, a namespace a group command
    /// holding its expanded members.
    pub fn expand_entry(&self, path: &MacroPath, entry: &MacroEntry) -> Result<CommandNode, ClashError> {
        match entry {
            MacroEntry::Leaf(_) => self.expand(&path.to_string(), path.leaf()),
            MacroEntry::Namespace(namespace) => {
                let mut group = CommandNode::new(path.leaf());
                for (name, child) in namespace {
                    group.insert_child(self.expand_entry(&path.child(name), child)?)?;
                }
                Ok(group)
            }
        }
    }

    /// Lowers a command document, expanding any macro it or its subcommands reference.
    pub fn lower_command(&self, doc: &CommandDoc) -> Result<CommandNode, ClashError> {
        self.lower_with(doc, &mut Vec::new())
    }

    /// Lowers argument entries onto `node`: `-x`/`--name` entries become value options,
    /// the rest positionals.
    pub fn lower_arguments(&self, args: &[ArgumentDoc], node: &mut CommandNode) -> Result<(), ClashError> {
        for arg in args {
            let source = arg
                .completer
                .as_ref()
                .map(|c| self.completers.resolve(c))
                .transpose()?;
            if arg.is_option() {
                let mut option = OptionSpec::from_form(&arg.name)?;
                option.help = arg.help.clone();
                option.source = source;
                node.options.push(option);
            } else {
                node.arguments.push(ArgumentSpec {
                    name: arg.name.clone(),
                    help: arg.help.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Lowers option documents onto `node`.
    pub fn lower_options(&self, options: &[OptionDoc], node: &mut CommandNode) -> Result<(), ClashError> {
        for doc in options {
            let mut option = OptionSpec::new(doc.short.as_deref(), doc.long.as_deref(), doc.takes_value)?;
            option.help = doc.help.clone();
            if let Some(completer) = &doc.completer {
                if !doc.takes_value {
                    return Err(ClashError::InvalidSpec {
                        message: format!("flag {} has a completer but takes no value", option.usage()),
                        help: Some("set `takes_value: true` or drop the completer".to_string()),
                    });
                }
                option.source = Some(self.completers.resolve(completer)?);
            }
            node.options.push(option);
        }
        Ok(())
    }
}

// =============================
// Internal expansion helpers
// =============================

impl MacroExpander<'_> {
    fn expand_with(&self, reference: &str, name: &str, chain: &mut Vec<String>) -> Result<CommandNode, ClashError> {
        if chain.iter().any(|r| r == reference) || chain.len() >= MAX_MACRO_RECURSION_DEPTH {
            let mut links = chain.clone();
            links.push(reference.to_string());
            return Err(ClashError::Cycle {
                chain: links.join(" -> "),
            });
        }
        let definition = self.registry.lookup(reference)?;
        tracing::trace!(reference, name, depth = chain.len(), "expanding macro");

        chain.push(reference.to_string());
        let mut node = CommandNode::new(name);
        node.help = definition.help.clone();
        self.lower_arguments(&definition.args, &mut node)?;
        for command in &definition.commands {
            let child = self.lower_with(command, chain)?;
            node.insert_child(child)?;
        }
        chain.pop();
        Ok(node)
    }

    fn lower_with(&self, doc: &CommandDoc, chain: &mut Vec<String>) -> Result<CommandNode, ClashError> {
        let mut node = CommandNode::new(&doc.name);
        node.help = doc.help.clone();
        self.lower_options(&doc.options, &mut node)?;
        self.lower_arguments(&doc.arguments, &mut node)?;
        if let Some(reference) = &doc.macro_ref {
            let spliced = self.expand_with(reference, &doc.name, chain)?;
            if node.help.is_none() {
                node.help = spliced.help.clone();
            }
            node.absorb(spliced)?;
        }
        for command in &doc.commands {
            let child = self.lower_with(command, chain)?;
            node.insert_child(child)?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::types::Macro;
    use crate::spec::CompleterDoc;

    fn macro_with(args: &[&str], commands: Vec<CommandDoc>) -> Macro {
        Macro {
            help: None,
            args: args.iter().map(|a| ArgumentDoc::new(*a)).collect(),
            commands,
        }
    }

    fn referencing(name: &str, reference: &str) -> CommandDoc {
        CommandDoc {
            macro_ref: Some(reference.to_string()),
            ..CommandDoc::new(name)
        }
    }

    #[test]
    fn expands_args_into_options_and_positionals() {
        let mut registry = MacroRegistry::new();
        registry.register("m", macro_with(&["target", "--arg"], vec![])).unwrap();
        let completers = CompleterRegistry::new();
        let node = MacroExpander::new(&registry, &completers).expand("m", "deploy").unwrap();
        assert_eq!(node.name, "deploy");
        assert_eq!(node.arguments[0].name, "target");
        assert_eq!(node.options[0].long.as_deref(), Some("--arg"));
        assert!(node.options[0].takes_value);
    }

    #[test]
    fn expansions_are_independent_copies() {
        let mut registry = MacroRegistry::new();
        registry
            .register("m", macro_with(&["--arg"], vec![CommandDoc::new("sub")]))
            .unwrap();
        let completers = CompleterRegistry::new();
        let expander = MacroExpander::new(&registry, &completers);
        let mut first = expander.expand("m", "one").unwrap();
        let second = expander.expand("m", "two").unwrap();

        first.options.clear();
        first.children.clear();
        assert_eq!(second.options.len(), 1);
        assert!(second.children.contains_key("sub"));
        assert_eq!(expander.expand("m", "three").unwrap().options.len(), 1);
    }

    #[test]
    fn detects_direct_and_indirect_cycles() {
        let mut registry = MacroRegistry::new();
        registry
            .register("selfish", macro_with(&[], vec![referencing("again", "selfish")]))
            .unwrap();
        registry
            .register("a", macro_with(&[], vec![referencing("to_b", "ns.b")]))
            .unwrap();
        registry
            .register("ns.b", macro_with(&[], vec![referencing("to_a", "a")]))
            .unwrap();
        let completers = CompleterRegistry::new();
        let expander = MacroExpander::new(&registry, &completers);

        let err = expander.expand("selfish", "x").unwrap_err();
        assert!(matches!(err, ClashError::Cycle { ref chain } if chain == "selfish -> selfish"));
        let err = expander.expand("a", "x").unwrap_err();
        assert!(matches!(err, ClashError::Cycle { ref chain } if chain == "a -> ns.b -> a"));
    }

    #[test]
    fn the_same_macro_may_appear_twice_without_a_cycle() {
        let mut registry = MacroRegistry::new();
        registry.register("leaf", macro_with(&["--arg"], vec![])).unwrap();
        registry
            .register(
                "pair",
                macro_with(&[], vec![referencing("left", "leaf"), referencing("right", "leaf")]),
            )
            .unwrap();
        let completers = CompleterRegistry::new();
        let node = MacroExpander::new(&registry, &completers).expand("pair", "pair").unwrap();
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn namespaces_expand_to_groups() {
        let mut registry = MacroRegistry::new();
        registry.register("nested.macro2", macro_with(&["--arg"], vec![])).unwrap();
        let completers = CompleterRegistry::new();
        let expander = MacroExpander::new(&registry, &completers);
        let (name, entry) = registry.entries().next().unwrap();
        let group = expander.expand_entry(&MacroPath::root(name), entry).unwrap();
        assert_eq!(group.name, "nested");
        assert_eq!(group.children["macro2"].options[0].dest(), "arg");
    }

    #[test]
    fn unknown_completers_fail_the_expansion() {
        let mut registry = MacroRegistry::new();
        let mut definition = macro_with(&[], vec![]);
        definition.args.push(ArgumentDoc::new("x").with_completer("missing"));
        registry.register("m", definition).unwrap();
        let completers = CompleterRegistry::new();
        let err = MacroExpander::new(&registry, &completers).expand("m", "m").unwrap_err();
        assert!(matches!(err, ClashError::UnknownCompleter { .. }));
    }

    #[test]
    fn flags_cannot_carry_completers() {
        let registry = MacroRegistry::new();
        let completers = CompleterRegistry::new();
        let doc = CommandDoc {
            options: vec![OptionDoc {
                long: Some("--force".to_string()),
                completer: Some(CompleterDoc::Choices { choices: vec![] }),
                ..OptionDoc::default()
            }],
            ..CommandDoc::new("c")
        };
        let err = MacroExpander::new(&registry, &completers).lower_command(&doc).unwrap_err();
        assert!(matches!(err, ClashError::InvalidSpec { .. }));
    }
}

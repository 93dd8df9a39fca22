//! Command tree construction.
//!
//! Builds the root from the built-ins, the user-declared commands and every macro in the
//! registry, then applies the cross-cutting passes: the `-h|--help` pair on every node and
//! the per-node option uniqueness check. The result is immutable.

use std::collections::HashSet;

use super::builtins;
use super::node::{CommandNode, Gate, OptionSpec};
use crate::completion::CompleterRegistry;
use crate::macros::{MacroExpander, MacroPath, MacroRegistry};
use crate::spec::Specification;
use crate::ClashError;

/// Program name used when the specification does not name one.
pub const DEFAULT_PROGRAM: &str = "clash";

/// The normalized command tree. Read-only once built.
#[derive(Debug, Clone)]
pub struct CommandTree {
    root: CommandNode,
}

impl CommandTree {
    pub fn root(&self) -> &CommandNode {
        &self.root
    }

    pub fn program(&self) -> &str {
        &self.root.name
    }

    /// Follows `path` from the root, ignoring gates.
    pub fn find(&self, path: &[&str]) -> Option<&CommandNode> {
        path.iter()
            .try_fold(&self.root, |node, name| node.children.get(*name))
    }
}

pub struct TreeBuilder<'a> {
    completers: &'a CompleterRegistry,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(completers: &'a CompleterRegistry) -> Self {
        Self { completers }
    }

    pub fn build(&self, spec: &Specification) -> Result<CommandTree, ClashError> {
        let registry = MacroRegistry::from_specification(spec)?;
        let expander = MacroExpander::new(&registry, self.completers);
        let program = spec.document.name.as_deref().unwrap_or(DEFAULT_PROGRAM);

        let mut root = CommandNode::new(program);
        root.insert_child(builtins::env_group(&expander, &spec.document.env.create)?)?;
        for command in builtins::environment_commands()? {
            root.insert_child(command)?;
        }

        for doc in &spec.document.commands {
            let mut node = expander.lower_command(doc)?;
            node.options.insert(0, builtins::verbose()?);
            node.gate = Gate::RequiresEnvironment;
            tracing::debug!(command = %node.name, "adding user command");
            root.insert_child(node)?;
        }

        for (name, entry) in registry.entries() {
            let node = expander.expand_entry(&MacroPath::root(name), entry)?.gated();
            tracing::debug!(command = %node.name, kind = entry.kind(), "splicing macro");
            root.insert_child(node)?;
        }

        root.visit_mut(&mut |node| node.options.push(OptionSpec::help_pair()));
        check_options(&root)?;

        tracing::debug!(
            program,
            commands = root.children.len(),
            macros = registry.qualified_names().len(),
            "built command tree"
        );
        Ok(CommandTree { root })
    }
}

fn check_options(node: &CommandNode) -> Result<(), ClashError> {
    let mut seen = HashSet::new();
    for form in node.options.iter().flat_map(OptionSpec::forms) {
        if !seen.insert(form) {
            return Err(ClashError::DuplicateOption {
                form: form.to_string(),
                command: node.name.clone(),
            });
        }
    }
    node.children.values().try_for_each(check_options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{load_spec_from_str, SpecDocument};

    fn build(source: &str) -> Result<CommandTree, ClashError> {
        let document = load_spec_from_str(source, "test.yaml").unwrap();
        TreeBuilder::new(&CompleterRegistry::new()).build(&Specification::new(document))
    }

    #[test]
    fn builtins_are_always_present() {
        let tree = TreeBuilder::new(&CompleterRegistry::new())
            .build(&Specification::new(SpecDocument::default()))
            .unwrap();
        let names: Vec<&str> = tree.root().children.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["apply", "env", "init", "status"]);
        assert!(tree.find(&["env", "create"]).is_some());
        assert_eq!(tree.program(), "clash");
    }

    #[test]
    fn every_node_carries_help() {
        let tree = build("commands:\n  - name: deploy\n    commands:\n      - name: now\n").unwrap();
        for path in [&[][..], &["env"], &["env", "use"], &["deploy"], &["deploy", "now"]] {
            let node = tree.find(path).unwrap();
            assert_eq!(node.options.iter().filter(|o| o.is_help()).count(), 1, "{path:?}");
        }
    }

    #[test]
    fn user_commands_are_gated_and_verbose() {
        let tree = build("commands:\n  - name: deploy\n").unwrap();
        let deploy = tree.find(&["deploy"]).unwrap();
        assert_eq!(deploy.gate, Gate::RequiresEnvironment);
        assert!(deploy.option("--verbose").is_some());
    }

    #[test]
    fn collisions_with_builtins_fail() {
        let err = build("commands:\n  - name: env\n").unwrap_err();
        assert!(matches!(err, ClashError::DuplicateCommand { ref name, .. } if name == "env"));
        let err = build("commands:\n  - name: a\n  - name: a\n").unwrap_err();
        assert!(matches!(err, ClashError::DuplicateCommand { .. }));
        let err = build("commands:\n  - name: status\nmacros:\n  status: {}\n").unwrap_err();
        assert!(matches!(err, ClashError::DuplicateCommand { .. }));
    }

    #[test]
    fn duplicate_option_forms_fail() {
        let err = build("commands:\n  - name: a\n    options:\n      - {short: -v}\n").unwrap_err();
        assert!(matches!(err, ClashError::DuplicateOption { ref form, .. } if form == "-v"));
        let err = build("commands:\n  - name: a\n    options:\n      - {long: --help}\n").unwrap_err();
        assert!(matches!(err, ClashError::DuplicateOption { .. }));
    }

    #[test]
    fn env_create_accepts_declared_arguments() {
        let tree = build("env:\n  create:\n    arguments:\n      - name: arg1\n      - name: --arg2\n").unwrap();
        let create = tree.find(&["env", "create"]).unwrap();
        assert_eq!(create.arguments[0].name, "arg1");
        assert!(create.option("--arg2").is_some_and(|o| o.takes_value));
        assert!(create.option("--storage-dir").is_some());
    }

    #[test]
    fn embedded_macro_references_splice_into_commands() {
        let tree = build(
            "commands:\n  - name: deploy\n    macro: shared.target\nmacros:\n  shared:\n    target:\n      args: [{name: where}]\n      commands: [{name: now}]\n",
        )
        .unwrap();
        let deploy = tree.find(&["deploy"]).unwrap();
        assert_eq!(deploy.arguments[0].name, "where");
        assert!(deploy.children.contains_key("now"));
        assert!(tree.find(&["shared", "target", "now"]).is_some());
    }

    #[test]
    fn macro_cycles_abort_the_build() {
        let err = build("macros:\n  loop:\n    commands: [{name: again, macro: loop}]\n").unwrap_err();
        assert!(matches!(err, ClashError::Cycle { .. }));
    }
}

//! Token walking over the command tree.
//!
//! The walk is shared by completion and dispatch. Per token, in order: a value for a pending
//! option, a declared option form, a reachable child name, the next positional slot. It
//! never fails: tokens that do not fit the tree are collected as `stray` and freeze the walk
//! at the node where they appeared. The
//! resolver degrades on them, the dispatcher turns them into usage errors.

use super::node::{CommandNode, OptionSpec};

/// An option seen on the line, with its value when it takes one.
#[derive(Debug, Clone)]
pub struct SuppliedOption<'t> {
    pub spec: &'t OptionSpec,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Walk<'t> {
    /// Nodes from the root to the terminal node.
    pub path: Vec<&'t CommandNode>,
    /// Positional values bound at the terminal node, in order.
    pub values: Vec<String>,
    /// Options supplied at the terminal node.
    pub options: Vec<SuppliedOption<'t>>,
    /// A value-taking option that was the last token and still awaits its value.
    pub pending: Option<&'t OptionSpec>,
    /// Tokens that fit nowhere, starting at the first one.
    pub stray: Vec<String>,
}

impl<'t> Walk<'t> {
    /// Walks `tokens` from `root`. `reachable` decides whether a child may be entered.
    pub fn new<S: AsRef<str>>(
        root: &'t CommandNode,
        tokens: &[S],
        reachable: impl Fn(&CommandNode) -> bool,
    ) -> Self {
        let mut walk = Walk {
            path: vec![root],
            values: Vec::new(),
            options: Vec::new(),
            pending: None,
            stray: Vec::new(),
        };
        for token in tokens {
            walk.step(token.as_ref(), &reachable);
        }
        walk
    }

    pub fn node(&self) -> &'t CommandNode {
        self.path[self.path.len() - 1]
    }

    /// Command names from the root's first child down to the terminal node.
    pub fn command_path(&self) -> Vec<&'t str> {
        self.path[1..].iter().map(|n| n.name.as_str()).collect()
    }

    pub fn is_stray(&self) -> bool {
        !self.stray.is_empty()
    }

    pub fn supplied(&self, option: &OptionSpec) -> bool {
        self.options.iter().any(|o| std::ptr::eq(o.spec, option))
    }

    pub fn help_requested(&self) -> bool {
        self.options.iter().any(|o| o.spec.is_help())
    }

    /// True while the terminal node still has unfilled positionals.
    pub fn positionals_pending(&self) -> bool {
        self.values.len() < self.node().arguments.len()
    }

    fn step(&mut self, token: &str, reachable: &impl Fn(&CommandNode) -> bool) {
        if let Some(spec) = self.pending.take() {
            self.options.push(SuppliedOption {
                spec,
                value: Some(token.to_string()),
            });
            return;
        }
        if self.is_stray() {
            self.stray.push(token.to_string());
            return;
        }
        let node = self.node();
        if token.starts_with('-') && token.len() > 1 {
            if let Some(spec) = node.option(token) {
                if spec.takes_value {
                    self.pending = Some(spec);
                } else {
                    self.options.push(SuppliedOption { spec, value: None });
                }
                return;
            }
            if let Some((spec, value)) = node.inline_option(token) {
                self.options.push(SuppliedOption {
                    spec,
                    value: Some(value.to_string()),
                });
                return;
            }
        } else if let Some(child) = node.children.get(token) {
            if reachable(child) {
                self.path.push(child);
                self.values.clear();
                self.options.clear();
                return;
            }
        }
        if self.positionals_pending() {
            self.values.push(token.to_string());
            return;
        }
        self.stray.push(token.to_string());
    }
}

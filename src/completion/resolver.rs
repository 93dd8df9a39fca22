//! Completion resolution.
//!
//! Walks the tree along the tokens typed so far and returns the candidates for the word
//! under the cursor. Resolution never fails: a broken line degrades to fewer candidates and
//! a completer error contributes none.

use std::collections::BTreeSet;

use super::input::PartialInput;
use crate::env::Environment;
use crate::tree::{CommandNode, CommandTree, Gate, ValueSource, Walk};

/// Environment state a single query resolves against.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext<'a> {
    pub active: Option<&'a Environment>,
    pub environments: Vec<&'a str>,
}

impl ResolveContext<'_> {
    /// Whether `node` can be entered with this state.
    pub fn reaches(&self, node: &CommandNode) -> bool {
        match node.gate {
            Gate::Always => true,
            Gate::RequiresEnvironment => self.active.is_some(),
        }
    }
}

/// Candidate completions for `input`, sorted and deduplicated.
pub fn resolve(tree: &CommandTree, ctx: &ResolveContext<'_>, input: &PartialInput) -> BTreeSet<String> {
    let walk = Walk::new(tree.root(), &input.tokens, |node: &CommandNode| ctx.reaches(node));
    let mut candidates = BTreeSet::new();

    if let Some(option) = walk.pending {
        if let Some(source) = &option.source {
            candidates.extend(values(source, ctx, &walk.values));
        }
        candidates.retain(|c| input.admits(c));
        return candidates;
    }

    let node = walk.node();
    for option in &node.options {
        if option.is_help() || !walk.supplied(option) {
            candidates.extend(option.forms().map(str::to_string));
        }
    }

    if !walk.is_stray() {
        if walk.positionals_pending() {
            if let Some(source) = &node.arguments[walk.values.len()].source {
                candidates.extend(values(source, ctx, &walk.values));
            }
        } else {
            candidates.extend(
                node.children
                    .values()
                    .filter(|child| ctx.reaches(child))
                    .map(|child| child.name.clone()),
            );
        }
    } else {
        tracing::trace!(stray = ?walk.stray, "line does not fit the tree");
    }

    candidates.retain(|c| input.admits(c));
    candidates
}

fn values(source: &ValueSource, ctx: &ResolveContext<'_>, resolved: &[String]) -> Vec<String> {
    match source {
        ValueSource::EnvironmentNames => ctx.environments.iter().map(|n| n.to_string()).collect(),
        ValueSource::Completer(completer) => match completer.complete(ctx.active, resolved) {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(completer = %completer.name, error = %err, "completer failed");
                Vec::new()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompleterRegistry;
    use crate::spec::{load_spec_from_str, Specification};
    use crate::tree::TreeBuilder;
    use crate::ClashError;

    const SPEC: &str = "
commands:
  - name: deploy
    arguments:
      - {name: target, completer: targets}
      - {name: --region, completer: {choices: [eu, us]}}
";

    fn tree() -> CommandTree {
        let mut completers = CompleterRegistry::new();
        completers
            .register_fn("targets", |env, _| {
                Ok(vec![format!("{}-web", env.map_or("none", |e| e.name.as_str()))])
            })
            .unwrap();
        let document = load_spec_from_str(SPEC, "test.yaml").unwrap();
        TreeBuilder::new(&completers)
            .build(&Specification::new(document))
            .unwrap()
    }

    fn complete(tree: &CommandTree, ctx: &ResolveContext<'_>, words: &[&str]) -> Vec<String> {
        resolve(tree, ctx, &PartialInput::from_words(words)).into_iter().collect()
    }

    #[test]
    fn root_without_environment_hides_gated_commands() {
        let tree = tree();
        let ctx = ResolveContext::default();
        assert_eq!(complete(&tree, &ctx, &[""]), vec!["--help", "-h", "env"]);
    }

    #[test]
    fn active_environment_opens_the_root() {
        let tree = tree();
        let env = Environment::new("main");
        let ctx = ResolveContext {
            active: Some(&env),
            environments: vec!["main"],
        };
        assert_eq!(
            complete(&tree, &ctx, &[""]),
            vec!["--help", "-h", "apply", "deploy", "env", "init", "status"]
        );
        assert_eq!(complete(&tree, &ctx, &["deploy", ""]), vec![
            "--help", "--region", "--verbose", "-h", "-v", "main-web"
        ]);
        assert_eq!(complete(&tree, &ctx, &["deploy", "x", "--region", ""]), vec!["eu", "us"]);
        assert_eq!(complete(&tree, &ctx, &["deploy", "x", "--region", "u"]), vec!["us"]);
    }

    #[test]
    fn supplied_options_are_not_offered_again() {
        let tree = tree();
        let ctx = ResolveContext::default();
        let got = complete(&tree, &ctx, &["env", "create", "--reset", "-"]);
        assert!(!got.contains(&"--reset".to_string()));
        assert!(!got.contains(&"-r".to_string()));
        assert!(got.contains(&"--help".to_string()));
        assert!(got.contains(&"--storage-dir".to_string()));
    }

    #[test]
    fn environment_names_complete_use() {
        let tree = tree();
        let ctx = ResolveContext {
            active: None,
            environments: vec!["main", "second"],
        };
        assert_eq!(complete(&tree, &ctx, &["env", "use", ""]), vec!["--help", "-h", "main", "second"]);
        assert_eq!(complete(&tree, &ctx, &["env", "use", "s"]), vec!["second"]);
    }

    #[test]
    fn stray_tokens_keep_only_options() {
        let tree = tree();
        let ctx = ResolveContext::default();
        assert_eq!(complete(&tree, &ctx, &["env", "bogus", ""]), vec!["--help", "-h"]);
        assert_eq!(complete(&tree, &ctx, &["init", ""]), vec!["--help", "-h"]);
    }

    #[test]
    fn failing_completers_contribute_nothing() {
        let mut completers = CompleterRegistry::new();
        completers
            .register_fn("broken", |_, _| {
                Err(ClashError::Completer {
                    name: "broken".to_string(),
                    message: "backend down".to_string(),
                })
            })
            .unwrap();
        let document = load_spec_from_str(
            "env:\n  create:\n    arguments:\n      - {name: arg1, completer: broken}\n",
            "test.yaml",
        )
        .unwrap();
        let tree = TreeBuilder::new(&completers)
            .build(&Specification::new(document))
            .unwrap();
        let got = complete(&tree, &ResolveContext::default(), &["env", "create", ""]);
        assert!(got.contains(&"--name".to_string()));
        assert!(!got.iter().any(|c| !c.starts_with('-')));
    }
}

//! Command dispatch.
//!
//! Binds a full command line against the tree with the same walk the resolver uses, then
//! executes the built-in commands against the environment store. User commands and macros
//! carry no behavior of their own: they come back as an [`Invocation`] for the embedding
//! program to act on.

use im::OrdMap;
use serde::Serialize;
use serde_json::Value;

use crate::completion::ResolveContext;
use crate::env::{CreateRequest, Environment, EnvironmentStore, DEFAULT_ENVIRONMENT};
use crate::tree::builtins::{self, CREATE, ENV, INIT, LIST, REMOVE, STATUS, USE};
use crate::tree::{CommandNode, CommandTree, Walk};
use crate::{usage_err, ClashError};

/// A command line bound to a tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    /// Command names from the root down.
    pub path: Vec<String>,
    /// Positionals by name, options by destination. Flags bind to booleans, value options
    /// that were not given to null.
    pub arguments: OrdMap<String, Value>,
    /// Active environment at dispatch time.
    pub environment: Option<String>,
}

impl Invocation {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.arguments
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn path_is(&self, path: &[&str]) -> bool {
        self.path.iter().map(String::as_str).eq(path.iter().copied())
    }
}

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `-h|--help` was given; carries the usage line of the node.
    Help(String),
    Created(String),
    Used(String),
    Removed(String),
    Listed {
        names: Vec<String>,
        active: Option<String>,
    },
    Initialized(String),
    Status {
        environment: Environment,
        json: bool,
    },
    /// `apply`, a user command or a macro.
    Invoked(Invocation),
}

/// Either a help request or a fully bound invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Help(String),
    Bound(Invocation),
}

/// Binds `tokens` against `tree`. Fails on anything the walk could not place, on a
/// missing option value, on a missing positional and on a group given without a command.
pub fn bind<S: AsRef<str>>(
    tree: &CommandTree,
    ctx: &ResolveContext<'_>,
    tokens: &[S],
) -> Result<Binding, ClashError> {
    let walk = Walk::new(tree.root(), tokens, |node: &CommandNode| ctx.reaches(node));
    let node = walk.node();
    let path = walk.command_path();
    let mut usage_path = vec![tree.program()];
    usage_path.extend(path.iter().copied());
    let usage = node.usage(&usage_path);

    if let Some(first) = walk.stray.first() {
        if node.children.get(first).is_some_and(|child| !ctx.reaches(child)) {
            return Err(ClashError::NoActiveEnvironment);
        }
        return Err(usage_err!("unrecognized argument '{}'", first; help = usage));
    }
    if walk.help_requested() {
        return Ok(Binding::Help(usage));
    }
    if let Some(option) = walk.pending {
        return Err(usage_err!("option {} expects a value", option.usage(); help = usage));
    }
    if let Some(missing) = node.arguments.get(walk.values.len()) {
        return Err(usage_err!("missing argument <{}>", missing.name; help = usage));
    }
    if node.is_group() {
        return Err(usage_err!("missing command"; help = usage));
    }

    let mut arguments = OrdMap::new();
    for (spec, value) in node.arguments.iter().zip(&walk.values) {
        arguments.insert(spec.name.clone(), Value::String(value.clone()));
    }
    for option in node.options.iter().filter(|o| !o.is_help()) {
        let default = if option.takes_value { Value::Null } else { Value::Bool(false) };
        arguments.insert(option.dest(), default);
    }
    for supplied in &walk.options {
        let value = match &supplied.value {
            Some(value) => Value::String(value.clone()),
            None => Value::Bool(true),
        };
        arguments.insert(supplied.spec.dest(), value);
    }

    Ok(Binding::Bound(Invocation {
        path: path.into_iter().map(str::to_string).collect(),
        arguments,
        environment: ctx.active.map(|e| e.name.clone()),
    }))
}

/// Binds and executes one command line against `store`.
pub fn dispatch<S: AsRef<str>>(
    tree: &CommandTree,
    store: &mut EnvironmentStore,
    tokens: &[S],
) -> Result<Outcome, ClashError> {
    let invocation = match bind(tree, &store.context(), tokens)? {
        Binding::Help(usage) => return Ok(Outcome::Help(usage)),
        Binding::Bound(invocation) => invocation,
    };
    tracing::debug!(path = ?invocation.path, "dispatching");

    if invocation.path_is(&[ENV, CREATE]) {
        let request = create_request(&invocation);
        let created = store.create(request)?;
        return Ok(Outcome::Created(created.name.clone()));
    }
    if invocation.path_is(&[ENV, USE]) {
        let name = required(&invocation, "name")?;
        store.use_environment(name)?;
        return Ok(Outcome::Used(name.to_string()));
    }
    if invocation.path_is(&[ENV, REMOVE]) {
        let removed = store.remove(required(&invocation, "name")?)?;
        return Ok(Outcome::Removed(removed.name));
    }
    if invocation.path_is(&[ENV, LIST]) {
        return Ok(Outcome::Listed {
            names: store.list().into_iter().map(str::to_string).collect(),
            active: store.active_name().map(str::to_string),
        });
    }
    if invocation.path_is(&[INIT]) {
        let environment = store.initialize_active(invocation.flag("reset"))?;
        return Ok(Outcome::Initialized(environment.name.clone()));
    }
    if invocation.path_is(&[STATUS]) {
        let environment = store.active().ok_or(ClashError::NoActiveEnvironment)?;
        return Ok(Outcome::Status {
            environment: environment.clone(),
            json: invocation.flag("json"),
        });
    }
    Ok(Outcome::Invoked(invocation))
}

fn required<'i>(invocation: &'i Invocation, key: &str) -> Result<&'i str, ClashError> {
    invocation
        .get_str(key)
        .ok_or_else(|| usage_err!("missing argument <{}>", key))
}

fn create_request(invocation: &Invocation) -> CreateRequest {
    let user_data = invocation
        .arguments
        .iter()
        .filter(|(key, _)| !builtins::CREATE_DESTS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    CreateRequest {
        name: invocation
            .get_str("name")
            .unwrap_or(DEFAULT_ENVIRONMENT)
            .to_string(),
        user_data,
        storage_dir: invocation.get_str("storage_dir").map(Into::into),
        editable: invocation.flag("editable"),
        reset: invocation.flag("reset"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompleterRegistry;
    use crate::spec::{load_spec_from_str, Specification};
    use crate::tree::TreeBuilder;

    fn tree() -> CommandTree {
        let document = load_spec_from_str(
            "env:\n  create:\n    arguments:\n      - name: arg1\n      - name: --arg2\ncommands:\n  - name: deploy\n    arguments: [{name: target}]\n",
            "test.yaml",
        )
        .unwrap();
        TreeBuilder::new(&CompleterRegistry::new())
            .build(&Specification::new(document))
            .unwrap()
    }

    #[test]
    fn create_binds_builtins_and_user_data() {
        let tree = tree();
        let mut store = EnvironmentStore::in_memory();
        let outcome = dispatch(&tree, &mut store, &["env", "create", "one", "--arg2", "four", "-e"]).unwrap();
        assert_eq!(outcome, Outcome::Created("main".to_string()));
        let env = store.get("main").unwrap();
        assert!(env.editable);
        assert_eq!(env.get_str("arg1"), Some("one"));
        assert_eq!(env.get_str("arg2"), Some("four"));
        assert!(env.get("storage_dir").is_none());
        assert_eq!(store.active_name(), Some("main"));
    }

    #[test]
    fn gated_commands_need_an_environment() {
        let tree = tree();
        let mut store = EnvironmentStore::in_memory();
        let err = dispatch(&tree, &mut store, &["deploy", "web"]).unwrap_err();
        assert!(matches!(err, ClashError::NoActiveEnvironment));

        dispatch(&tree, &mut store, &["env", "create", "x", "--name=second"]).unwrap();
        match dispatch(&tree, &mut store, &["deploy", "web", "-v"]).unwrap() {
            Outcome::Invoked(invocation) => {
                assert_eq!(invocation.path, vec!["deploy"]);
                assert_eq!(invocation.get_str("target"), Some("web"));
                assert!(invocation.flag("verbose"));
                assert_eq!(invocation.environment.as_deref(), Some("second"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn usage_errors() {
        let tree = tree();
        let mut store = EnvironmentStore::in_memory();
        for tokens in [
            vec!["env"],
            vec!["env", "create"],
            vec!["env", "create", "x", "--arg2"],
            vec!["env", "bogus"],
            vec![],
        ] {
            let err = dispatch(&tree, &mut store, &tokens).unwrap_err();
            assert!(matches!(err, ClashError::Usage { .. }), "{tokens:?}: {err:?}");
        }
    }

    #[test]
    fn help_short_circuits() {
        let tree = tree();
        let mut store = EnvironmentStore::in_memory();
        match dispatch(&tree, &mut store, &["env", "use", "--help"]).unwrap() {
            Outcome::Help(usage) => assert_eq!(usage, "usage: clash env use [-h|--help] <name>"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn environment_lifecycle() {
        let tree = tree();
        let mut store = EnvironmentStore::in_memory();
        dispatch(&tree, &mut store, &["env", "create", "a"]).unwrap();
        dispatch(&tree, &mut store, &["env", "create", "b", "-n", "second"]).unwrap();
        assert_eq!(
            dispatch(&tree, &mut store, &["env", "use", "second"]).unwrap(),
            Outcome::Used("second".to_string())
        );
        assert_eq!(
            dispatch(&tree, &mut store, &["init"]).unwrap(),
            Outcome::Initialized("second".to_string())
        );
        assert!(dispatch(&tree, &mut store, &["init"]).is_err());
        dispatch(&tree, &mut store, &["init", "--reset"]).unwrap();
        match dispatch(&tree, &mut store, &["status", "-j"]).unwrap() {
            Outcome::Status { environment, json } => {
                assert!(json);
                assert!(environment.initialized);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        dispatch(&tree, &mut store, &["env", "remove", "second"]).unwrap();
        assert_eq!(
            dispatch(&tree, &mut store, &["env", "list"]).unwrap(),
            Outcome::Listed {
                names: vec!["main".to_string()],
                active: None,
            }
        );
        assert!(matches!(
            dispatch(&tree, &mut store, &["status"]).unwrap_err(),
            ClashError::NoActiveEnvironment
        ));
    }
}

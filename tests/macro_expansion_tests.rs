//! Macro expansion contract and error tests.

use clash::completion::CompleterRegistry;
use clash::macros::{MacroExpander, MacroRegistry};
use clash::spec::{load_macros_from_str, load_spec_from_str, Specification};
use clash::tree::TreeBuilder;
use clash::{ClashError, ErrorType};

fn registry(source: &str) -> MacroRegistry {
    let spec = Specification::new(Default::default())
        .with_macros("macros.yaml", load_macros_from_str(source, "macros.yaml").unwrap());
    MacroRegistry::from_specification(&spec).unwrap()
}

#[test]
fn expansions_are_independent_copies() {
    let registry = registry("shared:\n  args: [{name: target}]\n  commands: [{name: now}]\n");
    let completers = CompleterRegistry::new();
    let expander = MacroExpander::new(&registry, &completers);

    let mut first = expander.expand("shared", "a").unwrap();
    let second = expander.expand("shared", "b").unwrap();
    first.arguments.clear();
    first.children.clear();

    assert_eq!(second.arguments.len(), 1);
    assert!(second.children.contains_key("now"));
}

#[test]
fn nested_references_behave_like_flat_ones() {
    let registry = registry(
        "flat:\n  args: [{name: --arg}]\nouter:\n  inner:\n    args: [{name: --arg}]\n",
    );
    let completers = CompleterRegistry::new();
    let expander = MacroExpander::new(&registry, &completers);

    let flat = expander.expand("flat", "x").unwrap();
    let nested = expander.expand("outer.inner", "x").unwrap();
    assert_eq!(flat.options.len(), nested.options.len());
    assert_eq!(flat.options[0].long, nested.options[0].long);
}

#[test]
fn mutual_recursion_reports_the_chain() {
    let registry = registry(
        "a:\n  commands: [{name: step, macro: b}]\nb:\n  commands: [{name: step, macro: a}]\n",
    );
    let completers = CompleterRegistry::new();
    let err = MacroExpander::new(&registry, &completers)
        .expand("a", "a")
        .unwrap_err();
    match &err {
        ClashError::Cycle { chain } => assert_eq!(chain, "a -> b -> a"),
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert_eq!(err.error_type(), ErrorType::Macro);
}

#[test]
fn unknown_references_fail_lookup() {
    let registry = registry("deploy:\n  args: []\n");
    let err = registry.lookup("deplyo").unwrap_err();
    assert!(matches!(err, ClashError::UnknownMacro { ref path, .. } if path == "deplyo"));
}

#[test]
fn namespaces_and_macros_cannot_share_a_path() {
    let first = load_macros_from_str("tools:\n  lint: {}\n", "one.yaml").unwrap();
    let second = load_macros_from_str("tools: {}\n", "two.yaml").unwrap();
    let spec = Specification::new(Default::default())
        .with_macros("one.yaml", first)
        .with_macros("two.yaml", second);
    let err = MacroRegistry::from_specification(&spec).unwrap_err();
    assert!(matches!(err, ClashError::NameCollision { .. }));
}

#[test]
fn namespaces_merge_across_documents() {
    let first = load_macros_from_str("tools:\n  lint: {}\n", "one.yaml").unwrap();
    let second = load_macros_from_str("tools:\n  fmt: {}\n", "two.yaml").unwrap();
    let document = load_spec_from_str("macros:\n  local: {}\n", "clash.yaml").unwrap();
    let spec = Specification::new(document)
        .with_macros("one.yaml", first)
        .with_macros("two.yaml", second);
    let registry = MacroRegistry::from_specification(&spec).unwrap();
    assert_eq!(registry.qualified_names(), vec!["local", "tools.fmt", "tools.lint"]);

    let tree = TreeBuilder::new(&CompleterRegistry::new()).build(&spec).unwrap();
    assert!(tree.find(&["tools", "fmt"]).is_some());
    assert!(tree.find(&["tools", "lint"]).is_some());
}

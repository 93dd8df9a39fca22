use std::path::PathBuf;

use im::OrdMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ClashError;

/// Name given to an environment created without `--name`.
pub const DEFAULT_ENVIRONMENT: &str = "main";

static ENVIRONMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

/// A named, persisted execution context.
///
/// `user_data` holds the values bound from `env create`'s declared arguments. It is a
/// persistent map so snapshots handed to completers are cheap to clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub user_data: OrdMap<String, Value>,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub initialized: bool,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_data: OrdMap::new(),
            storage_dir: None,
            editable: false,
            initialized: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.user_data.get(key)
    }

    /// String view of a user-data entry, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Checks that `name` is usable as an environment name.
pub fn validate_environment_name(name: &str) -> Result<(), ClashError> {
    if ENVIRONMENT_NAME.is_match(name) {
        return Ok(());
    }
    Err(ClashError::InvalidName {
        kind: "environment",
        name: name.to_string(),
        help: Some("use letters, digits, '.', '_' or '-', starting with a letter or digit".to_string()),
    })
}

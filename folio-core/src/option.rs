use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{self, Properties};

/// Per-shebang interpreter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterOption {
    pub shebang: String,
    pub interpreter_name: String,
    pub enabled: bool,
    pub class_name: String,
    pub class_path: String,
    #[serde(default)]
    pub properties: Properties,

    /// Whether the interpreter accepts more than one job at a time.
    #[serde(default)]
    pub concurrent: bool,

    /// Users or roles allowed to run jobs on this interpreter. Empty means everyone.
    #[serde(default)]
    pub owners: Vec<String>,
}

impl InterpreterOption {
    pub fn is_owner(&self, username: Option<&str>, roles: &[&str]) -> bool {
        if self.owners.is_empty() {
            return true;
        }

        let owns = |name: &str| self.owners.iter().any(|owner| owner == name);

        username.map_or(false, owns) || roles.iter().any(|role| owns(role))
    }
}

#[async_trait]
pub trait InterpreterOptionRepository: Send + Sync {
    async fn get_option(&self, shebang: &str) -> types::Result<Option<InterpreterOption>>;

    async fn set_enabled(&self, shebang: &str, enabled: bool) -> types::Result<()>;

    async fn save(&self, option: InterpreterOption) -> types::Result<InterpreterOption>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(owners: &[&str]) -> InterpreterOption {
        InterpreterOption {
            shebang: "%jdbc".to_string(),
            interpreter_name: "jdbc".to_string(),
            enabled: true,
            class_name: "JdbcInterpreter".to_string(),
            class_path: "/opt/jdbc".to_string(),
            properties: Properties::new(),
            concurrent: false,
            owners: owners.iter().map(|owner| owner.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_owners_allows_everyone() {
        assert!(option(&[]).is_owner(None, &[]));
    }

    #[test]
    fn test_owner_by_name_or_role() {
        let option = option(&["bob", "analyst"]);

        assert!(option.is_owner(Some("bob"), &[]));
        assert!(option.is_owner(Some("alice"), &["dev", "analyst"]));
        assert!(!option.is_owner(Some("alice"), &["dev"]));
        assert!(!option.is_owner(None, &[]));
    }
}

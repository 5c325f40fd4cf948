use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Key the host framework reads the module configuration from.
pub const CONFIG_KEY: &str = "nuxtCan";

pub const MODULE_NAME: &str = "nuxt-can";

/// Per-call transform settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Print a colored diff of every rewritten file to stderr.
    pub reporter: bool,
    /// Diagnostics print file names relative to this directory.
    pub cwd: Option<PathBuf>,
}

impl TransformOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_reporter(mut self, reporter: bool) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Module configuration as written under [`CONFIG_KEY`].
///
/// `permissions` and `canFunctionImport` are carried through to the runtime
/// side of the host integration; the transform itself only reads `reporter`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleOptions {
    pub reporter: bool,
    pub permissions: BTreeMap<String, Vec<String>>,
    pub can_function_import: Option<String>,
}

impl ModuleOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            reporter: self.reporter,
            cwd: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_are_missing() {
        let options = TransformOptions::from_json("{}").unwrap();
        assert_eq!(options, TransformOptions::default());
        assert!(!options.reporter);

        let module = ModuleOptions::from_json("{}").unwrap();
        assert!(module.permissions.is_empty());
        assert!(module.can_function_import.is_none());
    }

    #[test]
    fn test_module_options_use_camel_case_keys() {
        let module = ModuleOptions::from_json(
            r#"{
                "reporter": true,
                "permissions": { "employee": ["view", "edit"] },
                "canFunctionImport": "~/permissions/__can__"
            }"#,
        )
        .unwrap();
        assert_eq!(module.permissions["employee"], vec!["view", "edit"]);
        assert_eq!(module.can_function_import.as_deref(), Some("~/permissions/__can__"));
        assert_eq!(
            module.transform_options(),
            TransformOptions::default().with_reporter(true)
        );
    }

    #[test]
    fn test_transform_options_cwd() {
        let options = TransformOptions::from_json(r#"{ "cwd": "/work/app" }"#).unwrap();
        assert_eq!(options, TransformOptions::default().with_cwd("/work/app"));
    }
}

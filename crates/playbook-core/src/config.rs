use serde::{Deserialize, Serialize};

/// Settings consumed by the engine, one snapshot per workspace folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ansible: AnsibleSettings,
    pub python: PythonSettings,
    pub execution_environment: ExecutionEnvironmentSettings,
    pub completion: CompletionSettings,
    pub validation: ValidationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnsibleSettings {
    /// Path of the `ansible` executable; sibling tools are resolved next to it
    pub path: String,
    pub use_fully_qualified_collection_names: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PythonSettings {
    /// May contain `${workspaceFolder}`
    pub interpreter_path: String,
    pub activation_script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionEnvironmentSettings {
    pub enabled: bool,
    pub container_engine: ContainerEngineChoice,
    pub image: String,
    pub pull: PullSettings,
    pub volume_mounts: Vec<VolumeMount>,
    pub container_options: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerEngineChoice {
    #[default]
    Auto,
    Podman,
    Docker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PullSettings {
    pub policy: PullPolicy,
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PullPolicy {
    Always,
    #[default]
    Missing,
    Never,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VolumeMount {
    pub src: String,
    pub dest: String,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSettings {
    pub provide_redirect_modules: bool,
    pub provide_module_option_aliases: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    pub enabled: bool,
    pub lint: LintSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintSettings {
    pub enabled: bool,
    pub path: String,
    pub arguments: String,
}

impl Default for AnsibleSettings {
    fn default() -> Self {
        Self {
            path: "ansible".to_string(),
            use_fully_qualified_collection_names: true,
        }
    }
}

impl Default for ExecutionEnvironmentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            container_engine: ContainerEngineChoice::Auto,
            image: "ghcr.io/ansible/community-ansible-dev-tools:latest".to_string(),
            pull: PullSettings::default(),
            volume_mounts: Vec::new(),
            container_options: String::new(),
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            provide_redirect_modules: true,
            provide_module_option_aliases: true,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            lint: LintSettings::default(),
        }
    }
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "ansible-lint".to_string(),
            arguments: String::new(),
        }
    }
}

impl Settings {
    /// Parse the client's `ansible` settings section; missing keys keep their defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let settings = Settings::from_json(json!({
            "executionEnvironment": { "enabled": true, "pull": { "policy": "tag" } },
            "validation": { "lint": { "arguments": "-x yaml" } }
        }))
        .unwrap();

        assert!(settings.execution_environment.enabled);
        assert_eq!(settings.execution_environment.pull.policy, PullPolicy::Tag);
        assert_eq!(
            settings.execution_environment.container_engine,
            ContainerEngineChoice::Auto
        );
        assert_eq!(settings.validation.lint.path, "ansible-lint");
        assert_eq!(settings.validation.lint.arguments, "-x yaml");
        assert!(settings.validation.enabled);
        assert_eq!(settings.ansible.path, "ansible");
        assert!(settings.completion.provide_redirect_modules);
    }
}

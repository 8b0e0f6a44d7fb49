//! Snapshot of the tool installation a folder runs against.

use crate::error::ToolConfigError;
use crate::exec::CommandRunner;
use crate::notify::Notifier;
use crate::utils::parse_python_string_array;
use std::collections::BTreeMap;
use std::path::Path;

const SYS_PATH_SCRIPT: &str = r#"-c "import sys; print(sys.path, end=\"\")""#;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolConfig {
    pub collections_paths: Vec<String>,
    pub module_locations: Vec<String>,
    /// Directory of the tool's python package.
    pub ansible_location: Option<String>,
    pub default_host_list: Vec<String>,
}

/// `KEY(source) = value` lines of `ansible-config dump`, keyed without the source.
pub fn parse_config_dump(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once(" = "))
        .map(|(key, value)| {
            let key = key.split('(').next().unwrap_or(key).trim();
            (key.to_string(), value.trim().to_string())
        })
        .collect()
}

/// `name = value` lines of `ansible --version`.
pub fn parse_version_info(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once(" = "))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

async fn run_checked(runner: &CommandRunner, executable: &str, args: &str) -> Result<String, ToolConfigError> {
    let output = runner.run(executable, args, &[]).await?;
    if output.success() {
        Ok(output.stdout)
    } else {
        Err(ToolConfigError::Command {
            command: format!("{executable} {args}"),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

impl ToolConfig {
    /// Query the tools. Each failing step is reported to the user and leaves
    /// its part of the snapshot empty.
    pub async fn load(runner: &CommandRunner, notifier: &dyn Notifier) -> Self {
        let mut config = ToolConfig::default();

        match run_checked(runner, "ansible-config", "dump").await {
            Ok(dump) => {
                let values = parse_config_dump(&dump);
                if let Some(paths) = values.get("COLLECTIONS_PATHS") {
                    config.collections_paths = parse_python_string_array(paths);
                }
                if let Some(hosts) = values.get("DEFAULT_HOST_LIST") {
                    config.default_host_list = parse_python_string_array(hosts);
                }
            }
            Err(e) => notifier.show_error(e.to_string()).await,
        }

        match run_checked(runner, "ansible", "--version").await {
            Ok(version) => {
                let info = parse_version_info(&version);
                if let Some(paths) = info.get("configured module search path") {
                    config.module_locations = parse_python_string_array(paths);
                }
                if let Some(location) = info.get("ansible python module location") {
                    config
                        .module_locations
                        .push(Path::new(location).join("modules").to_string_lossy().into_owned());
                    config.ansible_location = Some(location.clone());
                }
            }
            Err(e) => notifier.show_error(e.to_string()).await,
        }

        match run_checked(runner, "python3", SYS_PATH_SCRIPT).await {
            Ok(sys_path) => {
                for entry in parse_python_string_array(&sys_path) {
                    if !config.collections_paths.contains(&entry) {
                        config.collections_paths.push(entry);
                    }
                }
            }
            Err(e) => log::warn!("Could not read the python search path: {e}"),
        }

        log::debug!("Resolved tool configuration: {config:?}");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::exec::testing::ScriptedExecutor;
    use crate::notify::testing::RecordingNotifier;
    use std::path::PathBuf;
    use std::sync::Arc;

    const DUMP: &str = "\
ACTION_WARNINGS(default) = True
COLLECTIONS_PATHS(/etc/ansible/ansible.cfg) = ['/home/u/.ansible/collections', '/usr/share/ansible/collections']
DEFAULT_HOST_LIST(default) = ['/etc/ansible/hosts']
";

    const VERSION: &str = "\
ansible [core 2.16.0]
  config file = /etc/ansible/ansible.cfg
  configured module search path = ['/home/u/.ansible/plugins/modules']
  ansible python module location = /usr/lib/python3/site-packages/ansible
  executable location = /usr/bin/ansible
";

    #[test]
    fn test_parse_config_dump_strips_source() {
        let values = parse_config_dump(DUMP);
        assert_eq!(values["ACTION_WARNINGS"], "True");
        assert!(values["COLLECTIONS_PATHS"].starts_with('['));
    }

    #[tokio::test]
    async fn test_load_collects_all_sources() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("ansible-config dump", 0, DUMP)
                .on("ansible --version", 0, VERSION)
                .on("python3 -c", 0, "['', '/usr/lib/python3/site-packages', '/usr/share/ansible/collections']"),
        );
        let runner = CommandRunner::new(Settings::default(), PathBuf::from("/work"), executor, None);
        let notifier = RecordingNotifier::default();
        let config = ToolConfig::load(&runner, &notifier).await;

        assert_eq!(
            config.collections_paths,
            vec![
                "/home/u/.ansible/collections",
                "/usr/share/ansible/collections",
                "/usr/lib/python3/site-packages",
            ]
        );
        assert_eq!(
            config.module_locations,
            vec![
                "/home/u/.ansible/plugins/modules",
                "/usr/lib/python3/site-packages/ansible/modules",
            ]
        );
        assert_eq!(config.default_host_list, vec!["/etc/ansible/hosts"]);
        assert_eq!(
            config.ansible_location.as_deref(),
            Some("/usr/lib/python3/site-packages/ansible")
        );
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_reported_and_partial() {
        let executor = Arc::new(ScriptedExecutor::new().on("ansible --version", 0, VERSION));
        let runner = CommandRunner::new(Settings::default(), PathBuf::from("/work"), executor, None);
        let notifier = RecordingNotifier::default();
        let config = ToolConfig::load(&runner, &notifier).await;

        assert!(config.collections_paths.is_empty());
        assert_eq!(config.module_locations.len(), 2);
        assert_eq!(notifier.errors().len(), 1);
        assert!(notifier.errors()[0].contains("ansible-config dump"));
    }
}

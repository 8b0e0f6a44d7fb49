use super::{locate_executable, CommandExecutor, CommandOutput, CommandRequest};
use crate::config::Settings;
use crate::ee::ExecutionEnvironment;
use crate::error::ExecError;
use crate::utils::expand_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs tool commands for one workspace folder, either on the host (inside the
/// configured python environment) or inside the execution environment.
#[derive(Clone)]
pub struct CommandRunner {
    settings: Settings,
    folder_root: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    environment: Option<Arc<ExecutionEnvironment>>,
}

impl CommandRunner {
    pub fn new(
        settings: Settings,
        folder_root: PathBuf,
        executor: Arc<dyn CommandExecutor>,
        environment: Option<Arc<ExecutionEnvironment>>,
    ) -> Self {
        Self {
            settings,
            folder_root,
            executor,
            environment,
        }
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    pub fn folder_root(&self) -> &Path {
        &self.folder_root
    }

    fn uses_environment(&self) -> bool {
        self.settings.execution_environment.enabled
    }

    /// Run `executable args`. `mount_paths` are host paths the command needs to
    /// see when it runs in a container.
    pub async fn run(
        &self,
        executable: &str,
        args: &str,
        mount_paths: &[PathBuf],
    ) -> Result<CommandOutput, ExecError> {
        let request = if self.uses_environment() {
            let environment = self
                .environment
                .as_ref()
                .ok_or(ExecError::EnvironmentUnavailable)?;
            let command = join_command(executable, args);
            CommandRequest::new(environment.wrap_container_args(&command, mount_paths))
                .in_dir(&self.folder_root)
        } else {
            let executable = self.resolve_executable(executable);
            self.with_interpreter(&executable, args)
        };
        self.executor.execute(&request).await
    }

    /// Path of a tool, or `None` when it cannot be found. Inside the execution
    /// environment the image is trusted to provide it.
    pub async fn locate(&self, executable: &str) -> Option<String> {
        if self.uses_environment() {
            return self.environment.as_ref().map(|_| executable.to_string());
        }
        let executable = self.resolve_executable(executable);
        if executable.contains('/') {
            return Some(executable);
        }
        locate_executable(self.executor.as_ref(), &executable).await
    }

    /// Tools of the `ansible` family live next to the configured `ansible.path`.
    fn resolve_executable(&self, executable: &str) -> String {
        let configured = expand_path(&self.settings.ansible.path);
        if executable.starts_with("ansible") && !executable.starts_with("ansible-lint") {
            if let Some(dir) = Path::new(&configured).parent().filter(|d| !d.as_os_str().is_empty()) {
                return dir.join(executable).to_string_lossy().into_owned();
            }
        }
        expand_path(executable)
    }

    /// Request for running `executable args` on the host with the configured
    /// activation script or interpreter applied.
    pub fn with_interpreter(&self, executable: &str, args: &str) -> CommandRequest {
        let mut request = CommandRequest::new(join_command(executable, args)).in_dir(&self.folder_root);
        request.env.insert("NO_COLOR".to_string(), "1".to_string());
        request.env.insert("ANSIBLE_FORCE_COLOR".to_string(), "0".to_string());
        request.env.insert("PYTHONBREAKPOINT".to_string(), "0".to_string());

        let python = &self.settings.python;
        if !python.activation_script.is_empty() {
            let script = expand_path(&self.substitute_folder(&python.activation_script));
            request.command = format!("bash -c 'source {script} && {}'", request.command);
        } else if !python.interpreter_path.is_empty() {
            let interpreter = PathBuf::from(expand_path(&self.substitute_folder(&python.interpreter_path)));
            if let Some(bin) = interpreter.parent() {
                if let Some(venv) = bin.parent() {
                    request
                        .env
                        .insert("VIRTUAL_ENV".to_string(), venv.to_string_lossy().into_owned());
                }
                let path = match std::env::var("PATH") {
                    Ok(existing) if !existing.is_empty() => format!("{}:{existing}", bin.display()),
                    _ => bin.display().to_string(),
                };
                request.env.insert("PATH".to_string(), path);
            }
            request.env_remove.push("PYTHONHOME".to_string());
        }
        request
    }

    fn substitute_folder(&self, value: &str) -> String {
        value.replace("${workspaceFolder}", &self.folder_root.to_string_lossy())
    }
}

fn join_command(executable: &str, args: &str) -> String {
    if args.trim().is_empty() {
        executable.to_string()
    } else {
        format!("{executable} {args}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedExecutor;

    fn runner(settings: Settings) -> (Arc<ScriptedExecutor>, CommandRunner) {
        let executor = Arc::new(ScriptedExecutor::new().on("--version", 0, "ansible [core 2.16.0]\n"));
        let runner = CommandRunner::new(settings, PathBuf::from("/work"), executor.clone(), None);
        (executor, runner)
    }

    #[test]
    fn test_interpreter_sets_virtual_env() {
        let mut settings = Settings::default();
        settings.python.interpreter_path = "${workspaceFolder}/.venv/bin/python".to_string();
        let (_, runner) = runner(settings);
        let request = runner.with_interpreter("ansible-lint", "--version");

        assert_eq!(request.command, "ansible-lint --version");
        assert_eq!(request.env["VIRTUAL_ENV"], "/work/.venv");
        assert!(request.env["PATH"].starts_with("/work/.venv/bin"));
        assert_eq!(request.env["NO_COLOR"], "1");
        assert_eq!(request.env["ANSIBLE_FORCE_COLOR"], "0");
        assert_eq!(request.env_remove, vec!["PYTHONHOME"]);
        assert_eq!(request.cwd.as_deref(), Some(Path::new("/work")));
    }

    #[test]
    fn test_activation_script_wraps_command() {
        let mut settings = Settings::default();
        settings.python.activation_script = "/opt/env/activate".to_string();
        settings.python.interpreter_path = "/ignored/bin/python".to_string();
        let (_, runner) = runner(settings);
        let request = runner.with_interpreter("ansible", "--version");

        assert_eq!(request.command, "bash -c 'source /opt/env/activate && ansible --version'");
        assert!(!request.env.contains_key("VIRTUAL_ENV"));
    }

    #[tokio::test]
    async fn test_ansible_tools_resolve_next_to_configured_path() {
        let mut settings = Settings::default();
        settings.ansible.path = "/opt/tools/bin/ansible".to_string();
        let (executor, runner) = runner(settings);
        let output = runner.run("ansible-config", "--version", &[]).await.unwrap();

        assert!(output.success());
        assert_eq!(executor.commands(), vec!["/opt/tools/bin/ansible-config --version"]);
        assert_eq!(
            runner.locate("ansible-playbook").await.as_deref(),
            Some("/opt/tools/bin/ansible-playbook")
        );
    }

    #[tokio::test]
    async fn test_environment_enabled_but_unavailable() {
        let mut settings = Settings::default();
        settings.execution_environment.enabled = true;
        let (executor, runner) = runner(settings);

        let err = runner.run("ansible-lint", "--version", &[]).await.unwrap_err();
        assert!(matches!(err, ExecError::EnvironmentUnavailable));
        assert!(executor.commands().is_empty());
        assert_eq!(runner.locate("ansible-lint").await, None);
    }
}

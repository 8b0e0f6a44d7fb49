//! Execution environment: runs tools inside a container image instead of on
//! the host, and mirrors the image's plugin documentation into a local cache.

mod cache;
mod session;

pub use cache::{builtin_plugin_dir, cache_path, rewrite_to_cache, SUCCESS_MARKER};
pub use session::ContainerSession;

use crate::config::{ContainerEngineChoice, ExecutionEnvironmentSettings, PullPolicy};
use crate::error::EnvironmentError;
use crate::exec::{locate_executable, CommandExecutor, CommandRequest};
use crate::notify::Notifier;
use crate::tool_config::ToolConfig;
use crate::utils::{expand_path, sanitize_name};
use crate::vfs::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerEngine {
    Podman,
    Docker,
}

impl ContainerEngine {
    pub fn name(self) -> &'static str {
        match self {
            ContainerEngine::Podman => "podman",
            ContainerEngine::Docker => "docker",
        }
    }
}

/// Pick the container engine. `auto` takes the first of podman and docker
/// that is installed; an explicit choice must be installed.
pub async fn detect_engine(
    executor: &dyn CommandExecutor,
    choice: ContainerEngineChoice,
) -> Result<ContainerEngine, EnvironmentError> {
    let candidates: &[ContainerEngine] = match choice {
        ContainerEngineChoice::Auto => &[ContainerEngine::Podman, ContainerEngine::Docker],
        ContainerEngineChoice::Podman => &[ContainerEngine::Podman],
        ContainerEngineChoice::Docker => &[ContainerEngine::Docker],
    };
    for &engine in candidates {
        if locate_executable(executor, engine.name()).await.is_some() {
            log::info!("Container engine set to '{}'", engine.name());
            return Ok(engine);
        }
        log::info!("Container engine '{}' not found", engine.name());
    }
    match choice {
        ContainerEngineChoice::Auto => Err(EnvironmentError::EngineNotFound),
        _ => Err(EnvironmentError::EngineMissing(candidates[0].name().to_string())),
    }
}

/// Tag of an image reference; `latest` when none is given.
pub fn image_tag(image: &str) -> &str {
    match image.rsplit_once(':') {
        Some((_, tag)) if !tag.contains('/') => tag,
        _ => "latest",
    }
}

/// Whether the image must be pulled before use.
pub fn determine_pull(policy: PullPolicy, present: bool, tag: &str) -> bool {
    match policy {
        PullPolicy::Always => true,
        PullPolicy::Never => false,
        PullPolicy::Missing => !present,
        PullPolicy::Tag => tag == "latest" || !present,
    }
}

/// A ready execution environment for one workspace folder.
pub struct ExecutionEnvironment {
    engine: ContainerEngine,
    settings: ExecutionEnvironmentSettings,
    folder_root: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    fs: Arc<dyn FileSystem>,
    cache_root: PathBuf,
}

impl std::fmt::Debug for ExecutionEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEnvironment")
            .field("engine", &self.engine)
            .field("image", &self.settings.image)
            .finish()
    }
}

impl ExecutionEnvironment {
    /// Detect the engine and make sure the image is available.
    pub async fn initialize(
        settings: ExecutionEnvironmentSettings,
        folder_root: PathBuf,
        executor: Arc<dyn CommandExecutor>,
        fs: Arc<dyn FileSystem>,
        notifier: &dyn Notifier,
        cache_root: PathBuf,
    ) -> Result<Self, EnvironmentError> {
        let engine = detect_engine(executor.as_ref(), settings.container_engine).await?;
        let environment = Self {
            engine,
            settings,
            folder_root,
            executor,
            fs,
            cache_root,
        };
        environment.setup_image(notifier).await?;
        Ok(environment)
    }

    pub fn engine(&self) -> ContainerEngine {
        self.engine
    }

    pub fn image(&self) -> &str {
        &self.settings.image
    }

    async fn image_present(&self) -> bool {
        let command = format!("{} image inspect {}", self.engine.name(), self.image());
        matches!(
            self.executor.execute(&CommandRequest::new(command)).await,
            Ok(output) if output.success()
        )
    }

    async fn setup_image(&self, notifier: &dyn Notifier) -> Result<(), EnvironmentError> {
        let image = self.image().to_string();
        let present = self.image_present().await;
        let pull = determine_pull(self.settings.pull.policy, present, image_tag(&image));
        if !pull {
            if present {
                return Ok(());
            }
            return Err(EnvironmentError::ImagePull {
                image,
                reason: "the image is not available locally and the pull policy is 'never'".to_string(),
            });
        }

        let progress = notifier
            .begin_progress("Execution environment", &format!("Pulling {image}"))
            .await;
        let mut command = format!("{} pull", self.engine.name());
        if !self.settings.pull.arguments.trim().is_empty() {
            command.push(' ');
            command.push_str(self.settings.pull.arguments.trim());
        }
        command.push(' ');
        command.push_str(&image);
        let result = self.executor.execute(&CommandRequest::new(command)).await;
        if let Some(token) = progress {
            notifier.end_progress(token).await;
        }

        match result {
            Ok(output) if output.success() => {
                log::info!("Pulled image {image}");
                Ok(())
            }
            Ok(output) => Err(EnvironmentError::ImagePull {
                image,
                reason: output.stderr.trim().to_string(),
            }),
            Err(e) => Err(EnvironmentError::ImagePull {
                image,
                reason: e.to_string(),
            }),
        }
    }

    async fn image_id(&self) -> Result<String, EnvironmentError> {
        let command = format!(
            "{} images {} --format \"{{{{.ID}}}}\"",
            self.engine.name(),
            self.image()
        );
        let output = self.executor.execute(&CommandRequest::new(command)).await?;
        output
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .filter(|_| output.success())
            .map(str::to_string)
            .ok_or_else(|| EnvironmentError::ImageId {
                image: self.image().to_string(),
            })
    }

    /// Cache directory for the current image build.
    pub async fn plugin_cache_dir(&self) -> Result<PathBuf, EnvironmentError> {
        let id = self.image_id().await?;
        Ok(self.cache_root.join(sanitize_name(self.image())).join(sanitize_name(&id)))
    }

    /// Translate a tool configuration resolved inside the container into host
    /// paths, filling the plugin-doc cache first unless it is already complete.
    pub async fn fetch_plugin_docs(
        &self,
        config: &ToolConfig,
        notifier: &dyn Notifier,
    ) -> Result<ToolConfig, EnvironmentError> {
        let cache_dir = self.plugin_cache_dir().await?;
        if self.fs.exists(&cache_dir.join(SUCCESS_MARKER)) {
            log::info!("Reusing plugin docs cached at {}", cache_dir.display());
            return Ok(rewrite_to_cache(self.fs.as_ref(), config, &cache_dir));
        }

        let session = ContainerSession::start(self.engine, self.image(), Arc::clone(&self.executor)).await?;
        let progress = notifier
            .begin_progress(
                "Execution environment",
                &format!("Copying plugin docs from {} to the host cache", self.image()),
            )
            .await;
        let populated = cache::populate(&session, self.fs.as_ref(), config, &cache_dir).await;
        session.teardown().await;
        if let Some(token) = progress {
            notifier.end_progress(token).await;
        }

        populated?;
        Ok(rewrite_to_cache(self.fs.as_ref(), config, &cache_dir))
    }

    /// Wrap a command line so it runs in a one-shot container with the
    /// workspace folder and `mount_paths` mounted at their host locations.
    pub fn wrap_container_args(&self, command: &str, mount_paths: &[PathBuf]) -> String {
        let root = self.folder_root.to_string_lossy().into_owned();
        let mut args: Vec<String> = vec![
            self.engine.name().to_string(),
            "run".to_string(),
            "--rm".to_string(),
            "--workdir".to_string(),
            root.clone(),
            "-v".to_string(),
            format!("{root}:{root}"),
        ];

        for path in mount_paths {
            if !self.fs.exists(path) {
                continue;
            }
            let volume = format!("{0}:{0}", path.display());
            if !args.contains(&volume) {
                args.push("-v".to_string());
                args.push(volume);
            }
        }

        for mount in &self.settings.volume_mounts {
            let src = expand_path(&mount.src);
            if !self.fs.exists(Path::new(&src)) {
                log::warn!("Volume mount source '{src}' does not exist; skipping it");
                continue;
            }
            let mut volume = format!("{src}:{}", mount.dest);
            if !mount.options.is_empty() {
                volume.push(':');
                volume.push_str(&mount.options);
            }
            if !args.contains(&volume) {
                args.push("-v".to_string());
                args.push(volume);
            }
        }

        let mut forwarded: Vec<String> = std::env::vars()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with("ANSIBLE_") && key != "ANSIBLE_FORCE_COLOR")
            .collect();
        forwarded.sort();
        for key in forwarded {
            args.push("-e".to_string());
            args.push(key);
        }
        args.push("-e".to_string());
        args.push("ANSIBLE_FORCE_COLOR=0".to_string());

        match self.engine {
            ContainerEngine::Podman => {
                args.push("--group-add=root".to_string());
                args.push("--ipc=host".to_string());
                args.push("--quiet".to_string());
            }
            ContainerEngine::Docker => {
                let uid = unsafe { libc::getuid() };
                args.push(format!("--user={uid}"));
            }
        }

        for option in self.settings.container_options.split_whitespace() {
            if !args.iter().any(|a| a == option) {
                args.push(option.to_string());
            }
        }

        args.push("--name".to_string());
        args.push(format!("als_{}", uuid::Uuid::new_v4()));
        args.push(self.image().to_string());
        args.push(command.to_string());

        let wrapped = args.join(" ");
        log::debug!("Container engine invocation: {wrapped}");
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedExecutor;
    use crate::exec::CommandOutput;
    use crate::notify::testing::RecordingNotifier;
    use crate::vfs::PhysicalFileSystem;
    use tempfile::TempDir;

    const IMAGE: &str = "ghcr.io/ansible/creator-ee:latest";

    fn environment(executor: Arc<ScriptedExecutor>, engine: ContainerEngine, cache_root: PathBuf) -> ExecutionEnvironment {
        ExecutionEnvironment {
            engine,
            settings: ExecutionEnvironmentSettings {
                enabled: true,
                image: IMAGE.to_string(),
                container_options: "--net=host --quiet --net=host".to_string(),
                ..Default::default()
            },
            folder_root: PathBuf::from("/work"),
            executor,
            fs: Arc::new(PhysicalFileSystem),
            cache_root,
        }
    }

    #[test]
    fn test_pull_policy_table() {
        assert!(determine_pull(PullPolicy::Tag, true, "latest"));
        assert!(determine_pull(PullPolicy::Tag, false, "latest"));
        assert!(!determine_pull(PullPolicy::Tag, true, "v1.2"));
        assert!(determine_pull(PullPolicy::Tag, false, "v1.2"));
        assert!(!determine_pull(PullPolicy::Missing, true, "latest"));
        assert!(determine_pull(PullPolicy::Missing, false, "v1"));
        assert!(determine_pull(PullPolicy::Always, true, "v1"));
        assert!(!determine_pull(PullPolicy::Never, false, "latest"));
    }

    #[test]
    fn test_image_tag() {
        assert_eq!(image_tag(IMAGE), "latest");
        assert_eq!(image_tag("quay.io/org/ee:2.4"), "2.4");
        assert_eq!(image_tag("localhost:5000/ee"), "latest");
        assert_eq!(image_tag("ee"), "latest");
    }

    #[tokio::test]
    async fn test_detect_engine() {
        let executor = ScriptedExecutor::new().on("command -v docker", 0, "/usr/bin/docker\n");
        assert_eq!(
            detect_engine(&executor, ContainerEngineChoice::Auto).await.unwrap(),
            ContainerEngine::Docker
        );
        assert_eq!(
            executor.commands()[0],
            "command -v podman",
            "podman is probed first"
        );
        assert!(matches!(
            detect_engine(&executor, ContainerEngineChoice::Podman).await,
            Err(EnvironmentError::EngineMissing(name)) if name == "podman"
        ));

        let none = ScriptedExecutor::new();
        assert!(matches!(
            detect_engine(&none, ContainerEngineChoice::Auto).await,
            Err(EnvironmentError::EngineNotFound)
        ));
    }

    #[tokio::test]
    async fn test_pull_failure_is_reported() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on("command -v podman", 0, "/usr/bin/podman\n")
                .on_output(
                    "podman pull",
                    CommandOutput {
                        status: Some(125),
                        stdout: String::new(),
                        stderr: "manifest unknown".to_string(),
                    },
                ),
        );
        let settings = ExecutionEnvironmentSettings {
            enabled: true,
            image: IMAGE.to_string(),
            ..Default::default()
        };
        let notifier = RecordingNotifier::default();
        let err = ExecutionEnvironment::initialize(
            settings,
            PathBuf::from("/work"),
            executor.clone(),
            Arc::new(PhysicalFileSystem),
            &notifier,
            PathBuf::from("/tmp/unused"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EnvironmentError::ImagePull { ref reason, .. } if reason == "manifest unknown"));
        assert!(executor.commands().iter().any(|c| c == &format!("podman pull {IMAGE}")));
    }

    #[test]
    fn test_wrap_flags_per_engine() {
        let cache = TempDir::new().unwrap();
        let mount = cache.path().to_path_buf();
        let podman = environment(Arc::new(ScriptedExecutor::new()), ContainerEngine::Podman, cache.path().into());
        let wrapped = podman.wrap_container_args("ansible-lint --version", &[mount.clone(), mount.clone(), PathBuf::from("/does/not/exist")]);

        assert!(wrapped.starts_with("podman run --rm --workdir /work -v /work:/work"));
        assert_eq!(wrapped.matches(&format!("{0}:{0}", mount.display())).count(), 1);
        assert!(!wrapped.contains("/does/not/exist"));
        assert!(wrapped.contains("-e ANSIBLE_FORCE_COLOR=0"));
        assert!(wrapped.contains("--group-add=root --ipc=host --quiet"));
        assert_eq!(wrapped.matches("--quiet").count(), 1);
        assert_eq!(wrapped.matches("--net=host").count(), 1);
        assert!(wrapped.contains("--name als_"));
        assert!(wrapped.ends_with(&format!("{IMAGE} ansible-lint --version")));
        assert!(!wrapped.contains("--user="));

        let docker = environment(Arc::new(ScriptedExecutor::new()), ContainerEngine::Docker, cache.path().into());
        let wrapped = docker.wrap_container_args("ansible --version", &[]);
        assert!(wrapped.contains("--user="));
        assert!(!wrapped.contains("--ipc=host"));
    }

    fn fetch_executor() -> Arc<ScriptedExecutor> {
        Arc::new(
            ScriptedExecutor::new()
                .on("images", 0, "sha256abc\n")
                .on("run -i --rm -d", 0, "container-id\n")
                .on("collections/ansible_collections", 0, "")
                .on("cp ", 0, "")
                .on(" stop ", 0, "")
                .on(" rm -f ", 0, ""),
        )
    }

    fn container_config() -> ToolConfig {
        ToolConfig {
            collections_paths: vec!["/usr/share/ansible/collections".to_string()],
            module_locations: vec!["/usr/lib/python3/site-packages/ansible/modules".to_string()],
            ansible_location: None,
            default_host_list: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_fetch_tears_down_and_writes_sentinel() {
        let cache = TempDir::new().unwrap();
        let executor = fetch_executor();
        let env = environment(executor.clone(), ContainerEngine::Podman, cache.path().into());
        let notifier = RecordingNotifier::default();

        let config = env.fetch_plugin_docs(&container_config(), &notifier).await.unwrap();
        let cache_dir = cache
            .path()
            .join("ghcr_io_ansible_creator_ee_latest")
            .join("sha256abc");
        assert!(cache_dir.join(SUCCESS_MARKER).exists());
        // The copy is scripted, so nothing landed on disk for the collections path.
        assert!(config.collections_paths.is_empty());

        let commands = executor.commands();
        let name = "ghcr_io_ansible_creator_ee_latest";
        assert!(commands.contains(&format!("podman run -i --rm -d --name {name} {IMAGE} bash")));
        assert!(commands.iter().any(|c| c.starts_with(&format!("podman cp {name}:/usr/share/ansible/collections"))));
        assert_eq!(commands[commands.len() - 2], format!("podman stop {name}"));
        assert_eq!(commands[commands.len() - 1], format!("podman rm -f {name}"));
    }

    #[tokio::test]
    async fn test_fetch_reuses_complete_cache() {
        let cache = TempDir::new().unwrap();
        let cache_dir = cache
            .path()
            .join("ghcr_io_ansible_creator_ee_latest")
            .join("sha256abc");
        std::fs::create_dir_all(cache_dir.join("usr/share/ansible/collections")).unwrap();
        std::fs::write(cache_dir.join(SUCCESS_MARKER), "").unwrap();

        let executor = fetch_executor();
        let env = environment(executor.clone(), ContainerEngine::Podman, cache.path().into());
        let config = env
            .fetch_plugin_docs(&container_config(), &RecordingNotifier::default())
            .await
            .unwrap();

        assert_eq!(
            config.collections_paths,
            vec![cache_dir.join("usr/share/ansible/collections").to_string_lossy().to_string()]
        );
        assert!(config.module_locations.is_empty());
        assert!(!executor.commands().iter().any(|c| c.contains(" run ")));
    }

    #[tokio::test]
    async fn test_failed_start_still_cleans_up() {
        let cache = TempDir::new().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on("images", 0, "sha256abc\n"));
        let env = environment(executor.clone(), ContainerEngine::Docker, cache.path().into());
        let err = env
            .fetch_plugin_docs(&container_config(), &RecordingNotifier::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EnvironmentError::ContainerStart { .. }));
        let commands = executor.commands();
        assert!(commands.last().unwrap().starts_with("docker rm -f"));
        assert!(!cache.path().join("ghcr_io_ansible_creator_ee_latest/sha256abc").join(SUCCESS_MARKER).exists());
    }
}

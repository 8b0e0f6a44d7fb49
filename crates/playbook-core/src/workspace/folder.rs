use crate::config::Settings;
use crate::deferred::Deferred;
use crate::docs::DocsLibrary;
use crate::ee::ExecutionEnvironment;
use crate::exec::{CommandExecutor, CommandRunner};
use crate::lint::LintRunner;
use crate::metadata::MetadataIndex;
use crate::model::{FileEvent, WorkspaceFolder};
use crate::notify::Notifier;
use crate::tool_config::ToolConfig;
use crate::vfs::FileSystem;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Host collaborators shared by every folder.
#[derive(Clone)]
pub struct Services {
    pub executor: Arc<dyn CommandExecutor>,
    pub notifier: Arc<dyn Notifier>,
    pub fs: Arc<dyn FileSystem>,
    /// Parent directory of the plugin-doc caches.
    pub cache_root: PathBuf,
}

/// Services of one workspace folder. The expensive ones are built on first
/// use and rebuilt after a settings change or a file change inside the folder.
pub struct FolderContext {
    folder: WorkspaceFolder,
    services: Services,
    settings: RwLock<Arc<Settings>>,
    environment: Deferred<Option<Arc<ExecutionEnvironment>>>,
    tool_config: Deferred<ToolConfig>,
    docs: Deferred<DocsLibrary>,
    metadata: MetadataIndex,
    lint: LintRunner,
}

impl FolderContext {
    pub fn new(folder: WorkspaceFolder, services: Services, settings: Settings) -> Self {
        Self {
            metadata: MetadataIndex::new(Arc::clone(&services.fs)),
            lint: LintRunner::new(Arc::clone(&services.fs)),
            folder,
            services,
            settings: RwLock::new(Arc::new(settings)),
            environment: Deferred::new(),
            tool_config: Deferred::new(),
            docs: Deferred::new(),
        }
    }

    pub fn folder(&self) -> &WorkspaceFolder {
        &self.folder
    }

    pub fn root(&self) -> PathBuf {
        self.folder.root()
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.services.notifier
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.services.fs
    }

    pub fn metadata(&self) -> &MetadataIndex {
        &self.metadata
    }

    pub fn lint_runner(&self) -> &LintRunner {
        &self.lint
    }

    /// Replace the settings and drop everything derived from them.
    pub fn update_settings(&self, settings: Settings) {
        let previous = {
            let mut current = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, Arc::new(settings))
        };
        if previous.execution_environment != self.settings().execution_environment {
            self.environment.invalidate();
        }
        self.invalidate();
    }

    fn invalidate(&self) {
        self.tool_config.invalidate();
        self.docs.invalidate();
    }

    pub fn handle_file_events(&self, events: &[FileEvent]) {
        self.metadata.handle_file_events(events);
        self.lint.handle_file_events(events);
        if events.iter().any(|e| self.folder.contains(&e.uri)) {
            log::debug!("Files changed in {}, dropping the module index", self.folder.uri);
            self.invalidate();
        }
    }

    /// The folder's execution environment; `None` when it is disabled or
    /// could not be set up. A failed setup is reported once and stays
    /// disabled until the settings change.
    pub async fn execution_environment(self: &Arc<Self>) -> Option<Arc<ExecutionEnvironment>> {
        let settings = self.settings();
        if !settings.execution_environment.enabled {
            return None;
        }
        let this = Arc::clone(self);
        let environment = self
            .environment
            .get_or_build(move || async move {
                let services = &this.services;
                let result = ExecutionEnvironment::initialize(
                    settings.execution_environment.clone(),
                    this.root(),
                    Arc::clone(&services.executor),
                    Arc::clone(&services.fs),
                    services.notifier.as_ref(),
                    services.cache_root.clone(),
                )
                .await;
                match result {
                    Ok(environment) => Some(Arc::new(environment)),
                    Err(e) => {
                        log::error!("Execution environment setup failed: {e}");
                        services
                            .notifier
                            .show_error(format!("{e}. The execution environment is disabled for this session."))
                            .await;
                        None
                    }
                }
            })
            .await;
        (*environment).clone()
    }

    pub async fn command_runner(self: &Arc<Self>) -> CommandRunner {
        let environment = self.execution_environment().await;
        CommandRunner::new(
            self.settings().as_ref().clone(),
            self.root(),
            Arc::clone(&self.services.executor),
            environment,
        )
    }

    /// Tool configuration with paths usable on the host: inside the execution
    /// environment the plugin docs are copied to the host cache first.
    pub async fn tool_config(self: &Arc<Self>) -> Arc<ToolConfig> {
        let this = Arc::clone(self);
        self.tool_config
            .get_or_build(move || async move {
                let runner = this.command_runner().await;
                let notifier = this.services.notifier.as_ref();
                let config = ToolConfig::load(&runner, notifier).await;
                let Some(environment) = this.execution_environment().await else {
                    return config;
                };
                match environment.fetch_plugin_docs(&config, notifier).await {
                    Ok(host_config) => host_config,
                    Err(e) => {
                        log::error!("Could not cache plugin docs: {e}");
                        notifier.show_error(e.to_string()).await;
                        config
                    }
                }
            })
            .await
    }

    pub async fn docs_library(self: &Arc<Self>) -> Arc<DocsLibrary> {
        let this = Arc::clone(self);
        self.docs
            .get_or_build(move || async move {
                let config = this.tool_config().await;
                let fs = Arc::clone(&this.services.fs);
                let index_fs = Arc::clone(&fs);
                match tokio::task::spawn_blocking(move || DocsLibrary::index(index_fs, &config)).await {
                    Ok(library) => library,
                    Err(e) => {
                        log::error!("Module indexing failed: {e}");
                        DocsLibrary::new(fs)
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedExecutor;
    use crate::model::FileChangeKind;
    use crate::notify::testing::RecordingNotifier;
    use crate::vfs::PhysicalFileSystem;
    use tempfile::TempDir;
    use url::Url;

    const VERSION: &str = "ansible [core 2.16.0]\n  configured module search path = ['/nonexistent/modules']\n";

    fn context(executor: Arc<ScriptedExecutor>, notifier: Arc<RecordingNotifier>, dir: &TempDir) -> Arc<FolderContext> {
        let services = Services {
            executor,
            notifier,
            fs: Arc::new(PhysicalFileSystem),
            cache_root: dir.path().join("cache"),
        };
        let folder = WorkspaceFolder::new(Url::from_file_path(dir.path()).unwrap(), "project");
        Arc::new(FolderContext::new(folder, services, Settings::default()))
    }

    fn tool_executor() -> Arc<ScriptedExecutor> {
        Arc::new(
            ScriptedExecutor::new()
                .on("ansible-config dump", 0, "COLLECTIONS_PATHS(default) = ['/nonexistent/collections']\n")
                .on("ansible --version", 0, VERSION)
                .on("python3", 0, "['/nonexistent/site-packages']"),
        )
    }

    #[tokio::test]
    async fn test_tool_config_built_once_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let executor = tool_executor();
        let ctx = context(executor.clone(), Arc::new(RecordingNotifier::default()), &dir);

        let (a, b) = tokio::join!(ctx.tool_config(), ctx.tool_config());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.collections_paths, vec!["/nonexistent/collections", "/nonexistent/site-packages"]);
        assert_eq!(executor.commands().len(), 3);

        ctx.update_settings(Settings::default());
        ctx.tool_config().await;
        assert_eq!(executor.commands().len(), 6);
    }

    #[tokio::test]
    async fn test_file_events_outside_folder_keep_index() {
        let dir = TempDir::new().unwrap();
        let executor = tool_executor();
        let ctx = context(executor.clone(), Arc::new(RecordingNotifier::default()), &dir);
        ctx.docs_library().await;
        assert_eq!(executor.commands().len(), 3);

        ctx.handle_file_events(&[FileEvent {
            uri: Url::parse("file:///elsewhere/site.yml").unwrap(),
            kind: FileChangeKind::Changed,
        }]);
        ctx.docs_library().await;
        assert_eq!(executor.commands().len(), 3);

        ctx.handle_file_events(&[FileEvent {
            uri: Url::from_file_path(dir.path().join("site.yml")).unwrap(),
            kind: FileChangeKind::Created,
        }]);
        ctx.docs_library().await;
        assert_eq!(executor.commands().len(), 6);
    }

    #[tokio::test]
    async fn test_failed_environment_is_disabled_and_reported() {
        let dir = TempDir::new().unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = context(executor, notifier.clone(), &dir);
        let mut settings = Settings::default();
        settings.execution_environment.enabled = true;
        ctx.update_settings(settings);

        assert!(ctx.execution_environment().await.is_none());
        assert!(ctx.execution_environment().await.is_none());
        assert_eq!(notifier.errors().len(), 1);
        assert!(notifier.errors()[0].contains("disabled for this session"));
    }
}

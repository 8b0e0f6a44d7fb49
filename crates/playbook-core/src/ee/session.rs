use super::ContainerEngine;
use crate::error::EnvironmentError;
use crate::exec::{CommandExecutor, CommandRequest};
use crate::utils::{quote, sanitize_name};
use std::path::Path;
use std::sync::Arc;

/// A throwaway container started from the environment image. Always finish
/// with [`ContainerSession::teardown`]; dropping an open session schedules the
/// teardown on the current runtime instead.
pub struct ContainerSession {
    engine: ContainerEngine,
    name: String,
    executor: Arc<dyn CommandExecutor>,
    closed: bool,
}

async fn remove_container(executor: &dyn CommandExecutor, engine: ContainerEngine, name: &str) {
    for command in [
        format!("{} stop {name}", engine.name()),
        format!("{} rm -f {name}", engine.name()),
    ] {
        // Already stopped or removed is fine.
        if let Err(e) = executor.execute(&CommandRequest::new(command)).await {
            log::debug!("Container cleanup: {e}");
        }
    }
}

impl ContainerSession {
    pub async fn start(
        engine: ContainerEngine,
        image: &str,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, EnvironmentError> {
        let name = sanitize_name(image);
        remove_container(executor.as_ref(), engine, &name).await;

        let command = format!("{} run -i --rm -d --name {name} {image} bash", engine.name());
        log::info!("Starting container: {command}");
        let result = executor.execute(&CommandRequest::new(command)).await;
        let failure = match result {
            Ok(output) if output.success() => None,
            Ok(output) => Some(output.stderr.trim().to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = failure {
            remove_container(executor.as_ref(), engine, &name).await;
            return Err(EnvironmentError::ContainerStart { name, reason });
        }
        Ok(Self {
            engine,
            name,
            executor,
            closed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `path` exists inside the container.
    pub async fn path_exists(&self, path: &str) -> bool {
        let command = format!("{} exec {} ls {}", self.engine.name(), self.name, quote(Path::new(path)));
        matches!(
            self.executor.execute(&CommandRequest::new(command)).await,
            Ok(output) if output.success()
        )
    }

    /// Copy `src` out of the container into the host directory `dest_parent`.
    pub async fn copy_out(&self, src: &str, dest_parent: &Path) -> Result<(), EnvironmentError> {
        let command = format!(
            "{} cp {}:{src} {}",
            self.engine.name(),
            self.name,
            quote(dest_parent)
        );
        log::debug!("Copying plugin docs: {command}");
        let output = self.executor.execute(&CommandRequest::new(command)).await?;
        if output.success() {
            Ok(())
        } else {
            Err(EnvironmentError::Io(std::io::Error::other(format!(
                "copy of {src} failed: {}",
                output.stderr.trim()
            ))))
        }
    }

    /// Stop and remove the container. Failures are not retried.
    pub async fn teardown(mut self) {
        self.closed = true;
        remove_container(self.executor.as_ref(), self.engine, &self.name).await;
    }
}

impl Drop for ContainerSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let executor = Arc::clone(&self.executor);
        let engine = self.engine;
        let name = std::mem::take(&mut self.name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    remove_container(executor.as_ref(), engine, &name).await;
                });
            }
            Err(_) => log::warn!("Container {name} left running: no runtime to clean it up"),
        }
    }
}

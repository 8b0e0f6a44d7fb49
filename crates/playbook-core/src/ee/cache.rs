//! Host-side copy of the plugin documentation inside an environment image.

use super::session::ContainerSession;
use crate::tool_config::ToolConfig;
use crate::vfs::FileSystem;
use std::path::{Path, PathBuf};

pub const SUCCESS_MARKER: &str = "SUCCESS";

/// Location of `container_path` inside the cache directory.
pub fn cache_path(cache_dir: &Path, container_path: &str) -> PathBuf {
    cache_dir.join(container_path.trim_start_matches('/'))
}

/// Plugin directory that sits next to a builtin module directory.
pub fn builtin_plugin_dir(module_location: &str) -> String {
    let trimmed = module_location.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, "modules")) => format!("{parent}/plugins"),
        _ => format!("{trimmed}/plugins"),
    }
}

/// Rewrite container paths to their cached copies, dropping those not cached.
pub fn rewrite_to_cache(fs: &dyn FileSystem, config: &ToolConfig, cache_dir: &Path) -> ToolConfig {
    let cached = |paths: &[String]| -> Vec<String> {
        paths
            .iter()
            .map(|p| cache_path(cache_dir, p))
            .filter(|p| fs.exists(p))
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    };
    ToolConfig {
        collections_paths: cached(&config.collections_paths),
        module_locations: cached(&config.module_locations),
        ansible_location: config
            .ansible_location
            .as_ref()
            .map(|l| cache_path(cache_dir, l))
            .filter(|p| fs.exists(p))
            .map(|p| p.to_string_lossy().into_owned()),
        default_host_list: config.default_host_list.clone(),
    }
}

/// Copy every probed path that exists in the container. A failed copy is
/// logged and skipped; the cache is used with whatever made it across.
async fn copy_paths(
    session: &ContainerSession,
    fs: &dyn FileSystem,
    cache_dir: &Path,
    paths: Vec<(String, String)>,
) {
    for (src, probe) in paths {
        if src.is_empty() {
            continue;
        }
        let dest = cache_path(cache_dir, &src);
        if fs.exists(&dest) || !session.path_exists(&probe).await {
            continue;
        }
        let Some(parent) = dest.parent() else { continue };
        if let Err(e) = fs.create_dir_all(parent) {
            log::warn!("Cannot create {}: {e}", parent.display());
            continue;
        }
        if let Err(e) = session.copy_out(&src, parent).await {
            log::warn!("{e}");
        }
    }
}

/// Fill `cache_dir` from the running container and mark it complete.
pub async fn populate(
    session: &ContainerSession,
    fs: &dyn FileSystem,
    config: &ToolConfig,
    cache_dir: &Path,
) -> std::io::Result<()> {
    fs.create_dir_all(cache_dir)?;

    let collections = config
        .collections_paths
        .iter()
        .map(|p| (p.clone(), format!("{}/ansible_collections", p.trim_end_matches('/'))))
        .collect();
    copy_paths(session, fs, cache_dir, collections).await;

    let plugins = config
        .module_locations
        .iter()
        .map(|p| {
            let dir = builtin_plugin_dir(p);
            (dir.clone(), dir)
        })
        .collect();
    copy_paths(session, fs, cache_dir, plugins).await;

    let modules = config
        .module_locations
        .iter()
        .map(|p| (p.clone(), p.clone()))
        .collect();
    copy_paths(session, fs, cache_dir, modules).await;

    if let Some(location) = &config.ansible_location {
        let runtime = format!("{}/config", location.trim_end_matches('/'));
        copy_paths(session, fs, cache_dir, vec![(runtime.clone(), runtime)]).await;
    }

    fs.write_all(&cache_dir.join(SUCCESS_MARKER), b"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_plugin_dir() {
        assert_eq!(
            builtin_plugin_dir("/usr/lib/python3.11/site-packages/ansible/modules"),
            "/usr/lib/python3.11/site-packages/ansible/plugins"
        );
        assert_eq!(builtin_plugin_dir("/opt/extra/"), "/opt/extra/plugins");
    }

    fn assert_send<F: std::future::Future + Send>(_: F) {}

    #[test]
    fn test_populate_future_is_send() {
        fn check(session: &ContainerSession, fs: &dyn FileSystem, config: &ToolConfig, dir: &Path) {
            assert_send(populate(session, fs, config, dir));
        }
        let _ = check;
    }

    #[test]
    fn test_cache_path_stays_inside_cache() {
        assert_eq!(
            cache_path(Path::new("/cache/img/abc"), "/usr/share/ansible"),
            PathBuf::from("/cache/img/abc/usr/share/ansible")
        );
    }
}

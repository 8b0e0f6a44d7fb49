use super::finder::{
    find_builtin_modules, find_builtin_routing, find_collection_modules, find_collection_routing,
    ModuleEntry, RoutingByCollection,
};
use super::model::{ModuleDoc, PluginRoute};
use crate::ansible::{declared_collections, provided_module_names};
use crate::syntax::Path;
use crate::tool_config::ToolConfig;
use crate::vfs::FileSystem;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path as FsPath;
use std::sync::Arc;

const MAX_REDIRECTS: usize = 8;

/// Index of every module visible to one workspace folder.
pub struct DocsLibrary {
    fs: Arc<dyn FileSystem>,
    modules: BTreeMap<String, Arc<ModuleEntry>>,
    /// Names completion may offer: indexed modules plus live redirects.
    names: BTreeSet<String>,
    routing: RoutingByCollection,
}

impl std::fmt::Debug for DocsLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocsLibrary")
            .field("modules", &self.modules.len())
            .field("names", &self.names.len())
            .finish()
    }
}

impl DocsLibrary {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            modules: BTreeMap::new(),
            names: BTreeSet::new(),
            routing: RoutingByCollection::new(),
        }
    }

    /// Scan the module and collection locations of a tool configuration.
    /// Blocking; run it off the async executor.
    pub fn index(fs: Arc<dyn FileSystem>, config: &ToolConfig) -> Self {
        let mut library = Self::new(Arc::clone(&fs));
        for location in &config.module_locations {
            for entry in find_builtin_modules(fs.as_ref(), FsPath::new(location)) {
                library.insert_module(entry);
            }
        }
        if let Some(location) = &config.ansible_location {
            library.merge_routing(find_builtin_routing(fs.as_ref(), FsPath::new(location)));
        }
        for path in &config.collections_paths {
            for entry in find_collection_modules(fs.as_ref(), FsPath::new(path)) {
                library.insert_module(entry);
            }
            library.merge_routing(find_collection_routing(fs.as_ref(), FsPath::new(path)));
        }
        log::info!(
            "Indexed {} modules and {} routed collections",
            library.modules.len(),
            library.routing.len()
        );
        library
    }

    fn merge_routing(&mut self, routing: RoutingByCollection) {
        for (collection, routes) in routing {
            for (name, route) in routes {
                self.insert_route(&collection, &name, route);
            }
        }
    }

    pub fn insert_module(&mut self, entry: ModuleEntry) {
        self.names.insert(entry.fqcn.clone());
        self.modules.insert(entry.fqcn.clone(), Arc::new(entry));
    }

    pub fn insert_route(&mut self, collection: &str, name: &str, route: PluginRoute) {
        if route.redirect.is_some() && route.tombstone.is_none() {
            self.names.insert(format!("{collection}.{name}"));
        }
        self.routing
            .entry(collection.to_string())
            .or_default()
            .insert(name.to_string(), route);
    }

    /// Every name completion may offer, sorted.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn module(&self, fqcn: &str) -> Option<&Arc<ModuleEntry>> {
        self.modules.get(fqcn)
    }

    pub fn route(&self, fqcn: &str) -> Option<&PluginRoute> {
        let (collection, name) = fqcn.rsplit_once('.')?;
        if !collection.contains('.') {
            return None;
        }
        self.routing.get(collection)?.get(name)
    }

    pub fn documentation(&self, entry: &ModuleEntry) -> Option<Arc<ModuleDoc>> {
        entry.documentation(self.fs.as_ref())
    }

    /// Fully qualified names `name` may refer to, most specific first.
    pub fn candidate_names(name: &str, context: Option<&Path<'_>>, metadata_collections: &[String]) -> Vec<String> {
        if name.split('.').count() >= 3 {
            return vec![name.to_string()];
        }
        let mut candidates = vec![format!("ansible.builtin.{name}")];
        candidates.extend(metadata_collections.iter().map(|c| format!("{c}.{name}")));
        if let Some(path) = context {
            candidates.extend(declared_collections(path).iter().map(|c| format!("{c}.{name}")));
        }
        candidates
    }

    /// Resolve a module by short or fully qualified name.
    ///
    /// Returns the module, if one is indexed, and the first candidate name that
    /// matched either a route or a module.
    pub fn find_module(
        &self,
        name: &str,
        context: Option<&Path<'_>>,
        metadata_collections: &[String],
    ) -> (Option<Arc<ModuleEntry>>, Option<String>) {
        let candidates = Self::candidate_names(name, context, metadata_collections);
        let routed = candidates
            .iter()
            .find_map(|fqcn| self.route(fqcn).map(|route| (fqcn.clone(), route)));

        if let Some((hit, route)) = &routed {
            if let Some(target) = &route.redirect {
                return (self.follow_redirect(target), Some(hit.clone()));
            }
        }
        let found = candidates
            .iter()
            .find_map(|fqcn| self.modules.get(fqcn).map(|m| (fqcn.clone(), Arc::clone(m))));
        match (routed, found) {
            (Some((hit, _)), found) => (found.map(|(_, m)| m), Some(hit)),
            (None, Some((hit, module))) => (Some(module), Some(hit)),
            (None, None) => (None, None),
        }
    }

    fn follow_redirect(&self, target: &str) -> Option<Arc<ModuleEntry>> {
        let mut current = target.to_string();
        for _ in 0..MAX_REDIRECTS {
            if let Some(module) = self.modules.get(&current) {
                return Some(Arc::clone(module));
            }
            current = self.route(&current)?.redirect.clone()?;
        }
        None
    }

    /// The module used by the task that owns `task_param_path`, if one is given.
    pub fn find_provided_module(
        &self,
        task_param_path: &Path<'_>,
        metadata_collections: &[String],
    ) -> Option<Arc<ModuleEntry>> {
        provided_module_names(task_param_path)
            .into_iter()
            .find_map(|name| self.find_module(name, Some(task_param_path), metadata_collections).0)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

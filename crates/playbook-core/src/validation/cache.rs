use crate::model::DiagnosticsByFile;
use std::collections::{BTreeSet, HashMap};
use url::Url;

/// Last full-pass results per origin document, plus which files each origin
/// has published diagnostics for.
#[derive(Debug, Default)]
pub struct ValidationCache {
    by_origin: HashMap<Url, DiagnosticsByFile>,
    references: HashMap<Url, BTreeSet<Url>>,
    ref_counts: HashMap<Url, usize>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last full-pass map for `origin`, empty if there is none.
    pub fn cached(&self, origin: &Url) -> DiagnosticsByFile {
        self.by_origin.get(origin).cloned().unwrap_or_default()
    }

    pub fn store(&mut self, origin: &Url, diagnostics: DiagnosticsByFile) {
        self.by_origin.insert(origin.clone(), diagnostics);
    }

    /// Record the files `origin` just published for. Returns the files that no
    /// origin references any more; their diagnostics must be cleared.
    pub fn track(&mut self, origin: &Url, published: &DiagnosticsByFile) -> Vec<Url> {
        let current: BTreeSet<Url> = published.keys().cloned().collect();
        let previous = self.references.remove(origin).unwrap_or_default();

        for added in current.difference(&previous) {
            *self.ref_counts.entry(added.clone()).or_default() += 1;
        }
        let stale = previous
            .difference(&current)
            .filter(|uri| self.decrement(uri))
            .cloned()
            .collect();
        self.references.insert(origin.clone(), current);
        stale
    }

    /// Forget `origin`. Returns the files whose diagnostics must be cleared.
    pub fn release(&mut self, origin: &Url) -> Vec<Url> {
        self.by_origin.remove(origin);
        let previous = self.references.remove(origin).unwrap_or_default();
        previous.into_iter().filter(|uri| self.decrement(uri)).collect()
    }

    /// Drop one reference; `true` when none remain.
    fn decrement(&mut self, uri: &Url) -> bool {
        match self.ref_counts.get_mut(uri) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            _ => {
                self.ref_counts.remove(uri);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("file:///work/{path}")).unwrap()
    }

    fn published(paths: &[&str]) -> DiagnosticsByFile {
        paths.iter().map(|p| (url(p), Vec::new())).collect()
    }

    #[test]
    fn test_shared_file_cleared_after_last_origin() {
        let mut cache = ValidationCache::new();
        let (site, deploy, role) = (url("site.yml"), url("deploy.yml"), url("roles/web/tasks/main.yml"));

        assert!(cache.track(&site, &published(&["site.yml", "roles/web/tasks/main.yml"])).is_empty());
        assert!(cache.track(&deploy, &published(&["deploy.yml", "roles/web/tasks/main.yml"])).is_empty());

        assert_eq!(cache.track(&site, &published(&["site.yml"])), Vec::<Url>::new());
        assert_eq!(cache.release(&deploy), vec![deploy.clone(), role]);
        assert_eq!(cache.release(&site), vec![site]);
    }

    #[test]
    fn test_store_replaces_previous_map() {
        let mut cache = ValidationCache::new();
        let site = url("site.yml");
        cache.store(&site, published(&["site.yml", "other.yml"]));
        cache.store(&site, published(&["site.yml"]));
        assert_eq!(cache.cached(&site).len(), 1);
        cache.release(&site);
        assert!(cache.cached(&site).is_empty());
    }
}

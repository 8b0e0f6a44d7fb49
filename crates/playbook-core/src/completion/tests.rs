use super::*;
use crate::docs::{ModuleDoc, ModuleEntry, PluginRoute};
use crate::vfs::PhysicalFileSystem;
use tempfile::TempDir;

const COPY_DOC: &str = "
module: copy
short_description: Copy files to remote locations
options:
  src:
    type: path
  dest:
    type: path
    required: true
    aliases: [path]
  mode:
    type: raw
  backup:
    type: bool
    default: no
  state:
    type: str
    choices: [file, absent]
    default: file
  validate_opts:
    type: dict
    suboptions:
      strict:
        type: bool
      checks:
        type: list
        elements: str
";

fn module(namespace: &str, collection: &str, name: &str, raw: &str) -> ModuleEntry {
    let value: serde_yaml::Value = serde_yaml::from_str(raw).unwrap();
    ModuleEntry::with_documentation(namespace, collection, name, ModuleDoc::from_raw(&value).unwrap())
}

fn library() -> DocsLibrary {
    let mut library = DocsLibrary::new(Arc::new(PhysicalFileSystem));
    library.insert_module(module("ansible", "builtin", "copy", COPY_DOC));
    library.insert_module(module("ansible", "builtin", "debug", "module: debug\n"));
    library.insert_module(module("community", "general", "ufw", "module: ufw\n"));
    library.insert_module(module("other", "coll", "ufw", "module: ufw\n"));
    library.insert_route(
        "community.general",
        "old_ufw",
        PluginRoute {
            redirect: Some("community.general.ufw".to_string()),
            ..PluginRoute::default()
        },
    );
    library
}

struct Fixture {
    library: DocsLibrary,
    settings: Settings,
    uri: Url,
}

impl Fixture {
    fn new() -> Self {
        Self {
            library: library(),
            settings: Settings::default(),
            uri: Url::parse("file:///work/site.yml").unwrap(),
        }
    }

    fn complete(&self, text: &str, line: u32, col: u32) -> Vec<CompletionCandidate> {
        let request = CompletionRequest {
            uri: &self.uri,
            text,
            position: Point::new(line, col),
            settings: &self.settings,
            library: &self.library,
            metadata_collections: &[],
            fs: &PhysicalFileSystem,
        };
        complete_with(&request, &CancelToken::new()).unwrap_or_default()
    }
}

fn labels(candidates: &[CompletionCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.label.as_str()).collect()
}

#[test]
fn test_sort_text_orders_large_lists() {
    let candidate = |priority: u8, order: usize| CompletionCandidate {
        label: format!("item{order}"),
        kind: CandidateKind::Module,
        priority,
        order,
        detail: None,
        documentation: None,
        filter_text: None,
        insert_text: String::new(),
        edit: None,
        snippet: false,
        module: None,
    };

    let mut keys: Vec<String> = (0..12_000).map(|order| candidate(2, order).sort_text()).collect();
    let unsorted = keys.clone();
    keys.sort();
    assert_eq!(keys, unsorted);
    assert!(candidate(2, 9_999).sort_text() < candidate(2, 10_000).sort_text());
    assert!(candidate(1, usize::MAX).sort_text() < candidate(2, 0).sort_text());
}

#[test]
fn test_play_mapping_ranks_name_first() {
    let fixture = Fixture::new();
    let candidates = fixture.complete("- hosts: all\n  ", 1, 2);

    assert_eq!(candidates[0].label, "name");
    assert_eq!(candidates[0].sort_text(), format!("1_{:020}", candidates[0].order));
    assert!(!labels(&candidates).contains(&"hosts"));
    assert!(labels(&candidates).contains(&"gather_facts"));
    assert!(candidates.iter().all(|c| c.kind == CandidateKind::Keyword));
    assert_eq!(candidates[0].insert_text, "name:");
}

#[test]
fn test_empty_task_offers_modules_and_block() {
    let fixture = Fixture::new();
    let text = "- hosts: all\n  tasks:\n    - ";
    let candidates = fixture.complete(text, 2, 6);
    let names = labels(&candidates);

    assert_eq!(names[0], "name");
    assert!(names.contains(&"block"));
    assert!(names.contains(&"when"));
    assert!(!names.contains(&"hosts"));
    let modules: Vec<&str> = candidates
        .iter()
        .filter(|c| c.module.is_some())
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(
        modules,
        vec![
            "ansible.builtin.copy",
            "ansible.builtin.debug",
            "community.general.ufw",
            "other.coll.ufw",
            "community.general.old_ufw",
        ]
    );
    assert!(!modules.contains(&"name"));

    let copy = candidates.iter().find(|c| c.label == "ansible.builtin.copy").unwrap();
    assert_eq!(copy.insert_text, "ansible.builtin.copy:\n\t\t");
    assert!(copy.snippet);
    assert_eq!(copy.detail.as_deref(), Some("ansible.builtin"));
    let old = candidates.iter().find(|c| c.label == "community.general.old_ufw").unwrap();
    assert_eq!(old.kind, CandidateKind::RedirectedModule);
    assert_eq!(old.priority, 3);
}

#[test]
fn test_redirected_modules_can_be_hidden() {
    let mut fixture = Fixture::new();
    fixture.settings.completion.provide_redirect_modules = false;
    let candidates = fixture.complete("- hosts: all\n  tasks:\n    - ", 2, 6);
    assert!(!labels(&candidates).contains(&"community.general.old_ufw"));
}

#[test]
fn test_short_names_only_when_unambiguous() {
    let mut fixture = Fixture::new();
    fixture.settings.ansible.use_fully_qualified_collection_names = false;
    let text = "- hosts: all\n  collections:\n    - community.general\n  tasks:\n    - ";
    let candidates = fixture.complete(text, 4, 6);
    let modules: Vec<&str> = candidates
        .iter()
        .filter(|c| c.module.is_some())
        .map(|c| c.label.as_str())
        .collect();

    assert!(modules.contains(&"copy"));
    assert!(modules.contains(&"ufw"));
    assert!(modules.contains(&"other.coll.ufw"));
    let ufw = candidates.iter().find(|c| c.label == "ufw").unwrap();
    assert_eq!(ufw.module.as_deref(), Some("community.general.ufw"));
}

#[test]
fn test_task_with_module_gets_no_modules() {
    let fixture = Fixture::new();
    let text = "- hosts: all\n  tasks:\n    - ansible.builtin.debug:\n      ";
    let candidates = fixture.complete(text, 3, 6);
    assert!(candidates.iter().all(|c| c.module.is_none()));
    assert!(!labels(&candidates).contains(&"block"));
    assert!(labels(&candidates).contains(&"name"));
}

#[test]
fn test_block_and_role_contexts() {
    let fixture = Fixture::new();
    let text = "- hosts: all\n  tasks:\n    - block:\n        - ansible.builtin.debug:\n      ";
    let candidates = fixture.complete(text, 4, 6);
    let names = labels(&candidates);
    assert!(names.contains(&"rescue"));
    assert!(!names.contains(&"block"));

    let text = "- hosts: all\n  roles:\n    - role: web\n      ";
    let candidates = fixture.complete(text, 3, 6);
    let names = labels(&candidates);
    assert!(names.contains(&"tags"));
    assert!(!names.contains(&"role"));
    assert!(candidates.iter().all(|c| c.module.is_none()));
}

#[test]
fn test_options_ranked_required_then_plain_then_alias() {
    let fixture = Fixture::new();
    let text = "- hosts: all\n  tasks:\n    - ansible.builtin.copy:\n        src: a\n        ";
    let candidates = fixture.complete(text, 4, 8);

    assert_eq!(
        labels(&candidates),
        vec!["dest", "mode", "backup", "state", "validate_opts", "path"]
    );
    assert_eq!(candidates[0].detail.as_deref(), Some("path (required)"));
    assert_eq!(candidates[5].kind, CandidateKind::Alias);
    let backup = &candidates[2];
    assert_eq!(backup.insert_text, "backup: ");
    let nested = &candidates[4];
    assert_eq!(nested.insert_text, "validate_opts:\n\t");
}

#[test]
fn test_aliases_can_be_hidden() {
    let mut fixture = Fixture::new();
    fixture.settings.completion.provide_module_option_aliases = false;
    let text = "- hosts: all\n  tasks:\n    - ansible.builtin.copy:\n        ";
    let candidates = fixture.complete(text, 3, 8);
    assert!(!labels(&candidates).contains(&"path"));
    assert_eq!(candidates[0].label, "dest");
}

#[test]
fn test_suboptions_follow_the_schema() {
    let fixture = Fixture::new();
    let text = "- hosts: all\n  tasks:\n    - ansible.builtin.copy:\n        validate_opts:\n          ";
    let candidates = fixture.complete(text, 4, 10);
    assert_eq!(labels(&candidates), vec!["strict", "checks"]);
    assert_eq!(candidates[1].detail.as_deref(), Some("list(str) (optional)"));
}

#[test]
fn test_value_candidates() {
    let fixture = Fixture::new();
    let text = "- hosts: all\n  tasks:\n    - ansible.builtin.copy:\n        backup: ";
    let candidates = fixture.complete(text, 3, 16);
    assert_eq!(labels(&candidates), vec!["false", "true"]);
    assert_eq!(candidates[0].detail.as_deref(), Some("default"));

    let text = "- hosts: all\n  tasks:\n    - ansible.builtin.copy:\n        state: ";
    let candidates = fixture.complete(text, 3, 15);
    assert_eq!(labels(&candidates), vec!["file", "absent"]);
    assert_eq!(candidates[0].priority, 1);
    assert_eq!(candidates[1].priority, 2);
}

#[test]
fn test_partial_word_is_replaced() {
    let fixture = Fixture::new();
    let candidates = fixture.complete("- hosts: all\n  na\n", 1, 4);
    let name = candidates.iter().find(|c| c.label == "name").unwrap();
    let edit = name.edit.as_ref().unwrap();
    assert_eq!(edit.range, TextRange::new(Point::new(1, 2), Point::new(1, 4)));
    assert_eq!(edit.new_text, "name:");
}

#[test]
fn test_cancelled_request_returns_none() {
    let fixture = Fixture::new();
    let token = CancelToken::new();
    token.cancel();
    let request = CompletionRequest {
        uri: &fixture.uri,
        text: "- hosts: all\n  ",
        position: Point::new(1, 2),
        settings: &fixture.settings,
        library: &fixture.library,
        metadata_collections: &[],
        fs: &PhysicalFileSystem,
    };
    assert!(complete_with(&request, &token).is_none());
}

#[test]
fn test_template_variables_by_scope() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("common.yml"), "shared_var: 1\n").unwrap();
    let mut fixture = Fixture::new();
    fixture.uri = Url::from_file_path(dir.path().join("site.yml")).unwrap();

    let text = "- hosts: all\n  vars:\n    play_var: 1\n  vars_prompt:\n    - name: password\n      prompt: Password?\n  vars_files:\n    - common.yml\n  tasks:\n    - name: show\n      vars:\n        task_var: 2\n      ansible.builtin.debug:\n        msg: \"{{  }}\"\n";
    let candidates = fixture.complete(text, 13, 16);

    let found: Vec<(&str, u8)> = candidates.iter().map(|c| (c.label.as_str(), c.priority)).collect();
    assert_eq!(
        found,
        vec![("task_var", 1), ("play_var", 2), ("password", 3), ("shared_var", 4)]
    );
    assert!(candidates.iter().all(|c| c.kind == CandidateKind::Variable));
}

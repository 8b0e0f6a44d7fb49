use super::{enclosing_mapping_keys, CandidateKind, CompletionCandidate, CompletionRequest, Prepared, TextEdit};
use crate::docs::{DocsLibrary, OptionDoc, OptionSet};
use crate::model::TextRange;
use crate::syntax::Path;
use serde_yaml::Value;

const NAME_KEYWORD: u8 = 1;
const MODULE: u8 = 2;
const REDIRECTED_MODULE: u8 = 3;
const KEYWORD: u8 = 4;

const REQUIRED_OPTION: u8 = 1;
const OPTION: u8 = 2;
const ALIAS_OPTION: u8 = 3;

const DEFAULT_VALUE: u8 = 1;
const VALUE: u8 = 2;

/// Text appended after `key:` when completing at the end of a line, by the
/// kind of value the key takes. Tabs stand for one indentation level.
pub fn insertion_suffix(value_type: Option<&str>, first_element_of_list: bool) -> String {
    let indent = if first_element_of_list { "\t\t" } else { "\t" };
    match value_type {
        Some("list") => format!("\n{indent}- "),
        Some("dict") => format!("\n{indent}"),
        _ => " ".to_string(),
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn option_detail(option: &OptionDoc) -> String {
    let requirement = if option.required { "required" } else { "optional" };
    match option.type_label() {
        Some(label) => format!("{label} ({requirement})"),
        None => format!("({requirement})"),
    }
}

fn option_documentation(option: &OptionDoc) -> String {
    let mut text = option.description.join("\n\n");
    if !option.choices.is_empty() {
        let choices: Vec<String> = option.choices.iter().map(value_label).collect();
        text.push_str(&format!("\n\nChoices: `{}`", choices.join("`, `")));
    }
    if let Some(default) = &option.default {
        text.push_str(&format!("\n\nDefault: `{}`", value_label(default)));
    }
    if let Some(version) = &option.version_added {
        text.push_str(&format!("\n\nAdded in version {version}"));
    }
    text.trim_start().to_string()
}

/// Markdown documentation of a module candidate.
pub fn module_documentation(library: &DocsLibrary, fqcn: &str) -> Option<String> {
    let entry = match library.module(fqcn) {
        Some(entry) => entry.clone(),
        None => library.find_module(fqcn, None, &[]).0?,
    };
    let doc = library.documentation(&entry)?;

    let mut text = format!("**{fqcn}**");
    if let Some(short) = &doc.short_description {
        text.push_str(&format!("\n\n*{short}*"));
    }
    if let Some(route) = library.route(fqcn) {
        if let Some(target) = &route.redirect {
            text.push_str(&format!("\n\nRedirects to `{target}`"));
        }
        if let Some(notice) = &route.deprecation {
            let warning = notice.warning_text.as_deref().unwrap_or("This module is deprecated.");
            text.push_str(&format!("\n\n**Deprecated:** {warning}"));
        }
    }
    if !doc.description.is_empty() {
        text.push_str("\n\n");
        text.push_str(&doc.description.join("\n\n"));
    }
    Some(text)
}

/// Whether `name` resolves to `fqcn` given the collections in scope.
fn short_name_resolves(library: &DocsLibrary, fqcn: &str, name: &str, path: &Path<'_>, metadata: &[String]) -> bool {
    DocsLibrary::candidate_names(name, Some(path), metadata)
        .into_iter()
        .find(|c| library.module(c).is_some() || library.route(c).is_some())
        .as_deref()
        == Some(fqcn)
}

/// Candidates in insertion order; `finish` ranks them.
pub(crate) struct CandidateList<'p, 'r> {
    prepared: &'p Prepared<'r>,
    request: &'p CompletionRequest<'r>,
    items: Vec<CompletionCandidate>,
}

impl<'p, 'r> CandidateList<'p, 'r> {
    pub fn new(prepared: &'p Prepared<'r>, request: &'p CompletionRequest<'r>) -> Self {
        Self {
            prepared,
            request,
            items: Vec::new(),
        }
    }

    pub fn prepared(&self) -> &'p Prepared<'r> {
        self.prepared
    }

    fn push(
        &mut self,
        label: impl Into<String>,
        kind: CandidateKind,
        priority: u8,
        insert_text: String,
        range: Option<TextRange>,
    ) -> &mut CompletionCandidate {
        let order = self.items.len();
        self.items.push(CompletionCandidate {
            label: label.into(),
            kind,
            priority,
            order,
            detail: None,
            documentation: None,
            filter_text: None,
            edit: range.map(|range| TextEdit {
                range,
                new_text: insert_text.clone(),
            }),
            snippet: insert_text.contains('\n'),
            insert_text,
            module: None,
        });
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Keywords not yet present in the enclosing mapping.
    pub fn keywords(&mut self, path: &Path<'_>, keywords: &[&str]) {
        let provided = enclosing_mapping_keys(path);
        let range = self.prepared.node_range(path);
        let at_end = self.prepared.at_end_of_line();
        for &keyword in keywords {
            if provided.contains(&keyword) {
                continue;
            }
            let priority = if keyword == "name" { NAME_KEYWORD } else { KEYWORD };
            let insert = if at_end { format!("{keyword}:") } else { keyword.to_string() };
            self.push(keyword, CandidateKind::Keyword, priority, insert, range);
        }
    }

    /// Every indexed module, under the name the document can use for it.
    pub fn modules(&mut self, path: &Path<'_>) {
        let request = self.request;
        let library = request.library;
        let settings = request.settings;
        let range = self.prepared.node_range(path);
        let at_end = self.prepared.at_end_of_line();
        let suffix = insertion_suffix(Some("dict"), self.prepared.first_element_of_list(range));

        for fqcn in library.module_names() {
            let route = library.route(fqcn);
            let redirected = route.is_some_and(|r| r.redirect.is_some());
            if redirected && !settings.completion.provide_redirect_modules {
                continue;
            }
            let demoted = redirected || route.is_some_and(|r| r.deprecation.is_some());
            let Some((collection, name)) = fqcn.rsplit_once('.') else {
                continue;
            };
            let short = !settings.ansible.use_fully_qualified_collection_names
                && short_name_resolves(library, fqcn, name, path, request.metadata_collections);
            let label = if short { name } else { fqcn };
            let insert = if at_end { format!("{label}:{suffix}") } else { label.to_string() };
            let (kind, priority) = if demoted {
                (CandidateKind::RedirectedModule, REDIRECTED_MODULE)
            } else {
                (CandidateKind::Module, MODULE)
            };

            let candidate = self.push(label, kind, priority, insert, range);
            candidate.detail = Some(collection.to_string());
            candidate.module = Some(fqcn.to_string());
            candidate.filter_text = Some(if short {
                format!("{name} {fqcn}")
            } else {
                let (namespace, coll) = collection.split_once('.').unwrap_or((collection, ""));
                format!("{name} {fqcn} {coll} {namespace}")
            });
        }
    }

    /// Options not yet given in the mapping owning the cursor key.
    pub fn options(&mut self, path: &Path<'_>, options: &OptionSet) {
        let doc = path.doc();
        let provided: Vec<&str> = path
            .ancestry()
            .parent_of_key()
            .node()
            .map(|map| doc.keys(map))
            .unwrap_or_default();
        let range = self.prepared.node_range(path);
        let at_end = self.prepared.at_end_of_line();
        let first = self.prepared.first_element_of_list(range);
        let with_aliases = self.request.settings.completion.provide_module_option_aliases;

        for (name, option) in options.iter() {
            if provided.contains(&option.name.as_str()) {
                continue;
            }
            let alias = name != option.name;
            if alias && !with_aliases {
                continue;
            }
            let (kind, priority) = if alias {
                (CandidateKind::Alias, ALIAS_OPTION)
            } else if option.required {
                (CandidateKind::Option, REQUIRED_OPTION)
            } else {
                (CandidateKind::Option, OPTION)
            };
            let insert = if at_end {
                format!("{name}:{}", insertion_suffix(option.type_name.as_deref(), first))
            } else {
                name.to_string()
            };
            let candidate = self.push(name, kind, priority, insert, range);
            candidate.detail = Some(option_detail(option));
            candidate.documentation = Some(option_documentation(option));
        }
    }

    /// Declared choices of `option`, booleans, or its default.
    pub fn values(&mut self, path: &Path<'_>, option: &OptionDoc) {
        let is_bool = option.type_name.as_deref() == Some("bool");
        let default = match &option.default {
            Some(Value::String(s)) if is_bool => Some(Value::Bool(matches!(
                s.to_ascii_lowercase().as_str(),
                "yes" | "true" | "on" | "1"
            ))),
            other => other.clone(),
        };
        let values: Vec<Value> = if !option.choices.is_empty() {
            option.choices.clone()
        } else if is_bool {
            vec![Value::Bool(true), Value::Bool(false)]
        } else {
            default.iter().cloned().collect()
        };

        let range = self.prepared.node_range(path);
        for value in values {
            let is_default = default.as_ref() == Some(&value);
            let label = value_label(&value);
            let priority = if is_default { DEFAULT_VALUE } else { VALUE };
            let candidate = self.push(label.clone(), CandidateKind::Value, priority, label, range);
            if is_default {
                candidate.detail = Some("default".to_string());
            }
        }
    }

    /// `(name, scope)` pairs; inner scopes rank first.
    pub fn variables(&mut self, variables: Vec<(String, u8)>) {
        for (name, scope) in variables {
            self.push(name.clone(), CandidateKind::Variable, scope, name, None);
        }
    }

    pub fn finish(mut self) -> Vec<CompletionCandidate> {
        self.items.sort_by_key(|c| (c.priority, c.order));
        self.items
    }
}

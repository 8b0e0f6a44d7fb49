use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::sync::Arc;

/// Documentation of one module option.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionDoc {
    pub name: String,
    pub description: Vec<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub choices: Vec<Value>,
    pub type_name: Option<String>,
    pub elements: Option<String>,
    pub aliases: Vec<String>,
    pub version_added: Option<String>,
    pub suboptions: OptionSet,
}

impl OptionDoc {
    /// Type label shown next to the option: `list(str)`, `dict`, or the bare type.
    pub fn type_label(&self) -> Option<String> {
        match (self.type_name.as_deref(), self.elements.as_deref()) {
            (Some("list"), Some(elements)) => Some(format!("list({elements})")),
            (Some(t), _) => Some(t.to_string()),
            (None, _) => None,
        }
    }
}

/// Options of a module in schema order; aliases appear as extra entries that
/// share the documentation of the option they alias.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionSet {
    entries: Vec<(String, Arc<OptionDoc>)>,
}

impl OptionSet {
    pub fn from_raw(raw: &Value) -> Self {
        let mut entries = Vec::new();
        let Some(map) = raw.as_mapping() else {
            return Self { entries };
        };
        for (key, value) in map {
            let (Some(name), Some(option)) = (key.as_str(), value.as_mapping()) else {
                continue;
            };
            let doc = Arc::new(parse_option(name, option));
            entries.push((name.to_string(), Arc::clone(&doc)));
            for alias in &doc.aliases {
                entries.push((alias.clone(), Arc::clone(&doc)));
            }
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<OptionDoc>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// `(name, doc)` pairs in schema order, aliases included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<OptionDoc>)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn string_field(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_option(name: &str, raw: &Mapping) -> OptionDoc {
    OptionDoc {
        name: name.to_string(),
        description: text_list(raw.get("description")),
        required: raw.get("required").and_then(Value::as_bool).unwrap_or(false),
        default: raw.get("default").filter(|v| !v.is_null()).cloned(),
        choices: raw
            .get("choices")
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default(),
        type_name: string_field(raw, "type"),
        elements: string_field(raw, "elements"),
        aliases: raw
            .get("aliases")
            .and_then(Value::as_sequence)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        version_added: string_field(raw, "version_added"),
        suboptions: raw
            .get("suboptions")
            .map(OptionSet::from_raw)
            .unwrap_or_default(),
    }
}

/// Parsed `DOCUMENTATION` of a module.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleDoc {
    pub module: String,
    pub short_description: Option<String>,
    pub description: Vec<String>,
    pub version_added: Option<String>,
    pub deprecated: bool,
    pub options: OptionSet,
}

impl ModuleDoc {
    /// `None` unless the raw document names its module.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let map = raw.as_mapping()?;
        let module = string_field(map, "module")?;
        Some(Self {
            module,
            short_description: string_field(map, "short_description"),
            description: text_list(map.get("description")),
            version_added: string_field(map, "version_added"),
            deprecated: map.get("deprecated").is_some_and(|v| !v.is_null() && v.as_bool() != Some(false)),
            options: map.get("options").map(OptionSet::from_raw).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RouteNotice {
    pub removal_version: Option<String>,
    pub removal_date: Option<String>,
    pub warning_text: Option<String>,
}

/// Routing entry for one module from a collection's runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct PluginRoute {
    pub redirect: Option<String>,
    pub deprecation: Option<RouteNotice>,
    pub tombstone: Option<RouteNotice>,
}

//! Parsing of the linter's codeclimate report.

use super::config::LintConfig;
use crate::model::{Diagnostic, DiagnosticSeverity, DiagnosticsByFile, TextRange};
use crate::utils::path_to_uri;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

pub const LINT_SOURCE: &str = "Ansible";

#[derive(Debug, Deserialize)]
struct Finding {
    check_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    categories: Vec<Value>,
    location: Option<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    path: Option<String>,
    lines: Option<Lines>,
    positions: Option<Lines>,
}

#[derive(Debug, Deserialize)]
struct Lines {
    begin: Option<Value>,
}

fn rule_name_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(?P<name>[a-z\-]+)\]").ok()).as_ref()
}

/// Rule name embedded in a check name such as `[risky-file-permissions] ...`.
pub fn rule_name(check_name: &str) -> &str {
    rule_name_regex()
        .and_then(|re| re.captures(check_name))
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
        .unwrap_or(check_name)
}

/// `(line, column)` of a `begin` entry, 1-based; the column defaults to 1.
fn begin_position(begin: &Value) -> Option<(u64, u64)> {
    match begin {
        Value::Number(n) => n.as_u64().map(|line| (line, 1)),
        Value::Object(map) => {
            let line = map.get("line")?.as_u64()?;
            let column = map.get("column").and_then(Value::as_u64).unwrap_or(1);
            Some((line, column))
        }
        _ => None,
    }
}

/// Severity of a finding. Matching the warn list by rule name or by any
/// category downgrades to a warning; nothing upgrades.
fn severity_for(rule: &str, categories: &[Value], config: &LintConfig) -> DiagnosticSeverity {
    let by_rule = config.warn_list.contains(rule);
    let by_category = categories
        .iter()
        .filter_map(Value::as_str)
        .any(|c| config.warn_list.contains(c));
    if by_rule || by_category {
        DiagnosticSeverity::Warning
    } else {
        DiagnosticSeverity::Error
    }
}

/// Diagnostics grouped by the file each finding names. Findings without a
/// check name, path or starting line are skipped.
pub fn parse_report(stdout: &str, config: &LintConfig, working_dir: &Path) -> Result<DiagnosticsByFile, serde_json::Error> {
    let mut diagnostics = DiagnosticsByFile::new();
    if stdout.trim().is_empty() {
        log::warn!("Standard output from the linter is suspiciously empty");
        return Ok(diagnostics);
    }
    let findings: Vec<Finding> = serde_json::from_str(stdout)?;
    for finding in findings {
        let Some(check_name) = finding.check_name else { continue };
        let Some(location) = finding.location else { continue };
        let Some(path) = location.path else { continue };
        let begin = location
            .positions
            .and_then(|p| p.begin)
            .or_else(|| location.lines.and_then(|l| l.begin));
        let Some((line, column)) = begin.as_ref().and_then(begin_position) else {
            continue;
        };
        let Some(uri) = path_to_uri(&working_dir.join(&path)) else {
            continue;
        };

        let line = u32::try_from(line.saturating_sub(1)).unwrap_or(u32::MAX);
        let column = u32::try_from(column.saturating_sub(1)).unwrap_or(0);
        let severity = severity_for(rule_name(&check_name), &finding.categories, config);
        let mut message = check_name.clone();
        if let Some(description) = finding.description.filter(|d| !d.is_empty()) {
            message.push_str("\nDescription: ");
            message.push_str(&description);
        }
        let mut diagnostic = Diagnostic::new(TextRange::to_line_end(line, column), severity, message, LINT_SOURCE);
        diagnostic.code = Some(rule_name(&check_name).to_string());
        diagnostics.entry(uri).or_default().push(diagnostic);
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;
    use url::Url;

    const REPORT: &str = r#"[
      {
        "type": "issue",
        "check_name": "[risky-file-permissions] File permissions unset or incorrect",
        "categories": ["unpredictability"],
        "description": "Missing or unsupported mode parameter",
        "location": {"path": "site.yml", "lines": {"begin": 7}}
      },
      {
        "check_name": "yaml[truthy]",
        "categories": ["formatting", "yaml"],
        "location": {"path": "roles/web/tasks/main.yml", "positions": {"begin": {"line": 3, "column": 5}}}
      },
      {
        "check_name": "[no-location]",
        "location": {"path": "site.yml"}
      }
    ]"#;

    #[test]
    fn test_warn_list_downgrades_by_rule_name() {
        let config = LintConfig {
            warn_list: ["risky-file-permissions".to_string()].into_iter().collect(),
        };
        let diagnostics = parse_report(REPORT, &config, Path::new("/work")).unwrap();
        let site = Url::from_file_path("/work/site.yml").unwrap();
        let site_diags = &diagnostics[&site];
        assert_eq!(site_diags.len(), 1);
        assert_eq!(site_diags[0].severity, DiagnosticSeverity::Warning);
        assert_eq!(site_diags[0].range.start, Point::new(6, 0));
        assert_eq!(site_diags[0].range.end.line, 6);
        assert!(site_diags[0]
            .message
            .ends_with("\nDescription: Missing or unsupported mode parameter"));
        assert_eq!(site_diags[0].source, "Ansible");

        let role = Url::from_file_path("/work/roles/web/tasks/main.yml").unwrap();
        assert_eq!(diagnostics[&role][0].severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostics[&role][0].range.start, Point::new(2, 4));
    }

    #[test]
    fn test_warn_list_downgrades_by_category() {
        let config = LintConfig {
            warn_list: ["formatting".to_string()].into_iter().collect(),
        };
        let diagnostics = parse_report(REPORT, &config, Path::new("/work")).unwrap();
        let role = Url::from_file_path("/work/roles/web/tasks/main.yml").unwrap();
        assert_eq!(diagnostics[&role][0].severity, DiagnosticSeverity::Warning);
    }

    #[test]
    fn test_rule_name() {
        assert_eq!(rule_name("[risky-file-permissions] File permissions"), "risky-file-permissions");
        assert_eq!(rule_name("yaml[truthy]"), "truthy");
        assert_eq!(rule_name("fqcn-builtins"), "fqcn-builtins");
    }

    #[test]
    fn test_bad_report_is_an_error() {
        assert!(parse_report("not json", &LintConfig::default(), Path::new("/work")).is_err());
        assert!(parse_report("  ", &LintConfig::default(), Path::new("/work")).unwrap().is_empty());
    }
}

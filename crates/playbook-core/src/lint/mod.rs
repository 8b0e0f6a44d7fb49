//! The external lint validator and the syntax-check fallback.

mod config;
mod report;

pub use config::{config_from_arguments, find_config_file, LintConfig, LintConfigCache};
pub use report::{parse_report, rule_name, LINT_SOURCE};

use crate::config::LintSettings;
use crate::error::LintError;
use crate::exec::CommandRunner;
use crate::model::{Diagnostic, DiagnosticSeverity, DiagnosticsByFile, FileEvent, TextRange};
use crate::notify::Notifier;
use crate::utils::{path_to_uri, quote, uri_to_path};
use crate::vfs::FileSystem;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use url::Url;

const REPORT_FLAGS: &str = "--offline --nocolor -f codeclimate";

/// Runs the lint tool for one folder. Holds the lint-config cache; otherwise
/// stateless between runs.
pub struct LintRunner {
    fs: Arc<dyn FileSystem>,
    configs: LintConfigCache,
    report_error_shown: AtomicBool,
    missing_tool_shown: AtomicBool,
}

impl LintRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            configs: LintConfigCache::new(Arc::clone(&fs)),
            fs,
            report_error_shown: AtomicBool::new(false),
            missing_tool_shown: AtomicBool::new(false),
        }
    }

    pub fn handle_file_events(&self, events: &[FileEvent]) {
        self.configs.handle_file_events(events);
    }

    /// `true` the first time the tool is reported missing.
    pub fn first_missing_report(&self) -> bool {
        !self.missing_tool_shown.swap(true, Ordering::SeqCst)
    }

    /// Config file for `doc_path`: the one named in the arguments, or the
    /// nearest one inside the folder.
    fn config_file(&self, arguments: &str, doc_path: &Path, folder_root: &Path) -> (Option<PathBuf>, bool) {
        match config_from_arguments(arguments) {
            Some(named) => (Some(folder_root.join(named)), true),
            None => (find_config_file(self.fs.as_ref(), doc_path, folder_root), false),
        }
    }

    /// Lint `doc_uri` and group the findings per file. A report that cannot be
    /// parsed is shown to the user the first time and yields no diagnostics.
    pub async fn lint(
        &self,
        runner: &CommandRunner,
        settings: &LintSettings,
        doc_uri: &Url,
        notifier: &dyn Notifier,
    ) -> Result<DiagnosticsByFile, LintError> {
        let folder_root = runner.folder_root().to_path_buf();
        let doc_path = uri_to_path(doc_uri);
        let (config_path, named) = self.config_file(&settings.arguments, &doc_path, &folder_root);

        let mut args: Vec<String> = Vec::new();
        if !settings.arguments.trim().is_empty() {
            args.push(settings.arguments.trim().to_string());
        }
        let config = match &config_path {
            Some(path) => {
                if !named {
                    args.push(format!("-c {}", quote(path)));
                }
                let (config, error) = self.configs.get(path);
                if let Some(error) = error {
                    log::warn!("{error}");
                    notifier.show_error(error.to_string()).await;
                }
                config
            }
            None => Arc::new(LintConfig::default()),
        };
        args.push(REPORT_FLAGS.to_string());
        args.push(quote(&doc_path));

        let mut mounts = vec![folder_root.clone()];
        mounts.extend(doc_path.parent().map(Path::to_path_buf));
        mounts.extend(config_path.as_deref().and_then(Path::parent).map(Path::to_path_buf));

        let progress = notifier.begin_progress("Ansible Lint", "Processing files...").await;
        let result = runner.run(&settings.path, &args.join(" "), &mounts).await;
        if let Some(token) = progress {
            notifier.end_progress(token).await;
        }
        let output = result?;

        // Exit code 2 means findings were reported.
        if !matches!(output.status, Some(0) | Some(2)) {
            return Err(LintError::Invocation {
                tool: settings.path.clone(),
                code: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        match parse_report(&output.stdout, &config, &folder_root) {
            Ok(diagnostics) => Ok(diagnostics),
            Err(source) => {
                let error = LintError::Report {
                    tool: settings.path.clone(),
                    source,
                };
                log::error!("{error}");
                if !self.report_error_shown.swap(true, Ordering::SeqCst) {
                    notifier.show_error(error.to_string()).await;
                }
                Ok(DiagnosticsByFile::new())
            }
        }
    }
}

fn syntax_error_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"The error appears to be in '(?P<filename>.*)': line (?P<line>\d+), column (?P<column>\d+)").ok()
    })
    .as_ref()
}

/// Diagnostic for a failed `--syntax-check`: at the reported location when the
/// output names one, else at the start of the checked file.
fn syntax_diagnostic(stderr: &str, doc_uri: &Url, folder_root: &Path) -> (Url, Diagnostic) {
    let located = syntax_error_regex()
        .and_then(|re| re.captures(stderr))
        .and_then(|caps| {
            let file = folder_root.join(caps.name("filename")?.as_str());
            let line: u32 = caps.name("line")?.as_str().parse().ok()?;
            let column: u32 = caps.name("column")?.as_str().parse().ok()?;
            Some((path_to_uri(&file)?, line, column))
        });
    let (uri, line, column) = located.unwrap_or_else(|| (doc_uri.clone(), 1, 1));
    let range = TextRange::to_line_end(line.saturating_sub(1), column.saturating_sub(1));
    let diagnostic = Diagnostic::new(range, DiagnosticSeverity::Error, stderr.trim(), LINT_SOURCE);
    (uri, diagnostic)
}

/// Run the playbook tool's syntax check on `doc_uri`.
pub async fn syntax_check(runner: &CommandRunner, doc_uri: &Url) -> Result<DiagnosticsByFile, LintError> {
    let doc_path = uri_to_path(doc_uri);
    let mounts: Vec<PathBuf> = doc_path.parent().map(Path::to_path_buf).into_iter().collect();
    let output = runner
        .run("ansible-playbook", &format!("{} --syntax-check", quote(&doc_path)), &mounts)
        .await?;

    let mut diagnostics = DiagnosticsByFile::new();
    if !output.success() {
        let (uri, diagnostic) = syntax_diagnostic(&output.stderr, doc_uri, runner.folder_root());
        diagnostics.entry(uri).or_default().push(diagnostic);
    }
    Ok(diagnostics)
}

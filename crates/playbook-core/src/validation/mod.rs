//! Document validation: structural diagnostics on every pass, the lint tool
//! (or the syntax check when lint is disabled) on full passes.

mod cache;
mod structural;

pub use cache::ValidationCache;
pub use structural::{collapse_overlapping, structural_diagnostics, SCOPE_END_MESSAGE, STRUCTURAL_SOURCE};

use crate::ansible::is_playbook;
use crate::error::LintError;
use crate::exec::CommandRunner;
use crate::lint::syntax_check;
use crate::model::DiagnosticsByFile;
use crate::workspace::FolderContext;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// Validate `uri`. A quick pass replays the last full-pass results; a full
/// pass runs the external tools and replaces them. The result always has an
/// entry for `uri`, so stale diagnostics get cleared.
pub async fn validate(
    context: &Arc<FolderContext>,
    cache: &Mutex<ValidationCache>,
    uri: &Url,
    text: &str,
    quick: bool,
) -> DiagnosticsByFile {
    let settings = context.settings();
    if !settings.validation.enabled {
        log::debug!("Validation disabled, clearing {uri}");
        return DiagnosticsByFile::from([(uri.clone(), Vec::new())]);
    }

    let mut diagnostics = if quick {
        let cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.cached(uri)
    } else {
        let mut diagnostics = full_pass(context, uri, text).await;
        diagnostics.entry(uri.clone()).or_default();
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store(uri, diagnostics.clone());
        diagnostics
    };
    diagnostics
        .entry(uri.clone())
        .or_default()
        .extend(structural_diagnostics(uri, text));
    diagnostics
}

/// The syntax check only stands in for a disabled linter. A missing or
/// failing linter is reported and produces no diagnostics.
async fn full_pass(context: &Arc<FolderContext>, uri: &Url, text: &str) -> DiagnosticsByFile {
    let settings = context.settings();
    let notifier = context.notifier().as_ref();
    let runner = context.command_runner().await;
    let lint = &settings.validation.lint;

    if !lint.enabled {
        return fallback(&runner, uri, text).await;
    }
    if runner.locate(&lint.path).await.is_none() {
        if context.lint_runner().first_missing_report() {
            let error = LintError::ToolNotFound { tool: lint.path.clone() };
            notifier.show_error(error.to_string()).await;
        }
        return DiagnosticsByFile::new();
    }
    match context.lint_runner().lint(&runner, lint, uri, notifier).await {
        Ok(diagnostics) => diagnostics,
        Err(e) => {
            log::error!("Lint failed for {uri}: {e}");
            notifier.show_error(e.to_string()).await;
            DiagnosticsByFile::new()
        }
    }
}

async fn fallback(runner: &CommandRunner, uri: &Url, text: &str) -> DiagnosticsByFile {
    if !is_playbook(text) {
        return DiagnosticsByFile::new();
    }
    syntax_check(runner, uri).await.unwrap_or_else(|e| {
        log::error!("Syntax check failed for {uri}: {e}");
        DiagnosticsByFile::new()
    })
}

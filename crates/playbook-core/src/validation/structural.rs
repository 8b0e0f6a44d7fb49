//! Diagnostics from the YAML parser's own errors.

use crate::line_map::LineMap;
use crate::model::{Diagnostic, DiagnosticSeverity, Point, RelatedInformation, TextRange};
use crate::syntax::{ErrorKind, ParsedDocument};
use url::Url;

pub const STRUCTURAL_SOURCE: &str = "Ansible [YAML]";
pub const SCOPE_END_MESSAGE: &str = "the scope of this error ends here";

fn severity_for(kind: ErrorKind) -> DiagnosticSeverity {
    match kind {
        ErrorKind::Syntax | ErrorKind::Semantic | ErrorKind::Reference => DiagnosticSeverity::Error,
        ErrorKind::Warning => DiagnosticSeverity::Warning,
    }
}

/// Closed ranges ordered by start, for overlap queries.
struct IntervalIndex {
    /// `(start, end, diagnostic index)`
    entries: Vec<(Point, Point, usize)>,
}

impl IntervalIndex {
    fn new(ranges: impl Iterator<Item = (usize, TextRange)>) -> Self {
        let mut entries: Vec<_> = ranges.map(|(i, r)| (r.start, r.end, i)).collect();
        entries.sort();
        Self { entries }
    }

    /// Indices of the ranges intersecting `[range.start, range.end]`.
    fn overlapping(&self, range: TextRange) -> impl Iterator<Item = usize> + '_ {
        let upper = self.entries.partition_point(|(start, _, _)| *start <= range.end);
        self.entries[..upper]
            .iter()
            .filter(move |(_, end, _)| *end >= range.start)
            .map(|(_, _, i)| *i)
    }
}

/// Collapse every diagnostic that partially overlaps another to a point at its
/// start, keeping the original end as related information. Diagnostics are
/// visited widest first among equal starts; a collapsed one no longer counts
/// as overlapping.
pub fn collapse_overlapping(uri: &Url, diagnostics: &mut [Diagnostic]) {
    let index = IntervalIndex::new(diagnostics.iter().map(|d| d.range).enumerate());
    let mut order: Vec<usize> = (0..diagnostics.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (diagnostics[a].range, diagnostics[b].range);
        ra.start.cmp(&rb.start).then(rb.end.cmp(&ra.end))
    });

    let mut collapsed = vec![false; diagnostics.len()];
    for &current in &order {
        let range = diagnostics[current].range;
        if range.is_empty() {
            continue;
        }
        let partial = index.overlapping(range).any(|other| {
            other != current
                && !collapsed[other]
                && !diagnostics[other].range.is_empty()
                && diagnostics[other].range != range
        });
        if partial {
            collapsed[current] = true;
            let diagnostic = &mut diagnostics[current];
            diagnostic.related.push(RelatedInformation {
                uri: uri.clone(),
                range: TextRange::point(range.end),
                message: SCOPE_END_MESSAGE.to_string(),
            });
            diagnostic.range = TextRange::point(range.start);
        }
    }
}

/// Structural diagnostics for `text`.
pub fn structural_diagnostics(uri: &Url, text: &str) -> Vec<Diagnostic> {
    let parsed = ParsedDocument::parse(text);
    let lines = LineMap::new(text);
    let mut diagnostics: Vec<Diagnostic> = parsed
        .errors
        .iter()
        .map(|error| {
            Diagnostic::new(
                lines.span_to_range(text, error.span.start, error.span.end),
                severity_for(error.kind),
                error.message.clone(),
                STRUCTURAL_SOURCE,
            )
        })
        .collect();
    collapse_overlapping(uri, &mut diagnostics);
    diagnostics
}

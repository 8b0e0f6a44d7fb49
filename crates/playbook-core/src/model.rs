use serde::{Deserialize, Serialize};
use url::Url;

/// Core internal coordinate system (0-based, UTF-16 columns)
/// Does not directly use LSP Position to avoid coupling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub col: u32,
}

impl Point {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Point,
    pub end: Point,
}

impl TextRange {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn point(at: Point) -> Self {
        Self { start: at, end: at }
    }

    /// Range from `(line, col)` to the end of the same line.
    pub fn to_line_end(line: u32, col: u32) -> Self {
        Self::new(Point::new(line, col), Point::new(line, u32::MAX))
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub uri: Url,
    pub range: TextRange,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: TextRange,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub source: String,
    pub code: Option<String>,
    pub code_url: Option<String>,
    pub related: Vec<RelatedInformation>,
}

impl Diagnostic {
    pub fn new(
        range: TextRange,
        severity: DiagnosticSeverity,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
            source: source.into(),
            code: None,
            code_url: None,
            related: Vec::new(),
        }
    }
}

/// Diagnostics of one validation pass, grouped per target file.
pub type DiagnosticsByFile = std::collections::BTreeMap<Url, Vec<Diagnostic>>;

/// A workspace folder as announced by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceFolder {
    pub uri: Url,
    pub name: String,
}

impl WorkspaceFolder {
    pub fn new(uri: Url, name: impl Into<String>) -> Self {
        Self {
            uri,
            name: name.into(),
        }
    }

    /// Local directory of the folder; falls back to the raw URI path.
    pub fn root(&self) -> std::path::PathBuf {
        self.uri
            .to_file_path()
            .unwrap_or_else(|_| std::path::PathBuf::from(self.uri.path()))
    }

    /// Whether `uri` lies inside this folder, matching whole path segments.
    pub fn contains(&self, uri: &Url) -> bool {
        let base = self.uri.as_str().trim_end_matches('/');
        let target = uri.as_str();
        target == base
            || (target.starts_with(base) && target[base.len()..].starts_with('/'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

/// One entry of a batched file-watcher notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub uri: Url,
    pub kind: FileChangeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_information_serializes_uri_as_string() {
        let uri = Url::parse("file:///work/site.yml").unwrap();
        let mut diagnostic = Diagnostic::new(
            TextRange::point(Point::new(1, 0)),
            DiagnosticSeverity::Error,
            "bad",
            "test",
        );
        diagnostic.related.push(RelatedInformation {
            uri: uri.clone(),
            range: TextRange::point(Point::new(2, 4)),
            message: "ends here".to_string(),
        });

        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["related"][0]["uri"], "file:///work/site.yml");
        let back: Diagnostic = serde_json::from_value(json).unwrap();
        assert_eq!(back.related[0].uri, uri);
    }
}

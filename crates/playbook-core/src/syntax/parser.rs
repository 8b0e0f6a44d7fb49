//! Lowers the tree-sitter YAML syntax tree into the document arena.
//!
//! The grammar recovers from malformed input with `ERROR` and `MISSING`
//! nodes. Those become syntax errors, and the well-formed parts around them
//! still produce a tree. The grammar accepts duplicate keys, dangling aliases
//! and unknown tags, so those are checked while lowering.

use std::collections::HashSet;

use tree_sitter::{Language, Node as SyntaxNode, Parser};

use super::tree::*;

const KNOWN_TAGS: &[&str] = &[
    "!!str",
    "!!int",
    "!!float",
    "!!bool",
    "!!null",
    "!!map",
    "!!seq",
    "!!set",
    "!!omap",
    "!!binary",
    "!!timestamp",
    "!vault",
    "!unsafe",
];

const DUPLICATE_KEY: &str = "Map keys must be unique";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Clip,
    Strip,
    Keep,
}

pub(crate) fn parse(text: &str) -> ParsedDocument {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_yaml::LANGUAGE.into();
    if let Err(e) = parser.set_language(&language) {
        log::error!("Cannot load the YAML grammar: {e}");
        return unparsed(text, format!("YAML grammar unavailable: {e}"));
    }
    let Some(tree) = parser.parse(text, None) else {
        return unparsed(text, "YAML parser produced no tree".to_string());
    };

    let stream = tree.root_node();
    let mut errors = Vec::new();
    collect_syntax_errors(stream, text, &mut errors);

    let mut documents = Vec::new();
    for child in named_children(stream) {
        if !matches!(child.kind(), "document" | "ERROR") {
            continue;
        }
        let mut lowering = Lowering::new(text);
        let root = lowering.document(child);
        let span = root.map_or_else(|| trimmed_span(text, child), |id| lowering.nodes[id].span);
        errors.append(&mut lowering.errors);
        if root.is_none() && child.kind() == "ERROR" {
            continue;
        }
        documents.push(Document {
            nodes: lowering.nodes,
            root,
            span,
        });
    }

    errors.sort_by_key(|e| (e.span.start, e.span.end));
    ParsedDocument { documents, errors }
}

fn unparsed(text: &str, message: String) -> ParsedDocument {
    ParsedDocument {
        documents: Vec::new(),
        errors: vec![SyntaxError {
            kind: ErrorKind::Syntax,
            message,
            span: Span::new(0, text.len()),
        }],
    }
}

fn named_children(node: SyntaxNode<'_>) -> Vec<SyntaxNode<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Byte range of `node` without trailing whitespace.
fn trimmed_span(text: &str, node: SyntaxNode<'_>) -> Span {
    let start = node.start_byte();
    let end = start + text[start..node.end_byte()].trim_end().len();
    Span::new(start, end)
}

/// Report every `ERROR` and `MISSING` node. Error subtrees are reported once.
fn collect_syntax_errors(node: SyntaxNode<'_>, text: &str, errors: &mut Vec<SyntaxError>) {
    if node.is_error() {
        let span = trimmed_span(text, node);
        errors.push(SyntaxError {
            kind: ErrorKind::Syntax,
            message: error_message(&text[span.start..span.end]),
            span,
        });
        return;
    }
    if node.is_missing() {
        let at = node.start_byte();
        errors.push(SyntaxError {
            kind: ErrorKind::Syntax,
            message: missing_message(node.kind()),
            span: Span::new(at, at),
        });
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_syntax_errors(child, text, errors);
    }
}

fn missing_message(kind: &str) -> String {
    match kind {
        "]" => "Expected flow sequence to end with ]".to_string(),
        "}" => "Expected flow map to end with }".to_string(),
        "\"" | "'" => format!("Missing closing {kind}quote"),
        _ => format!("Missing {kind}"),
    }
}

/// Describe an unparseable region by the construct it leaves open.
fn error_message(region: &str) -> String {
    let (mut brackets, mut braces) = (0i32, 0i32);
    let mut quote = None;
    for c in region.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => brackets += 1,
            (None, ']') => brackets -= 1,
            (None, '{') => braces += 1,
            (None, '}') => braces -= 1,
            _ => {}
        }
    }
    if let Some(q) = quote {
        return format!("Missing closing {q}quote");
    }
    if brackets > 0 {
        return missing_message("]");
    }
    if braces > 0 {
        return missing_message("}");
    }
    if region.contains('\t') {
        return "Tabs are not allowed as indentation".to_string();
    }
    let line = region.lines().next().unwrap_or_default().trim();
    if line.ends_with(':') || line.contains(": ") {
        "Bad indentation of a mapping entry".to_string()
    } else {
        "Implicit map keys need to be followed by map values".to_string()
    }
}

struct Lowering<'a> {
    text: &'a str,
    nodes: Vec<Node>,
    anchors: HashSet<String>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lowering<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            nodes: Vec::new(),
            anchors: HashSet::new(),
            errors: Vec::new(),
        }
    }

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.nodes.push(Node { kind, span });
        self.nodes.len() - 1
    }

    fn error(&mut self, kind: ErrorKind, message: impl Into<String>, span: Span) {
        self.errors.push(SyntaxError {
            kind,
            message: message.into(),
            span,
        });
    }

    fn source(&self, node: SyntaxNode<'_>) -> &'a str {
        &self.text[node.start_byte()..node.end_byte()]
    }

    fn document(&mut self, document: SyntaxNode<'_>) -> Option<NodeId> {
        let contents = content_nodes(document);
        let (first, rest) = contents.split_first()?;
        let root = self.node(*first);
        if !document.has_error() {
            for stray in rest {
                let span = trimmed_span(self.text, *stray);
                self.error(ErrorKind::Syntax, "Unexpected content after the document root", span);
            }
        }
        Some(root)
    }

    /// Lower a `block_node`, `flow_node` or bare content node.
    fn node(&mut self, node: SyntaxNode<'_>) -> NodeId {
        match node.kind() {
            "block_node" | "flow_node" => {
                let mut content = None;
                for child in named_children(node) {
                    match child.kind() {
                        "anchor" => {
                            let name = self.source(child).trim_start_matches('&').to_string();
                            self.anchors.insert(name);
                        }
                        "tag" => self.tag(child),
                        _ => content = content.or(Some(child)),
                    }
                }
                match content {
                    Some(content) => self.node(content),
                    None => {
                        let at = node.end_byte();
                        self.push(NodeKind::Null, Span::new(at, at))
                    }
                }
            }
            "block_mapping" => self.block_mapping(node),
            "block_sequence" => self.block_sequence(node),
            "flow_mapping" => self.flow_mapping(node),
            "flow_sequence" => self.flow_sequence(node),
            "flow_pair" => {
                let pair = self.pair(node);
                let span = self.nodes[pair].span;
                self.push(NodeKind::Mapping(vec![pair]), span)
            }
            "alias" => self.alias(node),
            "plain_scalar" => {
                let value = fold_lines(self.source(node));
                self.scalar(node, value, ScalarStyle::Plain)
            }
            "double_quote_scalar" => self.quoted(node, '"', ScalarStyle::DoubleQuoted),
            "single_quote_scalar" => self.quoted(node, '\'', ScalarStyle::SingleQuoted),
            "block_scalar" => self.block_scalar(node),
            _ => {
                // Recovered region: keep its first piece of content, if any.
                match content_nodes(node).first() {
                    Some(inner) => self.node(*inner),
                    None => {
                        let span = trimmed_span(self.text, node);
                        let value = self.text[span.start..span.end].to_string();
                        self.push(
                            NodeKind::Scalar {
                                value,
                                style: ScalarStyle::Plain,
                            },
                            span,
                        )
                    }
                }
            }
        }
    }

    fn scalar(&mut self, node: SyntaxNode<'_>, value: String, style: ScalarStyle) -> NodeId {
        self.push(NodeKind::Scalar { value, style }, trimmed_span(self.text, node))
    }

    fn tag(&mut self, node: SyntaxNode<'_>) {
        let tag = self.source(node);
        if !KNOWN_TAGS.contains(&tag) && !tag.starts_with("!<") && tag != "!" {
            let message = format!("The tag {tag} is unavailable, falling back to a string");
            let span = Span::new(node.start_byte(), node.end_byte());
            self.error(ErrorKind::Warning, message, span);
        }
    }

    fn alias(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let name = self.source(node).trim_start_matches('*').to_string();
        let span = Span::new(node.start_byte(), node.end_byte());
        if !self.anchors.contains(&name) {
            let message = format!("Aliased anchor not found: {name}");
            self.error(ErrorKind::Reference, message, span);
        }
        self.push(NodeKind::Alias(name), span)
    }

    fn quoted(&mut self, node: SyntaxNode<'_>, quote: char, style: ScalarStyle) -> NodeId {
        let raw = self.source(node);
        let inner = raw.strip_prefix(quote).unwrap_or(raw);
        let inner = inner.strip_suffix(quote).unwrap_or(inner);
        let value = quoted_value(inner, quote);
        self.push(NodeKind::Scalar { value, style }, Span::new(node.start_byte(), node.end_byte()))
    }

    fn block_mapping(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let entries = flatten_recovered(node, &["block_mapping_pair"]);
        let pairs = self.pairs(entries);
        self.push(NodeKind::Mapping(pairs), trimmed_span(self.text, node))
    }

    fn flow_mapping(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let entries = flatten_recovered(node, &["flow_pair", "flow_node"]);
        let pairs = self.pairs(entries);
        self.push(NodeKind::Mapping(pairs), Span::new(node.start_byte(), node.end_byte()))
    }

    /// Lower mapping entries, flagging keys that repeat.
    fn pairs(&mut self, entries: Vec<SyntaxNode<'_>>) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let pair = if entry.kind() == "flow_node" {
                let key = self.node(entry);
                let span = self.nodes[key].span;
                self.push(NodeKind::Pair { key, value: None }, span)
            } else {
                self.pair(entry)
            };
            if let Some((key, _)) = pair_parts(&self.nodes, pair) {
                if let NodeKind::Scalar { value, .. } = &self.nodes[key].kind {
                    if !seen.insert(value.clone()) {
                        let span = self.nodes[key].span;
                        self.error(ErrorKind::Semantic, DUPLICATE_KEY, span);
                    }
                }
            }
            pairs.push(pair);
        }
        pairs
    }

    /// Lower a `block_mapping_pair` or `flow_pair`.
    fn pair(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let key = match node.child_by_field_name("key") {
            Some(key) => self.node(key),
            None => {
                let at = node.start_byte();
                self.push(NodeKind::Null, Span::new(at, at))
            }
        };
        let value = node.child_by_field_name("value").map(|value| self.node(value));
        let start = self.nodes[key].span.start.min(node.start_byte());
        let end = match value {
            Some(value) => self.nodes[value].span.end,
            None => trimmed_span(self.text, node).end,
        };
        self.push(NodeKind::Pair { key, value }, Span::new(start, end.max(start)))
    }

    fn block_sequence(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let mut items = Vec::new();
        for item in flatten_recovered(node, &["block_sequence_item"]) {
            let id = match content_nodes(item).first() {
                Some(content) => self.node(*content),
                None => {
                    let at = item.start_byte() + 1;
                    self.push(NodeKind::Null, Span::new(at, at))
                }
            };
            items.push(id);
        }
        self.push(NodeKind::Sequence(items), trimmed_span(self.text, node))
    }

    fn flow_sequence(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let mut items = Vec::new();
        for item in flatten_recovered(node, &["flow_node", "flow_pair"]) {
            items.push(self.node(item));
        }
        self.push(NodeKind::Sequence(items), Span::new(node.start_byte(), node.end_byte()))
    }

    fn block_scalar(&mut self, node: SyntaxNode<'_>) -> NodeId {
        let text = self.text;
        let span = trimmed_span(text, node);
        let raw = &text[span.start..span.end];
        let (header, body) = raw.split_once('\n').unwrap_or((raw, ""));
        let header = header.split(" #").next().unwrap_or(header).trim_end();
        let folded = header.starts_with('>');

        let mut chomp = Chomp::Clip;
        let mut explicit = None;
        for c in header.chars().skip(1) {
            match c {
                '-' => chomp = Chomp::Strip,
                '+' => chomp = Chomp::Keep,
                '1'..='9' => explicit = c.to_digit(10).map(|d| d as usize),
                _ => {
                    let at = span.start;
                    self.error(
                        ErrorKind::Syntax,
                        "Invalid block scalar header",
                        Span::new(at, at + header.len()),
                    );
                    break;
                }
            }
        }

        // Explicit indentation counts from the entry that owns the scalar.
        let base = node
            .parent()
            .and_then(|parent| parent.parent())
            .map_or(0, |owner| owner.start_position().column);
        let trailing = blank_lines_after(text, span.end);
        let value = block_scalar_value(body, folded, chomp, explicit.map(|m| base + m), trailing);
        let style = if folded {
            ScalarStyle::Folded
        } else {
            ScalarStyle::Literal
        };
        self.push(NodeKind::Scalar { value, style }, span)
    }
}

fn pair_parts(nodes: &[Node], pair: NodeId) -> Option<(NodeId, Option<NodeId>)> {
    match nodes[pair].kind {
        NodeKind::Pair { key, value } => Some((key, value)),
        _ => None,
    }
}

/// Node content of a document, sequence item or recovered region.
fn content_nodes(node: SyntaxNode<'_>) -> Vec<SyntaxNode<'_>> {
    let mut contents = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "block_node" | "flow_node" | "block_mapping" | "block_sequence" | "flow_mapping"
            | "flow_sequence" | "plain_scalar" | "double_quote_scalar" | "single_quote_scalar"
            | "block_scalar" | "alias" => contents.push(child),
            "ERROR" => contents.extend(content_nodes(child)),
            _ => {}
        }
    }
    contents
}

/// Children of `node` with one of `kinds`, looking through recovered regions.
fn flatten_recovered<'t>(node: SyntaxNode<'t>, kinds: &[&str]) -> Vec<SyntaxNode<'t>> {
    let mut entries = Vec::new();
    for child in named_children(node) {
        if kinds.contains(&child.kind()) {
            entries.push(child);
        } else if child.is_error() {
            entries.extend(flatten_recovered(child, kinds));
        }
    }
    entries
}

/// Blank lines directly after `end`, for keep-chomping.
fn blank_lines_after(text: &str, end: usize) -> usize {
    let rest = text[end..].strip_prefix('\n').unwrap_or(&text[end..]);
    let mut count: usize = 0;
    for line in rest.split('\n') {
        if !line.trim().is_empty() {
            break;
        }
        count += 1;
    }
    // The final element after the last newline is not a line.
    if rest.ends_with('\n') || rest.is_empty() {
        count = count.saturating_sub(1);
    }
    count
}

fn block_scalar_value(body: &str, folded: bool, chomp: Chomp, explicit: Option<usize>, after: usize) -> String {
    let lines: Vec<&str> = body.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let trailing = lines.iter().rev().take_while(|l| l.trim().is_empty()).count();
    let content = &lines[..lines.len() - trailing];
    let indent = explicit.unwrap_or_else(|| {
        content
            .iter()
            .find(|l| !l.trim().is_empty())
            .map_or(0, |l| l.len() - l.trim_start_matches(' ').len())
    });

    let mut value = String::new();
    let mut previous_text = false;
    for (n, line) in content.iter().enumerate() {
        let text = if line.trim().is_empty() {
            ""
        } else {
            line.get(indent..).unwrap_or_else(|| line.trim_start())
        };
        if n > 0 {
            let more_indented = text.starts_with(' ') || text.starts_with('\t');
            if folded && previous_text && !text.is_empty() && !more_indented {
                value.push(' ');
            } else {
                value.push('\n');
            }
        }
        previous_text = !text.is_empty();
        value.push_str(text);
    }
    if !content.is_empty() {
        match chomp {
            Chomp::Strip => {}
            Chomp::Clip => value.push('\n'),
            Chomp::Keep => value.push_str(&"\n".repeat(trailing + after + 1)),
        }
    }
    value
}

/// Fold the line breaks of a multi-line flow scalar: single breaks become
/// spaces, runs of blank lines become newlines.
fn fold_lines(raw: &str) -> String {
    if !raw.contains('\n') {
        return raw.to_string();
    }
    let mut out = String::new();
    let mut pending_breaks = 0;
    for (n, line) in raw.split('\n').enumerate() {
        let line = line.trim_end_matches('\r');
        let line = if n == 0 { line.trim_end() } else { line.trim() };
        if n > 0 {
            if line.is_empty() {
                pending_breaks += 1;
                continue;
            }
            if pending_breaks > 0 {
                out.push_str(&"\n".repeat(pending_breaks));
                pending_breaks = 0;
            } else {
                out.push(' ');
            }
        }
        out.push_str(line);
    }
    out
}

fn quoted_value(raw: &str, quote: char) -> String {
    let folded = fold_lines(raw);
    if quote == '"' {
        unescape_double(&folded)
    } else {
        folded.replace("''", "'")
    }
}

fn unescape_double(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some(' ') => out.push(' '),
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

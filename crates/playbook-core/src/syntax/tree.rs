use serde_json::{Map, Value};

pub type NodeId = usize;

/// Half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, offset: usize, inclusive: bool) -> bool {
        self.start <= offset && (offset < self.end || (inclusive && offset <= self.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pair node ids in document order
    Mapping(Vec<NodeId>),
    Sequence(Vec<NodeId>),
    Pair {
        key: NodeId,
        value: Option<NodeId>,
    },
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    Alias(String),
    /// Empty sequence entry
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Reference,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

/// One YAML document of a stream; nodes live in an arena indexed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: Option<NodeId>,
    pub span: Span,
}

impl Document {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    pub fn is_mapping(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Mapping(_))
    }

    pub fn is_sequence(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Sequence(_))
    }

    pub fn is_pair(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Pair { .. })
    }

    /// Text of a scalar node.
    pub fn scalar(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// `(key, value)` of a pair node.
    pub fn pair(&self, id: NodeId) -> Option<(NodeId, Option<NodeId>)> {
        match self.kind(id) {
            NodeKind::Pair { key, value } => Some((*key, *value)),
            _ => None,
        }
    }

    pub fn pairs(&self, mapping: NodeId) -> &[NodeId] {
        match self.kind(mapping) {
            NodeKind::Mapping(pairs) => pairs,
            _ => &[],
        }
    }

    pub fn items(&self, sequence: NodeId) -> &[NodeId] {
        match self.kind(sequence) {
            NodeKind::Sequence(items) => items,
            _ => &[],
        }
    }

    /// Scalar keys of a mapping, in document order.
    pub fn keys(&self, mapping: NodeId) -> Vec<&str> {
        self.pairs(mapping)
            .iter()
            .filter_map(|&p| self.pair(p))
            .filter_map(|(k, _)| self.scalar(k))
            .collect()
    }

    /// Value node stored under `key` in a mapping.
    pub fn get(&self, mapping: NodeId, key: &str) -> Option<NodeId> {
        self.pairs(mapping)
            .iter()
            .filter_map(|&p| self.pair(p))
            .find(|(k, _)| self.scalar(*k) == Some(key))
            .and_then(|(_, v)| v)
    }

    /// Plain data view of a subtree. Scalars stay strings.
    pub fn to_json(&self, id: NodeId) -> Value {
        match self.kind(id) {
            NodeKind::Mapping(pairs) => {
                let mut map = Map::new();
                for &p in pairs {
                    if let Some((k, v)) = self.pair(p) {
                        let key = self.scalar(k).unwrap_or_default().to_string();
                        map.insert(key, v.map(|v| self.to_json(v)).unwrap_or(Value::Null));
                    }
                }
                Value::Object(map)
            }
            NodeKind::Sequence(items) => {
                Value::Array(items.iter().map(|&i| self.to_json(i)).collect())
            }
            NodeKind::Scalar { value, .. } => Value::String(value.clone()),
            NodeKind::Pair { .. } | NodeKind::Alias(_) | NodeKind::Null => Value::Null,
        }
    }
}

/// A parsed YAML stream: documents plus every error found while parsing.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub documents: Vec<Document>,
    pub errors: Vec<SyntaxError>,
}

impl ParsedDocument {
    pub fn parse(text: &str) -> Self {
        super::parser::parse(text)
    }
}

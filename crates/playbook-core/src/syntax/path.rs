use super::tree::{Document, NodeId, NodeKind, ParsedDocument};

/// One element of a [`Path`]: a tree node, or the empty slot the cursor sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Node(NodeId),
    Empty,
}

impl Step {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Step::Node(id) => Some(id),
            Step::Empty => None,
        }
    }
}

/// Node ancestry from a document root down to the node under the cursor.
///
/// Paths are immutable; every narrowing operation returns a new path over the
/// same document.
#[derive(Debug, Clone)]
pub struct Path<'d> {
    doc: &'d Document,
    steps: Vec<Step>,
}

impl<'d> Path<'d> {
    pub fn new(doc: &'d Document, steps: Vec<Step>) -> Self {
        Self { doc, steps }
    }

    pub fn doc(&self) -> &'d Document {
        self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Step> {
        self.steps.get(index).copied()
    }

    pub fn last(&self) -> Option<Step> {
        self.steps.last().copied()
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.last().and_then(Step::node)
    }

    /// Prefix of this path ending at `index` (inclusive).
    pub fn prefix(&self, index: usize) -> Path<'d> {
        let end = (index + 1).min(self.steps.len());
        Path::new(self.doc, self.steps[..end].to_vec())
    }

    pub fn ancestry(&self) -> Ancestry<'_, 'd> {
        Ancestry::new(self)
    }

    /// The string key this path ends at, when it ends at a mapping key.
    pub fn key_name(&self) -> Option<&'d str> {
        let doc = self.doc;
        self.last_node().and_then(|id| doc.scalar(id))
    }
}

/// Node class expected by an [`Ancestry`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Mapping,
    Sequence,
    Pair,
}

/// Cursor moving upward through a [`Path`].
///
/// Once a step fails, every later step fails too and all getters return `None`.
#[derive(Debug, Clone, Copy)]
pub struct Ancestry<'p, 'd> {
    path: &'p Path<'d>,
    index: Option<usize>,
}

impl<'p, 'd> Ancestry<'p, 'd> {
    pub fn new(path: &'p Path<'d>) -> Self {
        Self {
            path,
            index: path.len().checked_sub(1),
        }
    }

    fn node_at(&self, index: usize) -> Option<NodeId> {
        self.path.get(index).and_then(Step::node)
    }

    fn matches(&self, index: usize, expect: Expect) -> bool {
        let doc = self.path.doc;
        match self.node_at(index) {
            Some(id) => match expect {
                Expect::Mapping => doc.is_mapping(id),
                Expect::Sequence => doc.is_sequence(id),
                Expect::Pair => doc.is_pair(id),
            },
            None => false,
        }
    }

    /// Move to the parent, skipping a pair unless a pair is expected. Fails if the
    /// parent is not of the expected class.
    pub fn parent(mut self, expect: Option<Expect>) -> Self {
        let Some(mut index) = self.index.and_then(|i| i.checked_sub(1)) else {
            self.index = None;
            return self;
        };
        if expect != Some(Expect::Pair) && self.matches(index, Expect::Pair) {
            match index.checked_sub(1) {
                Some(i) => index = i,
                None => {
                    self.index = None;
                    return self;
                }
            }
        }
        self.index = match expect {
            Some(kind) if !self.matches(index, kind) => None,
            _ => Some(index),
        };
        self
    }

    /// Move to the mapping that owns the current node as a key.
    pub fn parent_of_key(self) -> Self {
        let node = self.get();
        let moved = self.parent(Some(Expect::Pair));
        let doc = self.path.doc;
        let is_key = match (moved.node(), node) {
            (Some(pair), Some(Step::Node(key))) => doc.pair(pair).map(|(k, _)| k) == Some(key),
            _ => false,
        };
        if is_key {
            moved.parent(Some(Expect::Mapping))
        } else {
            Self {
                path: self.path,
                index: None,
            }
        }
    }

    pub fn get(&self) -> Option<Step> {
        self.index.and_then(|i| self.path.get(i))
    }

    pub fn node(&self) -> Option<NodeId> {
        self.get().and_then(Step::node)
    }

    /// Key of the pair directly below the current node.
    pub fn string_key(&self) -> Option<&'d str> {
        let doc = self.path.doc;
        let pair = self.node_at(self.index? + 1)?;
        let (key, _) = doc.pair(pair)?;
        doc.scalar(key)
    }

    /// Value of the pair directly below the current node; `Some(None)` when the
    /// pair has no value.
    pub fn value(&self) -> Option<Option<NodeId>> {
        let doc = self.path.doc;
        let pair = self.node_at(self.index? + 1)?;
        doc.pair(pair).map(|(_, value)| value)
    }

    /// Path from the root to the current node.
    pub fn path(&self) -> Option<Path<'d>> {
        self.index.map(|i| self.path.prefix(i))
    }

    /// Path from the root to the key of the pair below the current node.
    pub fn key_path(&self) -> Option<Path<'d>> {
        let index = self.index?;
        let pair = self.node_at(index + 1)?;
        let (key, _) = self.path.doc.pair(pair)?;
        let mut steps = self.path.steps()[..index + 2].to_vec();
        steps.push(Step::Node(key));
        Some(Path::new(self.path.doc, steps))
    }
}

/// Ancestry of the node at `offset`; `inclusive` also matches a node ending there.
pub fn path_at<'d>(parsed: &'d ParsedDocument, offset: usize, inclusive: bool) -> Option<Path<'d>> {
    parsed.documents.iter().find_map(|doc| {
        let root = doc.root()?;
        if !doc.span(root).contains(offset, inclusive) {
            return None;
        }
        let steps = descend(doc, vec![Step::Node(root)], root, offset, inclusive);
        Some(Path::new(doc, steps))
    })
}

fn descend(doc: &Document, mut steps: Vec<Step>, node: NodeId, offset: usize, inclusive: bool) -> Vec<Step> {
    match doc.kind(node) {
        NodeKind::Mapping(pairs) => {
            for &pair in pairs {
                let Some((key, _)) = doc.pair(pair) else { continue };
                if doc.span(key).contains(offset, inclusive) {
                    steps.push(Step::Node(pair));
                    steps.push(Step::Node(key));
                    return descend(doc, steps, key, offset, inclusive);
                }
            }
            for &pair in pairs {
                let Some((_, Some(value))) = doc.pair(pair) else { continue };
                if doc.span(value).contains(offset, inclusive) {
                    steps.push(Step::Node(pair));
                    steps.push(Step::Node(value));
                    return descend(doc, steps, value, offset, inclusive);
                }
            }
            for &pair in pairs {
                let Some((key, Some(value))) = doc.pair(pair) else { continue };
                let gap_end = if inclusive {
                    doc.span(value).start
                } else {
                    doc.span(value).start.saturating_sub(1)
                };
                if doc.span(key).end <= offset && offset < gap_end {
                    steps.push(Step::Node(pair));
                    steps.push(Step::Empty);
                    return steps;
                }
            }
        }
        NodeKind::Sequence(items) => {
            for &item in items {
                if doc.span(item).contains(offset, inclusive) {
                    steps.push(Step::Node(item));
                    return descend(doc, steps, item, offset, inclusive);
                }
            }
        }
        _ => {
            if doc.span(node).contains(offset, inclusive) {
                return steps;
            }
        }
    }
    steps.push(Step::Empty);
    steps
}

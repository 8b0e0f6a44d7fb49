//! YAML syntax layer: tolerant parser, node arena and cursor ancestry.

mod parser;
mod path;
mod tree;

pub use path::{path_at, Ancestry, Expect, Path, Step};
pub use tree::{
    Document, ErrorKind, Node, NodeId, NodeKind, ParsedDocument, ScalarStyle, Span, SyntaxError,
};

#[cfg(test)]
mod tests;

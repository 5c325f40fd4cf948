//! Markup tree produced by the template parser.
//!
//! Nodes live in an arena owned by [`TemplateAst`] and are addressed by
//! [`NodeId`]. Per-run caches (directive sets, parsed permission paths,
//! inherited guards) are side tables keyed by these ids, so the tree itself
//! stays immutable once parsed.

use serde::{Deserialize, Serialize};

pub type NodeId = usize;

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE SPANS
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte range `[start, end)` into the parsed text, plus the 1-based
/// line/column of `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        SourceSpan {
            start,
            end,
            line,
            column,
        }
    }

    #[cfg(test)]
    pub fn slice<'s>(&self, text: &'s str) -> &'s str {
        &text[self.start..self.end]
    }
}

/// Offsets of line starts, for offset → (line, column) lookups.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex {
            text: text.to_string(),
            line_starts,
        }
    }

    /// 1-based line and column (in characters) of a byte offset.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line as u32 + 1, column as u32 + 1)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAst {
    pub nodes: Vec<TemplateNode>,
    pub roots: Vec<NodeId>,
}

impl TemplateAst {
    pub fn node(&self, id: NodeId) -> &TemplateNode {
        &self.nodes[id]
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        match self.nodes.get(id) {
            Some(TemplateNode::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Children of an element; empty for every other node kind.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map(|el| el.children.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Element(ElementNode),
    Text(TextNode),
    Comment(CommentNode),
    Interpolation(InterpolationNode),
}

impl TemplateNode {
    pub fn span(&self) -> &SourceSpan {
        match self {
            TemplateNode::Element(n) => &n.span,
            TemplateNode::Text(n) => &n.span,
            TemplateNode::Comment(n) => &n.span,
            TemplateNode::Interpolation(n) => &n.span,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttributeIR>,
    pub directives: Vec<DirectiveNode>,
    pub children: Vec<NodeId>,
    pub self_closing: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub content: String,
    pub span: SourceSpan,
}

impl TextNode {
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub content: String,
    pub span: SourceSpan,
}

/// `{{ expression }}` text interpolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolationNode {
    pub content: String,
    pub span: SourceSpan,
}

/// A plain (non-directive) attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    pub value: Option<String>,
    pub span: SourceSpan,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

/// `v-name:arg.mod="exp"`, or one of the `:`, `@`, `#` shorthands.
///
/// `span` covers the whole attribute, from the first character of the name up
/// to and including the closing quote of the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveNode {
    pub name: String,
    pub raw_name: String,
    pub arg: Option<DirectiveArg>,
    pub modifiers: Vec<String>,
    pub exp: Option<DirectiveExpression>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveArg {
    pub content: String,
    /// False for `v-bind:[key]` style dynamic arguments.
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveExpression {
    pub content: String,
    /// Span of the value between the quotes.
    pub span: SourceSpan,
}

/// Identity of a directive: owning element plus its index in `directives`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectiveId {
    pub element: NodeId,
    pub index: usize,
}

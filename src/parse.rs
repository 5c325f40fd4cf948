//! Parse Module for the `v-can` compiler
//!
//! Spanned template parser. Produces an arena-backed [`TemplateAst`] in which
//! every node, attribute and directive knows its exact byte range in the
//! template text, which is what makes in-place patching possible.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ir::{
    AttributeIR, CommentNode, DirectiveArg, DirectiveExpression, DirectiveNode, ElementNode,
    InterpolationNode, LineIndex, NodeId, SourceSpan, TemplateAst, TemplateNode, TextNode,
};

lazy_static! {
    /// Directive attribute names: `v-name:arg.mod`, `:arg`, `.prop`, `@event`, `#slot`.
    static ref DIRECTIVE_NAME_RE: Regex =
        Regex::new(r"(?i)(?:^v-([a-z0-9-]+))?(?:(?::|^\.|^@|^#)(\[[^\]]+\]|[^\.]+))?(.+)?$")
            .unwrap();
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "textarea"];

// ═══════════════════════════════════════════════════════════════════════════════
// PARSE ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Structural failure in the template markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: SourceSpan,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse template markup. Spans are relative to `text`.
pub fn parse_template(text: &str) -> Result<TemplateAst, ParseError> {
    TemplateParser::new(text).parse()
}

/// Whether an attribute name denotes a directive rather than a plain attribute.
pub fn is_directive_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(':') | Some('.') | Some('@') | Some('#') => chars.next().is_some(),
        Some('v') => {
            name.starts_with("v-")
                && name[2..]
                    .chars()
                    .next()
                    .map(|c| c.is_ascii_alphanumeric())
                    .unwrap_or(false)
        }
        _ => false,
    }
}

struct OpenElement {
    id: NodeId,
    tag: String,
}

struct TemplateParser<'s> {
    src: &'s str,
    pos: usize,
    lines: LineIndex,
    nodes: Vec<TemplateNode>,
    roots: Vec<NodeId>,
    stack: Vec<OpenElement>,
}

impl<'s> TemplateParser<'s> {
    fn new(src: &'s str) -> Self {
        TemplateParser {
            src,
            pos: 0,
            lines: LineIndex::new(src),
            nodes: Vec::new(),
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<TemplateAst, ParseError> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.parse_comment()?;
            } else if rest.starts_with("</") {
                self.parse_end_tag()?;
            } else if rest.starts_with("<!") {
                self.parse_bogus_comment()?;
            } else if starts_start_tag(rest) {
                self.parse_element()?;
            } else if rest.starts_with("{{") {
                self.parse_interpolation()?;
            } else {
                self.parse_text();
            }
        }

        if let Some(open) = self.stack.last() {
            let span = *self.nodes[open.id].span();
            return Err(self.error(&span, format!("Element <{}> is missing end tag.", open.tag)));
        }

        Ok(TemplateAst {
            nodes: self.nodes,
            roots: self.roots,
        })
    }

    // ───────────────────────────────────────────────────────────────────────────
    // helpers
    // ───────────────────────────────────────────────────────────────────────────

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.src.as_bytes().get(at).copied()
    }

    fn span(&self, start: usize, end: usize) -> SourceSpan {
        let (line, column) = self.lines.position(start);
        SourceSpan::new(start, end, line, column)
    }

    fn error(&self, span: &SourceSpan, message: String) -> ParseError {
        ParseError {
            message,
            span: *span,
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.byte(self.pos), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn push_node(&mut self, node: TemplateNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        match self.stack.last() {
            Some(open) => {
                if let TemplateNode::Element(parent) = &mut self.nodes[open.id] {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.src.get(from..)?.find(needle).map(|i| from + i)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // node kinds
    // ───────────────────────────────────────────────────────────────────────────

    fn parse_text(&mut self) {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut i = start + 1;
        while i < bytes.len() {
            if bytes[i] == b'<' && starts_start_tag_or_markup(&bytes[i..]) {
                break;
            }
            if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
                break;
            }
            i += 1;
        }
        // stops only on ASCII `<`/`{` or at the end, so `i` is a char boundary
        self.pos = i;
        let span = self.span(start, i);
        self.push_node(TemplateNode::Text(TextNode {
            content: self.src[start..i].to_string(),
            span,
        }));
    }

    fn parse_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let close = self.find_from(start + 4, "-->").ok_or_else(|| {
            self.error(&self.span(start, self.src.len()), "Unterminated comment.".to_string())
        })?;
        self.pos = close + 3;
        let span = self.span(start, self.pos);
        self.push_node(TemplateNode::Comment(CommentNode {
            content: self.src[start + 4..close].to_string(),
            span,
        }));
        Ok(())
    }

    /// `<!DOCTYPE ...>` and friends; kept as comments so they never break a chain.
    fn parse_bogus_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let close = self.find_from(start + 2, ">").ok_or_else(|| {
            self.error(&self.span(start, self.src.len()), "Unterminated markup declaration.".to_string())
        })?;
        self.pos = close + 1;
        let span = self.span(start, self.pos);
        self.push_node(TemplateNode::Comment(CommentNode {
            content: self.src[start + 2..close].to_string(),
            span,
        }));
        Ok(())
    }

    fn parse_interpolation(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let close = self.find_from(start + 2, "}}").ok_or_else(|| {
            self.error(
                &self.span(start, self.src.len()),
                "Interpolation end sign was not found.".to_string(),
            )
        })?;
        self.pos = close + 2;
        let span = self.span(start, self.pos);
        self.push_node(TemplateNode::Interpolation(InterpolationNode {
            content: self.src[start + 2..close].trim().to_string(),
            span,
        }));
        Ok(())
    }

    fn parse_end_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let close = self.find_from(start + 2, ">").ok_or_else(|| {
            self.error(&self.span(start, self.src.len()), "Unterminated end tag.".to_string())
        })?;
        let name = self.src[start + 2..close].trim();
        self.pos = close + 1;

        if is_void_element(name) {
            return Ok(());
        }

        match self.stack.last() {
            Some(open) if open.tag.eq_ignore_ascii_case(name) => {
                let id = open.id;
                self.stack.pop();
                if let TemplateNode::Element(el) = &mut self.nodes[id] {
                    el.span.end = self.pos;
                }
                Ok(())
            }
            Some(open) if self.stack.iter().any(|o| o.tag.eq_ignore_ascii_case(name)) => {
                let span = *self.nodes[open.id].span();
                Err(self.error(&span, format!("Element <{}> is missing end tag.", open.tag)))
            }
            _ => Err(self.error(
                &self.span(start, self.pos),
                format!("Invalid end tag </{}>.", name),
            )),
        }
    }

    fn parse_element(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let tag_start = self.pos;
        while let Some(b) = self.byte(self.pos) {
            if b.is_ascii_whitespace() || b == b'/' || b == b'>' {
                break;
            }
            self.pos += 1;
        }
        let tag = self.src[tag_start..self.pos].to_string();

        let mut attributes = Vec::new();
        let mut directives = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error(
                    &self.span(start, self.src.len()),
                    format!("Unterminated start tag <{}>.", tag),
                ));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            self.parse_attribute(&mut attributes, &mut directives)?;
        };

        let span = self.span(start, self.pos);
        let id = self.push_node(TemplateNode::Element(ElementNode {
            tag: tag.clone(),
            attributes,
            directives,
            children: Vec::new(),
            self_closing,
            span,
        }));

        if self_closing || is_void_element(&tag) {
            return Ok(());
        }

        let is_raw = RAW_TEXT_ELEMENTS
            .iter()
            .any(|raw| raw.eq_ignore_ascii_case(&tag));
        self.stack.push(OpenElement { id, tag: tag.clone() });
        if is_raw {
            self.parse_raw_text(&tag)?;
        }
        Ok(())
    }

    /// Content of `<script>`/`<style>`/`<textarea>` up to the matching end tag.
    fn parse_raw_text(&mut self, tag: &str) -> Result<(), ParseError> {
        let start = self.pos;
        let needle = format!("</{}", tag.to_ascii_lowercase());
        let end = self.rest().to_ascii_lowercase().find(&needle).map(|i| start + i);
        let Some(end) = end else {
            let open = self.stack.last().map(|o| o.id).unwrap_or_default();
            let span = *self.nodes[open].span();
            return Err(self.error(&span, format!("Element <{}> is missing end tag.", tag)));
        };
        if end > start {
            let span = self.span(start, end);
            self.push_node(TemplateNode::Text(TextNode {
                content: self.src[start..end].to_string(),
                span,
            }));
        }
        self.pos = end;
        Ok(())
    }

    fn parse_attribute(
        &mut self,
        attributes: &mut Vec<AttributeIR>,
        directives: &mut Vec<DirectiveNode>,
    ) -> Result<(), ParseError> {
        let start = self.pos;
        let mut name_end = start;
        while let Some(b) = self.byte(name_end) {
            if b.is_ascii_whitespace() || b == b'=' || b == b'>' {
                break;
            }
            if b == b'/' && self.byte(name_end + 1) == Some(b'>') {
                break;
            }
            name_end += 1;
        }
        if name_end == start {
            // stray `=` or `/`
            name_end += 1;
        }
        let name = &self.src[start..name_end];
        self.pos = name_end;

        let before_value = self.pos;
        self.skip_whitespace();
        let value = if self.byte(self.pos) == Some(b'=') {
            self.pos += 1;
            self.skip_whitespace();
            Some(self.parse_attribute_value(start)?)
        } else {
            self.pos = before_value;
            None
        };

        let span = self.span(start, self.pos);
        if is_directive_name(name) {
            directives.push(build_directive(name, value, span));
        } else {
            attributes.push(AttributeIR {
                name: name.to_string(),
                value: value.map(|(content, _)| content),
                span,
            });
        }
        Ok(())
    }

    fn parse_attribute_value(&mut self, attr_start: usize) -> Result<(String, SourceSpan), ParseError> {
        match self.byte(self.pos) {
            Some(quote @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let quote = if quote == b'"' { "\"" } else { "'" };
                let close = self.find_from(value_start, quote).ok_or_else(|| {
                    self.error(
                        &self.span(attr_start, self.src.len()),
                        "Attribute value was not closed.".to_string(),
                    )
                })?;
                self.pos = close + 1;
                Ok((
                    self.src[value_start..close].to_string(),
                    self.span(value_start, close),
                ))
            }
            _ => {
                let value_start = self.pos;
                while let Some(b) = self.byte(self.pos) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                Ok((
                    self.src[value_start..self.pos].to_string(),
                    self.span(value_start, self.pos),
                ))
            }
        }
    }
}

fn build_directive(raw_name: &str, value: Option<(String, SourceSpan)>, span: SourceSpan) -> DirectiveNode {
    let exp = value.map(|(content, span)| DirectiveExpression { content, span });
    let caps = DIRECTIVE_NAME_RE.captures(raw_name);

    let name = match caps.as_ref().and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => match raw_name.chars().next() {
            Some('@') => "on".to_string(),
            Some('#') => "slot".to_string(),
            _ => "bind".to_string(),
        },
    };

    let arg = caps.as_ref().and_then(|c| c.get(2)).map(|m| {
        let content = m.as_str();
        if content.starts_with('[') && content.ends_with(']') {
            DirectiveArg {
                content: content[1..content.len() - 1].to_string(),
                is_static: false,
            }
        } else {
            DirectiveArg {
                content: content.to_string(),
                is_static: true,
            }
        }
    });

    let mut modifiers: Vec<String> = caps
        .as_ref()
        .and_then(|c| c.get(3))
        .map(|m| {
            m.as_str()
                .trim_start_matches('.')
                .split('.')
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if raw_name.starts_with('.') {
        modifiers.push("prop".to_string());
    }

    DirectiveNode {
        name,
        raw_name: raw_name.to_string(),
        arg,
        modifiers,
        exp,
        span,
    }
}

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

fn starts_start_tag(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.first() == Some(&b'<') && bytes.get(1).map(u8::is_ascii_alphabetic).unwrap_or(false)
}

fn starts_start_tag_or_markup(bytes: &[u8]) -> bool {
    matches!(bytes.get(1), Some(b) if b.is_ascii_alphabetic() || *b == b'/' || *b == b'!')
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(ast: &TemplateAst) -> &ElementNode {
        ast.roots
            .iter()
            .find_map(|id| ast.element(*id))
            .expect("template has an element")
    }

    #[test]
    fn test_is_directive_name() {
        assert!(is_directive_name("v-can"));
        assert!(is_directive_name("v-else-if"));
        assert!(is_directive_name(":class"));
        assert!(is_directive_name("@click"));
        assert!(is_directive_name("#default"));
        assert!(!is_directive_name("class"));
        assert!(!is_directive_name("v-"));
        assert!(!is_directive_name("value"));
    }

    #[test]
    fn test_directive_span_covers_name_and_value() {
        let src = r#"<a v-can="can.employee.view">X</a>"#;
        let ast = parse_template(src).unwrap();
        let el = first_element(&ast);
        let dir = &el.directives[0];
        assert_eq!(dir.name, "can");
        assert_eq!(dir.span.slice(src), r#"v-can="can.employee.view""#);
        let exp = dir.exp.as_ref().unwrap();
        assert_eq!(exp.content, "can.employee.view");
        assert_eq!(exp.span.slice(src), "can.employee.view");
    }

    #[test]
    fn test_directive_arguments_and_modifiers() {
        let ast = parse_template(r#"<a v-on:click.prevent.stop="go" :[key]="v" @submit v-else></a>"#).unwrap();
        let el = first_element(&ast);
        let on = &el.directives[0];
        assert_eq!(on.name, "on");
        assert_eq!(on.arg.as_ref().unwrap().content, "click");
        assert_eq!(on.modifiers, vec!["prevent", "stop"]);

        let bind = &el.directives[1];
        assert_eq!(bind.name, "bind");
        assert!(!bind.arg.as_ref().unwrap().is_static);

        let submit = &el.directives[2];
        assert_eq!(submit.name, "on");
        assert!(submit.exp.is_none());

        let else_dir = &el.directives[3];
        assert_eq!(else_dir.name, "else");
        assert!(else_dir.arg.is_none());
        assert!(else_dir.modifiers.is_empty());
    }

    #[test]
    fn test_valueless_directive_span_excludes_trailing_whitespace() {
        let src = "<p v-cannot >Denied</p>";
        let ast = parse_template(src).unwrap();
        let dir = &first_element(&ast).directives[0];
        assert_eq!(dir.span.slice(src), "v-cannot");
        assert!(dir.exp.is_none());
    }

    #[test]
    fn test_tree_shape_and_node_kinds() {
        let src = "<div>\n  <!-- note -->\n  <br>\n  <img src=\"a.png\"/>\n  {{ name }}\n  <Comp />\n</div>";
        let ast = parse_template(src).unwrap();
        assert_eq!(ast.roots.len(), 1);
        let root = first_element(&ast);
        let kinds: Vec<&str> = root
            .children
            .iter()
            .map(|id| match ast.node(*id) {
                TemplateNode::Element(_) => "element",
                TemplateNode::Text(t) if t.is_blank() => "blank",
                TemplateNode::Text(_) => "text",
                TemplateNode::Comment(_) => "comment",
                TemplateNode::Interpolation(_) => "interpolation",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "blank",
                "comment",
                "blank",
                "element",
                "blank",
                "element",
                "blank",
                "interpolation",
                "blank",
                "element",
                "blank"
            ]
        );
        assert_eq!(root.span.slice(src), src);
    }

    #[test]
    fn test_spans_carry_line_and_column() {
        let src = "<div>\n  <p v-cannot>x</p>\n</div>";
        let ast = parse_template(src).unwrap();
        let p = ast
            .nodes
            .iter()
            .find_map(|n| match n {
                TemplateNode::Element(el) if el.tag == "p" => Some(el),
                _ => None,
            })
            .unwrap();
        assert_eq!((p.span.line, p.span.column), (2, 3));
        assert_eq!((p.directives[0].span.line, p.directives[0].span.column), (2, 6));
    }

    #[test]
    fn test_raw_text_elements_are_not_parsed() {
        let ast = parse_template("<textarea><p v-cannot></textarea>").unwrap();
        let el = first_element(&ast);
        assert_eq!(el.children.len(), 1);
        match ast.node(el.children[0]) {
            TemplateNode::Text(t) => assert_eq!(t.content, "<p v-cannot>"),
            other => panic!("expected raw text, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_errors() {
        let err = parse_template("<div><p></div>").unwrap_err();
        assert!(err.message.contains("<p> is missing end tag"));

        let err = parse_template("<div>").unwrap_err();
        assert!(err.message.contains("<div> is missing end tag"));

        let err = parse_template("</span>").unwrap_err();
        assert!(err.message.contains("Invalid end tag"));

        let err = parse_template(r#"<a v-if="ready>"#).unwrap_err();
        assert!(err.message.contains("not closed"));

        let err = parse_template("<!-- open").unwrap_err();
        assert!(err.message.contains("Unterminated comment"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let ast = parse_template("<p>a < b</p>").unwrap();
        let p = first_element(&ast);
        match ast.node(p.children[0]) {
            TemplateNode::Text(t) => assert_eq!(t.content, "a < b"),
            other => panic!("expected text, got {:?}", other),
        }
    }
}

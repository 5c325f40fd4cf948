//! Locates the `<template>` block of a single-file component.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Opening tag of any top-level block we need to step over.
    static ref BLOCK_OPEN_RE: Regex =
        Regex::new(r"(?i)<(template|script|style)(\s[^>]*)?>").unwrap();

    /// Opening or closing `template` tag inside the template block.
    static ref TEMPLATE_TAG_RE: Regex =
        Regex::new(r"(?i)<(/?)template(?:\s[^>]*?)?(/?)>").unwrap();

    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
}

/// Byte offsets of the template block's inner content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRegion {
    pub start: usize,
    pub end: usize,
}

impl TemplateRegion {
    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// Find the first top-level `<template>` block of `source`.
///
/// Top-level `<script>` and `<style>` blocks (and comments) are skipped so a
/// `<template>` string inside them is never picked up. Nested `<template>`
/// elements inside the block are balanced. Returns `None` when there is no
/// template block or it is never closed.
pub fn locate_template(source: &str) -> Option<TemplateRegion> {
    let mut pos = 0;
    while pos < source.len() {
        let rest = &source[pos..];
        let open = BLOCK_OPEN_RE.captures(rest)?;
        let whole = open.get(0)?;

        // a comment that starts before this block hides it
        if let Some(comment) = COMMENT_RE.find(rest) {
            if comment.start() < whole.start() && comment.end() > whole.start() {
                pos += comment.end();
                continue;
            }
        }

        let tag = open.get(1)?.as_str().to_ascii_lowercase();
        let content_start = pos + whole.end();

        if tag == "template" {
            if whole.as_str().ends_with("/>") {
                pos = content_start;
                continue;
            }
            let end = find_template_close(source, content_start)?;
            return Some(TemplateRegion {
                start: content_start,
                end,
            });
        }

        // skip the whole script/style block
        let close = format!("</{}", tag);
        let close_at = source[content_start..].to_ascii_lowercase().find(&close)?;
        pos = content_start + close_at + close.len();
    }
    None
}

/// Offset of the `</template>` that closes the block whose content starts at `from`.
/// Template tags inside comments are not counted.
fn find_template_close(source: &str, from: usize) -> Option<usize> {
    let rest = &source[from..];
    let comments: Vec<(usize, usize)> = COMMENT_RE
        .find_iter(rest)
        .map(|m| (m.start(), m.end()))
        .collect();
    let mut depth = 1usize;
    for caps in TEMPLATE_TAG_RE.captures_iter(rest) {
        let whole = caps.get(0)?;
        if comments
            .iter()
            .any(|(start, end)| whole.start() >= *start && whole.start() < *end)
        {
            continue;
        }
        let closing = caps.get(1).map(|m| !m.as_str().is_empty()).unwrap_or(false);
        let self_closing = caps.get(2).map(|m| !m.as_str().is_empty()).unwrap_or(false);
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(from + whole.start());
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locates_inner_content() {
        let src = "<template>\n  <div />\n</template>\n<script setup>\nconst a = 1\n</script>";
        let region = locate_template(src).unwrap();
        assert_eq!(region.slice(src), "\n  <div />\n");
    }

    #[test]
    fn test_balances_nested_templates() {
        let src = "<template lang=\"html\"><template v-if=\"a\"><p/></template><i/></template>";
        let region = locate_template(src).unwrap();
        assert_eq!(
            region.slice(src),
            "<template v-if=\"a\"><p/></template><i/>"
        );
    }

    #[test]
    fn test_skips_script_containing_template_string() {
        let src = "<script>\nconst t = '<template><b/></template>'\n</script>\n<template><a/></template>";
        let region = locate_template(src).unwrap();
        assert_eq!(region.slice(src), "<a/>");
    }

    #[test]
    fn test_skips_commented_out_template() {
        let src = "<!-- <template><old/></template> -->\n<template><new/></template>";
        let region = locate_template(src).unwrap();
        assert_eq!(region.slice(src), "<new/>");
    }

    #[test]
    fn test_template_tags_inside_comments_are_ignored() {
        let src = "<template>\n<!-- old markup: </template> -->\n<a v-can=\"can.a.b\"></a>\n</template>";
        let region = locate_template(src).unwrap();
        assert_eq!(
            region.slice(src),
            "\n<!-- old markup: </template> -->\n<a v-can=\"can.a.b\"></a>\n"
        );

        let src = "<template><!-- <template> --><p/></template>";
        assert_eq!(locate_template(src).unwrap().slice(src), "<!-- <template> --><p/>");
    }

    #[test]
    fn test_missing_or_unclosed_template() {
        assert_eq!(locate_template("<script>export default {}</script>"), None);
        assert_eq!(locate_template("<template><div>"), None);
    }
}

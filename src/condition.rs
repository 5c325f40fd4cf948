//! Branch conditions copied out of `v-if` / `v-else-if` attributes.

use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Whether the attribute text `code` decodes to a single JS/TS expression.
pub fn is_valid_condition(code: &str) -> bool {
    let decoded = decode_html_entities(code);
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_typescript(true);
    Parser::new(&allocator, &decoded, source_type)
        .parse_expression()
        .is_ok()
}

/// Re-encode raw attribute text for a double-quoted attribute.
///
/// The text is decoded first, so character references already present in the
/// source are not encoded twice.
pub fn escape_for_double_quotes(condition: &str) -> String {
    let decoded = decode_html_entities(condition);
    encode_double_quoted_attribute(decoded.as_ref()).into_owned()
}

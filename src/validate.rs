use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ir::{DirectiveNode, LineIndex, SourceSpan};
use crate::permission::PathError;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_GRAMMAR: &str = "CAN-ERR-GRAMMAR";
pub const ERR_CONFLICT: &str = "CAN-ERR-CONFLICT";
pub const ERR_ADJACENCY: &str = "CAN-ERR-ADJACENCY";
pub const ERR_CHAIN_CONSISTENCY: &str = "CAN-ERR-CHAIN";
pub const ERR_INHERITANCE_SCOPE: &str = "CAN-ERR-INHERIT";
pub const ERR_PARSE: &str = "CAN-ERR-PARSE";

/// Prefix carried by every diagnostic message.
pub const TOOL_TAG: &str = "[nuxt-can]";

/// Placeholder used when the file identifier is unknown.
pub const UNKNOWN_FILE: &str = "<template>";

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed, missing or non-static permission/branch expression.
    Grammar,
    /// Mutually exclusive directives, or arguments/modifiers where none are allowed.
    Conflict,
    /// Bare `v-cannot` without an immediately preceding guarded sibling.
    Adjacency,
    /// Members of one `v-if` chain reference different permission paths.
    ChainConsistency,
    /// An inherited guard landed on an element that is not a chain member.
    InheritanceScope,
    /// The template markup itself could not be parsed.
    Parse,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Grammar => ERR_GRAMMAR,
            ErrorKind::Conflict => ERR_CONFLICT,
            ErrorKind::Adjacency => ERR_ADJACENCY,
            ErrorKind::ChainConsistency => ERR_CHAIN_CONSISTENCY,
            ErrorKind::InheritanceScope => ERR_INHERITANCE_SCOPE,
            ErrorKind::Parse => ERR_PARSE,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAN ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// A validation failure. Aborts the transform of the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{tag} {message} ({file}:{line}:{column})", tag = TOOL_TAG)]
pub struct CanError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CanError {
    pub fn new(kind: ErrorKind, message: &str, file: &str, line: u32, column: u32) -> Self {
        CanError {
            kind,
            code: kind.code().to_string(),
            message: message.to_string(),
            file: file.to_string(),
            line,
            column,
        }
    }

    /// `file:line:column`, as printed after the message.
    pub fn position(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }
}

pub type Result<T> = std::result::Result<T, CanError>;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Turns template-relative spans into file positions for diagnostics.
///
/// Spans produced by the template parser are relative to the isolated template
/// region; `base` is the region's start offset in the whole file, and `lines`
/// indexes the whole file so reported lines match what an editor shows.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    file: String,
    base: usize,
    lines: LineIndex,
}

impl ErrorContext {
    pub fn new(filename: Option<&str>, cwd: Option<&Path>, source: &str, base: usize) -> Self {
        let file = match filename {
            Some(name) => match cwd {
                Some(cwd) => filename_relative_to_cwd(name, cwd),
                None => name.to_string(),
            },
            None => UNKNOWN_FILE.to_string(),
        };
        ErrorContext {
            file,
            base,
            lines: LineIndex::new(source),
        }
    }

    /// Context for a template parsed on its own, outside of any component file.
    pub fn for_template(template: &str) -> Self {
        Self::new(None, None, template, 0)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn error(&self, kind: ErrorKind, span: &SourceSpan, message: impl AsRef<str>) -> CanError {
        let (line, column) = self.lines.position(self.base + span.start);
        CanError::new(kind, message.as_ref(), &self.file, line, column)
    }

    /// Grammar failure of a directive's permission expression.
    pub fn path_error(&self, directive: &DirectiveNode, err: &PathError) -> CanError {
        self.error(
            ErrorKind::Grammar,
            &directive.span,
            format!("`{}` {}", directive.raw_name, err),
        )
    }
}

fn filename_relative_to_cwd(filename: &str, cwd: &Path) -> String {
    match Path::new(filename).strip_prefix(cwd) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_tag_and_position() {
        let err = CanError::new(ErrorKind::Adjacency, "bad", "components/Test.vue", 3, 7);
        assert_eq!(err.to_string(), "[nuxt-can] bad (components/Test.vue:3:7)");
        assert!(err.to_string().starts_with(TOOL_TAG));
        assert_eq!(err.code, ERR_ADJACENCY);
    }

    #[test]
    fn test_filename_relative_to_cwd() {
        let ctx = ErrorContext::new(
            Some("/work/app/components/Test.vue"),
            Some(Path::new("/work/app")),
            "",
            0,
        );
        assert_eq!(ctx.file(), "components/Test.vue");

        let outside = ErrorContext::new(Some("/elsewhere/A.vue"), Some(Path::new("/work/app")), "", 0);
        assert_eq!(outside.file(), "/elsewhere/A.vue");

        assert_eq!(ErrorContext::for_template("").file(), UNKNOWN_FILE);
    }

    #[test]
    fn test_error_position_uses_base_offset() {
        let source = "<template>\n  <p v-cannot/>\n</template>";
        let base = "<template>".len();
        let ctx = ErrorContext::new(Some("A.vue"), None, source, base);
        // `v-cannot` starts at template-relative offset 6 ("\n  <p " precedes it)
        let span = SourceSpan::new(6, 14, 2, 6);
        let err = ctx.error(ErrorKind::Adjacency, &span, "nope");
        assert_eq!((err.line, err.column), (2, 6));
        assert_eq!(err.file, "A.vue");
    }
}
